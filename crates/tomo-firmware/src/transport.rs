//! HTTP record sink
//!
//! One `POST` per record to the configured collection endpoint, body =
//! the single encoded line. The connection is opened and closed per send;
//! nothing is batched and nothing is retried. A failed send only costs
//! that one record.

use core::fmt::Write as _;

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_time::{Duration, with_timeout};
use embedded_io_async::{Read as _, Write as _};
use thiserror_no_std::Error;
use tomo_core::config::EndpointConfig;
use tomo_core::scanner::RecordSink;

/// Bound on one whole send: resolve, connect, write, read status.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

const BUFFER_SIZE: usize = 512;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("endpoint host did not resolve")]
    Dns,
    #[error("connect failed: {0:?}")]
    Connect(embassy_net::tcp::ConnectError),
    #[error("socket i/o failed: {0:?}")]
    Io(embassy_net::tcp::Error),
    #[error("endpoint rejected the record")]
    BadStatus,
    #[error("send timed out")]
    Timeout,
}

pub struct HttpSink {
    stack: Stack<'static>,
    endpoint: EndpointConfig<'static>,
    rx_buffer: [u8; BUFFER_SIZE],
    tx_buffer: [u8; BUFFER_SIZE],
}

impl HttpSink {
    pub fn new(stack: Stack<'static>, endpoint: EndpointConfig<'static>) -> Self {
        Self {
            stack,
            endpoint,
            rx_buffer: [0; BUFFER_SIZE],
            tx_buffer: [0; BUFFER_SIZE],
        }
    }

    async fn post(&mut self, line: &str) -> Result<(), TransportError> {
        let address = self
            .stack
            .dns_query(self.endpoint.host, DnsQueryType::A)
            .await
            .map_err(|_| TransportError::Dns)?
            .first()
            .copied()
            .ok_or(TransportError::Dns)?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket
            .connect((address, self.endpoint.port))
            .await
            .map_err(TransportError::Connect)?;

        let mut request: heapless::String<256> = heapless::String::new();
        let _ = write!(
            request,
            "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.endpoint.path,
            self.endpoint.host,
            line.len()
        );
        socket
            .write_all(request.as_bytes())
            .await
            .map_err(TransportError::Io)?;
        socket
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::Io)?;
        socket.flush().await.map_err(TransportError::Io)?;

        // "HTTP/1.x NNN ..."; anything outside 2xx is a rejection.
        let mut status = [0u8; 16];
        let n = socket.read(&mut status).await.map_err(TransportError::Io)?;
        socket.close();
        if n < 10 || !status.starts_with(b"HTTP/1.") || status[9] != b'2' {
            return Err(TransportError::BadStatus);
        }
        Ok(())
    }
}

impl RecordSink for HttpSink {
    type Error = TransportError;

    async fn send(&mut self, line: &str) -> Result<(), TransportError> {
        match with_timeout(SEND_TIMEOUT, self.post(line)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}
