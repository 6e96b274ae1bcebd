//! Station WiFi bring-up
//!
//! The connection task owns the WiFi controller and feeds driver outcomes
//! into the [`LinkMonitor`] as events, acting on each returned action.
//! The terminal outcome is published once through a signal; `main` waits
//! on it and never re-enters bring-up. After the terminal state the task
//! returns, so later driver events have no effect for the rest of the
//! process lifetime.

use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiEvent};
use log::{error, info, warn};
use tomo_core::link::{LinkAction, LinkEvent, LinkMonitor, LinkState};

/// Terminal outcome of bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Connected with an address; the transport path is usable.
    Ready,
    /// Bring-up failed; the scan proceeds but every send will fail.
    Failed,
}

static LINK_OUTCOME: Signal<CriticalSectionRawMutex, LinkOutcome> = Signal::new();

/// Cooperatively suspends until bring-up reaches a terminal state.
pub async fn wait_for_link() -> LinkOutcome {
    LINK_OUTCOME.wait().await
}

#[embassy_executor::task]
pub async fn connection_task(
    mut controller: WifiController<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
    retry_limit: u8,
) {
    let mut monitor = LinkMonitor::new(retry_limit);

    let client = ClientConfig::default()
        .with_ssid(ssid.into())
        .with_password(password.into());
    if let Err(err) = controller.set_config(&ModeConfig::Client(client)) {
        error!("station config rejected: {:?}", err);
        LINK_OUTCOME.signal(LinkOutcome::Failed);
        return;
    }

    if let Err(err) = controller.start_async().await {
        error!("station start failed: {:?}", err);
        LINK_OUTCOME.signal(LinkOutcome::Failed);
        return;
    }
    info!("station interface started");

    let mut action = monitor.on_event(LinkEvent::StationStarted);
    while let Some(LinkAction::Connect) = action {
        info!("joining network (attempt {})", monitor.retries() + 1);
        action = match controller.connect_async().await {
            Ok(()) => {
                // Associated; an address or a disconnect decides the next
                // event, whichever arrives first.
                match select(
                    stack.wait_config_up(),
                    controller.wait_for_event(WifiEvent::StaDisconnected),
                )
                .await
                {
                    Either::First(_) => monitor.on_event(LinkEvent::AddressAcquired),
                    Either::Second(_) => {
                        warn!("link dropped before an address was acquired");
                        monitor.on_event(LinkEvent::Disconnected)
                    }
                }
            }
            Err(err) => {
                warn!("connect attempt failed: {:?}", err);
                monitor.on_event(LinkEvent::Disconnected)
            }
        };
    }

    match monitor.state() {
        LinkState::Connected => {
            info!("station link ready");
            LINK_OUTCOME.signal(LinkOutcome::Ready);
        }
        _ => {
            error!("station link retries exhausted");
            LINK_OUTCOME.signal(LinkOutcome::Failed);
        }
    }
}
