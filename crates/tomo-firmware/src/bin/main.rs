#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_time::{Delay, Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use esp_radio::wifi::WifiDevice;
use log::{error, info};
use static_cell::StaticCell;

use tomo_core::config::{Config, EndpointConfig, InternetConfig, ScanConfig};
use tomo_core::scanner::Scanner;
use tomo_firmware::drive::{ELECTRODE_COUNT, ELECTRODE_PINS, GpioDriveBank};
use tomo_firmware::sense::AdcSense;
use tomo_firmware::transport::HttpSink;
use tomo_firmware::wifi::{self, LinkOutcome};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Device configuration, assembled from build-time inputs. Credentials
/// come from `.env` via the build script; absent values stay empty and
/// are caught by validation before any peripheral is configured.
fn device_config() -> Config<'static> {
    Config {
        internet: InternetConfig {
            ssid: option_env!("TOMO_WIFI_SSID").unwrap_or(""),
            password: option_env!("TOMO_WIFI_PASSWORD").unwrap_or(""),
        },
        endpoint: EndpointConfig {
            host: option_env!("TOMO_ENDPOINT_HOST").unwrap_or("collector.local"),
            port: 8080,
            path: "/records",
        },
        scan: ScanConfig::default(),
    }
}

async fn halt() -> ! {
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("embassy initialized");

    // Configuration errors are fatal and must surface before any GPIO or
    // ADC call.
    let device_config = device_config();
    if let Err(err) = device_config.validate() {
        error!("configuration rejected: {}", err);
        halt().await
    }
    if let Err(err) = tomo_core::config::validate_drive_pins(&ELECTRODE_PINS) {
        error!("electrode pin map rejected: {}", err);
        halt().await
    }

    let radio_init = esp_radio::init().expect("failed to initialize radio controller");
    let (controller, interfaces) =
        esp_radio::wifi::new(&radio_init, peripherals.WIFI, Default::default())
            .expect("failed to initialize wifi controller");

    static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let mut rng = esp_hal::rng::Rng::new();
    let net_seed = ((rng.random() as u64) << 32) | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        net_seed,
    );
    spawner.spawn(net_task(runner)).expect("net task");
    spawner
        .spawn(wifi::connection_task(
            controller,
            stack,
            device_config.internet.ssid,
            device_config.internet.password,
            device_config.scan.retry_limit,
        ))
        .expect("connection task");

    // Bring-up happens exactly once; a failed link degrades the device to
    // scan-only operation, it does not stop the scan.
    match wifi::wait_for_link().await {
        LinkOutcome::Ready => info!(
            "streaming records to {}:{}{}",
            device_config.endpoint.host, device_config.endpoint.port, device_config.endpoint.path
        ),
        LinkOutcome::Failed => {
            error!("network unavailable; scanning continues, records will be dropped")
        }
    }

    // Drive lines start low: no current flows until the first pair is
    // excited.
    let pins = [
        Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO6, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO8, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO9, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO10, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO11, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO12, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO14, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO16, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO17, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO18, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default()),
    ];
    let drive = GpioDriveBank::new(pins);

    // 12-bit conversions at 0 dB attenuation on the shared sense input.
    let mut adc_config = AdcConfig::new();
    let sense_pin = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_0dB);
    let adc = Adc::new(peripherals.ADC1, adc_config).into_async();
    let sense = AdcSense::new(adc, sense_pin);

    let sink = HttpSink::new(stack, device_config.endpoint);

    let mut scanner =
        Scanner::<ELECTRODE_COUNT, _, _, _, _>::new(drive, sense, sink, Delay, device_config.scan)
            .expect("a 16-electrode array always forms a valid plan");
    scanner.run().await
}
