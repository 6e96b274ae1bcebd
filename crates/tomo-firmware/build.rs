fn main() {
    // Surface .env values (station credentials, collection endpoint) as
    // compile-time env vars for option_env! in the firmware.
    let _ = dotenvy::dotenv();
    for key in [
        "TOMO_WIFI_SSID",
        "TOMO_WIFI_PASSWORD",
        "TOMO_ENDPOINT_HOST",
    ] {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={key}");
    }
}
