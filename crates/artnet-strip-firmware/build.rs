use chrono::Local;

/// Build-time values baked into the image. Missing ones fall back to an empty
/// string so a plain `cargo build` still succeeds.
const PASSTHROUGH: [&str; 3] = ["WIFI_SSID", "WIFI_PASSWORD", "OTA_BASE_URL"];

fn main() {
    let version = Local::now().format("%Y-%m-%d_%H-%M-%S");
    println!("cargo:rustc-env=BUILD_VERSION={version}");

    for key in PASSTHROUGH {
        println!("cargo:rerun-if-env-changed={key}");
        let value = std::env::var(key).unwrap_or_default();
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rerun-if-changed=partitions.csv");
    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
