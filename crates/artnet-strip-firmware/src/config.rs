use artnet_strip_core::Settings;
use artnet_strip_core::settings::truncated;

pub(crate) struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

pub(crate) struct LightConfig {
    pub pixel_count: u16,
    pub group_factor: u16,
    pub output_pin: u8,
}

pub(crate) struct FirmwareConfig {
    pub version: &'static str,
    /// Directory holding `version.txt` and `firmware.bin`. Empty disables pulls.
    pub ota_base_url: &'static str,
}

pub(crate) struct NetworkConfig {
    pub artnet_port: u16,
    pub http_port: u16,
}

/// Base address of the `settings` partition (defined in partitions.csv).
pub(crate) const SETTINGS_PARTITION_OFFSET: u32 = 0x31_0000;

pub(crate) const WIFI: WifiConfig = WifiConfig {
    ssid: env!("WIFI_SSID"),
    password: env!("WIFI_PASSWORD"),
};

pub(crate) const LIGHT: LightConfig = LightConfig {
    pixel_count: 626,
    group_factor: 1,
    output_pin: 2,
};

pub(crate) const FIRMWARE: FirmwareConfig = FirmwareConfig {
    version: env!("BUILD_VERSION"),
    ota_base_url: env!("OTA_BASE_URL"),
};

pub(crate) const NETWORK: NetworkConfig = NetworkConfig {
    artnet_port: artnet_strip_core::artnet::ARTNET_PORT,
    http_port: 80,
};

/// Settings used on first boot and for keys missing from storage.
pub(crate) fn default_settings() -> Settings {
    let mut settings = Settings {
        pixel_count: LIGHT.pixel_count,
        group_factor: LIGHT.group_factor,
        output_pin: LIGHT.output_pin,
        ..Settings::default()
    };
    settings.wifi.ssid = truncated(WIFI.ssid);
    settings.wifi.password = truncated(WIFI.password);
    settings
}
