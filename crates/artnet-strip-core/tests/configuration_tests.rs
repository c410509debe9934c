//! Integration tests for the configuration API use cases.

mod common;

use core::net::Ipv4Addr;

use artnet_strip_core::api::{SettingsPatch, SettingsView, StatusView};
use artnet_strip_core::settings_store::keys;
use artnet_strip_core::{
    Addressing, Applied, ConfigurationError, ConfigurationService, FrameOutcome, FrameStats,
    KeyValueStore, LifecycleError, LifecycleState, Orchestrator, RecordKvStore, SettingsError,
    SettingsStore, StripError,
};
use common::{MemoryDriver, ScriptedFactory, settings};

type Service = ConfigurationService<RecordKvStore<MemoryDriver>>;

fn booted(driver: &MemoryDriver) -> (Service, Orchestrator<ScriptedFactory>) {
    let mut service = ConfigurationService::new(SettingsStore::new(RecordKvStore::open(
        driver.clone(),
    )));
    let mut orchestrator = Orchestrator::new(ScriptedFactory::new());
    service.boot(&mut orchestrator).expect("boot");
    (service, orchestrator)
}

fn patch(json: &str) -> SettingsPatch {
    serde_json_core::from_str::<SettingsPatch>(json)
        .expect("valid patch")
        .0
}

// -----------------------------------------------------------------------------
// Boot
// -----------------------------------------------------------------------------

#[test]
fn boot_starts_with_defaults_on_first_run() {
    let driver = MemoryDriver::new();
    let (_, orchestrator) = booted(&driver);

    assert_eq!(orchestrator.state(), LifecycleState::Running);
    assert_eq!(orchestrator.settings().pixel_count, 626);
    assert!(orchestrator.settings().configured);
}

#[test]
fn boot_replaces_unusable_persisted_values() {
    let driver = MemoryDriver::new();
    {
        let mut kv = RecordKvStore::open(driver.clone());
        kv.put_bool(keys::CONFIGURED, true).expect("put");
        kv.put_i32(keys::NUM_PIXELS, 0).expect("put");
        kv.put_i32(keys::GROUP_LED, 0).expect("put");
        kv.put_i32(keys::DATA_PIN, 4).expect("put");
        kv.commit().expect("commit");
    }

    let (_, orchestrator) = booted(&driver);

    assert_eq!(orchestrator.state(), LifecycleState::Running);
    assert_eq!(orchestrator.settings().pixel_count, 626);
    assert_eq!(orchestrator.settings().group_factor, 1);
    assert_eq!(orchestrator.settings().output_pin, 4);
}

#[test]
fn boot_with_unusable_pin_degrades() {
    let driver = MemoryDriver::new();
    {
        let mut kv = RecordKvStore::open(driver.clone());
        kv.put_bool(keys::CONFIGURED, true).expect("put");
        kv.put_i32(keys::DATA_PIN, 99).expect("put");
        kv.commit().expect("commit");
    }
    let mut service = ConfigurationService::new(SettingsStore::new(RecordKvStore::open(
        driver.clone(),
    )));
    let mut orchestrator = Orchestrator::new(ScriptedFactory::new());

    let result = service.boot(&mut orchestrator);

    assert_eq!(result, Err(LifecycleError::Strip(StripError::InvalidPin(99))));
    assert_eq!(orchestrator.state(), LifecycleState::Degraded);

    // The API can still repair the pin
    let applied = service
        .apply_patch(&mut orchestrator, &patch(r#"{"outputPin":2}"#))
        .expect("repair");
    assert_eq!(applied, Applied::Rebuilt);
    assert_eq!(orchestrator.state(), LifecycleState::Running);
}

// -----------------------------------------------------------------------------
// Patches
// -----------------------------------------------------------------------------

#[test]
fn patch_rebuilds_and_persists() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);

    let applied = service
        .apply_patch(
            &mut orchestrator,
            &patch(r#"{"pixelCount":300,"groupFactor":2,"outputPin":4}"#),
        )
        .expect("apply");

    assert_eq!(applied, Applied::Rebuilt);
    assert_eq!(orchestrator.settings().pixel_count, 300);
    assert_eq!(orchestrator.strip().expect("strip").pixels().len(), 300);

    let reloaded = SettingsStore::new(RecordKvStore::open(driver.clone())).load();
    assert_eq!(reloaded.pixel_count, 300);
    assert_eq!(reloaded.group_factor, 2);
    assert_eq!(reloaded.output_pin, 4);
}

#[test]
fn identity_patch_applies_in_place() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);

    let applied = service
        .apply_patch(
            &mut orchestrator,
            &patch(r#"{"shortName":"Truss A","startUniverse":4}"#),
        )
        .expect("apply");

    assert_eq!(applied, Applied::InPlace);
    assert_eq!(orchestrator.settings().identity.short_name.as_str(), "Truss A");
    assert_eq!(orchestrator.settings().start_universe, 4);
    assert_eq!(orchestrator.factory().built_pins.len(), 1);
    assert_eq!(
        service.store().kv().get_str(keys::SHORT_NAME),
        Some("Truss A")
    );
}

#[test]
fn invalid_patch_is_rejected_before_saving() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);
    let writes = driver.writes.get();

    let zero_group = service.apply_patch(&mut orchestrator, &patch(r#"{"groupFactor":0}"#));
    let bad_pin = service.apply_patch(&mut orchestrator, &patch(r#"{"outputPin":99}"#));
    let long_name = service.apply_patch(
        &mut orchestrator,
        &patch(r#"{"shortName":"a name longer than eighteen"}"#),
    );

    assert_eq!(
        zero_group,
        Err(ConfigurationError::Invalid(SettingsError::ZeroGroupFactor))
    );
    assert_eq!(
        bad_pin,
        Err(ConfigurationError::Lifecycle(LifecycleError::Strip(
            StripError::InvalidPin(99)
        )))
    );
    assert_eq!(
        long_name,
        Err(ConfigurationError::Invalid(SettingsError::ValueTooLong))
    );
    assert_eq!(driver.writes.get(), writes);
    assert_eq!(orchestrator.state(), LifecycleState::Running);
}

#[test]
fn patch_during_reconfiguration_conflicts() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);
    orchestrator.begin_reconfiguration().expect("begin");

    let result = service.apply_patch(&mut orchestrator, &patch(r#"{"pixelCount":10}"#));

    assert_eq!(
        result,
        Err(ConfigurationError::Lifecycle(
            LifecycleError::ReconfigurationInProgress
        ))
    );
    assert_eq!(
        SettingsStore::new(RecordKvStore::open(driver.clone()))
            .load()
            .pixel_count,
        626
    );
}

#[test]
fn failed_save_still_applies_the_patch() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);
    driver.fail_writes.set(true);

    let applied = service
        .apply_patch(&mut orchestrator, &patch(r#"{"pixelCount":50}"#))
        .expect("apply");

    assert_eq!(applied, Applied::Rebuilt);
    assert_eq!(orchestrator.settings().pixel_count, 50);
    assert!(orchestrator.settings().configured);
}

#[test]
fn wifi_addressing_patches() {
    let base = settings(10, 1, 2);

    let fixed = patch(
        r#"{"wifiIp":"192.168.1.201","wifiGateway":"192.168.1.1","wifiSubnet":"255.255.255.0"}"#,
    )
    .apply_to(&base)
    .expect("static");
    assert_eq!(
        fixed.wifi.addressing,
        Addressing::Static {
            ip: Ipv4Addr::new(192, 168, 1, 201),
            gateway: Ipv4Addr::new(192, 168, 1, 1),
            subnet: Ipv4Addr::new(255, 255, 255, 0),
        }
    );

    let dhcp = patch(r#"{"wifiIp":""}"#).apply_to(&fixed).expect("dhcp");
    assert_eq!(dhcp.wifi.addressing, Addressing::Dhcp);

    assert_eq!(
        patch(r#"{"wifiIp":"300.1.1.1"}"#).apply_to(&base),
        Err(SettingsError::InvalidAddress)
    );
}

#[test]
fn gateway_and_subnet_without_ip_are_rejected() {
    let base = settings(10, 1, 2);

    assert_eq!(
        patch(r#"{"wifiGateway":"192.168.1.1","wifiSubnet":"255.255.255.0"}"#).apply_to(&base),
        Err(SettingsError::InvalidAddress)
    );
}

#[test]
fn ip_without_gateway_or_subnet_is_rejected() {
    let base = settings(10, 1, 2);

    assert_eq!(
        patch(r#"{"wifiIp":"192.168.1.50"}"#).apply_to(&base),
        Err(SettingsError::InvalidAddress)
    );
    assert_eq!(
        patch(r#"{"wifiIp":"192.168.1.50","wifiGateway":"192.168.1.1"}"#).apply_to(&base),
        Err(SettingsError::InvalidAddress)
    );
}

#[test]
fn partial_address_patch_on_static_node_keeps_the_rest() {
    let mut base = settings(10, 1, 2);
    base.wifi.addressing = Addressing::Static {
        ip: Ipv4Addr::new(10, 0, 0, 5),
        gateway: Ipv4Addr::new(10, 0, 0, 1),
        subnet: Ipv4Addr::new(255, 255, 255, 0),
    };

    let moved = patch(r#"{"wifiIp":"10.0.0.6"}"#)
        .apply_to(&base)
        .expect("static");

    assert_eq!(
        moved.wifi.addressing,
        Addressing::Static {
            ip: Ipv4Addr::new(10, 0, 0, 6),
            gateway: Ipv4Addr::new(10, 0, 0, 1),
            subnet: Ipv4Addr::new(255, 255, 255, 0),
        }
    );
}

#[test]
fn incomplete_static_address_is_not_saved() {
    let driver = MemoryDriver::new();
    let (mut service, mut orchestrator) = booted(&driver);
    let writes = driver.writes.get();

    let result = service.apply_patch(&mut orchestrator, &patch(r#"{"wifiIp":"192.168.1.50"}"#));

    assert_eq!(
        result,
        Err(ConfigurationError::Invalid(SettingsError::InvalidAddress))
    );
    assert_eq!(driver.writes.get(), writes);
    assert_eq!(orchestrator.settings().wifi.addressing, Addressing::Dhcp);
}

#[test]
fn empty_patch_changes_nothing() {
    let base = settings(10, 1, 2);

    assert_eq!(patch("{}").apply_to(&base), Ok(base));
}

// -----------------------------------------------------------------------------
// Views
// -----------------------------------------------------------------------------

#[test]
fn settings_view_serializes_without_password() {
    let mut settings = settings(626, 1, 2);
    settings.wifi.ssid = artnet_strip_core::settings::truncated("venue");
    settings.wifi.password = artnet_strip_core::settings::truncated("hunter22");

    let json: heapless::String<512> =
        serde_json_core::to_string(&SettingsView::from(&settings)).expect("serialize");

    assert!(json.starts_with(r#"{"pixelCount":626,"groupFactor":1,"startUniverse":0"#));
    assert!(json.contains(r#""outputPin":2"#));
    assert!(json.contains(r#""shortName":"ESP_ArtNet""#));
    assert!(json.contains(r#""wifiSsid":"venue""#));
    assert!(json.contains(r#""wifiIp":null"#));
    assert!(!json.contains("hunter22"));
}

#[test]
fn settings_view_shows_static_addresses() {
    let mut settings = settings(626, 1, 2);
    settings.wifi.addressing = Addressing::Static {
        ip: Ipv4Addr::new(10, 0, 0, 20),
        gateway: Ipv4Addr::new(10, 0, 0, 1),
        subnet: Ipv4Addr::new(255, 255, 255, 255),
    };

    let view = SettingsView::from(&settings);

    assert_eq!(view.wifi_ip.as_deref(), Some("10.0.0.20"));
    assert_eq!(view.wifi_subnet.as_deref(), Some("255.255.255.255"));
}

#[test]
fn status_view_reports_state_and_frames() {
    let mut stats = FrameStats::new();
    stats.record(FrameOutcome::Rendered { pixels: 3 }, 0);
    stats.record(FrameOutcome::Skipped, 1);

    let view = StatusView::new(
        LifecycleState::Degraded,
        false,
        Some(LifecycleError::Strip(StripError::Peripheral)),
        "2026-01-01_00-00-00",
        stats.snapshot(),
    );
    let json: heapless::String<256> = serde_json_core::to_string(&view).expect("serialize");

    assert!(json.contains(r#""state":"degraded""#));
    assert!(json.contains(r#""lastError":"peripheral""#));
    assert!(json.contains(r#""frames":{"rendered":1,"dropped":0,"skipped":1,"fps":0}"#));
}

#[test]
fn error_codes_name_the_innermost_cause() {
    let too_many = LifecycleError::Strip(StripError::TooManyPixels {
        requested: 65_535,
        max: 680,
    });

    assert_eq!(too_many.as_str(), "tooManyPixels");
    assert_eq!(
        ConfigurationError::Invalid(SettingsError::InvalidAddress).as_str(),
        "invalidAddress"
    );
    assert_eq!(
        ConfigurationError::Lifecycle(LifecycleError::ReconfigurationInProgress).as_str(),
        "reconfigurationInProgress"
    );
}

#[test]
fn settings_view_renders_the_widest_address() {
    let mut settings = settings(10, 1, 2);
    settings.wifi.addressing = Addressing::Static {
        ip: Ipv4Addr::new(255, 255, 255, 254),
        gateway: Ipv4Addr::new(255, 255, 255, 255),
        subnet: Ipv4Addr::new(255, 255, 255, 0),
    };

    let view = SettingsView::from(&settings);

    assert_eq!(view.wifi_gateway.as_deref(), Some("255.255.255.255"));
    assert_eq!(view.wifi_ip.as_deref(), Some("255.255.255.254"));
}
