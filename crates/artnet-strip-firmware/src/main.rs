#![no_std]
#![no_main]
#![feature(type_alias_impl_trait)]

mod app;
mod config;
mod controllers;
mod infrastructure;
mod net;

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, rng::Rng, timer::timg::TimerGroup};
use log::{info, warn};

use artnet_strip_core::animation::{CONNECTED, ConnectingPulse, fill, sparkle};
use artnet_strip_core::link::NetworkLink as _;
use artnet_strip_core::{
    ConfigurationService, FrameStats, Orchestrator, RecordKvStore, SettingsStore,
};

use crate::app::{Runtime, install_runtime, with_runtime};
use crate::infrastructure::drivers::{
    EspNorFlashStorageDriver, EspStripFactory, WifiLink, init_flash_storage,
};
use crate::infrastructure::services::OtaService;
use crate::infrastructure::tasks::{artnet_task, http_server_task};

esp_bootloader_esp_idf::esp_app_desc!();

/// Frames of the startup sparkle
const SPARKLE_FRAMES: u32 = 20;
const SPARKLE_MAX_LEVEL: u8 = 200;
/// One pixel in this many lights up per sparkle frame
const SPARKLE_FREQUENCY: u32 = 10;

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    info!("ArtNet strip node {}", config::FIRMWARE.version);

    // Initialize hardware
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Allocate heap memory (64 + 32 KB)
    esp_alloc::heap_allocator!(
        #[unsafe(link_section = ".dram2_uninit")] size: 64 * 1024
    );
    esp_alloc::heap_allocator!(size: 32 * 1024);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let flash = init_flash_storage(peripherals.FLASH);
    OtaService::handle_boot_state(flash).await;

    // Settings and strip
    let store = SettingsStore::with_defaults(
        RecordKvStore::open(EspNorFlashStorageDriver::new(flash)),
        config::default_settings(),
    );
    let mut configuration = ConfigurationService::new(store);
    let mut orchestrator = Orchestrator::new(EspStripFactory::new(peripherals.RMT));
    if let Err(e) = configuration.boot(&mut orchestrator) {
        warn!("boot: strip unavailable, settings API only: {:?}", e);
    }

    let rng = Rng::new();
    for _ in 0..SPARKLE_FRAMES {
        orchestrator.with_strip(|strip| {
            sparkle(strip, SPARKLE_MAX_LEVEL, SPARKLE_FREQUENCY, |bound| {
                rng.random() % bound.max(1)
            });
        });
        Timer::after(Duration::from_millis(50)).await;
    }

    let settings = orchestrator.settings().clone();
    install_runtime(Runtime {
        orchestrator,
        configuration,
        stats: FrameStats::new(),
    })
    .await;

    // Network
    let mut link = match WifiLink::new(spawner, peripherals.WIFI, &settings) {
        Ok(link) => link,
        Err(e) => {
            warn!("boot: network device unavailable: {:?}", e);
            idle().await
        }
    };
    if let Err(e) = link.begin().await {
        warn!("boot: network not started: {:?}", e);
        idle().await
    }

    let mut pulse = ConnectingPulse::new();
    while !link.is_connected() {
        with_runtime(|runtime| runtime.orchestrator.with_strip(|strip| pulse.paint(strip))).await;
        Timer::after(Duration::from_millis(10)).await;
    }
    let stack = link.stack();
    info!(
        "boot: {:?} link up, address {:?}",
        link.kind(),
        link.local_address()
    );
    with_runtime(|runtime| {
        runtime
            .orchestrator
            .with_strip(|strip| fill(strip, CONNECTED))
    })
    .await;

    if !config::FIRMWARE.ota_base_url.is_empty() {
        if let Err(e) = OtaService::new(stack, flash).check_and_update().await {
            warn!("boot: firmware check failed: {:?}", e);
        }
    }

    spawner.spawn(artnet_task(stack)).ok();
    spawner.spawn(http_server_task(stack)).ok();
    info!("boot: ready");

    idle().await
}

async fn idle() -> ! {
    loop {
        Timer::after(Duration::from_secs(5)).await;
    }
}
