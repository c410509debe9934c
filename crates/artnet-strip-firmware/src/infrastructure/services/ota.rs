//! Firmware pull service
//!
//! On boot the running image is confirmed. After the link is up the node asks
//! the update server for its version and installs the served image when it
//! differs from the running build. The flash lock is held for the whole
//! download, so settings writes fail until the update ends.

use embassy_net::{Stack, tcp::TcpSocket};
use embassy_time::{Duration, Timer};
use embedded_io_async::Write as _;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_bootloader_esp_idf::ota::{Ota, OtaImageState, Slot};
use esp_bootloader_esp_idf::ota_updater::OtaUpdater;
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use heapless::Vec;
use log::{info, warn};

use artnet_strip_core::animation::{UPDATE_FAILED, UPDATING, fill};
use artnet_strip_core::ota::{
    AlignedWriter, HttpUrl, OtaError, OtaUrls, ResponseHead, UpdateCheck, check_version,
    parse_http_url,
};

use crate::app::with_runtime;
use crate::config;
use crate::infrastructure::drivers::{FlashStorageMutex, resolve_host};

const DOWNLOAD_RX_BUFFER_SIZE: usize = 4096;
const DOWNLOAD_TX_BUFFER_SIZE: usize = 256;
const HEAD_BUFFER_SIZE: usize = 512;
const CHUNK_SIZE: usize = 1024;
const MAX_VERSION_LEN: usize = 64;
const ERASE_SECTOR: u32 = 4096;
const PROGRESS_STEP: u32 = 64 * 1024;

/// How long the failure color stays before rendering resumes.
const FAILURE_HOLD: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub(crate) enum UpdateError {
    Ota(OtaError),
    Resolve,
    Connect,
    Io,
    PartitionTable,
    /// The image does not fit the next slot
    TooLarge,
    /// The connection closed before the announced length arrived
    Incomplete,
    Activate,
}

impl From<OtaError> for UpdateError {
    fn from(error: OtaError) -> Self {
        UpdateError::Ota(error)
    }
}

impl From<embassy_net::tcp::Error> for UpdateError {
    fn from(_error: embassy_net::tcp::Error) -> Self {
        UpdateError::Io
    }
}

pub(crate) struct OtaService {
    stack: Stack<'static>,
    flash: &'static FlashStorageMutex,
}

impl OtaService {
    pub(crate) fn new(stack: Stack<'static>, flash: &'static FlashStorageMutex) -> Self {
        Self { stack, flash }
    }

    /// Marks a freshly installed image as valid so the bootloader keeps it.
    pub(crate) async fn handle_boot_state(flash: &'static FlashStorageMutex) {
        let mut flash = flash.lock().await;
        let mut buffer = [0u8; PARTITION_TABLE_MAX_LEN];

        let Ok(pt) = read_partition_table(&mut *flash, &mut buffer) else {
            warn!("ota: failed to read partition table");
            return;
        };
        let Ok(Some(ota_data_part)) =
            pt.find_partition(PartitionType::Data(DataPartitionSubType::Ota))
        else {
            info!("ota: no OTA data partition found");
            return;
        };

        let mut ota_region = ota_data_part.as_embedded_storage(&mut *flash);
        let Ok(mut ota) = Ota::new(&mut ota_region) else {
            warn!("ota: failed to open OTA data");
            return;
        };
        match ota.current_slot() {
            Ok(Slot::None) | Err(_) => return,
            Ok(_) => {}
        }

        if let Ok(OtaImageState::New | OtaImageState::PendingVerify) = ota.current_ota_state() {
            if ota.set_current_ota_state(OtaImageState::Valid).is_ok() {
                info!("ota: marked current image as valid");
            } else {
                warn!("ota: failed to mark current image as valid");
            }
        }
    }

    /// Installs the served image when its version differs from the running one.
    ///
    /// Returns `Ok(())` when the node is up to date. A successful install
    /// reboots and never returns.
    pub(crate) async fn check_and_update(&self) -> Result<(), UpdateError> {
        let urls = OtaUrls::from_base(config::FIRMWARE.ota_base_url)?;
        let served = self.fetch_version(&urls).await?;
        if check_version(config::FIRMWARE.version, &served)? == UpdateCheck::UpToDate {
            info!("ota: firmware {} is up to date", config::FIRMWARE.version);
            return Ok(());
        }

        info!("ota: new firmware available, installing");
        with_runtime(|runtime| {
            runtime.orchestrator.suspend();
            runtime
                .orchestrator
                .with_strip(|strip| fill(strip, UPDATING));
        })
        .await;

        match self.install(&urls).await {
            Ok(()) => {
                info!("ota: rebooting into the new image");
                Timer::after(Duration::from_millis(500)).await;
                esp_hal::system::software_reset()
            }
            Err(e) => {
                warn!("ota: update failed: {:?}", e);
                with_runtime(|runtime| {
                    runtime
                        .orchestrator
                        .with_strip(|strip| fill(strip, UPDATE_FAILED));
                })
                .await;
                Timer::after(FAILURE_HOLD).await;
                with_runtime(|runtime| runtime.orchestrator.resume()).await;
                Err(e)
            }
        }
    }

    async fn fetch_version(&self, urls: &OtaUrls) -> Result<Vec<u8, MAX_VERSION_LEN>, UpdateError> {
        let url = parse_http_url(&urls.version)?;
        let mut rx_buffer = [0u8; HEAD_BUFFER_SIZE];
        let mut tx_buffer = [0u8; DOWNLOAD_TX_BUFFER_SIZE];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);

        let mut head_buf = [0u8; HEAD_BUFFER_SIZE];
        let (head, len) = self.request(&mut socket, &url, &mut head_buf).await?;

        let mut version = Vec::new();
        version
            .extend_from_slice(&head_buf[head.body_offset..len])
            .map_err(|()| UpdateError::Ota(OtaError::InvalidVersion))?;
        let mut chunk = [0u8; MAX_VERSION_LEN];
        loop {
            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            version
                .extend_from_slice(&chunk[..n])
                .map_err(|()| UpdateError::Ota(OtaError::InvalidVersion))?;
        }
        Ok(version)
    }

    async fn install(&self, urls: &OtaUrls) -> Result<(), UpdateError> {
        let url = parse_http_url(&urls.firmware)?;
        let mut rx_buffer = [0u8; DOWNLOAD_RX_BUFFER_SIZE];
        let mut tx_buffer = [0u8; DOWNLOAD_TX_BUFFER_SIZE];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buffer, &mut tx_buffer);

        let mut head_buf = [0u8; HEAD_BUFFER_SIZE];
        let (head, len) = self.request(&mut socket, &url, &mut head_buf).await?;

        let mut flash = self.flash.lock().await;
        let mut part_buffer = [0u8; PARTITION_TABLE_MAX_LEN];
        let mut updater = OtaUpdater::new(&mut *flash, &mut part_buffer)
            .map_err(|_| UpdateError::PartitionTable)?;

        {
            let (mut partition, part_type) = updater
                .next_partition()
                .map_err(|_| UpdateError::PartitionTable)?;
            let capacity = u32::try_from(partition.capacity()).unwrap_or(u32::MAX);
            info!(
                "ota: writing {:?} bytes to {:?}",
                head.content_length, part_type
            );

            let erase_size = match head.content_length {
                Some(length) if length > capacity => return Err(UpdateError::TooLarge),
                Some(length) => length.div_ceil(ERASE_SECTOR) * ERASE_SECTOR,
                None => capacity,
            };
            partition
                .erase(0, erase_size.min(capacity))
                .map_err(|_| UpdateError::Ota(OtaError::Flash))?;

            let mut writer = AlignedWriter::new(&mut partition);
            writer.write(&head_buf[head.body_offset..len])?;
            let mut chunk = [0u8; CHUNK_SIZE];
            let mut next_report = PROGRESS_STEP;
            loop {
                let n = socket.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                writer.write(&chunk[..n])?;
                if writer.received() >= next_report {
                    info!("ota: {} bytes written", writer.received());
                    next_report += PROGRESS_STEP;
                }
            }
            let written = writer.finish()?;

            if head.content_length.is_some_and(|length| length != written) {
                return Err(UpdateError::Incomplete);
            }
            info!("ota: image written ({} bytes)", written);
        }

        updater
            .activate_next_partition()
            .and_then(|()| updater.set_current_ota_state(OtaImageState::New))
            .map_err(|_| UpdateError::Activate)
    }

    /// Sends a GET for `url` and reads the response head into `head_buf`.
    ///
    /// Returns the checked head and the number of bytes read, which may
    /// include the start of the body.
    async fn request(
        &self,
        socket: &mut TcpSocket<'_>,
        url: &HttpUrl<'_>,
        head_buf: &mut [u8],
    ) -> Result<(ResponseHead, usize), UpdateError> {
        socket.set_timeout(Some(Duration::from_secs(60)));
        let addr = resolve_host(self.stack, url.host)
            .await
            .map_err(|()| UpdateError::Resolve)?;
        socket
            .connect((addr, url.port))
            .await
            .map_err(|_| UpdateError::Connect)?;
        socket.write_all(&url.get_request()?).await?;

        let mut len = 0;
        loop {
            if len == head_buf.len() {
                return Err(OtaError::MalformedResponse.into());
            }
            let n = socket.read(&mut head_buf[len..]).await?;
            if n == 0 {
                return Err(OtaError::MalformedResponse.into());
            }
            len += n;
            if let Some(head) = ResponseHead::parse(&head_buf[..len])? {
                head.ensure_ok()?;
                return Ok((head, len));
            }
        }
    }
}
