//! Flash storage shared between the settings record and firmware updates.
//!
//! Settings writes are short and happen from the HTTP handler, so they only
//! try the lock. A firmware update holds it for the whole download.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_hal::peripherals::FLASH;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use artnet_strip_core::kv::KV_BLOCK_SIZE;
use artnet_strip_core::{StorageDriver, StorageError};

use crate::config;

pub(crate) const BLOCK_SIZE: u32 = 4096;

pub(crate) type FlashStorageMutex = Mutex<CriticalSectionRawMutex, FlashStorage<'static>>;

static FLASH_STORAGE: StaticCell<FlashStorageMutex> = StaticCell::new();

/// Takes the flash peripheral. Must be called once.
pub(crate) fn init_flash_storage(flash: FLASH<'static>) -> &'static FlashStorageMutex {
    FLASH_STORAGE.init(Mutex::new(FlashStorage::new(flash)))
}

/// Storage driver for the settings record.
///
/// The driver operates strictly within the `settings` partition
/// at offset [`config::SETTINGS_PARTITION_OFFSET`].
pub(crate) struct EspNorFlashStorageDriver {
    flash: &'static FlashStorageMutex,
    addr: u32,
}

impl EspNorFlashStorageDriver {
    pub(crate) fn new(flash: &'static FlashStorageMutex) -> Self {
        Self {
            flash,
            addr: config::SETTINGS_PARTITION_OFFSET,
        }
    }
}

impl StorageDriver<KV_BLOCK_SIZE> for EspNorFlashStorageDriver {
    fn read(&self, buffer: &mut [u8]) -> Result<(), StorageError> {
        let mut flash = self
            .flash
            .try_lock()
            .map_err(|_| StorageError::DriverError)?;
        flash
            .read(self.addr, buffer)
            .map_err(|_| StorageError::DriverError)
    }

    fn write(&self, buffer: &[u8]) -> Result<(), StorageError> {
        let mut flash = self
            .flash
            .try_lock()
            .map_err(|_| StorageError::DriverError)?;
        flash
            .erase(self.addr, self.addr + BLOCK_SIZE)
            .map_err(|_| StorageError::DriverError)?;
        flash
            .write(self.addr, buffer)
            .map_err(|_| StorageError::DriverError)
    }
}
