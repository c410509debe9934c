mod flash_storage;
mod led;
mod network;

pub(crate) use flash_storage::{EspNorFlashStorageDriver, FlashStorageMutex, init_flash_storage};
pub(crate) use led::EspStripFactory;
pub(crate) use network::{WifiLink, resolve_host};
