use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

use artnet_strip_core::{ConfigurationService, FrameStats, Orchestrator, RecordKvStore};

use crate::infrastructure::drivers::{EspNorFlashStorageDriver, EspStripFactory};

pub(crate) type SettingsKv = RecordKvStore<EspNorFlashStorageDriver>;

/// Everything the frame path and the settings API share.
pub(crate) struct Runtime {
    pub orchestrator: Orchestrator<EspStripFactory>,
    pub configuration: ConfigurationService<SettingsKv>,
    pub stats: FrameStats,
}

/// Installed once by `main` after the strip has started.
///
/// Frames, settings patches and the update service take turns on this lock,
/// so a patch is applied between two frames and never during one.
pub(crate) static RUNTIME: Mutex<CriticalSectionRawMutex, Option<Runtime>> = Mutex::new(None);

pub(crate) async fn install_runtime(runtime: Runtime) {
    RUNTIME.lock().await.replace(runtime);
}

/// Runs `op` on the installed runtime. Returns `None` before installation.
pub(crate) async fn with_runtime<R>(op: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
    let mut guard = RUNTIME.lock().await;
    guard.as_mut().map(op)
}
