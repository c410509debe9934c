//! Configuration use cases
//!
//! Ties the settings store to the orchestrator: boot-time loading and the
//! `POST /settings` flow (merge, validate, save, reconfigure).

use log::warn;

use crate::api::SettingsPatch;
use crate::kv::KeyValueStore;
use crate::lifecycle::{Applied, LifecycleError, LifecycleState, Orchestrator, StripFactory};
use crate::settings::{Settings, SettingsError};
use crate::settings_store::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The merged settings are invalid
    Invalid(SettingsError),
    /// The strip cannot be built or a reconfiguration is already running
    Lifecycle(LifecycleError),
}

impl ConfigurationError {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigurationError::Invalid(e) => e.as_str(),
            ConfigurationError::Lifecycle(e) => e.as_str(),
        }
    }
}

impl From<SettingsError> for ConfigurationError {
    fn from(error: SettingsError) -> Self {
        ConfigurationError::Invalid(error)
    }
}

impl From<LifecycleError> for ConfigurationError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::Settings(e) => ConfigurationError::Invalid(e),
            e => ConfigurationError::Lifecycle(e),
        }
    }
}

pub struct ConfigurationService<S: KeyValueStore> {
    store: SettingsStore<S>,
}

impl<S: KeyValueStore> ConfigurationService<S> {
    pub fn new(store: SettingsStore<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    /// Loads the persisted settings and starts the orchestrator with them.
    ///
    /// Persisted values the strip cannot use are replaced by their defaults.
    pub fn boot<F: StripFactory>(
        &mut self,
        orchestrator: &mut Orchestrator<F>,
    ) -> Result<(), LifecycleError> {
        let mut settings = self.store.load();
        let defaults = self.store.defaults();
        if settings.pixel_count == 0 {
            warn!("settings: pixel count is zero, using default");
            settings.pixel_count = defaults.pixel_count;
        }
        if settings.group_factor == 0 {
            warn!("settings: group factor is zero, using default");
            settings.group_factor = defaults.group_factor;
        }
        orchestrator.start(settings)
    }

    /// Applies a partial update coming from the settings API.
    ///
    /// The merged record is checked against the strip factory before it is
    /// saved, so a rejected update never reaches storage. A failed save is
    /// only logged.
    pub fn apply_patch<F: StripFactory>(
        &mut self,
        orchestrator: &mut Orchestrator<F>,
        patch: &SettingsPatch,
    ) -> Result<Applied, ConfigurationError> {
        let next = patch.apply_to(orchestrator.settings())?;
        self.apply(orchestrator, next)
    }

    pub fn apply<F: StripFactory>(
        &mut self,
        orchestrator: &mut Orchestrator<F>,
        mut next: Settings,
    ) -> Result<Applied, ConfigurationError> {
        orchestrator.check(&next)?;
        if orchestrator.state() == LifecycleState::Reconfiguring {
            return Err(LifecycleError::ReconfigurationInProgress.into());
        }

        next.configured = self.store.save(&next).is_ok() || orchestrator.settings().configured;
        Ok(orchestrator.apply_settings(next)?)
    }
}
