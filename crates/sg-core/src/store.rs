//! Settings persistence

use crate::settings::{Settings, SettingsError};

/// Error type for settings stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Where settings are read from and written to.
///
/// Every synchronization pass reads through `load`; nothing is cached between
/// passes.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings, StoreError>;
    fn save(&mut self, settings: &Settings) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    settings: Settings,
    writes: usize,
}

impl MemoryStore {
    pub fn new(settings: Settings) -> Self {
        Self { settings, writes: 0 }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Number of successful `save` calls.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.settings.clone())
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        self.settings = settings.clone();
        self.writes += 1;
        Ok(())
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for &mut T {
    fn load(&self) -> Result<Settings, StoreError> {
        (**self).load()
    }

    fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        (**self).save(settings)
    }
}
