//! Options-page editing logic
//!
//! One implementation of everything the options page does besides rendering:
//! editing the site list and redirect target, managing the challenge text,
//! and import/export. Every mutation is written through to the store, which
//! in turn is what triggers a rule resync.

use crate::lock::{LockError, OptionsSession, Privilege, Unlock};
use crate::settings::{Settings, SettingsError};
use crate::store::{SettingsStore, StoreError};
use crate::types::MAX_BLOCKED_SITES;

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("Site must not be empty")]
    EmptySite,
    #[error("No blocked site at index {0}")]
    NoSuchSite(usize),
    #[error("Cannot block more than {capacity} sites")]
    Capacity { capacity: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub struct Options<S: SettingsStore> {
    store: S,
    settings: Settings,
    session: OptionsSession,
}

impl<S: SettingsStore> Options<S> {
    /// Load settings and start a session.
    pub fn open(store: S) -> Result<Self, OptionsError> {
        let settings = store.load()?;
        let session = OptionsSession::new(settings.challenge_text.clone());
        Ok(Self {
            store,
            settings,
            session,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn session(&self) -> &OptionsSession {
        &self.session
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn unlock(&mut self, attempt: &str) -> Result<Unlock, OptionsError> {
        Ok(self.session.unlock(attempt)?)
    }

    /// Append a site. Always permitted.
    ///
    /// Returns `false` if the site is already listed.
    pub fn add_site(&mut self, input: &str) -> Result<bool, OptionsError> {
        let site = input.trim();
        if site.is_empty() {
            return Err(OptionsError::EmptySite);
        }
        if self.settings.contains_site(site) {
            return Ok(false);
        }
        if self.settings.blocked_sites.len() >= MAX_BLOCKED_SITES {
            return Err(OptionsError::Capacity {
                capacity: MAX_BLOCKED_SITES,
            });
        }

        let mut next = self.settings.clone();
        next.blocked_sites.push(site.to_string());
        self.commit(next)?;
        Ok(true)
    }

    /// Remove the site at `index` and return it.
    pub fn remove_site(&mut self, index: usize) -> Result<String, OptionsError> {
        self.session.authorize(Privilege::REMOVE_SITE)?;
        if index >= self.settings.blocked_sites.len() {
            return Err(OptionsError::NoSuchSite(index));
        }

        let mut next = self.settings.clone();
        let removed = next.blocked_sites.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// Store a new redirect target.
    ///
    /// The text is kept as entered (trimmed); an unusable target falls back
    /// to the blocked page when rules are built.
    pub fn save_redirect(&mut self, url: &str) -> Result<(), OptionsError> {
        self.session.authorize(Privilege::SAVE_REDIRECT)?;
        let mut next = self.settings.clone();
        next.redirect_url = url.trim().to_string();
        self.commit(next)
    }

    pub fn set_challenge(&mut self, text: &str) -> Result<(), OptionsError> {
        self.session.authorize(Privilege::SET_CHALLENGE)?;
        let mut next = self.settings.clone();
        next.challenge_text = text.to_string();
        self.commit(next)?;
        self.session.set_challenge(text)?;
        Ok(())
    }

    pub fn export(&self) -> Result<String, OptionsError> {
        Ok(self.settings.to_export_json()?)
    }

    /// Replace all settings from an export file. Always permitted.
    ///
    /// The session is re-decided from the imported challenge text.
    pub fn import(&mut self, text: &str) -> Result<(), OptionsError> {
        let imported = Settings::import(text)?;
        self.commit(imported)?;
        self.session.reset(self.settings.challenge_text.clone());
        Ok(())
    }

    /// Write `next` to the store, then adopt it. A failed write leaves the
    /// editor matching what is stored.
    fn commit(&mut self, next: Settings) -> Result<(), OptionsError> {
        self.store.save(&next)?;
        self.settings = next;
        Ok(())
    }
}
