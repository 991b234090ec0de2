//! SiteGate Core Library
//!
//! This crate holds the shared data model for the SiteGate site blocker:
//! the dynamic rule schema consumed by the browser's network filter, the
//! persisted settings document, and the challenge-text lock that guards
//! privileged edits.
//!
//! # Modules
//!
//! - `types`: Rule schema, rule updates and the reserved id range
//! - `url`: Scheme checks for site patterns and redirect targets
//! - `settings`: Settings document, storage keys, import/export
//! - `store`: Settings persistence trait
//! - `lock`: Challenge-text lock state and privileges
//! - `options`: Options-page editing logic over a settings store

pub mod lock;
pub mod options;
pub mod settings;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use lock::{LockError, LockState, OptionsSession, Privilege, Unlock};
pub use options::{Options, OptionsError};
pub use settings::{requires_resync, Settings, SettingsError};
pub use store::{MemoryStore, SettingsStore, StoreError};
pub use types::{Redirect, ResourceType, Rule, RuleAction, RuleCondition, RuleUpdate};
