//! SiteGate Rule Compiler
//!
//! This crate compiles the blocked-site list and redirect target into dynamic
//! redirect rules, and drives the remove-then-add installation of those rules
//! into the network filter.

pub mod builder;
pub mod parser;
pub mod sync;

pub use builder::{plan_update, resolve_redirect, synthesize_rules, ExtensionContext, SynthesisError, UpdatePlan};
pub use parser::SitePattern;
pub use sync::{EngineError, MemoryEngine, RuleEngine, SyncError, SyncReport, SyncTrigger, Synchronizer};
