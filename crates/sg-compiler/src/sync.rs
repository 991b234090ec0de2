//! Rule synchronization
//!
//! A pass reads the settings, synthesizes the rule batch, then replaces the
//! installed rules in two engine calls: clear the reserved id range, wait for
//! it, install the new batch. Passes are never coalesced or cancelled; the
//! last pass to run decides the installed state.

use std::collections::BTreeMap;

use sg_core::settings::requires_resync;
use sg_core::store::{SettingsStore, StoreError};
use sg_core::types::{Rule, RuleUpdate};

use crate::builder::{plan_update, ExtensionContext, SynthesisError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Rule id {0} is already installed")]
    DuplicateRuleId(u32),
    #[error("Rule update rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to read settings: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The browser's network-filtering engine.
///
/// Each call is applied atomically: removals first, then additions, and a
/// failing call changes nothing.
pub trait RuleEngine {
    fn update_dynamic_rules(&mut self, update: &RuleUpdate) -> Result<(), EngineError>;
}

impl<T: RuleEngine + ?Sized> RuleEngine for &mut T {
    fn update_dynamic_rules(&mut self, update: &RuleUpdate) -> Result<(), EngineError> {
        (**self).update_dynamic_rules(update)
    }
}

/// In-memory rule table with the host's id uniqueness check.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    rules: BTreeMap<u32, Rule>,
    calls: Vec<RuleUpdate>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installed rules ordered by id.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Every update call received, including rejected ones.
    pub fn calls(&self) -> &[RuleUpdate] {
        &self.calls
    }
}

impl RuleEngine for MemoryEngine {
    fn update_dynamic_rules(&mut self, update: &RuleUpdate) -> Result<(), EngineError> {
        self.calls.push(update.clone());

        let mut next = self.rules.clone();
        for id in update.remove_ids() {
            next.remove(id);
        }
        for rule in update.rules() {
            if rule.id == 0 {
                return Err(EngineError::Rejected("rule id must be positive".to_string()));
            }
            if next.insert(rule.id, rule.clone()).is_some() {
                return Err(EngineError::DuplicateRuleId(rule.id));
            }
        }

        self.rules = next;
        Ok(())
    }
}

/// What started a synchronization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Installed,
    Startup,
    SettingsChanged,
}

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    /// Number of ids in the removal call
    pub removed: usize,
    pub installed: usize,
    pub fallback_redirect: bool,
}

/// Sole writer of the engine's dynamic rules.
pub struct Synchronizer<S, E> {
    store: S,
    engine: E,
    extension_id: String,
}

impl<S: SettingsStore, E: RuleEngine> Synchronizer<S, E> {
    pub fn new(store: S, engine: E, extension_id: impl Into<String>) -> Self {
        Self {
            store,
            engine,
            extension_id: extension_id.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn on_installed(&mut self) -> Result<SyncReport, SyncError> {
        self.sync(SyncTrigger::Installed)
    }

    pub fn on_startup(&mut self) -> Result<SyncReport, SyncError> {
        self.sync(SyncTrigger::Startup)
    }

    /// Handle a storage change event. Returns `None` if the change does not
    /// affect the rules.
    pub fn on_storage_changed<K: AsRef<str>>(
        &mut self,
        area: &str,
        changed_keys: &[K],
    ) -> Result<Option<SyncReport>, SyncError> {
        if !requires_resync(area, changed_keys) {
            return Ok(None);
        }
        self.sync(SyncTrigger::SettingsChanged).map(Some)
    }

    /// Run one full pass.
    ///
    /// Rules are synthesized before the engine is touched, so a rejected
    /// configuration leaves the previously installed rules in place.
    pub fn sync(&mut self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let settings = self.store.load()?;
        let ctx = ExtensionContext::new(&self.extension_id);
        let plan = plan_update(&settings, &ctx)?;

        self.engine.update_dynamic_rules(&plan.remove)?;
        if let Some(add) = &plan.add {
            self.engine.update_dynamic_rules(add)?;
        }

        let report = SyncReport {
            trigger,
            removed: plan.remove.remove_ids().len(),
            installed: plan.rule_count(),
            fallback_redirect: plan.fallback_redirect,
        };
        log::info!(
            "rules synchronized ({:?}): {} installed{}",
            trigger,
            report.installed,
            if report.fallback_redirect { ", redirecting to blocked page" } else { "" }
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use sg_core::settings::{Settings, BLOCKED_SITES_KEY, CHALLENGE_TEXT_KEY};
    use sg_core::store::MemoryStore;
    use sg_core::types::MAX_BLOCKED_SITES;

    use super::*;

    const EXT_ID: &str = "abcdefghijklmnop";

    fn settings(sites: &[&str], redirect: &str) -> Settings {
        Settings {
            blocked_sites: sites.iter().map(|s| s.to_string()).collect(),
            redirect_url: redirect.to_string(),
            challenge_text: String::new(),
        }
    }

    struct FailingStore;

    impl SettingsStore for FailingStore {
        fn load(&self) -> Result<Settings, StoreError> {
            Err(StoreError::Unavailable("storage quota".to_string()))
        }

        fn save(&mut self, _settings: &Settings) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("storage quota".to_string()))
        }
    }

    #[test]
    fn installs_rules_after_clearing() {
        let store = MemoryStore::new(settings(&["a.com", "https://b.com/*"], "https://safe.example/"));
        let mut sync = Synchronizer::new(store, MemoryEngine::new(), EXT_ID);

        let report = sync.on_installed().unwrap();
        assert_eq!(
            report,
            SyncReport {
                trigger: SyncTrigger::Installed,
                removed: MAX_BLOCKED_SITES,
                installed: 2,
                fallback_redirect: false,
            }
        );

        let calls = sync.engine().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].remove_ids().len(), MAX_BLOCKED_SITES);
        assert!(calls[0].rules().is_empty());
        assert!(calls[1].remove_ids().is_empty());
        assert_eq!(calls[1].rules().len(), 2);

        let filters: Vec<&str> = sync.engine().rules().map(|r| r.url_filter()).collect();
        assert_eq!(filters, vec!["*://a.com/*", "https://b.com/*"]);
    }

    #[test]
    fn repeated_passes_converge() {
        let store = MemoryStore::new(settings(&["a.com", "b.com"], ""));
        let mut sync = Synchronizer::new(store, MemoryEngine::new(), EXT_ID);

        sync.on_startup().unwrap();
        let first: Vec<Rule> = sync.engine().rules().cloned().collect();
        sync.on_startup().unwrap();
        let second: Vec<Rule> = sync.engine().rules().cloned().collect();

        assert_eq!(first, second);
        assert_eq!(sync.engine().calls().len(), 4);
        assert_eq!(
            sync.engine().get(1).map(|r| r.redirect_url()),
            Some("chrome-extension://abcdefghijklmnop/blocked.html")
        );
    }

    #[test]
    fn empty_site_list_still_clears() {
        let store = MemoryStore::new(settings(&["a.com"], ""));
        let mut sync = Synchronizer::new(store, MemoryEngine::new(), EXT_ID);
        sync.on_installed().unwrap();
        assert_eq!(sync.engine().rule_count(), 1);

        sync.store_mut().save(&Settings::default()).unwrap();
        let report = sync
            .on_storage_changed("local", &[BLOCKED_SITES_KEY])
            .unwrap()
            .expect("site list change should resync");

        assert_eq!(report.installed, 0);
        assert_eq!(sync.engine().rule_count(), 0);
        let last = sync.engine().calls().last().unwrap();
        assert_eq!(last.remove_ids().len(), MAX_BLOCKED_SITES);
    }

    #[test]
    fn unrelated_changes_do_not_resync() {
        let mut sync = Synchronizer::new(MemoryStore::default(), MemoryEngine::new(), EXT_ID);
        assert_eq!(sync.on_storage_changed("local", &[CHALLENGE_TEXT_KEY]).unwrap(), None);
        assert_eq!(sync.on_storage_changed("sync", &[BLOCKED_SITES_KEY]).unwrap(), None);
        assert!(sync.engine().calls().is_empty());
    }

    #[test]
    fn rejected_configuration_keeps_installed_rules() {
        let store = MemoryStore::new(settings(&["a.com"], "https://safe.example/"));
        let mut sync = Synchronizer::new(store, MemoryEngine::new(), EXT_ID);
        sync.on_installed().unwrap();

        let too_many: Vec<String> = (0..=MAX_BLOCKED_SITES).map(|i| format!("s{}.com", i)).collect();
        sync.store_mut()
            .save(&Settings {
                blocked_sites: too_many,
                ..Settings::default()
            })
            .unwrap();

        let err = sync.sync(SyncTrigger::SettingsChanged).unwrap_err();
        assert!(matches!(err, SyncError::Synthesis(SynthesisError::CapacityExceeded { .. })));
        assert_eq!(sync.engine().calls().len(), 2);
        assert_eq!(sync.engine().rule_count(), 1);
    }

    #[test]
    fn store_errors_propagate() {
        let mut engine = MemoryEngine::new();
        let mut sync = Synchronizer::new(FailingStore, &mut engine, EXT_ID);
        assert!(matches!(sync.on_startup(), Err(SyncError::Store(StoreError::Unavailable(_)))));
        drop(sync);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn engine_rejects_duplicate_ids_atomically() {
        let mut engine = MemoryEngine::new();
        engine
            .update_dynamic_rules(&RuleUpdate::add(vec![Rule::redirect(1, "*://a.com/*", "https://x.example/")]))
            .unwrap();

        let result = engine.update_dynamic_rules(&RuleUpdate::add(vec![
            Rule::redirect(2, "*://b.com/*", "https://x.example/"),
            Rule::redirect(1, "*://c.com/*", "https://x.example/"),
        ]));
        assert_eq!(result, Err(EngineError::DuplicateRuleId(1)));
        assert_eq!(engine.rule_count(), 1);
        assert_eq!(engine.get(1).map(|r| r.url_filter()), Some("*://a.com/*"));
    }
}
