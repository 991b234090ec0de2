use std::fs;
use std::path::Path;
use std::time::Instant;

use sg_compiler::{plan_update, ExtensionContext, MemoryEngine, SyncReport, SyncTrigger, Synchronizer};
use sg_core::settings::Settings;
use sg_core::store::SettingsStore;
use sg_core::types::Rule;

use crate::store::JsonFileStore;

#[derive(Debug, Clone)]
pub struct CompileStats {
    pub sites: usize,
    pub rules: usize,
    pub fallback_redirect: bool,
    pub total_ms: f64,
}

pub fn load_settings(path: &Path) -> Result<Settings, String> {
    JsonFileStore::new(path)
        .load()
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Synthesize the rules for a settings file.
pub fn compile_rules(settings_path: &Path, extension_id: &str) -> Result<(Vec<Rule>, CompileStats), String> {
    let start = Instant::now();
    let settings = load_settings(settings_path)?;

    let ctx = ExtensionContext::new(extension_id);
    let plan = plan_update(&settings, &ctx)
        .map_err(|e| format!("Failed to build rules for '{}': {}", settings_path.display(), e))?;

    let stats = CompileStats {
        sites: settings.blocked_sites.len(),
        rules: plan.rule_count(),
        fallback_redirect: plan.fallback_redirect,
        total_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    let rules = plan.add.and_then(|update| update.add_rules).unwrap_or_default();

    Ok((rules, stats))
}

pub fn write_rules(path: &Path, rules: &[Rule]) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create '{}': {}", parent.display(), e))?;
    }
    let json = serde_json::to_string_pretty(rules)
        .map_err(|e| format!("Failed to serialize rules: {}", e))?;
    fs::write(path, json)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))
}

/// Run one synchronization pass against an in-memory engine.
pub fn simulate_sync(settings_path: &Path, extension_id: &str) -> Result<(SyncReport, MemoryEngine), String> {
    let mut engine = MemoryEngine::new();
    let report = Synchronizer::new(JsonFileStore::new(settings_path), &mut engine, extension_id)
        .sync(SyncTrigger::SettingsChanged)
        .map_err(|e| format!("Sync failed: {}", e))?;
    Ok((report, engine))
}
