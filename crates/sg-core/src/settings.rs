//! Persisted settings document
//!
//! Mirrors the extension's `storage.local` layout. The same document is used
//! for export/import files.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::types::MAX_BLOCKED_SITES;

/// Storage key of the blocked site list.
pub const BLOCKED_SITES_KEY: &str = "blockedSites";
/// Storage key of the redirect target.
pub const REDIRECT_URL_KEY: &str = "redirectURL";
/// Storage key of the challenge text.
pub const CHALLENGE_TEXT_KEY: &str = "challengeText";
/// Storage area the settings live in.
pub const STORAGE_AREA: &str = "local";

/// Error type for settings documents.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Settings file has no `blockedSites` array")]
    MissingSites,
    #[error("Too many blocked sites: {count} (limit {capacity})")]
    Capacity { count: usize, capacity: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "blockedSites", default, deserialize_with = "null_as_default")]
    pub blocked_sites: Vec<String>,
    #[serde(rename = "redirectURL", default, deserialize_with = "null_as_default")]
    pub redirect_url: String,
    #[serde(rename = "challengeText", default, deserialize_with = "null_as_default")]
    pub challenge_text: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Settings {
    /// Read a stored settings document. Missing keys default to empty.
    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse an export file.
    ///
    /// Unlike `from_json`, the file must carry a `blockedSites` array. The
    /// site list is normalized and checked against the rule capacity.
    pub fn import(text: &str) -> Result<Self, SettingsError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.get(BLOCKED_SITES_KEY).is_some_and(Value::is_array) {
            return Err(SettingsError::MissingSites);
        }

        let mut settings: Settings = serde_json::from_value(value)?;
        settings.blocked_sites = normalize_sites(&settings.blocked_sites);
        settings.redirect_url = settings.redirect_url.trim().to_string();

        if settings.blocked_sites.len() > MAX_BLOCKED_SITES {
            return Err(SettingsError::Capacity {
                count: settings.blocked_sites.len(),
                capacity: MAX_BLOCKED_SITES,
            });
        }

        Ok(settings)
    }

    /// Pretty-printed export document.
    pub fn to_export_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Redirect target as the rule synthesizer should see it.
    pub fn redirect_target(&self) -> &str {
        self.redirect_url.trim()
    }

    pub fn contains_site(&self, site: &str) -> bool {
        self.blocked_sites.iter().any(|s| s == site)
    }
}

/// Trim entries, drop empty ones and remove duplicates keeping the first.
pub fn normalize_sites<S: AsRef<str>>(sites: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(sites.len());

    for site in sites {
        let site = site.as_ref().trim();
        if site.is_empty() {
            continue;
        }
        if seen.insert(site) {
            out.push(site.to_string());
        }
    }

    out
}

/// Whether a storage change should trigger a rule resync.
///
/// Only the site list and redirect target feed the rules; challenge text
/// changes are ignored.
pub fn requires_resync<K: AsRef<str>>(area: &str, changed_keys: &[K]) -> bool {
    area == STORAGE_AREA
        && changed_keys
            .iter()
            .any(|k| matches!(k.as_ref(), BLOCKED_SITES_KEY | REDIRECT_URL_KEY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults_missing_keys() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());

        let settings = Settings::from_json(r#"{"blockedSites":["a.com"],"redirectURL":null}"#).unwrap();
        assert_eq!(settings.blocked_sites, vec!["a.com"]);
        assert_eq!(settings.redirect_url, "");
    }

    #[test]
    fn test_import_requires_site_array() {
        assert!(matches!(
            Settings::import(r#"{"redirectURL":"https://x.example/"}"#),
            Err(SettingsError::MissingSites)
        ));
        assert!(matches!(
            Settings::import(r#"{"blockedSites":"a.com"}"#),
            Err(SettingsError::MissingSites)
        ));
        assert!(matches!(Settings::import("[]"), Err(SettingsError::MissingSites)));
        assert!(matches!(Settings::import("not json"), Err(SettingsError::Json(_))));
        assert!(matches!(
            Settings::import(r#"{"blockedSites":[1,2]}"#),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_import_normalizes() {
        let settings = Settings::import(
            r#"{"blockedSites":[" a.com ","b.com","","a.com"],"redirectURL":null,"challengeText":"type me"}"#,
        )
        .unwrap();
        assert_eq!(settings.blocked_sites, vec!["a.com", "b.com"]);
        assert_eq!(settings.redirect_url, "");
        assert_eq!(settings.challenge_text, "type me");
    }

    #[test]
    fn test_import_capacity() {
        let sites: Vec<String> = (0..=MAX_BLOCKED_SITES).map(|i| format!("site{}.com", i)).collect();
        let text = serde_json::json!({ "blockedSites": sites }).to_string();
        match Settings::import(&text) {
            Err(SettingsError::Capacity { count, capacity }) => {
                assert_eq!(count, MAX_BLOCKED_SITES + 1);
                assert_eq!(capacity, MAX_BLOCKED_SITES);
            }
            other => panic!("expected capacity error, got {:?}", other),
        }

        let at_cap = serde_json::json!({ "blockedSites": &sites[..MAX_BLOCKED_SITES] }).to_string();
        assert_eq!(Settings::import(&at_cap).unwrap().blocked_sites.len(), MAX_BLOCKED_SITES);
    }

    #[test]
    fn test_export_keys() {
        let settings = Settings {
            blocked_sites: vec!["a.com".to_string()],
            redirect_url: "https://safe.example/".to_string(),
            challenge_text: String::new(),
        };
        let text = settings.to_export_json().unwrap();
        assert!(text.contains("\"blockedSites\""));
        assert!(text.contains("\"redirectURL\": \"https://safe.example/\""));
        assert!(text.contains("\"challengeText\": \"\""));
        assert_eq!(Settings::import(&text).unwrap(), settings);
    }

    #[test]
    fn test_requires_resync() {
        assert!(requires_resync("local", &[BLOCKED_SITES_KEY]));
        assert!(requires_resync("local", &["challengeText", "redirectURL"]));
        assert!(!requires_resync("local", &[CHALLENGE_TEXT_KEY]));
        assert!(!requires_resync("sync", &[BLOCKED_SITES_KEY]));
        assert!(!requires_resync::<&str>("local", &[]));
    }
}
