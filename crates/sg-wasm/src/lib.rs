//! WebAssembly bindings for SiteGate
//!
//! The service worker owns storage and the `declarativeNetRequest` calls; it
//! asks this module for an update plan on install, startup and every relevant
//! storage change, then awaits the removal call before issuing the addition.

use wasm_bindgen::prelude::*;

use sg_compiler::{ExtensionContext, UpdatePlan};
use sg_core::lock::{LockError, OptionsSession, Privilege, Unlock};
use sg_core::settings::Settings;

// =============================================================================
// Logging
// =============================================================================

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let message = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&message),
            log::Level::Warn => web_sys::console::warn_1(&message),
            log::Level::Info => web_sys::console::info_1(&message),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&message),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` output to the browser console. Defaults to `info`.
#[wasm_bindgen]
pub fn init_logging(level: Option<String>) -> Result<(), JsValue> {
    let filter = match level.as_deref() {
        None => log::LevelFilter::Info,
        Some(name) => name
            .parse::<log::LevelFilter>()
            .map_err(|_| JsValue::from_str(&format!("Unknown log level '{}'", name)))?,
    };

    // A second call only adjusts the level.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(filter);
    Ok(())
}

// =============================================================================
// Rule Synthesis
// =============================================================================

#[wasm_bindgen]
pub fn synthesize_rules(sites: JsValue, redirect_url: &str, extension_id: &str) -> Result<JsValue, JsValue> {
    // Unset storage reads as an empty list.
    let site_array = if sites.is_undefined() || sites.is_null() {
        js_sys::Array::new()
    } else {
        js_sys::Array::from(&sites)
    };
    let mut site_list: Vec<String> = Vec::with_capacity(site_array.length() as usize);
    for value in site_array.iter() {
        let site = value
            .as_string()
            .ok_or_else(|| JsValue::from_str("Blocked sites must be strings"))?;
        site_list.push(site);
    }

    let ctx = ExtensionContext::new(extension_id);
    let rules = sg_compiler::synthesize_rules(site_list.as_slice(), redirect_url, &ctx)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    to_js(&rules)
}

/// Build the two `updateDynamicRules` arguments for the stored settings.
///
/// Returns `{ remove, add, ruleCount, fallbackRedirect }`; `add` is `null`
/// when no sites are blocked.
#[wasm_bindgen]
pub fn plan_update(settings: JsValue, extension_id: &str) -> Result<JsValue, JsValue> {
    let settings = settings_from_js(&settings)?;
    let ctx = ExtensionContext::new(extension_id);
    let plan = sg_compiler::plan_update(&settings, &ctx).map_err(|e| JsValue::from_str(&e.to_string()))?;

    plan_to_js(&plan)
}

#[wasm_bindgen]
pub fn requires_resync(area: &str, changed_keys: JsValue) -> bool {
    let keys: Vec<String> = js_sys::Array::from(&changed_keys)
        .iter()
        .filter_map(|k| k.as_string())
        .collect();
    sg_core::settings::requires_resync(area, keys.as_slice())
}

// =============================================================================
// Import / Export
// =============================================================================

/// Parse and normalize an export file into a settings object.
#[wasm_bindgen]
pub fn import_settings(text: &str) -> Result<JsValue, JsValue> {
    let settings = Settings::import(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&settings)
}

#[wasm_bindgen]
pub fn export_settings(settings: JsValue) -> Result<String, JsValue> {
    settings_from_js(&settings)?
        .to_export_json()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

// =============================================================================
// Challenge Lock
// =============================================================================

/// Lock state of an options page.
#[wasm_bindgen]
pub struct OptionsLock {
    session: OptionsSession,
}

#[wasm_bindgen]
impl OptionsLock {
    #[wasm_bindgen(constructor)]
    pub fn new(challenge: &str) -> OptionsLock {
        OptionsLock {
            session: OptionsSession::new(challenge),
        }
    }

    /// Returns `true` if this attempt unlocked the page, `false` if it was
    /// already unlocked.
    pub fn unlock(&mut self, attempt: &str) -> Result<bool, JsValue> {
        match self.session.unlock(attempt) {
            Ok(Unlock::Unlocked) => Ok(true),
            Ok(Unlock::AlreadyUnlocked) => Ok(false),
            Err(e) => Err(lock_error(e)),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    #[wasm_bindgen(getter, js_name = hasChallenge)]
    pub fn has_challenge(&self) -> bool {
        self.session.has_challenge()
    }

    #[wasm_bindgen(js_name = canRemoveSite)]
    pub fn can_remove_site(&self) -> bool {
        self.session.permitted().contains(Privilege::REMOVE_SITE)
    }

    #[wasm_bindgen(js_name = canSaveRedirect)]
    pub fn can_save_redirect(&self) -> bool {
        self.session.permitted().contains(Privilege::SAVE_REDIRECT)
    }

    #[wasm_bindgen(js_name = canSetChallenge)]
    pub fn can_set_challenge(&self) -> bool {
        self.session.permitted().contains(Privilege::SET_CHALLENGE)
    }

    #[wasm_bindgen(js_name = setChallenge)]
    pub fn set_challenge(&mut self, text: &str) -> Result<(), JsValue> {
        self.session.set_challenge(text).map_err(lock_error)
    }

    /// Re-decide the lock after an import.
    pub fn reset(&mut self, challenge: &str) {
        self.session.reset(challenge);
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn lock_error(e: LockError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn settings_from_js(value: &JsValue) -> Result<Settings, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Settings::default());
    }

    let text: String = js_sys::JSON::stringify(value)?.into();
    Settings::from_json(&text).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn to_js<T: serde::Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&text)
}

fn plan_to_js(plan: &UpdatePlan) -> Result<JsValue, JsValue> {
    let result = js_sys::Object::new();
    let add = match &plan.add {
        Some(update) => to_js(update)?,
        None => JsValue::NULL,
    };

    let _ = js_sys::Reflect::set(&result, &"remove".into(), &to_js(&plan.remove)?);
    let _ = js_sys::Reflect::set(&result, &"add".into(), &add);
    let _ = js_sys::Reflect::set(&result, &"ruleCount".into(), &JsValue::from(plan.rule_count() as u32));
    let _ = js_sys::Reflect::set(&result, &"fallbackRedirect".into(), &JsValue::from(plan.fallback_redirect));

    Ok(result.into())
}
