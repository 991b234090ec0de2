//! Core type definitions for SiteGate
//!
//! These types serialize to the browser's `declarativeNetRequest` dynamic
//! rule schema and are what the network filter ultimately installs.

use serde::{Deserialize, Serialize};

// =============================================================================
// Reserved Rule Ids
// =============================================================================

/// First id of the reserved dynamic-rule range.
pub const RESERVED_RULE_ID_MIN: u32 = 1;
/// Last id of the reserved dynamic-rule range.
pub const RESERVED_RULE_ID_MAX: u32 = 1000;
/// Number of sites that can be blocked at once (one rule per site).
pub const MAX_BLOCKED_SITES: usize = (RESERVED_RULE_ID_MAX - RESERVED_RULE_ID_MIN + 1) as usize;

/// Priority assigned to every synthesized rule.
pub const RULE_PRIORITY: u32 = 1;

/// Every id in the reserved range, in ascending order.
pub fn reserved_rule_ids() -> Vec<u32> {
    (RESERVED_RULE_ID_MIN..=RESERVED_RULE_ID_MAX).collect()
}

// =============================================================================
// Resource Types
// =============================================================================

/// Request resource type as named by the network filter.
///
/// Rules only ever apply to top-level navigations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

// =============================================================================
// Rules
// =============================================================================

/// Redirect destination of a rule action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Redirect {
    pub url: String,
}

/// Action taken when a rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Send the navigation to another URL
    Redirect { redirect: Redirect },
}

/// Which requests a rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    /// Match expression derived from a site pattern
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// A dynamic rule as installed into the network filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Rule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl Rule {
    /// Build a redirect rule for top-level navigations matching `url_filter`.
    pub fn redirect(id: u32, url_filter: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            priority: RULE_PRIORITY,
            action: RuleAction::Redirect {
                redirect: Redirect { url: url.into() },
            },
            condition: RuleCondition {
                url_filter: url_filter.into(),
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    pub fn url_filter(&self) -> &str {
        &self.condition.url_filter
    }

    pub fn redirect_url(&self) -> &str {
        match &self.action {
            RuleAction::Redirect { redirect } => &redirect.url,
        }
    }
}

// =============================================================================
// Rule Updates
// =============================================================================

/// Argument of one call to the network filter's dynamic-rule update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub remove_rule_ids: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(optional))]
    pub add_rules: Option<Vec<Rule>>,
}

impl RuleUpdate {
    pub fn remove(ids: Vec<u32>) -> Self {
        Self {
            remove_rule_ids: Some(ids),
            add_rules: None,
        }
    }

    pub fn add(rules: Vec<Rule>) -> Self {
        Self {
            remove_rule_ids: None,
            add_rules: Some(rules),
        }
    }

    /// Removal of the whole reserved range.
    pub fn clear_reserved() -> Self {
        Self::remove(reserved_rule_ids())
    }

    pub fn remove_ids(&self) -> &[u32] {
        self.remove_rule_ids.as_deref().unwrap_or_default()
    }

    pub fn rules(&self) -> &[Rule] {
        self.add_rules.as_deref().unwrap_or_default()
    }
}
