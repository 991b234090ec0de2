//! Rule synthesis
//!
//! Turns the site list and redirect target into one redirect rule per site.
//! Synthesis is pure: the same inputs always give the same rules with the
//! same ids, so a repeated or duplicated sync converges to the same state.

use sg_core::settings::Settings;
use sg_core::types::{Rule, RuleUpdate, MAX_BLOCKED_SITES, RESERVED_RULE_ID_MIN};
use sg_core::url::{extension_url, is_redirect_url, FALLBACK_PAGE};

use crate::parser::SitePattern;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Blocked site #{index} is empty")]
    EmptyPattern { index: usize },
    #[error("Too many blocked sites: {requested} (limit {capacity})")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// Identity of the running extension, used to address its bundled pages.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    pub extension_id: &'a str,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(extension_id: &'a str) -> Self {
        Self { extension_id }
    }

    /// The extension's own "you are blocked" page.
    pub fn fallback_url(&self) -> String {
        extension_url(self.extension_id, FALLBACK_PAGE)
    }
}

/// Redirect destination shared by every rule of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRedirect {
    pub url: String,
    /// The configured target was unusable and the blocked page is used instead
    pub fallback: bool,
}

/// Pick the redirect destination for a batch.
pub fn resolve_redirect(target: &str, ctx: &ExtensionContext<'_>) -> ResolvedRedirect {
    let target = target.trim();
    if is_redirect_url(target) {
        ResolvedRedirect {
            url: target.to_string(),
            fallback: false,
        }
    } else {
        if !target.is_empty() {
            log::warn!("redirect target {:?} is not an http(s) URL, using blocked page", target);
        }
        ResolvedRedirect {
            url: ctx.fallback_url(),
            fallback: true,
        }
    }
}

/// Build one redirect rule per site, in input order, with ids from 1.
///
/// Fails if a site is empty or if there are more sites than reserved rule
/// ids; nothing is truncated.
pub fn synthesize_rules<S: AsRef<str>>(
    sites: &[S],
    redirect_target: &str,
    ctx: &ExtensionContext<'_>,
) -> Result<Vec<Rule>, SynthesisError> {
    Ok(synthesize(sites, redirect_target, ctx)?.0)
}

fn synthesize<S: AsRef<str>>(
    sites: &[S],
    redirect_target: &str,
    ctx: &ExtensionContext<'_>,
) -> Result<(Vec<Rule>, ResolvedRedirect), SynthesisError> {
    if sites.len() > MAX_BLOCKED_SITES {
        return Err(SynthesisError::CapacityExceeded {
            requested: sites.len(),
            capacity: MAX_BLOCKED_SITES,
        });
    }

    let redirect = resolve_redirect(redirect_target, ctx);
    let mut rules = Vec::with_capacity(sites.len());

    for (index, (site, id)) in sites.iter().zip(RESERVED_RULE_ID_MIN..).enumerate() {
        let pattern = SitePattern::parse(site.as_ref()).ok_or(SynthesisError::EmptyPattern { index })?;
        rules.push(Rule::redirect(id, pattern.url_filter(), redirect.url.as_str()));
    }

    log::debug!(
        "synthesized {} rules redirecting to {}",
        rules.len(),
        redirect.url
    );

    Ok((rules, redirect))
}

/// The two rule updates of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Clears every reserved id. Always issued, even with no sites.
    pub remove: RuleUpdate,
    /// Installs the new batch. `None` when there are no sites.
    pub add: Option<RuleUpdate>,
    pub fallback_redirect: bool,
}

impl UpdatePlan {
    pub fn rule_count(&self) -> usize {
        self.add.as_ref().map_or(0, |u| u.rules().len())
    }

    /// Updates in the order they must be applied.
    pub fn updates(&self) -> impl Iterator<Item = &RuleUpdate> {
        std::iter::once(&self.remove).chain(self.add.iter())
    }
}

/// Synthesize rules for `settings` and wrap them into the update sequence.
pub fn plan_update(settings: &Settings, ctx: &ExtensionContext<'_>) -> Result<UpdatePlan, SynthesisError> {
    let (rules, redirect) = synthesize(&settings.blocked_sites, settings.redirect_target(), ctx)?;
    let add = if rules.is_empty() {
        None
    } else {
        Some(RuleUpdate::add(rules))
    };

    Ok(UpdatePlan {
        remove: RuleUpdate::clear_reserved(),
        add,
        fallback_redirect: redirect.fallback,
    })
}
