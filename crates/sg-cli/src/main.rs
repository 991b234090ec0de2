//! SiteGate CLI
//!
//! CLI tool for building blocked-site rules and editing settings files.

mod ruleset;
mod store;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ts_rs::TS;

use sg_compiler::{resolve_redirect, ExtensionContext, SitePattern};
use sg_core::lock::LockError;
use sg_core::options::{Options, OptionsError};
use sg_core::settings::Settings;
use sg_core::types::{Rule, RuleUpdate, MAX_BLOCKED_SITES};

use crate::store::JsonFileStore;

#[derive(Parser)]
#[command(name = "sg-cli")]
#[command(about = "SiteGate rule compiler and settings tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a settings file into dynamic redirect rules
    Compile {
        /// Settings file
        #[arg(short, long)]
        settings: PathBuf,

        /// Extension id used to address the blocked page
        #[arg(short, long)]
        extension_id: String,

        /// Output rules file
        #[arg(short, long, default_value = "rules.json")]
        output: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the rule updates a sync pass would issue
    Plan {
        /// Settings file
        #[arg(short, long)]
        settings: PathBuf,

        /// Extension id used to address the blocked page
        #[arg(short, long)]
        extension_id: String,
    },

    /// Validate a settings or export file
    Validate {
        /// File to validate
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Dump settings info
    Info {
        /// Settings file to inspect
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Block another site
    AddSite {
        #[arg(short, long)]
        settings: PathBuf,

        /// Host or match pattern
        site: String,
    },

    /// Unblock the site at a position (0-based, as listed by `info`)
    RemoveSite {
        #[arg(short, long)]
        settings: PathBuf,

        index: usize,

        /// Challenge text, if one is set
        #[arg(short, long)]
        challenge: Option<String>,
    },

    /// Change the redirect target
    SetRedirect {
        #[arg(short, long)]
        settings: PathBuf,

        url: String,

        /// Challenge text, if one is set
        #[arg(short, long)]
        challenge: Option<String>,
    },

    /// Change or clear the challenge text
    SetChallenge {
        #[arg(short, long)]
        settings: PathBuf,

        /// New challenge text (empty clears it)
        text: String,

        /// Current challenge text, if one is set
        #[arg(short, long)]
        challenge: Option<String>,
    },

    /// Replace settings from an export file
    Import {
        #[arg(short, long)]
        settings: PathBuf,

        /// Export file to read
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Write settings to an export file
    Export {
        #[arg(short, long)]
        settings: PathBuf,

        /// Export file to write
        #[arg(short, long, default_value = "blocked-sites.json")]
        output: PathBuf,
    },

    /// Export TypeScript definitions of the rule schema
    Types {
        /// Output directory
        #[arg(short, long, default_value = "bindings")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            settings,
            extension_id,
            output,
            verbose,
        } => cmd_compile(&settings, &extension_id, &output, verbose),
        Commands::Plan { settings, extension_id } => cmd_plan(&settings, &extension_id),
        Commands::Validate { input } => cmd_validate(&input),
        Commands::Info { settings } => cmd_info(&settings),
        Commands::AddSite { settings, site } => cmd_add_site(&settings, &site),
        Commands::RemoveSite {
            settings,
            index,
            challenge,
        } => cmd_remove_site(&settings, index, challenge.as_deref()),
        Commands::SetRedirect {
            settings,
            url,
            challenge,
        } => cmd_set_redirect(&settings, &url, challenge.as_deref()),
        Commands::SetChallenge {
            settings,
            text,
            challenge,
        } => cmd_set_challenge(&settings, &text, challenge.as_deref()),
        Commands::Import { settings, input } => cmd_import(&settings, &input),
        Commands::Export { settings, output } => cmd_export(&settings, &output),
        Commands::Types { output } => cmd_types(&output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_compile(settings: &Path, extension_id: &str, output: &Path, verbose: bool) -> Result<(), String> {
    let (rules, stats) = ruleset::compile_rules(settings, extension_id)?;

    if verbose {
        for rule in &rules {
            println!("  [{}] {} -> {}", rule.id, rule.url_filter(), rule.redirect_url());
        }
    }

    ruleset::write_rules(output, &rules)?;

    println!("Compiled '{}' to '{}'", settings.display(), output.display());
    println!("  Sites:    {}", stats.sites);
    println!("  Rules:    {} (capacity {})", stats.rules, MAX_BLOCKED_SITES);
    if stats.fallback_redirect {
        println!("  Redirect: blocked page (no usable redirect URL)");
    }
    println!("  Time:     {:.1}ms", stats.total_ms);

    Ok(())
}

fn cmd_plan(settings: &Path, extension_id: &str) -> Result<(), String> {
    let (report, engine) = ruleset::simulate_sync(settings, extension_id)?;

    for (step, update) in engine.calls().iter().enumerate() {
        let json = serde_json::to_string_pretty(update)
            .map_err(|e| format!("Failed to serialize update: {}", e))?;
        println!("// updateDynamicRules call {}", step + 1);
        println!("{}", json);
    }

    println!("// removed {} ids, installed {} rules", report.removed, report.installed);
    Ok(())
}

fn cmd_validate(input: &Path) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let settings = Settings::import(&text)
        .map_err(|e| format!("Invalid settings: {}", e))?;

    let ctx = ExtensionContext::new("validate");
    let plan = sg_compiler::plan_update(&settings, &ctx)
        .map_err(|e| format!("Invalid settings: {}", e))?;

    println!("Settings '{}' are valid", input.display());
    println!("  Sites:       {} (capacity {})", settings.blocked_sites.len(), MAX_BLOCKED_SITES);
    println!("  Rules:       {}", plan.rule_count());
    println!(
        "  Redirect:    {}",
        if plan.fallback_redirect { "blocked page" } else { settings.redirect_target() }
    );

    Ok(())
}

fn cmd_info(settings_path: &Path) -> Result<(), String> {
    let settings = ruleset::load_settings(settings_path)?;
    let redirect = resolve_redirect(settings.redirect_target(), &ExtensionContext::new("<extension-id>"));

    println!("Settings: {}", settings_path.display());
    println!("  Redirect:    {}", redirect.url);
    println!(
        "  Challenge:   {}",
        if settings.challenge_text.is_empty() { "not set" } else { "set (options locked)" }
    );
    println!();

    println!("Blocked sites ({}/{}):", settings.blocked_sites.len(), MAX_BLOCKED_SITES);
    for (index, site) in settings.blocked_sites.iter().enumerate() {
        match SitePattern::parse(site) {
            Some(pattern) => println!("  {:>4}  {:<30} {}", index, pattern.host(), pattern.url_filter()),
            None => println!("  {:>4}  <empty>", index),
        }
    }

    Ok(())
}

fn open_options(settings: &Path, challenge: Option<&str>) -> Result<Options<JsonFileStore>, String> {
    let mut options = Options::open(JsonFileStore::new(settings))
        .map_err(|e| format!("Failed to read '{}': {}", settings.display(), e))?;

    if let Some(attempt) = challenge {
        match options.unlock(attempt) {
            Ok(_) | Err(OptionsError::Lock(LockError::NoChallenge)) => {}
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(options)
}

fn cmd_add_site(settings: &Path, site: &str) -> Result<(), String> {
    let mut options = open_options(settings, None)?;
    if options.add_site(site).map_err(|e| e.to_string())? {
        println!("Blocked '{}'", site.trim());
    } else {
        println!("'{}' is already blocked", site.trim());
    }
    Ok(())
}

fn cmd_remove_site(settings: &Path, index: usize, challenge: Option<&str>) -> Result<(), String> {
    let mut options = open_options(settings, challenge)?;
    let removed = options.remove_site(index).map_err(|e| e.to_string())?;
    println!("Unblocked '{}'", removed);
    Ok(())
}

fn cmd_set_redirect(settings: &Path, url: &str, challenge: Option<&str>) -> Result<(), String> {
    let mut options = open_options(settings, challenge)?;
    options.save_redirect(url).map_err(|e| e.to_string())?;
    println!("Redirect URL saved");
    Ok(())
}

fn cmd_set_challenge(settings: &Path, text: &str, challenge: Option<&str>) -> Result<(), String> {
    let mut options = open_options(settings, challenge)?;
    options.set_challenge(text).map_err(|e| e.to_string())?;
    println!("Challenge text updated");
    Ok(())
}

fn cmd_import(settings: &Path, input: &Path) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let mut options = open_options(settings, None)?;
    options.import(&text).map_err(|e| e.to_string())?;

    println!("Imported {} sites from '{}'", options.settings().blocked_sites.len(), input.display());
    Ok(())
}

fn cmd_export(settings: &Path, output: &Path) -> Result<(), String> {
    let options = open_options(settings, None)?;
    let json = options.export().map_err(|e| e.to_string())?;
    fs::write(output, json)
        .map_err(|e| format!("Failed to write '{}': {}", output.display(), e))?;

    println!("Exported settings to '{}'", output.display());
    Ok(())
}

fn cmd_types(output: &Path) -> Result<(), String> {
    Rule::export_all_to(output)
        .map_err(|e| format!("Failed to export Rule types: {}", e))?;
    RuleUpdate::export_all_to(output)
        .map_err(|e| format!("Failed to export RuleUpdate types: {}", e))?;

    println!("Wrote TypeScript definitions to '{}'", output.display());
    Ok(())
}
