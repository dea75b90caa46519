//! Config check and init command handlers.

use std::path::Path;

use anyhow::{bail, Context, Result};

use banterbot::config::validate::{unknown_field_diagnostics, validate_config, DiagnosticLevel};
use banterbot::config::Config;
use banterbot::schedule::plan_entries;

/// Validate the configuration and print the randomized schedule.
pub(crate) fn cmd_check(path: &Path) -> Result<()> {
    println!("Config file: {}", path.display());

    if path.exists() {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        let raw: serde_json::Value = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => bail!("Invalid JSON: {}", e),
        };
        for diag in unknown_field_diagnostics(&raw) {
            println!("{}", diag);
        }
    } else {
        println!("[OK] No config file found (using defaults and environment)");
    }

    let config = Config::load_from_path(path).context("Failed to load config")?;
    let diagnostics = validate_config(&config);
    for diag in &diagnostics {
        println!("{}", diag);
    }

    println!();
    print_schedule(&config);

    let errors = diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Error)
        .count();
    if errors > 0 {
        bail!("Found {} configuration error(s)", errors);
    }

    println!("\nConfiguration looks good!");
    Ok(())
}

fn print_schedule(config: &Config) {
    if !config.schedule.enabled {
        println!("Scheduled posts: disabled");
        return;
    }

    let entries = plan_entries(&config.schedule.posts, config.schedule.max_offset_minutes);
    println!(
        "Scheduled posts (±{} min, rerolled at every start):",
        config.schedule.max_offset_minutes
    );
    for post in &config.schedule.posts {
        println!("  base {:02}:{:02}", post.hour, post.minute);
    }
    let times: Vec<String> = entries.iter().map(ToString::to_string).collect();
    println!("  this run would fire at: {}", times.join(", "));
}

/// Write the default configuration to `path`.
pub(crate) fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default()
        .save_to_path(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    println!("Set telegram.token, monitor.chat_id and provider.api_key (or the");
    println!("BANTERBOT_TELEGRAM_TOKEN, BANTERBOT_CHAT_ID and BANTERBOT_OPENAI_API_KEY");
    println!("environment variables), then run `banterbot check`.");
    Ok(())
}
