//! One-shot content generation against the configured backend.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use banterbot::content::ContentGenerator;
use banterbot::providers::OpenAIProvider;

use super::common::load_config_and_logging;
use super::GenerateKind;

pub(crate) async fn cmd_generate(
    path: &Path,
    kind: GenerateKind,
    text: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let config = load_config_and_logging(path)?;
    let provider =
        OpenAIProvider::from_config(&config.provider).context("Failed to create backend")?;
    let generator = ContentGenerator::new(
        Arc::new(provider),
        config.generation.clone(),
        config.persona.clone(),
    );

    let generated = match kind {
        GenerateKind::Joke => generator.generate_joke().await,
        GenerateKind::Quote => generator.generate_quote().await,
        GenerateKind::Ambient => generator.generate_ambient_content().await,
        GenerateKind::Comment => {
            let context = text.unwrap_or_else(|| config.persona.empty_context_placeholder.clone());
            generator.generate_comment(&context).await
        }
        GenerateKind::Mention => {
            let message = text.unwrap_or_default();
            let name = name.unwrap_or_else(|| config.persona.unknown_user_name.clone());
            generator.generate_mention_reply(&message, &name).await
        }
    };

    println!("{}", generated.text);
    if generated.fallback {
        eprintln!("(backend failed; fallback {} shown)", generated.kind);
    }
    Ok(())
}
