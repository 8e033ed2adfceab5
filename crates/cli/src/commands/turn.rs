//! `benchpilot turn`: one controller turn against the configured vendor.

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use benchpilot_agent::Controller;
use benchpilot_config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::info;

pub async fn run(config_path: Option<&Path>, prompt: &str, images: &[PathBuf]) -> anyhow::Result<()> {
    let config = AppConfig::load_at(config_path).context("Failed to load config")?;
    let mut controller = Controller::from_config(&config).context("Failed to build controller")?;

    let encoded = images
        .iter()
        .map(|path| {
            std::fs::read(path)
                .map(|bytes| STANDARD.encode(bytes))
                .with_context(|| format!("Failed to read image {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Text-tag providers learn the tools from the prompt.
    let prompt = match controller.tool_instructions() {
        Some(instructions) => format!("{instructions}\n\n{prompt}"),
        None => prompt.to_string(),
    };

    let output = controller.call(&prompt, encoded).await?;
    info!(actions = output.actions().len(), terminal = output.is_terminal(), "Turn complete");

    if let Some(reasoning) = controller.last_reasoning() {
        eprintln!("Reasoning: {reasoning}");
        eprintln!();
    }
    println!("{}", serde_json::to_string_pretty(&output)?);

    let stats = controller.cost_stats();
    eprintln!();
    eprintln!("Cost");
    eprintln!("─────────────────────────────────────");
    eprintln!("  Model:          {}", stats.model);
    eprintln!("  API calls:      {}", stats.api_calls);
    eprintln!("  Input tokens:   {}", stats.total_input_tokens);
    eprintln!("  Cached tokens:  {}", stats.total_cached_tokens);
    eprintln!("  Output tokens:  {}", stats.total_output_tokens);
    eprintln!("  Total cost:     ${:.6}", stats.total_cost_usd);

    Ok(())
}
