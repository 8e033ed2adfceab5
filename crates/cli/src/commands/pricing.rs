//! `benchpilot pricing`: which pricing tier a model resolves to, and what a call costs.

use benchpilot_agent::controller::pricing_table;
use benchpilot_config::AppConfig;
use benchpilot_telemetry::PriceMatch;
use std::path::Path;

pub fn run(
    config_path: Option<&Path>,
    model: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
    cached_tokens: u64,
) -> anyhow::Result<()> {
    let config = AppConfig::load_at(config_path)?;
    let table = pricing_table(&config);
    let (matched, pricing) = table.lookup(model);

    let tier = match &matched {
        PriceMatch::Exact(key) => format!("exact ({key})"),
        PriceMatch::Prefix(key) => format!("prefix ({key})"),
        PriceMatch::Fallback(key) => format!("fallback ({key})"),
    };

    println!("Pricing for {model} (table {})", table.version());
    println!("─────────────────────────────────────");
    println!("  Match:          {tier}");
    println!("  Input:          ${:.3} / 1M", pricing.input);
    match pricing.cached_input {
        Some(rate) => println!("  Cached input:   ${rate:.3} / 1M"),
        None => println!("  Cached input:   (input rate)"),
    }
    match pricing.output {
        Some(rate) => println!("  Output:         ${rate:.3} / 1M"),
        None => println!("  Output:         unbilled"),
    }

    if prompt_tokens + completion_tokens > 0 {
        let cost = pricing.cost(prompt_tokens, completion_tokens, cached_tokens);
        println!();
        println!("  Prompt tokens:      {prompt_tokens} ({cached_tokens} cached)");
        println!("  Completion tokens:  {completion_tokens}");
        println!("  Estimated cost:     ${cost:.6}");
    }

    Ok(())
}
