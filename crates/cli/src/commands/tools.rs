//! `benchpilot tools`: print the tool catalog advertised for a client type.

use benchpilot_config::{AppConfig, ClientType};
use benchpilot_tools::ToolCatalog;
use std::path::Path;

pub fn run(config_path: Option<&Path>, client_type: Option<&str>, as_text: bool) -> anyhow::Result<()> {
    let client_type: ClientType = match client_type {
        Some(name) => name.parse()?,
        None => AppConfig::load_at(config_path)?.controller.client_type,
    };

    let catalog = ToolCatalog::for_client(client_type);
    if catalog.is_empty() {
        eprintln!("Client type '{}' runs in free-text mode; no tools are advertised.", client_type.as_str());
        return Ok(());
    }

    if as_text {
        println!("{}", catalog.to_text());
    } else {
        println!("{}", serde_json::to_string_pretty(catalog.definitions())?);
    }
    eprintln!();
    eprintln!("  {} tools for client type '{}'", catalog.len(), client_type.as_str());

    Ok(())
}
