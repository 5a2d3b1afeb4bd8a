use crate::config::Config;
use crate::models::topology::ExchangeTopology;
use tracing::info;
use colored::*;
use figlet_rs::FIGfont;

pub fn print_config(config: &Config) {
    let json = serde_json::to_string_pretty(config).unwrap_or_default();

    info!("\n{}: \n{}", String::from("[CONFIG]").blue().underline(), json.magenta());
}

fn print_banner(text: &str) {
    // Banner is cosmetic; fall back to plain text if the font is unavailable
    let figure = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(text).map(|figure| figure.to_string()));

    info!("\n{}", figure.unwrap_or_else(|| text.to_string()));
}

pub fn print_app_starting() {
    print_banner("TRI is starting...");
}

pub fn print_app_started() {
    print_banner("TRI is STARTED!!!");
}

/// Log leg counts and the first few paths of a resolved topology
pub fn print_topology(topology: &ExchangeTopology, anchor: &str, sample: usize) {
    info!(
        "{} first={} second={} third={}",
        String::from("[TOPOLOGY]").blue().underline(),
        topology.first_leg.len(),
        topology.second_leg.len(),
        topology.third_leg.len()
    );

    let examples = topology
        .second_leg
        .iter()
        .take(sample)
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{:3}. {}{} → {} → {}{}",
                i + 1,
                s.quote_asset,
                anchor,
                s.symbol_id.to_string().yellow(),
                s.base_asset,
                anchor
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    if !examples.is_empty() {
        info!("Sample paths: \n{}", examples);
    }
}
