use crate::{
    arbitrage::topology::resolve_topology,
    config::Config,
    exchange::{ binance::BinanceClient, client::ExchangeClient },
    utils::console::{ print_app_starting, print_config, print_topology },
    API_TIMEOUT,
};
use anyhow::{ anyhow, Context, Result };
use tracing::info;

const SAMPLE_PATHS: usize = 20;

/// Resolve the topology once, print it and exit
pub fn run_topology_mode(config: Config) -> Result<()> {
    print_app_starting();
    print_config(&config);

    let rt = tokio::runtime::Builder
        ::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let client = BinanceClient::new(&config.rest_url, config.api_key.clone()).context(
        "Failed to create Binance client"
    )?;

    let symbols = rt.block_on(async {
        let fetch = async {
            if config.active_only {
                client.get_active_spot_symbols().await
            } else {
                client.get_all_symbols().await
            }
        };
        tokio::time::timeout(API_TIMEOUT, fetch).await
    });

    let symbols = match symbols {
        Ok(result) => result.context("Failed to fetch symbols")?,
        Err(_) => {
            return Err(anyhow!("Timed out while fetching symbols"));
        }
    };

    info!("✓ Fetched {} symbols from {}", symbols.len(), client.name());

    let topology = resolve_topology(&symbols, &config.anchor_asset);
    print_topology(&topology, &config.anchor_asset, SAMPLE_PATHS);

    info!(
        "A push subscription for this topology covers {} symbols",
        topology.symbol_ids().len()
    );

    Ok(())
}
