use std::sync::Arc;

use crate::{
    app::pipeline::Pipeline,
    arbitrage::{ selector::ArbitrageCandidate, sink::{ CandidateSink, ChannelSink, ConsoleSink } },
    config::{ Config, SinkKind, SourceMode },
    error::ArbitrageError,
    exchange::{ binance::BinanceClient, client::ExchangeClient },
    models::quote::Snapshot,
    source::build_source,
    utils::console::{ print_app_started, print_app_starting, print_config, print_topology },
    API_TIMEOUT,
};
use anyhow::{ anyhow, bail, Context, Result };
use futures::{ stream::BoxStream, StreamExt };
use tokio::sync::{ mpsc, watch };
use tokio::time::{ Instant, Interval, MissedTickBehavior };
use tracing::{ error, info, warn };

/// Candidates queued for the execution task before `emit` waits
const CANDIDATE_QUEUE: usize = 64;

type SnapshotStream = BoxStream<'static, Result<Snapshot, ArbitrageError>>;

/// Counters of one finished run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub candidates: u64,
    pub failures: u64,
    pub topology_refreshes: u64,
}

pub fn run_normal_mode(config: Config) -> Result<()> {
    // Display startup information
    print_app_starting();
    print_config(&config);

    // Single-threaded cooperative scheduling: one tick at a time
    let rt = tokio::runtime::Builder
        ::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Set up Ctrl+C handler
    ctrlc
        ::set_handler(move || {
            info!("Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        })
        .context("Error setting Ctrl-C handler")?;

    let client: Arc<dyn ExchangeClient> = Arc::new(
        BinanceClient::new(&config.rest_url, config.api_key.clone()).context(
            "Failed to create Binance client"
        )?
    );

    let summary = rt.block_on(run_with_sink(&config, client, shutdown_rx))?;

    info!(
        ticks = summary.ticks,
        candidates = summary.candidates,
        failures = summary.failures,
        topology_refreshes = summary.topology_refreshes,
        "Triangular arbitrage system stopped"
    );

    Ok(())
}

async fn run_with_sink(
    config: &Config,
    client: Arc<dyn ExchangeClient>,
    shutdown: watch::Receiver<bool>
) -> Result<RunSummary> {
    match config.sink {
        SinkKind::Console => {
            let mut sink = ConsoleSink::new();
            let summary = run_pipeline(config, client, &mut sink, shutdown).await?;
            info!("Printed {} candidates", sink.emitted());
            Ok(summary)
        }
        SinkKind::Channel => {
            let (mut sink, receiver) = ChannelSink::channel(CANDIDATE_QUEUE);
            let executor = tokio::spawn(consume_candidates(receiver));

            let result = run_pipeline(config, client, &mut sink, shutdown).await;

            // closing the channel lets the executor drain and finish
            drop(sink);
            let handed_off = executor.await.context("Candidate executor task failed")?;
            info!("Handed off {} candidates", handed_off);

            result
        }
    }
}

/// Receiving end of the channel sink; order placement plugs in here
async fn consume_candidates(mut receiver: mpsc::Receiver<ArbitrageCandidate>) -> u64 {
    let mut handed_off = 0u64;

    while let Some(candidate) = receiver.recv().await {
        handed_off += 1;
        info!(
            path = %candidate.path,
            start_amount = candidate.start_amount,
            end_amount = candidate.end_amount,
            expected_profit = candidate.expected_profit,
            "Candidate handed off for execution"
        );
    }

    handed_off
}

async fn next_refresh(refresh: &mut Option<Interval>) {
    match refresh {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Count one transient failure; gives up once `max_consecutive_failures` are reached
fn record_failure(
    config: &Config,
    consecutive_failures: &mut u32,
    summary: &mut RunSummary,
    what: &str,
    e: &ArbitrageError
) -> Result<()> {
    *consecutive_failures += 1;
    summary.failures += 1;
    warn!(
        "{} failed ({}/{}): {}",
        what,
        consecutive_failures,
        config.max_consecutive_failures,
        e
    );

    if *consecutive_failures >= config.max_consecutive_failures {
        error!("Giving up after {} consecutive failures", consecutive_failures);
        bail!("Giving up after {} consecutive failures: {}", consecutive_failures, e);
    }

    Ok(())
}

/// Resolve the topology, start the snapshot source and drive it until
/// shutdown or a fatal error.
pub async fn run_pipeline<S>(
    config: &Config,
    client: Arc<dyn ExchangeClient>,
    sink: &mut S,
    shutdown: watch::Receiver<bool>
) -> Result<RunSummary>
    where S: CandidateSink
{
    // Verify exchange connectivity with timeout
    match tokio::time::timeout(API_TIMEOUT, client.is_operational()).await {
        Ok(Ok(true)) => {
            info!("✓ Exchange {} is operational", client.name());
        }
        _ => {
            error!("❌ Exchange is not operational or timed out");
            return Err(anyhow!("Exchange is not operational"));
        }
    }

    let mut pipeline = Pipeline::from_config(config);
    let topology = pipeline
        .refresh(client.as_ref(), config.active_only).await
        .context("Failed to resolve exchange topology")?;

    print_topology(&topology, pipeline.engine().anchor(), 5);
    if topology.is_empty() {
        warn!("No triangular paths through {}; every tick will be empty", pipeline.engine().anchor());
    }

    info!(
        anchor = pipeline.engine().anchor(),
        swap_amount = pipeline.engine().swap_amount(),
        order_profit = pipeline.selector().order_profit(),
        "Detection pipeline ready"
    );

    let snapshots = build_source(config, client.clone(), &topology).await
        .context("Failed to start snapshot source")?
        .into_stream();

    print_app_started();
    info!("\nPress Ctrl+C to exit");

    drive(config, client, &mut pipeline, snapshots, sink, shutdown).await
}

/// Drive snapshots through the pipeline until shutdown or a fatal error.
///
/// Ticks run strictly in arrival order and each one (including emission)
/// finishes before shutdown or a metadata refresh is looked at. A refresh
/// commits its topology only once the source serving it is running.
async fn drive<S>(
    config: &Config,
    client: Arc<dyn ExchangeClient>,
    pipeline: &mut Pipeline,
    mut snapshots: SnapshotStream,
    sink: &mut S,
    mut shutdown: watch::Receiver<bool>
) -> Result<RunSummary>
    where S: CandidateSink
{
    if !pipeline.engine().is_initialized() {
        warn!("Starting without a resolved topology; the first tick resolves it");
    }

    let mut subscribed = pipeline
        .engine()
        .topology()
        .map(|topology| topology.symbol_set())
        .unwrap_or_default();

    let mut refresh = config.topology_refresh().map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    let mut summary = RunSummary::default();
    let mut consecutive_failures = 0u32;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    warn!("Shutdown channel closed");
                }
                break;
            }

            _ = next_refresh(&mut refresh) => {
                let fetched = pipeline.engine().fetch_topology(client.as_ref(), config.active_only).await;
                let topology = match fetched {
                    Ok(topology) => Arc::new(topology),
                    Err(e) => {
                        warn!("Topology refresh failed, keeping previous topology: {}", e);
                        continue;
                    }
                };

                let symbols = topology.symbol_set();
                if config.source_mode() == SourceMode::Push && symbols != subscribed {
                    info!("Topology symbols changed, resubscribing to {} symbols", symbols.len());

                    match build_source(config, client.clone(), &topology).await {
                        Ok(source) => {
                            snapshots = source.into_stream();
                            subscribed = symbols;
                        }
                        Err(e) if e.is_transient() => {
                            // the running stream and its topology stay; the next cadence retries
                            record_failure(
                                config,
                                &mut consecutive_failures,
                                &mut summary,
                                "Resubscription",
                                &e
                            )?;
                            continue;
                        }
                        Err(e) => {
                            return Err(anyhow::Error::new(e).context("Failed to restart snapshot source"));
                        }
                    }
                }

                let topology = pipeline.engine_mut().install(topology);
                summary.topology_refreshes += 1;

                if topology.is_empty() {
                    warn!("Refreshed topology has no triangular paths through {}", pipeline.engine().anchor());
                }
            }

            item = snapshots.next() => {
                let Some(item) = item else {
                    break;
                };

                let outcome = match item {
                    Ok(snapshot) => {
                        summary.ticks += 1;
                        pipeline.process(&snapshot)
                    }
                    Err(e) => Err(e),
                };

                match outcome {
                    Ok(candidate) => {
                        consecutive_failures = 0;

                        if let Some(candidate) = candidate {
                            summary.candidates += 1;
                            sink.emit(candidate).await.context("Failed to emit candidate")?;
                        }
                    }
                    Err(ArbitrageError::NotInitialized) => {
                        warn!("Topology not initialized, resolving before the next tick");
                        let topology = pipeline
                            .refresh(client.as_ref(), config.active_only).await
                            .context("Failed to resolve exchange topology")?;

                        if topology.is_empty() {
                            warn!("No triangular paths through {}; every tick will be empty", pipeline.engine().anchor());
                        }
                    }
                    Err(e) if e.is_transient() => {
                        record_failure(config, &mut consecutive_failures, &mut summary, "Tick", &e)?;
                    }
                    Err(e) => {
                        error!("Snapshot source ended: {}", e);
                        return Err(anyhow::Error::new(e).context("Snapshot source ended"));
                    }
                }
            }
        }
    }

    info!("Shutdown requested, stopping after {} ticks", summary.ticks);

    Ok(summary)
}
