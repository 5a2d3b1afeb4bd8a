// src/arbitrage/sink.rs

use anyhow::{ anyhow, Result };
use async_trait::async_trait;
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::info;

use super::selector::ArbitrageCandidate;

/// Downstream consumer of selected candidates. One call per tick that has a
/// candidate; a returned `Ok` is the commit point for that tick.
#[async_trait]
pub trait CandidateSink: Send {
    async fn emit(&mut self, candidate: ArbitrageCandidate) -> Result<()>;
}

/// Prints every candidate to stdout and logs it
#[derive(Debug, Default)]
pub struct ConsoleSink {
    emitted: u64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[async_trait]
impl CandidateSink for ConsoleSink {
    async fn emit(&mut self, candidate: ArbitrageCandidate) -> Result<()> {
        self.emitted += 1;

        println!("\n{}", "=== ARBITRAGE OPPORTUNITY ===".bright_purple().bold());
        println!("#{}: {}", self.emitted, candidate.display());
        println!("{}\n", "=============================".bright_purple().bold());

        info!(
            path = %candidate.path,
            expected_profit = candidate.expected_profit,
            end_amount = candidate.end_amount,
            "Arbitrage candidate"
        );

        Ok(())
    }
}

/// Hands candidates to an order-execution task over a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<ArbitrageCandidate>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<ArbitrageCandidate>) -> Self {
        Self { sender }
    }

    /// A sink and the receiving half of its channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ArbitrageCandidate>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

#[async_trait]
impl CandidateSink for ChannelSink {
    async fn emit(&mut self, candidate: ArbitrageCandidate) -> Result<()> {
        self.sender.send(candidate).await.map_err(|_| anyhow!("Candidate receiver dropped"))
    }
}
