//! Inter-recipient pacing policies for the dispatch loop.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

use crate::errors::Error;

/// Awaited by the dispatcher between two consecutive sends.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Selected with `DISPATCH_PACING`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PacingMode {
    /// Sleep the full delay after every send.
    #[default]
    Fixed,
    /// Keep send starts `delay` apart, counting time spent sending.
    Interval,
}

impl FromStr for PacingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "interval" => Ok(Self::Interval),
            other => Err(Error::Config(format!(
                "DISPATCH_PACING must be 'fixed' or 'interval', got '{other}'"
            ))),
        }
    }
}

/// Never waits. Used when `DISPATCH_DELAY_MS=0` and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self) {}
}

/// Sleeps a fixed amount between sends, regardless of how long the send took.
#[derive(Clone, Copy, Debug)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        if !self.0.is_zero() {
            sleep(self.0).await;
        }
    }
}

/// Keeps consecutive sends at least `interval` apart.
///
/// The first pause waits the whole interval. Later pauses only wait for what is
/// left of it since the previous pause returned, so a slow send shortens the wait.
#[derive(Debug)]
pub struct IntervalPacer {
    interval: Duration,
    released_at: Mutex<Option<Instant>>,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            released_at: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Pacer for IntervalPacer {
    async fn pause(&self) {
        let mut released_at = self.released_at.lock().await;
        match *released_at {
            Some(prev) => sleep_until(prev + self.interval).await,
            None => sleep(self.interval).await,
        }
        *released_at = Some(Instant::now());
    }
}

/// Pacer for the configured mode and delay. A zero delay disables pacing.
pub fn from_config(mode: PacingMode, delay: Duration) -> Box<dyn Pacer> {
    if delay.is_zero() {
        return Box::new(NoPacing);
    }
    match mode {
        PacingMode::Fixed => Box::new(FixedDelay(delay)),
        PacingMode::Interval => Box::new(IntervalPacer::new(delay)),
    }
}
