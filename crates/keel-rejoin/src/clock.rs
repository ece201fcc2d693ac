// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{Instant, Interval, MissedTickBehavior};

#[async_trait]
pub trait Ticker: Send {
	async fn tick(&mut self);
}

pub trait Clock: Send + Sync {
	/// Ticker whose first tick comes one `period` from now.
	fn ticker(&self, period: Duration) -> Box<dyn Ticker>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

struct TokioTicker {
	interval: Interval,
}

#[async_trait]
impl Ticker for TokioTicker {
	async fn tick(&mut self) {
		self.interval.tick().await;
	}
}

impl Clock for TokioClock {
	fn ticker(&self, period: Duration) -> Box<dyn Ticker> {
		// interval_at panics on a zero period
		let period = period.max(Duration::from_millis(1));
		let mut interval = tokio::time::interval_at(Instant::now() + period, period);
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
		Box::new(TokioTicker { interval })
	}
}

/// Clock that only advances when told to.
///
/// Every ticker created from it fires once per [`ManualClock::step`],
/// whatever the requested period. Steps taken while a ticker is not being
/// polled collapse into a single tick.
#[derive(Debug, Clone)]
pub struct ManualClock {
	steps: Arc<watch::Sender<u64>>,
}

impl ManualClock {
	pub fn new() -> Self {
		let (steps, _) = watch::channel(0);
		Self {
			steps: Arc::new(steps),
		}
	}

	pub fn step(&self) {
		self.steps.send_modify(|n| *n += 1);
	}

	/// Number of live tickers.
	pub fn tickers(&self) -> usize {
		self.steps.receiver_count()
	}
}

impl Default for ManualClock {
	fn default() -> Self {
		Self::new()
	}
}

struct ManualTicker {
	steps: watch::Receiver<u64>,
}

#[async_trait]
impl Ticker for ManualTicker {
	async fn tick(&mut self) {
		if self.steps.changed().await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}

impl Clock for ManualClock {
	fn ticker(&self, _period: Duration) -> Box<dyn Ticker> {
		Box::new(ManualTicker {
			steps: self.steps.subscribe(),
		})
	}
}
