// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::RejoinConfig;
use crate::dialer::SecureDialer;
use crate::endpoints::{control_plane_endpoints, join_endpoint, remove_self_from_endpoints};
use crate::error::{RejoinError, Result};
use crate::metadata::{InstanceMetadata, MetadataSource, Role};
use crate::ticket::{IssueRejoinTicketRequest, RejoinTicket};

/// Polls the control plane for this node's rejoin ticket.
pub struct RejoinClient<D, M> {
	dialer: D,
	metadata: M,
	node_info: InstanceMetadata,
	config: RejoinConfig,
	clock: Arc<dyn Clock>,
	disk_uuid: String,
}

impl<D: SecureDialer, M: MetadataSource> RejoinClient<D, M> {
	pub fn new(dialer: D, node_info: InstanceMetadata, metadata: M) -> Self {
		Self {
			dialer,
			metadata,
			node_info,
			config: RejoinConfig::default(),
			clock: Arc::new(TokioClock),
			disk_uuid: String::new(),
		}
	}

	pub fn with_config(mut self, config: RejoinConfig) -> Self {
		self.config = config;
		self
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.config.interval = interval;
		self
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = timeout;
		self
	}

	pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
		self.clock = Arc::new(clock);
		self
	}

	pub fn config(&self) -> &RejoinConfig {
		&self.config
	}

	pub fn disk_uuid(&self) -> &str {
		&self.disk_uuid
	}

	/// Runs discovery cycles until one endpoint hands out a ticket.
	///
	/// The first cycle runs immediately, later ones once per interval.
	/// Returns `None` when `cancel` fires; a token that is already cancelled
	/// yields `None` without any metadata query or dial.
	#[instrument(skip(self, cancel), fields(role = %self.node_info.role))]
	pub async fn start(
		&mut self,
		cancel: &CancellationToken,
		disk_uuid: &str,
	) -> Option<RejoinTicket> {
		self.disk_uuid = disk_uuid.to_string();
		info!(interval = ?self.config.interval, timeout = ?self.config.timeout, "starting rejoin client");

		let mut ticker = self.clock.ticker(self.config.interval);

		loop {
			if cancel.is_cancelled() {
				info!("rejoin cancelled");
				return None;
			}

			match self.run_cycle(cancel).await {
				Ok(ticket) => {
					info!("rejoin ticket received");
					return Some(ticket);
				}
				Err(RejoinError::Cancelled) => {
					info!("rejoin cancelled");
					return None;
				}
				Err(e @ RejoinError::Exhausted { .. }) => {
					error!(error = %e, "rejoin cycle failed, retrying next interval");
				}
				Err(e) => {
					warn!(error = %e, "join endpoint discovery failed, retrying next interval");
				}
			}

			tokio::select! {
				biased;

				_ = cancel.cancelled() => {
					info!("rejoin cancelled");
					return None;
				}

				_ = ticker.tick() => {}
			}
		}
	}

	async fn run_cycle(&self, cancel: &CancellationToken) -> Result<RejoinTicket> {
		let endpoints = cancellable(cancel, self.join_endpoints()).await?;
		debug!(?endpoints, "discovered join endpoints");
		self.try_rejoin_with_available_services(cancel, &endpoints).await
	}

	/// Join-service endpoints of all control-plane nodes plus the load
	/// balancer, without this node's own address.
	///
	/// The load balancer is always appended even when the direct listing is
	/// complete, so one cycle may ask the same node twice.
	pub async fn join_endpoints(&self) -> Result<Vec<String>> {
		let port = self.config.join_service_port;

		let instances = self
			.timed(async { self.metadata.list().await.map_err(RejoinError::from) })
			.await?;
		let mut endpoints = control_plane_endpoints(&instances, port);

		let (lb_host, _) = self
			.timed(async {
				self
					.metadata
					.load_balancer_endpoint()
					.await
					.map_err(RejoinError::from)
			})
			.await?;
		endpoints.push(join_endpoint(&lb_host, port));

		if self.node_info.role == Role::ControlPlane {
			endpoints = remove_self_from_endpoints(&self.node_info.vpc_ip, endpoints);
		}

		Ok(endpoints)
	}

	/// Tries `endpoints` in order and returns the first ticket obtained.
	pub async fn try_rejoin_with_available_services(
		&self,
		cancel: &CancellationToken,
		endpoints: &[String],
	) -> Result<RejoinTicket> {
		for endpoint in endpoints {
			match self.request_rejoin_ticket(cancel, endpoint).await {
				Ok(ticket) => {
					info!(%endpoint, "rejoin ticket issued");
					return Ok(ticket);
				}
				Err(RejoinError::Cancelled) => return Err(RejoinError::Cancelled),
				Err(e) => {
					warn!(%endpoint, error = %e, "rejoin ticket request failed");
					if cancel.is_cancelled() {
						return Err(RejoinError::Cancelled);
					}
				}
			}
		}

		Err(RejoinError::Exhausted {
			attempted: endpoints.len(),
		})
	}

	/// One dial, one request, one close.
	///
	/// Dial and request share a single timeout and both race `cancel`. Once
	/// the dial succeeded the connection is closed on every outcome.
	#[instrument(skip(self, cancel))]
	pub async fn request_rejoin_ticket(
		&self,
		cancel: &CancellationToken,
		endpoint: &str,
	) -> Result<RejoinTicket> {
		let deadline = Instant::now() + self.config.timeout;

		let mut conn = cancellable(
			cancel,
			self.before(deadline, async {
				self.dialer.dial(endpoint).await.map_err(RejoinError::from)
			}),
		)
		.await?;

		let request = IssueRejoinTicketRequest {
			disk_uuid: self.disk_uuid.clone(),
		};
		let result = cancellable(
			cancel,
			self.before(deadline, async {
				conn
					.issue_rejoin_ticket(&request)
					.await
					.map_err(RejoinError::from)
			}),
		)
		.await;

		match tokio::time::timeout(self.config.timeout, conn.close()).await {
			Ok(Ok(())) => {}
			Ok(Err(e)) => debug!(error = %e, "closing rejoin connection failed"),
			Err(_) => debug!("closing rejoin connection timed out"),
		}

		result
	}

	async fn timed<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
		self.before(Instant::now() + self.config.timeout, fut).await
	}

	async fn before<T>(&self, deadline: Instant, fut: impl Future<Output = Result<T>>) -> Result<T> {
		tokio::time::timeout_at(deadline, fut)
			.await
			.map_err(|_| RejoinError::Timeout(self.config.timeout))?
	}
}

async fn cancellable<T>(
	cancel: &CancellationToken,
	fut: impl Future<Output = Result<T>>,
) -> Result<T> {
	tokio::select! {
		biased;

		_ = cancel.cancelled() => Err(RejoinError::Cancelled),
		result = fut => result,
	}
}

impl<D, M> std::fmt::Debug for RejoinClient<D, M> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RejoinClient")
			.field("node_info", &self.node_info)
			.field("config", &self.config)
			.field("disk_uuid", &self.disk_uuid)
			.finish()
	}
}
