// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::ConfigError;
use std::time::Duration;

/// Port the join service listens on, on every control-plane node and on
/// the load balancer.
pub const JOIN_SERVICE_NODE_PORT: u16 = 30090;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn env_secs(name: &str, default: Duration) -> Result<Duration, ConfigError> {
	match std::env::var(name) {
		Ok(raw) => {
			let secs: u64 = raw
				.trim()
				.parse()
				.map_err(|e| ConfigError::Parse(format!("invalid {name}: {e}")))?;
			if secs == 0 {
				return Err(ConfigError::Parse(format!("{name} must be greater than zero")));
			}
			Ok(Duration::from_secs(secs))
		}
		Err(_) => Ok(default),
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejoinConfig {
	/// Pause between discovery cycles.
	pub interval: Duration,
	/// Bound on each metadata call and each ticket request.
	pub timeout: Duration,
	pub join_service_port: u16,
}

impl Default for RejoinConfig {
	fn default() -> Self {
		Self {
			interval: DEFAULT_INTERVAL,
			timeout: DEFAULT_TIMEOUT,
			join_service_port: JOIN_SERVICE_NODE_PORT,
		}
	}
}

impl RejoinConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		let interval = env_secs("KEEL_REJOIN_INTERVAL_SECS", DEFAULT_INTERVAL)?;
		let timeout = env_secs("KEEL_REJOIN_TIMEOUT_SECS", DEFAULT_TIMEOUT)?;

		let join_service_port = match std::env::var("KEEL_JOIN_SERVICE_PORT") {
			Ok(raw) => raw
				.trim()
				.parse()
				.map_err(|e| ConfigError::Parse(format!("invalid KEEL_JOIN_SERVICE_PORT: {e}")))?,
			Err(_) => JOIN_SERVICE_NODE_PORT,
		};

		Ok(Self {
			interval,
			timeout,
			join_service_port,
		})
	}
}
