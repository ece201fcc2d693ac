// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::error::ConfigError;
use keel_mesh_common::DEFAULT_LISTEN_PORT;
use std::time::Duration;

pub const DEFAULT_INTERFACE: &str = "wg0";

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match std::env::var(name) {
		Ok(raw) => raw
			.trim()
			.parse()
			.map(Some)
			.map_err(|e| ConfigError::Parse(format!("invalid {name}: {e}"))),
		Err(_) => Ok(None),
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshConfig {
	pub interface: String,
	pub listen_port: u16,
	pub persistent_keepalive: Option<Duration>,
}

impl Default for MeshConfig {
	fn default() -> Self {
		Self {
			interface: DEFAULT_INTERFACE.to_string(),
			listen_port: DEFAULT_LISTEN_PORT,
			persistent_keepalive: None,
		}
	}
}

impl MeshConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		let interface = std::env::var("KEEL_WG_INTERFACE")
			.ok()
			.filter(|s| !s.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

		let listen_port = env_parse("KEEL_WG_LISTEN_PORT")?.unwrap_or(DEFAULT_LISTEN_PORT);

		let persistent_keepalive = env_parse::<u64>("KEEL_WG_KEEPALIVE_SECS")?
			.filter(|secs| *secs > 0)
			.map(Duration::from_secs);

		Ok(Self {
			interface,
			listen_port,
			persistent_keepalive,
		})
	}

	pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
		self.interface = interface.into();
		self
	}

	pub fn with_persistent_keepalive(mut self, keepalive: Duration) -> Self {
		self.persistent_keepalive = Some(keepalive);
		self
	}
}
