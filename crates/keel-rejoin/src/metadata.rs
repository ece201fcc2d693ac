// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;

/// Role of an instance in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
	ControlPlane,
	Worker,
	#[default]
	Unknown,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Role::ControlPlane => "ControlPlane",
			Role::Worker => "Worker",
			Role::Unknown => "Unknown",
		};
		f.write_str(s)
	}
}

/// Unrecognized names parse as [`Role::Unknown`].
impl FromStr for Role {
	type Err = Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized: String = s
			.chars()
			.filter(|c| *c != '-' && *c != '_')
			.flat_map(char::to_lowercase)
			.collect();

		Ok(match normalized.as_str() {
			"controlplane" => Role::ControlPlane,
			"worker" => Role::Worker,
			_ => Role::Unknown,
		})
	}
}

/// Snapshot of one instance as reported by the cloud provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMetadata {
	pub name: String,
	pub provider_id: String,
	pub role: Role,
	pub vpc_ip: String,
}

impl InstanceMetadata {
	pub fn new(role: Role, vpc_ip: impl Into<String>) -> Self {
		Self {
			role,
			vpc_ip: vpc_ip.into(),
			..Self::default()
		}
	}
}

/// Cloud metadata, queried afresh on every discovery cycle.
#[async_trait]
pub trait MetadataSource: Send + Sync {
	async fn list(&self) -> Result<Vec<InstanceMetadata>, MetadataError>;

	/// Host and port of the cluster load balancer.
	async fn load_balancer_endpoint(&self) -> Result<(String, u16), MetadataError>;
}
