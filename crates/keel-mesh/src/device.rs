// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Control surface of the kernel mesh interface.
//!
//! The device is addressed by interface name and knows peers only by public
//! key. A [`DeviceConfig`] is applied as a single transaction.

use crate::error::DeviceError;
use async_trait::async_trait;
use ipnet::Ipv4Net;
use keel_mesh_common::{WgPrivateKey, WgPublicKey};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePeer {
	pub public_key: WgPublicKey,
	pub endpoint: Option<SocketAddr>,
	pub allowed_ips: Vec<Ipv4Net>,
	pub persistent_keepalive: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceState {
	pub private_key: Option<WgPrivateKey>,
	pub public_key: Option<WgPublicKey>,
	pub listen_port: Option<u16>,
	pub peers: Vec<DevicePeer>,
}

impl DeviceState {
	pub fn peer(&self, public_key: &WgPublicKey) -> Option<&DevicePeer> {
		self.peers.iter().find(|p| &p.public_key == public_key)
	}
}

/// One peer entry of a configuration transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
	pub public_key: WgPublicKey,
	pub remove: bool,
	/// Only touch the peer if the device already has it.
	pub update_only: bool,
	pub endpoint: Option<SocketAddr>,
	pub replace_allowed_ips: bool,
	pub allowed_ips: Vec<Ipv4Net>,
	pub persistent_keepalive: Option<Duration>,
}

impl PeerConfig {
	pub fn add(
		public_key: WgPublicKey,
		endpoint: SocketAddr,
		allowed_ip: Ipv4Net,
		persistent_keepalive: Option<Duration>,
	) -> Self {
		Self {
			public_key,
			remove: false,
			update_only: false,
			endpoint: Some(endpoint),
			replace_allowed_ips: true,
			allowed_ips: vec![allowed_ip],
			persistent_keepalive,
		}
	}

	pub fn update_endpoint(public_key: WgPublicKey, endpoint: SocketAddr) -> Self {
		Self {
			public_key,
			remove: false,
			update_only: true,
			endpoint: Some(endpoint),
			replace_allowed_ips: false,
			allowed_ips: Vec::new(),
			persistent_keepalive: None,
		}
	}

	pub fn remove(public_key: WgPublicKey) -> Self {
		Self {
			public_key,
			remove: true,
			update_only: false,
			endpoint: None,
			replace_allowed_ips: false,
			allowed_ips: Vec::new(),
			persistent_keepalive: None,
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct DeviceConfig {
	pub private_key: Option<WgPrivateKey>,
	pub listen_port: Option<u16>,
	pub peers: Vec<PeerConfig>,
}

impl DeviceConfig {
	pub fn with_peers(peers: Vec<PeerConfig>) -> Self {
		Self {
			peers,
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.private_key.is_none() && self.listen_port.is_none() && self.peers.is_empty()
	}
}

#[async_trait]
pub trait MeshDevice: Send + Sync {
	async fn device(&self, name: &str) -> Result<DeviceState, DeviceError>;

	async fn configure_device(&self, name: &str, config: DeviceConfig) -> Result<(), DeviceError>;

	async fn interface_addr(&self, name: &str) -> Result<Option<Ipv4Addr>, DeviceError>;

	async fn set_interface_addr(&self, name: &str, addr: Ipv4Net) -> Result<(), DeviceError>;
}
