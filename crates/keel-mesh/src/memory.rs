// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use ipnet::Ipv4Net;
use keel_mesh_common::{WgPrivateKey, WgPublicKey};

use crate::device::{DeviceConfig, DevicePeer, DeviceState, MeshDevice, PeerConfig};
use crate::error::DeviceError;

/// Recorded call to the in-memory device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceCall {
	Device,
	Configure(Vec<PeerConfig>),
	InterfaceAddr,
	SetInterfaceAddr(Ipv4Net),
}

#[derive(Default)]
struct Inner {
	private_key: Option<WgPrivateKey>,
	listen_port: Option<u16>,
	peers: BTreeMap<WgPublicKey, DevicePeer>,
	addr: Option<Ipv4Net>,
	configure_error: Option<String>,
	read_error: Option<String>,
	calls: Vec<DeviceCall>,
}

/// Device that keeps its state in process memory.
///
/// Transactions are validated in full before any peer is touched, so a
/// rejected transaction leaves the peer table unchanged.
#[derive(Clone)]
pub struct InMemoryDevice {
	name: String,
	inner: Arc<Mutex<Inner>>,
}

impl InMemoryDevice {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			inner: Arc::new(Mutex::new(Inner::default())),
		}
	}

	pub fn with_peer(self, peer: DevicePeer) -> Self {
		self.lock().peers.insert(peer.public_key, peer);
		self
	}

	pub fn with_interface_addr(self, addr: Ipv4Net) -> Self {
		self.lock().addr = Some(addr);
		self
	}

	pub fn with_configure_error(self, error: impl Into<String>) -> Self {
		self.lock().configure_error = Some(error.into());
		self
	}

	pub fn with_read_error(self, error: impl Into<String>) -> Self {
		self.lock().read_error = Some(error.into());
		self
	}

	/// Peers ordered by public key.
	pub fn peers(&self) -> Vec<DevicePeer> {
		self.lock().peers.values().cloned().collect()
	}

	pub fn get_calls(&self) -> Vec<DeviceCall> {
		self.lock().calls.clone()
	}

	/// Number of configuration transactions applied or attempted.
	pub fn configure_count(&self) -> usize {
		self
			.lock()
			.calls
			.iter()
			.filter(|c| matches!(c, DeviceCall::Configure(_)))
			.count()
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn check_name(&self, name: &str) -> Result<(), DeviceError> {
		if name == self.name {
			Ok(())
		} else {
			Err(DeviceError::NotFound(name.to_string()))
		}
	}
}

fn apply_peer(peers: &mut BTreeMap<WgPublicKey, DevicePeer>, cfg: &PeerConfig) {
	if cfg.remove {
		peers.remove(&cfg.public_key);
		return;
	}

	if cfg.update_only && !peers.contains_key(&cfg.public_key) {
		return;
	}

	let peer = peers.entry(cfg.public_key).or_insert_with(|| DevicePeer {
		public_key: cfg.public_key,
		endpoint: None,
		allowed_ips: Vec::new(),
		persistent_keepalive: None,
	});

	if cfg.endpoint.is_some() {
		peer.endpoint = cfg.endpoint;
	}
	if cfg.persistent_keepalive.is_some() {
		peer.persistent_keepalive = cfg.persistent_keepalive;
	}
	if cfg.replace_allowed_ips {
		peer.allowed_ips.clear();
	}
	for net in &cfg.allowed_ips {
		if !peer.allowed_ips.contains(net) {
			peer.allowed_ips.push(*net);
		}
	}
}

#[async_trait]
impl MeshDevice for InMemoryDevice {
	async fn device(&self, name: &str) -> Result<DeviceState, DeviceError> {
		self.check_name(name)?;
		let mut inner = self.lock();
		inner.calls.push(DeviceCall::Device);
		if let Some(err) = &inner.read_error {
			return Err(DeviceError::Rejected(err.clone()));
		}

		Ok(DeviceState {
			public_key: inner.private_key.as_ref().map(|k| k.public_key()),
			private_key: inner.private_key.clone(),
			listen_port: inner.listen_port,
			peers: inner.peers.values().cloned().collect(),
		})
	}

	async fn configure_device(&self, name: &str, config: DeviceConfig) -> Result<(), DeviceError> {
		self.check_name(name)?;
		let mut inner = self.lock();
		inner.calls.push(DeviceCall::Configure(config.peers.clone()));
		if let Some(err) = &inner.configure_error {
			return Err(DeviceError::Rejected(err.clone()));
		}

		let mut peers = inner.peers.clone();
		for cfg in &config.peers {
			apply_peer(&mut peers, cfg);
		}

		inner.peers = peers;
		if let Some(key) = config.private_key {
			inner.private_key = Some(key);
		}
		if let Some(port) = config.listen_port {
			inner.listen_port = Some(port);
		}
		Ok(())
	}

	async fn interface_addr(&self, name: &str) -> Result<Option<Ipv4Addr>, DeviceError> {
		self.check_name(name)?;
		let mut inner = self.lock();
		inner.calls.push(DeviceCall::InterfaceAddr);
		Ok(inner.addr.map(|net| net.addr()))
	}

	async fn set_interface_addr(&self, name: &str, addr: Ipv4Net) -> Result<(), DeviceError> {
		self.check_name(name)?;
		let mut inner = self.lock();
		inner.calls.push(DeviceCall::SetInterfaceAddr(addr));
		inner.addr = Some(addr);
		Ok(())
	}
}
