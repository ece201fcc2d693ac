// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::net::Ipv4Addr;

use keel_mesh_common::{
	host_route, interface_net, mesh_endpoint, Peer, WgPrivateKey, WgPublicKey,
};
use tracing::{debug, info, instrument};

use crate::config::MeshConfig;
use crate::device::{DeviceConfig, MeshDevice, PeerConfig};
use crate::diff::plan_peer_update;
use crate::error::{MeshError, Result};

/// Keeps the mesh interface in line with cluster membership.
///
/// Not internally synchronized: calls are expected from a single
/// membership-watch task.
pub struct WireguardManager<D: MeshDevice> {
	device: D,
	config: MeshConfig,
}

impl<D: MeshDevice> WireguardManager<D> {
	pub fn new(device: D, config: MeshConfig) -> Self {
		Self { device, config }
	}

	pub fn device(&self) -> &D {
		&self.device
	}

	pub fn config(&self) -> &MeshConfig {
		&self.config
	}

	/// Installs `private_key` (or a freshly generated one) and the listen
	/// port on the interface.
	#[instrument(skip(self, private_key), fields(interface = %self.config.interface))]
	pub async fn setup(&self, private_key: Option<WgPrivateKey>) -> Result<WgPublicKey> {
		let generated = private_key.is_none();
		let private_key = private_key.unwrap_or_else(WgPrivateKey::generate);
		let public_key = private_key.public_key();

		self
			.device
			.configure_device(
				&self.config.interface,
				DeviceConfig {
					private_key: Some(private_key),
					listen_port: Some(self.config.listen_port),
					peers: Vec::new(),
				},
			)
			.await?;

		info!(%public_key, generated, "mesh interface key installed");
		Ok(public_key)
	}

	pub async fn private_key(&self) -> Result<WgPrivateKey> {
		let state = self.device.device(&self.config.interface).await?;
		state.private_key.ok_or(MeshError::NotSetUp)
	}

	pub async fn public_key(&self) -> Result<WgPublicKey> {
		let state = self.device.device(&self.config.interface).await?;
		state
			.public_key
			.or_else(|| state.private_key.as_ref().map(|k| k.public_key()))
			.ok_or(MeshError::NotSetUp)
	}

	pub async fn interface_ip(&self) -> Result<Option<Ipv4Addr>> {
		Ok(self.device.interface_addr(&self.config.interface).await?)
	}

	#[instrument(skip(self), fields(interface = %self.config.interface))]
	pub async fn set_interface_ip(&self, ip: Ipv4Addr) -> Result<()> {
		self
			.device
			.set_interface_addr(&self.config.interface, interface_net(ip))
			.await?;
		info!(%ip, "mesh interface address set");
		Ok(())
	}

	/// Adds a single peer. Adding the local interface's own address is a
	/// no-op.
	#[instrument(skip(self, public_key), fields(%vpn_ip))]
	pub async fn add_peer(
		&self,
		public_key: WgPublicKey,
		public_endpoint: &str,
		vpn_ip: Ipv4Addr,
	) -> Result<()> {
		let peer = Peer::new(public_endpoint, vpn_ip, public_key);
		let public_ip = peer.public_ip()?;

		if self.interface_ip().await? == Some(vpn_ip) {
			debug!("not adding self as peer");
			return Ok(());
		}

		let cfg = PeerConfig::add(
			public_key,
			mesh_endpoint(public_ip, self.config.listen_port),
			host_route(vpn_ip),
			self.config.persistent_keepalive,
		);
		self
			.device
			.configure_device(&self.config.interface, DeviceConfig::with_peers(vec![cfg]))
			.await?;

		debug!(%public_key, "peer added");
		Ok(())
	}

	#[instrument(skip(self))]
	pub async fn remove_peer(&self, public_key: WgPublicKey) -> Result<()> {
		self
			.device
			.configure_device(
				&self.config.interface,
				DeviceConfig::with_peers(vec![PeerConfig::remove(public_key)]),
			)
			.await?;
		debug!("peer removed");
		Ok(())
	}

	/// Converges the device peer table to `desired` minus this node.
	///
	/// All changes go to the device in one transaction. When nothing differs
	/// the device is not written to.
	#[instrument(skip(self, desired), fields(interface = %self.config.interface, desired = desired.len()))]
	pub async fn update_peers(&self, desired: &[Peer]) -> Result<()> {
		let state = self.device.device(&self.config.interface).await?;
		let self_ip = self.interface_ip().await?;

		let update = plan_peer_update(
			&state.peers,
			desired,
			self_ip,
			self.config.listen_port,
			self.config.persistent_keepalive,
		)?;

		if update.is_empty() {
			debug!("mesh peers already up to date");
			return Ok(());
		}

		let (added, updated, removed) = (
			update.added.len(),
			update.updated.len(),
			update.removed.len(),
		);

		self
			.device
			.configure_device(
				&self.config.interface,
				DeviceConfig::with_peers(update.into_peer_configs()),
			)
			.await?;

		info!(added, updated, removed, "mesh peers reconciled");
		Ok(())
	}
}

impl<D: MeshDevice> std::fmt::Debug for WireguardManager<D> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WireguardManager")
			.field("interface", &self.config.interface)
			.field("listen_port", &self.config.listen_port)
			.finish()
	}
}
