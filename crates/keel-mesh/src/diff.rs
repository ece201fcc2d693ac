// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Peer-set difference between the live device table and a membership
//! snapshot.
//!
//! The device is keyed by public key, the snapshot by VPN address. A peer
//! whose key rotated therefore shows up as one addition (new key) and one
//! removal (old key); the transport has no way to rename a peer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;
use std::time::Duration;

use keel_mesh_common::{host_route, mesh_endpoint, Peer, PeerError, WgPublicKey};

use crate::device::{DevicePeer, PeerConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerUpdate {
	pub added: Vec<PeerConfig>,
	pub updated: Vec<PeerConfig>,
	pub removed: Vec<PeerConfig>,
}

impl PeerUpdate {
	pub fn is_empty(&self) -> bool {
		self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
	}

	/// All entries in the order they go into one transaction.
	pub fn into_peer_configs(self) -> Vec<PeerConfig> {
		let mut peers = self.removed;
		peers.extend(self.updated);
		peers.extend(self.added);
		peers
	}
}

/// Computes the transaction that turns `current` into `desired`.
///
/// `self_ip` is the local interface address; a snapshot entry carrying it is
/// never planned. Every remaining snapshot entry must carry a parseable
/// `ip:port` public endpoint, otherwise nothing is planned at all.
pub fn plan_peer_update(
	current: &[DevicePeer],
	desired: &[Peer],
	self_ip: Option<Ipv4Addr>,
	listen_port: u16,
	persistent_keepalive: Option<Duration>,
) -> Result<PeerUpdate, PeerError> {
	let mut by_vpn_ip: BTreeMap<Ipv4Addr, &Peer> = BTreeMap::new();
	for peer in desired {
		if Some(peer.vpn_ip) == self_ip {
			continue;
		}
		by_vpn_ip.insert(peer.vpn_ip, peer);
	}

	let current_by_key: HashMap<&WgPublicKey, &DevicePeer> =
		current.iter().map(|p| (&p.public_key, p)).collect();

	let mut update = PeerUpdate::default();
	let mut wanted: HashSet<WgPublicKey> = HashSet::new();

	for (vpn_ip, peer) in by_vpn_ip {
		let endpoint = mesh_endpoint(peer.public_ip()?, listen_port);
		let route = host_route(vpn_ip);

		if !wanted.insert(peer.vpn_pub_key) {
			// same key announced under two addresses, first address wins
			continue;
		}

		match current_by_key.get(&peer.vpn_pub_key) {
			None => update.added.push(PeerConfig::add(
				peer.vpn_pub_key,
				endpoint,
				route,
				persistent_keepalive,
			)),
			Some(live) if live.allowed_ips != [route] => update.added.push(PeerConfig::add(
				peer.vpn_pub_key,
				endpoint,
				route,
				persistent_keepalive,
			)),
			Some(live) if live.endpoint != Some(endpoint) => update
				.updated
				.push(PeerConfig::update_endpoint(peer.vpn_pub_key, endpoint)),
			Some(_) => {}
		}
	}

	for live in current {
		if !wanted.contains(&live.public_key) {
			update.removed.push(PeerConfig::remove(live.public_key));
		}
	}

	Ok(update)
}
