// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::keys::WgPublicKey;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
	#[error("public endpoint {0:?} is not an ip:port pair")]
	InvalidEndpoint(String),
}

/// One member of the mesh as published by the membership directory.
///
/// The directory identifies members by `vpn_ip`; the device only knows
/// `vpn_pub_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
	pub public_endpoint: String,
	pub vpn_ip: Ipv4Addr,
	pub vpn_pub_key: WgPublicKey,
}

impl Peer {
	pub fn new(public_endpoint: impl Into<String>, vpn_ip: Ipv4Addr, vpn_pub_key: WgPublicKey) -> Self {
		Self {
			public_endpoint: public_endpoint.into(),
			vpn_ip,
			vpn_pub_key,
		}
	}

	/// Parses `public_endpoint`. A bare host without a port is rejected.
	pub fn public_addr(&self) -> Result<SocketAddr, PeerError> {
		self
			.public_endpoint
			.parse()
			.map_err(|_| PeerError::InvalidEndpoint(self.public_endpoint.clone()))
	}

	pub fn public_ip(&self) -> Result<IpAddr, PeerError> {
		self.public_addr().map(|addr| addr.ip())
	}
}
