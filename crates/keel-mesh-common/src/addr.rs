// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ipnet::Ipv4Net;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Prefix of the subnet every node's mesh address is allocated from.
pub const MESH_PREFIX_LEN: u8 = 16;

/// Port the mesh interface listens on for encrypted traffic.
pub const DEFAULT_LISTEN_PORT: u16 = 51820;

/// Each peer is routed by a single host address.
pub fn host_route(ip: Ipv4Addr) -> Ipv4Net {
	Ipv4Net::from(ip)
}

/// Address assigned to the local interface, covering the whole mesh subnet.
pub fn interface_net(ip: Ipv4Addr) -> Ipv4Net {
	Ipv4Net::new(ip, MESH_PREFIX_LEN).unwrap_or_else(|_| Ipv4Net::from(ip))
}

/// Device endpoint for a peer reachable at `public_ip`.
pub fn mesh_endpoint(public_ip: IpAddr, listen_port: u16) -> SocketAddr {
	SocketAddr::new(public_ip, listen_port)
}
