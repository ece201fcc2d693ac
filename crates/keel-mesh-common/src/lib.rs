// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod addr;
pub mod keys;
pub mod peer;

pub use addr::{
	host_route, interface_net, mesh_endpoint, DEFAULT_LISTEN_PORT, MESH_PREFIX_LEN,
};
pub use keys::{KeyError, WgPrivateKey, WgPublicKey, KEY_LEN};
pub use peer::{Peer, PeerError};
