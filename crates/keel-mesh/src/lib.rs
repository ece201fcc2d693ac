// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! WireGuard mesh reconciliation for cluster nodes.
//!
//! Every node runs one mesh interface. The membership directory publishes
//! the set of [`Peer`]s; [`WireguardManager::update_peers`] brings the
//! interface's peer table in line with that set in a single device
//! transaction.
//!
//! # Example
//!
//! ```ignore
//! use keel_mesh::{MeshConfig, WgCommandDevice, WireguardManager};
//!
//! let manager = WireguardManager::new(WgCommandDevice::new(), MeshConfig::from_env()?);
//! let public_key = manager.setup(None).await?;
//! manager.set_interface_ip("10.118.0.1".parse()?).await?;
//! manager.update_peers(&peers).await?;
//! ```

pub mod config;
pub mod device;
pub mod diff;
pub mod error;
pub mod manager;
pub mod memory;
pub mod wg_command;

pub use config::{MeshConfig, DEFAULT_INTERFACE};
pub use device::{DeviceConfig, DevicePeer, DeviceState, MeshDevice, PeerConfig};
pub use diff::{plan_peer_update, PeerUpdate};
pub use error::{ConfigError, DeviceError, MeshError, Result};
pub use manager::WireguardManager;
pub use memory::{DeviceCall, InMemoryDevice};
pub use wg_command::WgCommandDevice;

pub use keel_mesh_common::{Peer, PeerError, WgPrivateKey, WgPublicKey};
