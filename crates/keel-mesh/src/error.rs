// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keel_mesh_common::{KeyError, PeerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("device {0} not found")]
	NotFound(String),

	#[error("command failed: {cmd} {args:?}: {stderr}")]
	CommandFailed {
		cmd: &'static str,
		args: Vec<String>,
		stderr: String,
	},

	#[error("unexpected device output: {0}")]
	Parse(String),

	#[error("configuration rejected: {0}")]
	Rejected(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MeshError {
	#[error("device error: {0}")]
	Device(#[from] DeviceError),

	#[error("invalid peer: {0}")]
	Peer(#[from] PeerError),

	#[error("key error: {0}")]
	Key(#[from] KeyError),

	#[error("interface has no private key, call setup first")]
	NotSetUp,
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("parse error: {0}")]
	Parse(String),
}

pub type Result<T> = std::result::Result<T, MeshError>;
