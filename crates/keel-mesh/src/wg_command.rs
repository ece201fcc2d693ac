// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! [`MeshDevice`] backed by the `wg` and `ip` command line tools.

use std::net::{Ipv4Addr, SocketAddr};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::Ipv4Net;
use keel_common_secret::SecretString;
use keel_mesh_common::{WgPrivateKey, WgPublicKey};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, trace};

use crate::device::{DeviceConfig, DevicePeer, DeviceState, MeshDevice, PeerConfig};
use crate::error::DeviceError;

const NONE: &str = "(none)";

pub struct WgCommandDevice {
	wg_bin: String,
	ip_bin: String,
}

impl WgCommandDevice {
	pub fn new() -> Self {
		Self {
			wg_bin: "wg".to_string(),
			ip_bin: "ip".to_string(),
		}
	}

	pub fn with_binaries(wg_bin: impl Into<String>, ip_bin: impl Into<String>) -> Self {
		Self {
			wg_bin: wg_bin.into(),
			ip_bin: ip_bin.into(),
		}
	}
}

impl Default for WgCommandDevice {
	fn default() -> Self {
		Self::new()
	}
}

async fn run(
	cmd: &'static str,
	bin: &str,
	args: &[String],
	stdin: Option<&SecretString>,
) -> Result<String, DeviceError> {
	trace!(cmd = %format!("{} {}", bin, args.join(" ")), "running device command");

	let mut command = Command::new(bin);
	command
		.args(args)
		.stdin(if stdin.is_some() {
			Stdio::piped()
		} else {
			Stdio::null()
		})
		.stdout(Stdio::piped())
		.stderr(Stdio::piped());

	let mut child = command.spawn()?;
	if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
		pipe.write_all(input.expose().as_bytes()).await?;
		pipe.write_all(b"\n").await?;
	}

	let output = child.wait_with_output().await?;
	if output.status.success() {
		Ok(String::from_utf8_lossy(&output.stdout).to_string())
	} else {
		Err(DeviceError::CommandFailed {
			cmd,
			args: args.to_vec(),
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		})
	}
}

fn parse_key_field(field: &str) -> Result<Option<WgPublicKey>, DeviceError> {
	if field == NONE {
		return Ok(None);
	}
	WgPublicKey::from_base64(field)
		.map(Some)
		.map_err(|e| DeviceError::Parse(format!("bad public key: {e}")))
}

fn parse_peer_line(fields: &[&str]) -> Result<DevicePeer, DeviceError> {
	// public-key preshared-key endpoint allowed-ips latest-handshake rx tx keepalive
	if fields.len() < 8 {
		return Err(DeviceError::Parse(format!(
			"peer line has {} fields, expected 8",
			fields.len()
		)));
	}

	let public_key = parse_key_field(fields[0])?
		.ok_or_else(|| DeviceError::Parse("peer without public key".to_string()))?;

	let endpoint = match fields[2] {
		NONE => None,
		raw => Some(
			raw
				.parse::<SocketAddr>()
				.map_err(|e| DeviceError::Parse(format!("bad endpoint {raw}: {e}")))?,
		),
	};

	// IPv6 routes are not managed by the mesh and are left out of the snapshot.
	let allowed_ips = fields[3]
		.split(',')
		.filter(|s| !s.is_empty() && *s != NONE)
		.filter_map(|s| s.parse::<Ipv4Net>().ok())
		.collect();

	let persistent_keepalive = match fields[7] {
		"off" | "0" => None,
		raw => Some(Duration::from_secs(raw.parse().map_err(|_| {
			DeviceError::Parse(format!("bad keepalive {raw}"))
		})?)),
	};

	Ok(DevicePeer {
		public_key,
		endpoint,
		allowed_ips,
		persistent_keepalive,
	})
}

/// Parses the output of `wg show <interface> dump`.
pub fn parse_dump(output: &str) -> Result<DeviceState, DeviceError> {
	let mut lines = output.lines().filter(|l| !l.trim().is_empty());

	let header: Vec<&str> = lines
		.next()
		.ok_or_else(|| DeviceError::Parse("empty dump".to_string()))?
		.split('\t')
		.collect();
	if header.len() < 4 {
		return Err(DeviceError::Parse("interface line is truncated".to_string()));
	}

	let private_key = match header[0] {
		NONE => None,
		raw => Some(
			WgPrivateKey::from_base64(raw)
				.map_err(|e| DeviceError::Parse(format!("bad private key: {e}")))?,
		),
	};
	let public_key = parse_key_field(header[1])?;
	let listen_port = header[2].parse().ok().filter(|p| *p != 0);

	let peers = lines
		.map(|line| parse_peer_line(&line.split('\t').collect::<Vec<_>>()))
		.collect::<Result<Vec<_>, _>>()?;

	Ok(DeviceState {
		private_key,
		public_key,
		listen_port,
		peers,
	})
}

/// Builds the argument list of a single `wg set` invocation.
pub fn set_args(name: &str, config: &DeviceConfig) -> Vec<String> {
	let mut args = vec!["set".to_string(), name.to_string()];

	if let Some(port) = config.listen_port {
		args.extend(["listen-port".to_string(), port.to_string()]);
	}
	if config.private_key.is_some() {
		args.extend(["private-key".to_string(), "/dev/stdin".to_string()]);
	}

	for peer in &config.peers {
		args.extend(["peer".to_string(), peer.public_key.to_base64()]);
		if peer.remove {
			args.push("remove".to_string());
			continue;
		}
		if let Some(endpoint) = peer.endpoint {
			args.extend(["endpoint".to_string(), endpoint.to_string()]);
		}
		if let Some(keepalive) = peer.persistent_keepalive {
			args.extend([
				"persistent-keepalive".to_string(),
				keepalive.as_secs().to_string(),
			]);
		}
		if peer.replace_allowed_ips || !peer.allowed_ips.is_empty() {
			let ips: Vec<String> = peer.allowed_ips.iter().map(|n| n.to_string()).collect();
			args.extend(["allowed-ips".to_string(), ips.join(",")]);
		}
	}

	args
}

fn parse_inet(output: &str) -> Option<Ipv4Addr> {
	output.split_whitespace().skip_while(|w| *w != "inet").nth(1).and_then(|cidr| {
		cidr
			.split('/')
			.next()
			.and_then(|ip| ip.parse::<Ipv4Addr>().ok())
	})
}

#[async_trait]
impl MeshDevice for WgCommandDevice {
	#[instrument(skip(self))]
	async fn device(&self, name: &str) -> Result<DeviceState, DeviceError> {
		let args = vec!["show".to_string(), name.to_string(), "dump".to_string()];
		let output = run("wg", &self.wg_bin, &args, None)
			.await
			.map_err(|e| match e {
				DeviceError::CommandFailed { ref stderr, .. } if stderr.contains("No such device") => {
					DeviceError::NotFound(name.to_string())
				}
				other => other,
			})?;
		parse_dump(&output)
	}

	#[instrument(skip(self, config), fields(peers = config.peers.len()))]
	async fn configure_device(&self, name: &str, mut config: DeviceConfig) -> Result<(), DeviceError> {
		// `wg set` creates peers it does not know, so update-only entries are
		// resolved against the live table first.
		if config.peers.iter().any(|p| p.update_only) {
			let current = self.device(name).await?;
			config
				.peers
				.retain(|p: &PeerConfig| !p.update_only || current.peer(&p.public_key).is_some());
		}

		if config.is_empty() {
			debug!("nothing to apply");
			return Ok(());
		}

		let key = config.private_key.as_ref().map(|k| k.to_base64());
		let args = set_args(name, &config);
		run("wg", &self.wg_bin, &args, key.as_ref()).await?;
		Ok(())
	}

	#[instrument(skip(self))]
	async fn interface_addr(&self, name: &str) -> Result<Option<Ipv4Addr>, DeviceError> {
		let args: Vec<String> = ["-4", "-o", "addr", "show", "dev", name]
			.iter()
			.map(|s| s.to_string())
			.collect();
		let output = run("ip", &self.ip_bin, &args, None).await?;
		Ok(parse_inet(&output))
	}

	#[instrument(skip(self))]
	async fn set_interface_addr(&self, name: &str, addr: Ipv4Net) -> Result<(), DeviceError> {
		let flush: Vec<String> = ["-4", "addr", "flush", "dev", name]
			.iter()
			.map(|s| s.to_string())
			.collect();
		run("ip", &self.ip_bin, &flush, None).await?;

		let add = vec![
			"-4".to_string(),
			"addr".to_string(),
			"add".to_string(),
			addr.to_string(),
			"dev".to_string(),
			name.to_string(),
		];
		run("ip", &self.ip_bin, &add, None).await?;

		let up: Vec<String> = ["link", "set", "up", "dev", name]
			.iter()
			.map(|s| s.to_string())
			.collect();
		run("ip", &self.ip_bin, &up, None).await?;
		Ok(())
	}
}
