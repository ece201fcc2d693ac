// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use crate::metadata::{InstanceMetadata, Role};

/// Joins `host` and `port`, bracketing IPv6 literals.
pub fn join_endpoint(host: &str, port: u16) -> String {
	if host.contains(':') && !host.starts_with('[') {
		format!("[{host}]:{port}")
	} else {
		format!("{host}:{port}")
	}
}

/// Splits `host:port`. IPv6 hosts must be bracketed and come back without
/// the brackets.
pub fn split_endpoint(endpoint: &str) -> Option<(&str, u16)> {
	let (host, port) = endpoint.rsplit_once(':')?;
	let port = port.parse().ok()?;

	let host = match host.strip_prefix('[') {
		Some(rest) => rest.strip_suffix(']')?,
		None if host.contains(':') => return None,
		None => host,
	};

	if host.is_empty() {
		return None;
	}
	Some((host, port))
}

/// Join-service endpoints of every control-plane instance with a known VPC
/// address, in listing order.
pub fn control_plane_endpoints(instances: &[InstanceMetadata], port: u16) -> Vec<String> {
	instances
		.iter()
		.filter(|i| i.role == Role::ControlPlane && !i.vpc_ip.is_empty())
		.map(|i| join_endpoint(&i.vpc_ip, port))
		.collect()
}

/// Drops every endpoint whose host is `self_ip`. Endpoints that do not parse
/// as `host:port` are dropped too.
pub fn remove_self_from_endpoints(self_ip: &str, endpoints: Vec<String>) -> Vec<String> {
	endpoints
		.into_iter()
		.filter(|endpoint| matches!(split_endpoint(endpoint), Some((host, _)) if host != self_ip))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_join_brackets_ipv6() {
		assert_eq!(join_endpoint("192.0.2.1", 30090), "192.0.2.1:30090");
		assert_eq!(join_endpoint("2001:db8::1", 30090), "[2001:db8::1]:30090");
		assert_eq!(join_endpoint("lb.example.com", 30090), "lb.example.com:30090");
	}

	#[test]
	fn test_split() {
		assert_eq!(split_endpoint("192.0.2.1:30090"), Some(("192.0.2.1", 30090)));
		assert_eq!(split_endpoint("[2001:db8::1]:30090"), Some(("2001:db8::1", 30090)));
		assert_eq!(split_endpoint("192.0.2.1"), None);
		assert_eq!(split_endpoint("2001:db8::1"), None);
		assert_eq!(split_endpoint(":30090"), None);
		assert_eq!(split_endpoint("192.0.2.1:port"), None);
	}

	#[test]
	fn test_self_not_in_endpoints() {
		let endpoints: Vec<String> = (2..=6).map(|i| format!("192.0.2.{i}:30090")).collect();
		assert_eq!(
			remove_self_from_endpoints("192.0.2.1", endpoints.clone()),
			endpoints
		);
	}

	#[test]
	fn test_self_in_endpoints() {
		let endpoints: Vec<String> = (1..=6).map(|i| format!("192.0.2.{i}:30090")).collect();
		let got = remove_self_from_endpoints("192.0.2.1", endpoints);
		assert_eq!(got.len(), 5);
		assert!(!got.contains(&"192.0.2.1:30090".to_string()));
	}

	#[test]
	fn test_host_match_is_exact() {
		let endpoints = vec!["192.0.2.10:30090".to_string(), "192.0.2.1:30090".to_string()];
		assert_eq!(
			remove_self_from_endpoints("192.0.2.1", endpoints),
			vec!["192.0.2.10:30090".to_string()]
		);
	}

	#[test]
	fn test_only_control_planes_with_address() {
		let instances = vec![
			InstanceMetadata::new(Role::ControlPlane, "192.0.2.2"),
			InstanceMetadata::new(Role::Worker, "192.0.2.12"),
			InstanceMetadata::new(Role::ControlPlane, ""),
			InstanceMetadata::new(Role::Unknown, "192.0.2.20"),
			InstanceMetadata::new(Role::ControlPlane, "192.0.2.3"),
		];
		assert_eq!(
			control_plane_endpoints(&instances, 30090),
			vec!["192.0.2.2:30090".to_string(), "192.0.2.3:30090".to_string()]
		);
	}

	proptest! {
		#[test]
		fn test_self_never_survives(
			hosts in prop::collection::vec(1u8..=254, 0..16),
			self_host in 1u8..=254,
		) {
			let self_ip = format!("192.0.2.{self_host}");
			let endpoints: Vec<String> = hosts.iter().map(|h| join_endpoint(&format!("192.0.2.{h}"), 30090)).collect();
			let kept = remove_self_from_endpoints(&self_ip, endpoints.clone());

			prop_assert!(kept.iter().all(|e| split_endpoint(e).map(|(h, _)| h) != Some(self_ip.as_str())));
			prop_assert_eq!(kept.len(), hosts.iter().filter(|h| **h != self_host).count());
		}
	}
}
