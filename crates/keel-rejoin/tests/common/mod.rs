// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keel_common_secret::SecretBytes;
use keel_rejoin::{
	DialError, InstanceMetadata, IssueRejoinTicketRequest, MetadataError, MetadataSource,
	RejoinConnection, RejoinTicket, SecureDialer,
};

#[derive(Default)]
struct MetadataInner {
	instances: Vec<InstanceMetadata>,
	load_balancer: Option<(String, u16)>,
	failing_lists: usize,
	list_calls: usize,
	lb_calls: usize,
}

/// Metadata source with a fixed instance listing.
#[derive(Clone, Default)]
pub struct StaticMetadata {
	inner: Arc<Mutex<MetadataInner>>,
}

impl StaticMetadata {
	pub fn new(instances: Vec<InstanceMetadata>, lb_host: &str) -> Self {
		let meta = Self::default();
		{
			let mut inner = meta.inner.lock().unwrap();
			inner.instances = instances;
			inner.load_balancer = Some((lb_host.to_string(), 443));
		}
		meta
	}

	/// The next `n` listings fail.
	pub fn failing_lists(self, n: usize) -> Self {
		self.inner.lock().unwrap().failing_lists = n;
		self
	}

	pub fn without_load_balancer(self) -> Self {
		self.inner.lock().unwrap().load_balancer = None;
		self
	}

	pub fn list_calls(&self) -> usize {
		self.inner.lock().unwrap().list_calls
	}

	pub fn lb_calls(&self) -> usize {
		self.inner.lock().unwrap().lb_calls
	}
}

#[async_trait]
impl MetadataSource for StaticMetadata {
	async fn list(&self) -> Result<Vec<InstanceMetadata>, MetadataError> {
		let mut inner = self.inner.lock().unwrap();
		inner.list_calls += 1;
		if inner.failing_lists > 0 {
			inner.failing_lists -= 1;
			return Err(MetadataError::List("metadata server unavailable".to_string()));
		}
		Ok(inner.instances.clone())
	}

	async fn load_balancer_endpoint(&self) -> Result<(String, u16), MetadataError> {
		let mut inner = self.inner.lock().unwrap();
		inner.lb_calls += 1;
		inner
			.load_balancer
			.clone()
			.ok_or_else(|| MetadataError::LoadBalancer("no load balancer".to_string()))
	}
}

#[derive(Clone, Debug)]
pub enum Outcome {
	Ticket(String, String),
	RpcError,
	DialError,
	Hang,
}

impl Outcome {
	pub fn ticket(key: &str, secret: &str) -> Self {
		Outcome::Ticket(key.to_string(), secret.to_string())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
	Dial(String),
	Issue { endpoint: String, disk_uuid: String },
	Close(String),
}

/// Dialer whose per-endpoint behavior is scripted. Unknown endpoints fail
/// to dial.
#[derive(Clone, Default)]
pub struct MockDialer {
	outcomes: Arc<Mutex<HashMap<String, Outcome>>>,
	calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockDialer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(self, endpoint: &str, outcome: Outcome) -> Self {
		self
			.outcomes
			.lock()
			.unwrap()
			.insert(endpoint.to_string(), outcome);
		self
	}

	pub fn calls(&self) -> Vec<MockCall> {
		self.calls.lock().unwrap().clone()
	}

	pub fn dials(&self) -> Vec<String> {
		self
			.calls()
			.into_iter()
			.filter_map(|c| match c {
				MockCall::Dial(endpoint) => Some(endpoint),
				_ => None,
			})
			.collect()
	}

	fn record(&self, call: MockCall) {
		self.calls.lock().unwrap().push(call);
	}
}

#[async_trait]
impl SecureDialer for MockDialer {
	async fn dial(&self, endpoint: &str) -> Result<Box<dyn RejoinConnection>, DialError> {
		self.record(MockCall::Dial(endpoint.to_string()));

		let outcome = self
			.outcomes
			.lock()
			.unwrap()
			.get(endpoint)
			.cloned()
			.unwrap_or(Outcome::DialError);

		if let Outcome::DialError = outcome {
			return Err(DialError::Connect {
				endpoint: endpoint.to_string(),
				reason: "connection refused".to_string(),
			});
		}

		Ok(Box::new(MockConnection {
			dialer: self.clone(),
			endpoint: endpoint.to_string(),
			outcome,
		}))
	}
}

struct MockConnection {
	dialer: MockDialer,
	endpoint: String,
	outcome: Outcome,
}

#[async_trait]
impl RejoinConnection for MockConnection {
	async fn issue_rejoin_ticket(
		&mut self,
		request: &IssueRejoinTicketRequest,
	) -> Result<RejoinTicket, DialError> {
		self.dialer.record(MockCall::Issue {
			endpoint: self.endpoint.clone(),
			disk_uuid: request.disk_uuid.clone(),
		});

		match &self.outcome {
			Outcome::Ticket(key, secret) => Ok(RejoinTicket::new(
				SecretBytes::new(key.as_bytes().to_vec()),
				SecretBytes::new(secret.as_bytes().to_vec()),
			)),
			Outcome::Hang => std::future::pending().await,
			Outcome::RpcError | Outcome::DialError => {
				Err(DialError::Rpc("service unavailable".to_string()))
			}
		}
	}

	async fn close(&mut self) -> Result<(), DialError> {
		self.dialer.record(MockCall::Close(self.endpoint.clone()));
		Ok(())
	}
}

pub fn key_of(ticket: &RejoinTicket) -> String {
	String::from_utf8(ticket.state_disk_key().expose().clone()).unwrap()
}

pub fn secret_of(ticket: &RejoinTicket) -> String {
	String::from_utf8(ticket.measurement_secret().expose().clone()).unwrap()
}
