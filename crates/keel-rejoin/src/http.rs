// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rejoin transport over HTTPS.
//!
//! The [`reqwest::Client`] is built by the caller with the attestation
//! verifier installed as its TLS configuration; this module only speaks the
//! rejoin ticket exchange on top of it.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keel_common_secret::{SecretBytes, SecretString};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::dialer::{RejoinConnection, SecureDialer};
use crate::endpoints::split_endpoint;
use crate::error::DialError;
use crate::ticket::{IssueRejoinTicketRequest, RejoinTicket};

pub const REJOIN_TICKET_PATH: &str = "/v1/rejoin-ticket";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpDialerConfig {
	/// Use plain `http://`. Only for tests against a local server.
	pub allow_insecure: bool,
}

impl HttpDialerConfig {
	pub fn from_env() -> Self {
		let allow_insecure = std::env::var("KEEL_REJOIN_ALLOW_INSECURE")
			.map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
			.unwrap_or(false);
		Self { allow_insecure }
	}
}

#[derive(Clone)]
pub struct HttpDialer {
	client: Client,
	config: HttpDialerConfig,
}

impl HttpDialer {
	pub fn new(client: Client) -> Self {
		Self::with_config(client, HttpDialerConfig::default())
	}

	pub fn with_config(client: Client, config: HttpDialerConfig) -> Self {
		Self { client, config }
	}

	pub fn ticket_url(&self, endpoint: &str) -> Result<Url, DialError> {
		split_endpoint(endpoint).ok_or_else(|| DialError::InvalidEndpoint(endpoint.to_string()))?;
		let scheme = if self.config.allow_insecure {
			"http"
		} else {
			"https"
		};
		Ok(Url::parse(&format!("{scheme}://{endpoint}"))?.join(REJOIN_TICKET_PATH)?)
	}
}

impl std::fmt::Debug for HttpDialer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HttpDialer")
			.field("allow_insecure", &self.config.allow_insecure)
			.finish()
	}
}

#[async_trait]
impl SecureDialer for HttpDialer {
	#[instrument(skip(self))]
	async fn dial(&self, endpoint: &str) -> Result<Box<dyn RejoinConnection>, DialError> {
		let url = self.ticket_url(endpoint)?;
		debug!(%url, "dialing join service");
		Ok(Box::new(HttpConnection {
			client: self.client.clone(),
			endpoint: endpoint.to_string(),
			url: Some(url),
		}))
	}
}

struct HttpConnection {
	client: Client,
	endpoint: String,
	url: Option<Url>,
}

#[derive(Deserialize)]
struct TicketBody {
	state_disk_key: SecretString,
	measurement_secret: SecretString,
}

fn decode(field: &str, value: &SecretString) -> Result<SecretBytes, DialError> {
	STANDARD
		.decode(value.expose())
		.map(SecretBytes::new)
		.map_err(|e| DialError::Decode(format!("{field}: {e}")))
}

#[async_trait]
impl RejoinConnection for HttpConnection {
	async fn issue_rejoin_ticket(
		&mut self,
		request: &IssueRejoinTicketRequest,
	) -> Result<RejoinTicket, DialError> {
		let url = self.url.clone().ok_or(DialError::Closed)?;

		let resp = self
			.client
			.post(url)
			.json(request)
			.send()
			.await
			.map_err(|e| {
				if e.is_connect() {
					DialError::Connect {
						endpoint: self.endpoint.clone(),
						reason: e.to_string(),
					}
				} else {
					DialError::Http(e)
				}
			})?;

		let status = resp.status();
		if !status.is_success() {
			let body = resp.text().await.unwrap_or_default();
			return Err(DialError::Rpc(format!("{status}: {}", body.trim())));
		}

		let body: TicketBody = resp.json().await?;
		Ok(RejoinTicket::new(
			decode("state_disk_key", &body.state_disk_key)?,
			decode("measurement_secret", &body.measurement_secret)?,
		))
	}

	async fn close(&mut self) -> Result<(), DialError> {
		self.url = None;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn insecure() -> HttpDialer {
		HttpDialer::with_config(
			Client::new(),
			HttpDialerConfig {
				allow_insecure: true,
			},
		)
	}

	fn request() -> IssueRejoinTicketRequest {
		IssueRejoinTicketRequest {
			disk_uuid: "uuid".to_string(),
		}
	}

	#[test]
	fn test_ticket_url_is_https_by_default() {
		let dialer = HttpDialer::new(Client::new());
		let url = dialer.ticket_url("192.0.2.1:30090").unwrap();
		assert_eq!(url.as_str(), "https://192.0.2.1:30090/v1/rejoin-ticket");
	}

	#[test]
	fn test_ticket_url_ipv6() {
		let dialer = HttpDialer::new(Client::new());
		let url = dialer.ticket_url("[2001:db8::1]:30090").unwrap();
		assert_eq!(url.as_str(), "https://[2001:db8::1]:30090/v1/rejoin-ticket");
	}

	#[tokio::test]
	async fn test_dial_rejects_endpoint_without_port() {
		let result = HttpDialer::new(Client::new()).dial("192.0.2.1").await;
		assert!(matches!(result, Err(DialError::InvalidEndpoint(_))));
	}

	#[tokio::test]
	async fn test_issues_ticket() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(REJOIN_TICKET_PATH))
			.and(body_json(json!({ "disk_uuid": "uuid" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"state_disk_key": STANDARD.encode("disk-key"),
				"measurement_secret": STANDARD.encode("measurement-secret"),
			})))
			.expect(1)
			.mount(&server)
			.await;

		let mut conn = insecure().dial(&server.address().to_string()).await.unwrap();
		let ticket = conn.issue_rejoin_ticket(&request()).await.unwrap();
		conn.close().await.unwrap();

		assert_eq!(ticket.state_disk_key().expose(), b"disk-key");
		assert_eq!(ticket.measurement_secret().expose(), b"measurement-secret");
	}

	#[tokio::test]
	async fn test_error_status_is_rpc_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path(REJOIN_TICKET_PATH))
			.respond_with(ResponseTemplate::new(403).set_body_string("attestation rejected"))
			.mount(&server)
			.await;

		let mut conn = insecure().dial(&server.address().to_string()).await.unwrap();
		let err = conn.issue_rejoin_ticket(&request()).await.unwrap_err();

		match err {
			DialError::Rpc(msg) => assert!(msg.contains("attestation rejected")),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn test_bad_base64_is_decode_error() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"state_disk_key": "not base64!",
				"measurement_secret": STANDARD.encode("measurement-secret"),
			})))
			.mount(&server)
			.await;

		let mut conn = insecure().dial(&server.address().to_string()).await.unwrap();
		let err = conn.issue_rejoin_ticket(&request()).await.unwrap_err();
		assert!(matches!(err, DialError::Decode(msg) if msg.starts_with("state_disk_key")));
	}

	#[tokio::test]
	async fn test_closed_connection_refuses_requests() {
		let server = MockServer::start().await;
		let mut conn = insecure().dial(&server.address().to_string()).await.unwrap();
		conn.close().await.unwrap();

		let err = conn.issue_rejoin_ticket(&request()).await.unwrap_err();
		assert!(matches!(err, DialError::Closed));
		assert!(server.received_requests().await.unwrap_or_default().is_empty());
	}

	#[test]
	fn test_debug_hides_client() {
		let debug = format!("{:?}", HttpDialer::new(Client::new()));
		assert!(debug.contains("allow_insecure"));
	}
}
