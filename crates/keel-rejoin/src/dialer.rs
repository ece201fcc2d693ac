// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Attestation-gated transport to the join service.
//!
//! Attestation is the dialer's business. A peer that fails validation shows
//! up here as an ordinary [`DialError`].

use async_trait::async_trait;

use crate::error::DialError;
use crate::ticket::{IssueRejoinTicketRequest, RejoinTicket};

/// A connection to one join service, used for a single ticket request.
///
/// The client calls [`close`](RejoinConnection::close) after the request on
/// every outcome, including a timed out or cancelled request.
#[async_trait]
pub trait RejoinConnection: Send {
	async fn issue_rejoin_ticket(
		&mut self,
		request: &IssueRejoinTicketRequest,
	) -> Result<RejoinTicket, DialError>;

	async fn close(&mut self) -> Result<(), DialError>;
}

#[async_trait]
pub trait SecureDialer: Send + Sync {
	/// Opens a connection to `endpoint` (`host:port`).
	async fn dial(&self, endpoint: &str) -> Result<Box<dyn RejoinConnection>, DialError>;
}
