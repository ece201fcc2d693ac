// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Rejoin client for restarted nodes.
//!
//! A node whose state disk was sealed before a restart has to recover the
//! disk key from a control-plane node. The client discovers candidate
//! join-service endpoints from cloud metadata, asks them one at a time over
//! an attestation-gated transport, and stops at the first ticket.
//!
//! # Example
//!
//! ```ignore
//! use keel_rejoin::{HttpDialer, RejoinClient, RejoinConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let mut client = RejoinClient::new(HttpDialer::new(atls_client), node_info, metadata)
//!     .with_config(RejoinConfig::from_env()?);
//! let cancel = CancellationToken::new();
//! if let Some(ticket) = client.start(&cancel, &disk_uuid).await {
//!     unlock_state_disk(ticket.state_disk_key(), ticket.measurement_secret())?;
//! }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod dialer;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod metadata;
pub mod ticket;

pub use client::RejoinClient;
pub use clock::{Clock, ManualClock, Ticker, TokioClock};
pub use config::{RejoinConfig, DEFAULT_INTERVAL, DEFAULT_TIMEOUT, JOIN_SERVICE_NODE_PORT};
pub use dialer::{RejoinConnection, SecureDialer};
pub use endpoints::{control_plane_endpoints, join_endpoint, remove_self_from_endpoints, split_endpoint};
pub use error::{ConfigError, DialError, MetadataError, RejoinError, Result};
pub use http::{HttpDialer, HttpDialerConfig, REJOIN_TICKET_PATH};
pub use metadata::{InstanceMetadata, MetadataSource, Role};
pub use ticket::{IssueRejoinTicketRequest, RejoinTicket};
