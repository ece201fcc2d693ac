// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
	#[error("listing instances failed: {0}")]
	List(String),

	#[error("load balancer lookup failed: {0}")]
	LoadBalancer(String),
}

#[derive(Debug, Error)]
pub enum DialError {
	#[error("invalid endpoint {0:?}, expected host:port")]
	InvalidEndpoint(String),

	#[error("connecting to {endpoint} failed: {reason}")]
	Connect { endpoint: String, reason: String },

	#[error("rejoin ticket rpc failed: {0}")]
	Rpc(String),

	#[error("connection already closed")]
	Closed,

	#[error("malformed rejoin ticket: {0}")]
	Decode(String),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("URL parse error: {0}")]
	Url(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum RejoinError {
	#[error("metadata error: {0}")]
	Metadata(#[from] MetadataError),

	#[error("dial error: {0}")]
	Dial(#[from] DialError),

	#[error("timed out after {0:?}")]
	Timeout(Duration),

	#[error("all {attempted} join endpoints failed")]
	Exhausted { attempted: usize },

	#[error("cancelled")]
	Cancelled,
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("parse error: {0}")]
	Parse(String),
}

pub type Result<T> = std::result::Result<T, RejoinError>;
