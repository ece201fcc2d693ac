// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use keel_common_secret::SecretBytes;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRejoinTicketRequest {
	pub disk_uuid: String,
}

/// Key material handed to a restarted node by the control plane.
///
/// Both halves come from one response; there is no way to build a ticket
/// from parts of different responses.
#[derive(Debug, Clone)]
pub struct RejoinTicket {
	state_disk_key: SecretBytes,
	measurement_secret: SecretBytes,
}

impl RejoinTicket {
	pub fn new(state_disk_key: SecretBytes, measurement_secret: SecretBytes) -> Self {
		Self {
			state_disk_key,
			measurement_secret,
		}
	}

	pub fn state_disk_key(&self) -> &SecretBytes {
		&self.state_disk_key
	}

	pub fn measurement_secret(&self) -> &SecretBytes {
		&self.measurement_secret
	}

	pub fn into_parts(self) -> (SecretBytes, SecretBytes) {
		(self.state_disk_key, self.measurement_secret)
	}
}
