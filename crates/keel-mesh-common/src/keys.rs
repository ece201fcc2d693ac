// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Curve25519 keys for the mesh interface.
//!
//! Keys use padded standard base64, the encoding `wg(8)` prints and accepts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keel_common_secret::SecretString;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum KeyError {
	#[error("invalid key length: expected 32 bytes, got {0}")]
	InvalidLength(usize),

	#[error("invalid base64 encoding: {0}")]
	InvalidBase64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, KeyError>;

fn to_array(bytes: &[u8]) -> Result<[u8; KEY_LEN]> {
	<[u8; KEY_LEN]>::try_from(bytes).map_err(|_| KeyError::InvalidLength(bytes.len()))
}

fn decode(s: &str) -> Result<[u8; KEY_LEN]> {
	let mut bytes = STANDARD.decode(s.trim())?;
	let arr = to_array(&bytes);
	bytes.zeroize();
	arr
}

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WgPrivateKey {
	bytes: [u8; KEY_LEN],
}

impl WgPrivateKey {
	pub fn generate() -> Self {
		let secret = StaticSecret::random_from_rng(OsRng);
		Self {
			bytes: secret.to_bytes(),
		}
	}

	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self { bytes: decode(s)? })
	}

	pub fn to_base64(&self) -> SecretString {
		SecretString::new(STANDARD.encode(self.bytes))
	}

	pub fn public_key(&self) -> WgPublicKey {
		let secret = StaticSecret::from(self.bytes);
		WgPublicKey::from_bytes(*PublicKey::from(&secret).as_bytes())
	}

	pub fn expose_bytes(&self) -> &[u8; KEY_LEN] {
		&self.bytes
	}
}

impl fmt::Debug for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WgPrivateKey")
			.field("bytes", &"[REDACTED]")
			.finish()
	}
}

impl fmt::Display for WgPrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("[REDACTED]")
	}
}

/// The public half of an interface key. This is the identity the device
/// indexes its peer table by.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WgPublicKey {
	bytes: [u8; KEY_LEN],
}

impl WgPublicKey {
	pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
		Self { bytes }
	}

	pub fn from_base64(s: &str) -> Result<Self> {
		Ok(Self { bytes: decode(s)? })
	}

	pub fn to_base64(&self) -> String {
		STANDARD.encode(self.bytes)
	}

	pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
		&self.bytes
	}
}

impl FromStr for WgPublicKey {
	type Err = KeyError;

	fn from_str(s: &str) -> Result<Self> {
		Self::from_base64(s)
	}
}

impl fmt::Debug for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let b64 = self.to_base64();
		f.debug_tuple("WgPublicKey")
			.field(&format!("{}...", &b64[..8]))
			.finish()
	}
}

impl fmt::Display for WgPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.to_base64())
	}
}

impl Serialize for WgPublicKey {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_base64())
	}
}

impl<'de> Deserialize<'de> for WgPublicKey {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::from_base64(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_base64_is_padded_like_wg() {
		let key = WgPublicKey::from_bytes([7; KEY_LEN]);
		let b64 = key.to_base64();
		assert_eq!(b64.len(), 44);
		assert!(b64.ends_with('='));
	}

	#[test]
	fn test_private_key_restored_from_base64_derives_same_public_key() {
		let private = WgPrivateKey::generate();
		let b64 = private.to_base64();
		let restored = WgPrivateKey::from_base64(b64.expose()).unwrap();
		assert_eq!(private.public_key(), restored.public_key());
	}

	#[test]
	fn test_from_base64_rejects_garbage() {
		assert!(WgPublicKey::from_base64("not base64!").is_err());
		assert!(matches!(
			WgPublicKey::from_base64("AQID"),
			Err(KeyError::InvalidLength(3))
		));
	}

	#[test]
	fn test_public_key_parses_from_str() {
		let key = WgPublicKey::from_bytes([9; KEY_LEN]);
		let parsed: WgPublicKey = key.to_base64().parse().unwrap();
		assert_eq!(parsed, key);
	}

	#[test]
	fn test_public_key_debug_shows_prefix_only() {
		let key = WgPublicKey::from_bytes([3; KEY_LEN]);
		let debug = format!("{:?}", key);
		assert!(debug.contains("..."));
		assert!(!debug.contains(&key.to_base64()));
	}

	#[test]
	fn test_public_key_serde() {
		let key = WgPublicKey::from_bytes([5; KEY_LEN]);
		let json = serde_json::to_string(&key).unwrap();
		assert_eq!(json, format!("\"{}\"", key.to_base64()));
		let restored: WgPublicKey = serde_json::from_str(&json).unwrap();
		assert_eq!(restored, key);
	}

	proptest! {
		#[test]
		fn test_private_key_formatting_never_leaks(seed in prop::array::uniform32(any::<u8>())) {
			let private = WgPrivateKey::from_bytes(seed);
			let b64 = STANDARD.encode(seed);

			let debug = format!("{:?}", private);
			prop_assert!(!debug.contains(&b64));
			prop_assert_eq!(format!("{}", private), "[REDACTED]");
		}
	}
}
