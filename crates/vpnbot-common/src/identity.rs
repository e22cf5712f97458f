// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_PEER_NAME_LEN: usize = 32;

/// Labels the front end offers when asking which device a config is for.
pub const SUGGESTED_PEER_NAMES: &[&str] = &["phone", "laptop", "tablet", "desktop", "router"];

/// Chat platform user id. Assigned externally and trusted as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn get(self) -> i64 {
		self.0
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<i64> for UserId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
	#[error("peer name must not be empty")]
	Empty,

	#[error("peer name is longer than {MAX_PEER_NAME_LEN} characters")]
	TooLong,

	#[error("peer name contains invalid character {0:?}")]
	InvalidChar(char),
}

/// Label a user gives one of their peers. Unique per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PeerName(String);

impl PeerName {
	pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
		let name = name.into();
		if name.is_empty() {
			return Err(NameError::Empty);
		}
		if name.chars().count() > MAX_PEER_NAME_LEN {
			return Err(NameError::TooLong);
		}
		if let Some(c) = name
			.chars()
			.find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
		{
			return Err(NameError::InvalidChar(c));
		}
		Ok(Self(name))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_inner(self) -> String {
		self.0
	}

	pub fn is_suggested(&self) -> bool {
		SUGGESTED_PEER_NAMES.contains(&self.0.as_str())
	}
}

impl fmt::Display for PeerName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for PeerName {
	type Err = NameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl AsRef<str> for PeerName {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl<'de> Deserialize<'de> for PeerName {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::new(s).map_err(serde::de::Error::custom)
	}
}
