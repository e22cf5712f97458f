// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;
use vpnbot_common::{IpError, NameError, UserId};
use vpnbot_db::DbError;

#[derive(Error, Debug)]
pub enum ProvisionError {
	#[error("a peer named {name} already exists")]
	DuplicateName { name: String },

	#[error("no peer named {name}")]
	NotFound { name: String },

	#[error("peer limit of {limit} reached")]
	QuotaExceeded { limit: u32 },

	#[error("tunnel address space exhausted")]
	AddressSpaceExhausted,

	#[error("invalid peer name: {0}")]
	InvalidName(#[from] NameError),

	#[error("user {0} is not registered")]
	UnknownUser(UserId),

	#[error("storage error: {0}")]
	Storage(DbError),

	#[error("internal error: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Who has to act on an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The request can be corrected by the user.
	CallerError,
	/// The deployment needs attention (e.g. a bigger pool).
	OperatorError,
	InternalError,
}

impl ProvisionError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			ProvisionError::DuplicateName { .. }
			| ProvisionError::NotFound { .. }
			| ProvisionError::QuotaExceeded { .. }
			| ProvisionError::InvalidName(_)
			| ProvisionError::UnknownUser(_) => ErrorKind::CallerError,
			ProvisionError::AddressSpaceExhausted => ErrorKind::OperatorError,
			ProvisionError::Storage(_) | ProvisionError::Internal(_) => ErrorKind::InternalError,
		}
	}
}

impl From<DbError> for ProvisionError {
	fn from(e: DbError) -> Self {
		match e {
			DbError::LimitReached { limit } => ProvisionError::QuotaExceeded { limit },
			DbError::AddressPool(IpError::Exhausted(_)) => ProvisionError::AddressSpaceExhausted,
			DbError::AddressPool(other) => ProvisionError::Internal(format!("address pool: {other}")),
			DbError::AddressTaken(address) => {
				ProvisionError::Internal(format!("tunnel address {address} is already allocated"))
			}
			other => ProvisionError::Storage(other),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::net::Ipv4Addr;

	#[test]
	fn limit_and_exhaustion_are_translated() {
		let quota: ProvisionError = DbError::LimitReached { limit: 5 }.into();
		assert!(matches!(quota, ProvisionError::QuotaExceeded { limit: 5 }));
		assert_eq!(quota.kind(), ErrorKind::CallerError);

		let exhausted: ProvisionError =
			DbError::AddressPool(IpError::Exhausted(Ipv4Addr::new(10, 0, 0, 254))).into();
		assert!(matches!(exhausted, ProvisionError::AddressSpaceExhausted));
		assert_eq!(exhausted.kind(), ErrorKind::OperatorError);
	}

	#[test]
	fn held_address_is_not_a_duplicate_name() {
		let err: ProvisionError = DbError::AddressTaken(Ipv4Addr::new(10, 0, 0, 3)).into();
		assert!(matches!(err, ProvisionError::Internal(ref m) if m.contains("10.0.0.3")));
		assert_eq!(err.kind(), ErrorKind::InternalError);
	}

	#[test]
	fn driver_errors_are_internal() {
		let err: ProvisionError = DbError::Internal("bad row".to_string()).into();
		assert!(matches!(err, ProvisionError::Storage(_)));
		assert_eq!(err.kind(), ErrorKind::InternalError);
	}
}
