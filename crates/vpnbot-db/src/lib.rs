// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # vpnbot-db
//!
//! SQLite persistence for users and their peer configurations, via sqlx.
//!
//! Follows the `*Store` trait / `*Repository` struct split: [`PeerStore`]
//! is what the provisioning layer depends on, [`PeerRepository`] is the
//! SQLite implementation holding a `SqlitePool`.
//!
//! | Variant | When |
//! |---------|------|
//! | `Conflict` | Duplicate `(user, name)` |
//! | `AddressTaken` | Tunnel address already held by a live peer |
//! | `LimitReached` | User already holds the maximum number of peers |
//! | `AddressPool` | No address left, or stored data outside the pool |
//! | `Sqlx` | Anything else from the driver |
//! | `Internal` | Unparseable stored data |
//!
//! Lookups return `Result<Option<T>>`; deletes return `Result<bool>`.

pub mod error;
pub mod migrations;
pub mod peer;
pub mod pool;
pub mod testing;
pub mod types;

pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use peer::{PeerRepository, PeerStore};
pub use pool::create_pool;
pub use types::{NewPeer, PeerRecord, UserRecord};
