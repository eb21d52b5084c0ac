//! The sticky partition balance strategy for Kafka consumer groups, as a
//! pure function.
//!
//! Given the members of a group and the partitions the client knows of,
//! [`balance`] produces an assignment in which every subscribed partition
//! belongs to exactly one member, partition counts differ by at most one
//! wherever the subscription graph permits, and members keep as much of
//! their previous assignment as balance allows. The previous assignment is
//! reconstructed from the opaque user data each member sends when joining
//! (see [`protocol::messages`]); conflicting claims are settled by the
//! KIP-341 generation.
//!
//! The group protocol itself -- finding the coordinator, join/sync,
//! heartbeats, metadata -- is out of scope: this crate is the strategy a
//! group leader runs in between.
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use kafka_sticky::{balance, GroupMember};
//!
//! let members = vec![
//!     GroupMember {
//!         id: "a".to_string(),
//!         version: 0,
//!         topics: vec!["orders".to_string()],
//!         user_data: vec![],
//!     },
//!     GroupMember {
//!         id: "b".to_string(),
//!         version: 0,
//!         topics: vec!["orders".to_string()],
//!         user_data: vec![],
//!     },
//! ];
//! let topics = BTreeMap::from([("orders".to_string(), vec![0, 1, 2, 3])]);
//!
//! let plan = balance(members, &topics);
//! assert_eq!(plan["a"]["orders"], vec![0, 2]);
//! assert_eq!(plan["b"]["orders"], vec![1, 3]);
//! ```
#![deny(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod protocol;
pub mod sticky;

pub use sticky::{balance, GroupMember, Plan, DEFAULT_GENERATION};
