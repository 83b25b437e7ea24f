//! Lowkey Core - Domain logic for the hybrid directory monitor
//!
//! This crate contains the types and pure logic shared by every other
//! lowkey crate:
//! - **Domain entities** - `FileSignature`, `Change`, `Manifest`, `Heartbeat`
//! - **Signature cache** - thread-safe path → signature map with
//!   single-critical-section change decisions
//! - **Ignore classifier** - bloom-filter pre-check plus exact glob matching
//! - **State paths** - platform-aware state directory resolution
//!
//! # Architecture
//!
//! Nothing in this crate performs watching, scheduling, or persistence
//! beyond reading file metadata. The watch engine, stores, and daemon
//! layers build on these types without this crate depending on them.

pub mod cache;
pub mod domain;
pub mod ignore;
pub mod logline;
pub mod paths;

pub use cache::{SignatureCache, SignatureUpdate};
pub use domain::{
    Change, ChangeKind, FileSignature, Heartbeat, Manifest, ManifestDiff, Summary, WatchError,
};
pub use ignore::IgnoreSet;
