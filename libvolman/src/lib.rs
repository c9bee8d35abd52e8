//! # libvolman — Volume plugin manager
//!
//! `libvolman` implements a volume-plugin manager: it discovers third-party
//! volume driver plugins advertised through spec files on disk, keeps a
//! registry of healthy drivers fresh with a background syncer, and exposes
//! mount/unmount/create operations to callers both in-process and over HTTP.
//! It follows the usual conventions of this codebase (Tokio async runtime,
//! `tracing` for observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Manager API wire types: list/mount/unmount/create bodies. |
//! | [`error`] | [`VolmanError`] enum covering all failure modes. |
//! | [`address`] | Canonicalization of raw plugin addresses. |
//! | [`scanner`] | Spec-file discovery across driver directories. |
//! | [`factory`] | [`DriverFactory`] — from spec file to live driver handle. |
//! | [`registry`] | Concurrent registry of activated drivers. |
//! | [`syncer`] | Background loop republishing the registry each tick. |
//! | [`client`] | [`Manager`] trait and the in-process [`LocalClient`]. |
//! | [`voldriver`] | Driver plugin protocol: trait, wire types, HTTP client/server. |
//! | [`volhttp`] | Manager HTTP router and the remote manager client. |

pub mod address;
pub mod client;
pub mod error;
pub mod factory;
pub mod registry;
pub mod scanner;
pub mod syncer;
pub mod types;
pub mod voldriver;
pub mod volhttp;

// Re-export the most commonly used items at crate root for convenience.
pub use client::{LocalClient, Manager};
pub use error::VolmanError;
pub use factory::{DiskDriverFactory, DriverFactory, RemoteClientFactory};
pub use registry::{DriverEntry, DriverRegistry};
pub use scanner::{DriverScanner, DriverSpec, SpecKind};
pub use syncer::{DriverSyncer, SyncerHandle};
pub use voldriver::Driver;
