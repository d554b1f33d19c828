//! # Adapters Layer
//!
//! Concrete implementations of the outbound ports.
//!
//! - `config` - static and TOML configuration providers
//! - `json_store` - JSON snapshot files on disk
//! - `memory` - scripted overlay and in-memory store for tests
//! - `random` - OS-seeded and fixed random sources
//! - `libp2p` - live Kademlia overlay (feature `libp2p`)

pub mod config;
pub mod json_store;
pub mod memory;
pub mod random;

#[cfg(feature = "libp2p")]
pub mod libp2p;

pub use config::{StaticConfigProvider, TomlConfigProvider};
pub use json_store::JsonFileStore;
pub use memory::{InMemoryOverlay, InMemorySnapshotStore};
pub use random::{FixedRandomSource, OsRandomSource};

#[cfg(feature = "libp2p")]
pub use self::libp2p::Libp2pOverlay;
