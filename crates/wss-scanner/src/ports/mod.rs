//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** what the scanner exposes to its host
//! - **Driven Ports (Outbound):** what the scanner requires from adapters

pub mod inbound;
pub mod outbound;

pub use inbound::ScannerApi;
pub use outbound::{ConfigProvider, NeighborStream, Overlay, RandomSource, SnapshotStore};
