//! objsync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `UploadSession`, `PartUploadRequest`, `PartListing`
//! - **Port definitions** - Traits for adapters: `Destination`,
//!   `StillWritingProbe`, `ProgressListener`
//! - **Configuration** - Typed YAML configuration with defaults
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure upload-planning logic with no I/O.
//! Ports define trait interfaces that adapter crates implement; the engine
//! crate drives the domain through those ports.

pub mod config;
pub mod domain;
pub mod ports;
