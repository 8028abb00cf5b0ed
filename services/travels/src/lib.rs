//! Travels service for the Riding application
//!
//! Matches riders requesting transportation with available drivers, tracks
//! the resulting travel through its lifecycle and resolves completion via
//! mutual confirmation. Storage is behind trait objects so the engines run
//! the same against PostgreSQL and the in-process backend used by tests.

pub mod config;
pub mod error;
pub mod geo;
pub mod lifecycle;
pub mod matching;
pub mod models;
pub mod notifier;
pub mod routes;
pub mod state;
pub mod store;
pub mod sweeper;
