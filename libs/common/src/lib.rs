//! Common library for the Riding application
//!
//! This crate provides the shared infrastructure used by the Riding
//! services: PostgreSQL connectivity and the error types around it.

pub mod database;
pub mod error;
