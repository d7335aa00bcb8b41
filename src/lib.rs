//! Climate gateway firmware library.
//!
//! Exposes the control core and its adapters for the bench binary and
//! integration tests. ESP-IDF-specific code is guarded by
//! `#[cfg(feature = "espidf")]` within each adapter.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod safety;
pub mod schedule;
pub mod sensors;
pub mod telemetry;
