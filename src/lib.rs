//! # SBUS Bridge Library
//!
//! Decode the Futaba S.bus RC receiver protocol and republish channel data.
//!
//! This library provides the core functionality for recovering frames from
//! an S.bus byte stream, extracting the packed 11-bit channel values, and
//! publishing channel reports to in-process consumers.

pub mod clock;
pub mod config;
pub mod error;
pub mod sbus;
pub mod serial;
pub mod telemetry;
