//! # S.bus Protocol Module
//!
//! Implementation of the Futaba S.bus receiver protocol.
//!
//! This module handles:
//! - Frame synchronization over an unframed byte stream (timing-gap heuristic)
//! - Channel extraction via the 16x3 bit-pick decoder matrix
//! - Failsafe / signal-lost detection
//! - Publishing channel reports to consumers

pub mod decoder;
pub mod protocol;
pub mod receiver;
