//! Hardware-independent core library for tomo-rs
//!
//! This crate contains all platform-agnostic logic for the tomo electrode
//! scanning device: the electrode drive-state model, pairwise scan plan,
//! acquisition sweep, station-link bring-up state machine, record wire
//! encoding, and configuration validation.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3)
//! and desktop hosts (for tests).

#![no_std]

pub mod config;
pub mod electrode;
pub mod link;
pub mod record;
pub mod scan;
pub mod scanner;
