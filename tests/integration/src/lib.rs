//! Integration test utilities for huddle
//!
//! This crate provides a hosted server harness and a UDP test client that
//! speaks the wire protocol, for end-to-end tests over loopback.

pub mod helpers;

pub use helpers::*;
