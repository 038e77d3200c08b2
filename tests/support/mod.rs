//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod recording;
pub mod socket_guard;
