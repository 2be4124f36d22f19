//! Core types and trait definitions for ParkQuest.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the challenge-assignment state machine ([`engine::AssignmentEngine`]), the
//! scoring projection, and the traits storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod challenge;
pub mod clock;
pub mod engine;
pub mod error;
pub mod post;
pub mod repo;
pub mod scoring;
pub mod store;
pub mod submission;
pub mod user;

pub use error::{Error, Result};
