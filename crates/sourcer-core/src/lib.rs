//! Core types and trait definitions for the sourcer candidate pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the entity model, the [`store::CandidateStore`] abstraction, the traits for
//! every external collaborator, and the pure algorithms that the pipeline
//! composes (URL canonicalisation, payload normalisation, contact extraction,
//! continuation planning).

// We intentionally use native `async fn` in traits for the store (stabilised in
// Rust 1.75). Collaborator traits that need dynamic dispatch use `async_trait`.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod candidate;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod planning;
pub mod profile_url;
pub mod provider;
pub mod raw;
pub mod scoring;
pub mod search;
pub mod store;
pub mod workflow;

pub use error::{Error, Result};
