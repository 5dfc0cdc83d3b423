//! Pure pricing primitives for securities-locate borrow fees.
//!
//! This crate holds everything that can be computed without I/O: the
//! decimal number types, the domain model shared between the reference
//! store and the feed clients, and the [`kernel`] itself. The binary in
//! `src/bin/pricing-service` wires this up to HTTP, a cache tier, the
//! external feed clients, and a Postgres-backed reference store.

pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod kernel;
pub mod number;

/// Git SHA baked in at build time by CI, or a placeholder for local builds.
pub fn build_version() -> &'static str {
    const BUILD_VERSION: Option<&str> = option_env!("GITHUB_SHA");
    BUILD_VERSION.unwrap_or("local build")
}
