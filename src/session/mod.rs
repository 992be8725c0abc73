//! Session-oriented generation API.

/// Bounded parallel generation of every edition configuration.
pub mod generate_session;
