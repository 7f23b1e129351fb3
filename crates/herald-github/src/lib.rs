//! GitHub implementation of Herald's [`herald_core::CodeHost`].

mod client;
mod error;
mod payloads;

pub use client::{GitHub, split_repository};
pub use error::{GitHubError, Result};
