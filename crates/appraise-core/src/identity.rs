//! Author identity resolution.
//!
//! Determines the `requester` / `author` recorded on new notes.

use anyhow::{bail, Result};
use std::env;

use crate::repo::Repository;

/// Environment variable overriding the author identity.
pub const AUTHOR_ENV: &str = "APPRAISE_AUTHOR";

/// Get the identity to record on new notes.
///
/// Resolution order:
/// 1. Explicit override (`--author`)
/// 2. `APPRAISE_AUTHOR` environment variable
/// 3. `git config user.email` of the repository
pub fn resolve_author(explicit: Option<&str>, repo: &dyn Repository) -> Result<String> {
    if let Some(name) = explicit.map(str::trim).filter(|name| !name.is_empty()) {
        return Ok(name.to_string());
    }

    if let Ok(name) = env::var(AUTHOR_ENV) {
        if !name.trim().is_empty() {
            return Ok(name.trim().to_string());
        }
    }

    let email = repo.user_email()?;
    if email.trim().is_empty() {
        bail!("Author identity required. Use --author <email>, set {AUTHOR_ENV}, or configure git user.email.");
    }
    Ok(email.trim().to_string())
}
