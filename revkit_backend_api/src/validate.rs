//! Argument checks shared by both backends, applied before any work starts.

use crate::{VcsError, VcsResult};

/// Trimmed commit message, rejecting blank input.
///
/// # Errors
///
/// Returns [`VcsError::InvalidInput`] for an empty or whitespace-only message.
pub fn commit_message(message: &str) -> VcsResult<&str> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(VcsError::invalid("Commit message cannot be empty"));
    }
    Ok(trimmed)
}

/// Reject an empty path list or blank entries.
///
/// # Errors
///
/// Returns [`VcsError::InvalidInput`] when no usable path is given.
pub fn paths(paths: &[String]) -> VcsResult<()> {
    if paths.is_empty() {
        return Err(VcsError::invalid("No paths specified"));
    }
    if paths.iter().any(|path| path.trim().is_empty()) {
        return Err(VcsError::invalid("Paths cannot be blank"));
    }
    Ok(())
}

/// Reject revision expressions that cannot name a single commit.
///
/// # Errors
///
/// Returns [`VcsError::InvalidInput`] for blank, option-like, ranged or
/// whitespace-containing expressions.
pub fn revision(revision: &str) -> VcsResult<()> {
    if revision.is_empty() {
        return Err(VcsError::invalid("Revision cannot be empty"));
    }
    if revision.starts_with('-') {
        return Err(VcsError::invalid(format!(
            "Revision must not start with '-': {revision}"
        )));
    }
    if revision.contains("..") {
        return Err(VcsError::invalid(format!(
            "Revision ranges are not accepted: {revision}"
        )));
    }
    if revision
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(VcsError::invalid(format!("Malformed revision: {revision:?}")));
    }
    Ok(())
}

/// Reject names git would refuse for a tag, remote or branch reference.
///
/// # Errors
///
/// Returns [`VcsError::InvalidInput`] when `name` is not a valid ref name.
pub fn ref_name(kind: &str, name: &str) -> VcsResult<()> {
    const FORBIDDEN: &[char] = &['~', '^', ':', '?', '*', '[', '\\'];

    let malformed = name.is_empty()
        || name.starts_with('-')
        || name.starts_with('/')
        || name.ends_with('/')
        || name.ends_with('.')
        || name.ends_with(".lock")
        || name.contains("..")
        || name.contains("@{")
        || name == "@"
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c));
    if malformed {
        return Err(VcsError::invalid(format!("Invalid {kind} name: {name:?}")));
    }
    Ok(())
}
