//! Input validation for administrative member payloads.
//!
//! The domain doubles as the `source` value embedded in backlink markers, so
//! it has to be a bare host that round-trips through URL parsing unchanged.

use thiserror::Error;
use url::Url;

use crate::member::{MemberUpdate, NewMember};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("Invalid domain '{0}': expected a bare host without scheme or path")]
    InvalidDomain(String),

    #[error("Invalid path '{0}': must start with '/'")]
    InvalidPath(String),
}

/// Validate a creation payload
pub fn validate_new_member(member: &NewMember) -> Result<(), ValidationError> {
    validate_label("name", &member.name)?;
    validate_label("author", &member.author)?;
    validate_domain(&member.domain)?;
    validate_path(&member.path)
}

/// Validate the fields present in an update payload
pub fn validate_update(update: &MemberUpdate) -> Result<(), ValidationError> {
    if let Some(name) = &update.name {
        validate_label("name", name)?;
    }
    if let Some(author) = &update.author {
        validate_label("author", author)?;
    }
    if let Some(domain) = &update.domain {
        validate_domain(domain)?;
    }
    if let Some(path) = &update.path {
        validate_path(path)?;
    }
    Ok(())
}

fn validate_label(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

/// A domain is valid when `http://<domain>/` parses back to the same authority
pub fn validate_domain(domain: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidDomain(domain.to_string());

    if domain.is_empty() || domain.chars().any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@')) {
        return Err(invalid());
    }

    let url = Url::parse(&format!("http://{domain}/")).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    if authority.eq_ignore_ascii_case(domain) { Ok(()) } else { Err(invalid()) }
}

/// Empty paths are accepted and stored as `/`
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() || (path.starts_with('/') && !path.chars().any(char::is_whitespace)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPath(path.to_string()))
    }
}
