//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Registrar substrate:
//! - Relation tags (`Relation`)
//! - Content digests (`Digest`)
//! - Error types (`RegistrarError`, `ErrorKind`)
//!
//! Record structs live in [`crate::records`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// RELATION TAG
// =============================================================================

/// Discriminator naming which record kind a meta entry points at.
///
/// Serialized as the bare variant name, which is also the value the
/// `relation` field of a selector matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    StudentProfile,
    TakenCourseResult,
    CourseCatalogEntry,
}

impl Relation {
    /// All relation kinds in declaration order.
    pub const ALL: [Relation; 3] = [
        Relation::StudentProfile,
        Relation::TakenCourseResult,
        Relation::CourseCatalogEntry,
    ];

    /// The tag as it appears in stored meta entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Relation::StudentProfile => "StudentProfile",
            Relation::TakenCourseResult => "TakenCourseResult",
            Relation::CourseCatalogEntry => "CourseCatalogEntry",
        }
    }

    /// Parse a relation tag, accepting the stored tag or a kebab-case alias
    /// (`profile`, `taken-course`, `catalog`) used on the command line.
    pub fn parse(tag: &str) -> Result<Self, RegistrarError> {
        match tag {
            "StudentProfile" | "profile" | "profiles" => Ok(Relation::StudentProfile),
            "TakenCourseResult" | "taken-course" | "taken-courses" | "taken" => {
                Ok(Relation::TakenCourseResult)
            }
            "CourseCatalogEntry" | "catalog" | "course-catalog" => {
                Ok(Relation::CourseCatalogEntry)
            }
            other => Err(RegistrarError::InvalidInput(format!(
                "unknown relation tag '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DIGEST
// =============================================================================

/// Content digest of a record, rendered as lowercase hex.
///
/// A digest doubles as the storage key of the record it identifies.
/// The empty digest marks a record whose digest has not been computed yet.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Wrap an already-encoded hex digest produced by the canonical hasher.
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    /// Parse a digest supplied at the caller boundary.
    ///
    /// Accepts 32 (128-bit) or 64 (256-bit) lowercase hex characters.
    pub fn parse(raw: &str) -> Result<Self, RegistrarError> {
        let well_formed = matches!(raw.len(), 32 | 64)
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(RegistrarError::InvalidInput(format!(
                "malformed digest '{}': expected 32 or 64 lowercase hex characters",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Get the digest as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the digest has been computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Closed set of failure kinds, for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    SerializationError,
    BackendUnavailable,
    JoinIncomplete,
    InvalidInput,
    Configuration,
}

/// Errors that can occur in the Registrar system.
///
/// - No silent failures
/// - Use `Result<T, RegistrarError>` for fallible operations
/// - Messages name the lookup or step that failed
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// A selector query or digest lookup yielded nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The (owner, subject, digest) triple is already indexed.
    #[error("Record already exists: owner={owner} student_id={student_id} digest={digest}")]
    AlreadyExists {
        owner: String,
        student_id: String,
        digest: Digest,
    },

    /// A stored payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The key-value backend failed; the operation was aborted.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Strict join: a taken course has no matching catalog entry.
    #[error("Transcript join incomplete: no catalog entry for course {0}")]
    JoinIncomplete(String),

    /// Caller-supplied input was rejected before touching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or incompatible with the opened store.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RegistrarError {
    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            RegistrarError::NotFound(_) => ErrorKind::NotFound,
            RegistrarError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            RegistrarError::SerializationError(_) => ErrorKind::SerializationError,
            RegistrarError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            RegistrarError::JoinIncomplete(_) => ErrorKind::JoinIncomplete,
            RegistrarError::InvalidInput(_) => ErrorKind::InvalidInput,
            RegistrarError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Prefix a `NotFound` message with the step that performed the lookup.
    ///
    /// Other kinds pass through unchanged.
    #[must_use]
    pub fn during(self, step: &str) -> Self {
        match self {
            RegistrarError::NotFound(what) => {
                RegistrarError::NotFound(format!("{}: {}", step, what))
            }
            other => other,
        }
    }
}

/// Map any backend failure into `BackendUnavailable`.
pub(crate) fn backend_err<E: fmt::Display>(e: E) -> RegistrarError {
    RegistrarError::BackendUnavailable(e.to_string())
}

/// Map any encode/decode failure into `SerializationError`.
pub(crate) fn serde_err<E: fmt::Display>(e: E) -> RegistrarError {
    RegistrarError::SerializationError(e.to_string())
}

// =============================================================================
// TESTS
// =============================================================================
