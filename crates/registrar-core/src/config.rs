//! # Registrar Configuration
//!
//! Behavioural switches of the CORE. All fields have defaults, so an empty
//! `[registrar]` table (or none at all) yields the documented behaviour:
//! BLAKE3 digests, duplicate rejection and lenient transcript joins.

use crate::canonical::DigestAlgorithm;
use serde::{Deserialize, Serialize};

/// What an insert does when the (owner, subject, digest) triple is already indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `AlreadyExists`.
    #[default]
    Reject,
    /// Succeed without writing; the insert reports `false`.
    Idempotent,
}

/// How the transcript join treats a taken course with no catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Omit the course from the transcript.
    #[default]
    Lenient,
    /// Fail with `JoinIncomplete`.
    Strict,
}

/// CORE settings, loaded by the application from the `[registrar]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    pub digest_algorithm: DigestAlgorithm,
    pub duplicate_policy: DuplicatePolicy,
    pub join_mode: JoinMode,
}
