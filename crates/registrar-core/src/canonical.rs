//! # Canonical Hasher
//!
//! Turns a record's data fields into a deterministic byte string and a
//! fixed-size digest.
//!
//! ## Canonical Form
//!
//! Every record kind declares its fields explicitly, in a fixed order, through
//! [`CanonicalRecord::write_canonical`]. No reflection is involved, so the form is
//! auditable and stays stable when struct fields are reordered.
//!
//! The form is a sequence of netstrings (`<byte-len>:<payload>,`):
//!
//! ```text
//! 12:registrar/v1,14:StudentProfile,35:faculty=Faculty of Engineering and ...,
//! ```
//!
//! 1. the schema tag ([`CANONICAL_SCHEMA`])
//! 2. the relation tag
//! 3. one `name=value` netstring per field
//!
//! Length prefixes make separator characters inside values harmless: two
//! records with different field values can never produce the same form.
//!
//! The digest field of a record is never written into its own canonical form.

use crate::primitives::CANONICAL_SCHEMA;
use crate::{Digest, Relation};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

// =============================================================================
// DIGEST ALGORITHM
// =============================================================================

/// Digest function applied to the canonical form.
///
/// Swapping the algorithm changes digest values but not the record-identity
/// contract: identical content still maps to identical digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    /// BLAKE3 truncated to 128 bits (32 hex characters).
    #[default]
    Blake3,
    /// SHA-256, 256 bits (64 hex characters).
    Sha256,
}

impl DigestAlgorithm {
    /// Hash raw bytes into a hex digest.
    #[must_use]
    pub fn digest_bytes(self, bytes: &[u8]) -> Digest {
        let hex = match self {
            DigestAlgorithm::Blake3 => {
                let hash = blake3::hash(bytes);
                hex::encode(&hash.as_bytes()[..16])
            }
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
        };
        Digest::from_hex(hex)
    }

    /// Number of hex characters in a digest produced by this algorithm.
    #[must_use]
    pub const fn hex_len(self) -> usize {
        match self {
            DigestAlgorithm::Blake3 => 32,
            DigestAlgorithm::Sha256 => 64,
        }
    }

    /// Stable name, as stamped into the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DigestAlgorithm::Blake3 => "blake3",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    /// Parse an algorithm name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "blake3" => Some(DigestAlgorithm::Blake3),
            "sha256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CANONICAL WRITER
// =============================================================================

/// Accumulates the canonical form of one record.
#[derive(Debug)]
pub struct CanonicalWriter {
    buf: String,
}

impl CanonicalWriter {
    /// Start a canonical form for a record of the given kind.
    #[must_use]
    pub fn new(relation: Relation) -> Self {
        let mut writer = Self { buf: String::new() };
        writer.netstring(CANONICAL_SCHEMA);
        writer.netstring(relation.as_str());
        writer
    }

    /// Append a text field.
    pub fn text(&mut self, name: &str, value: &str) {
        self.netstring(&format!("{}={}", name, value));
    }

    /// Append an unsigned integer field in decimal.
    pub fn uint(&mut self, name: &str, value: u64) {
        self.netstring(&format!("{}={}", name, value));
    }

    /// Append a real-valued field in its shortest round-trip decimal form.
    ///
    /// Negative zero is written as `0` so that `-0.0` and `0.0` hash alike.
    pub fn real(&mut self, name: &str, value: f32) {
        let value = if value == 0.0 { 0.0_f32 } else { value };
        self.netstring(&format!("{}={}", name, value));
    }

    /// Finish and return the canonical form.
    #[must_use]
    pub fn finish(self) -> String {
        self.buf
    }

    fn netstring(&mut self, payload: &str) {
        self.buf.push_str(&payload.len().to_string());
        self.buf.push(':');
        self.buf.push_str(payload);
        self.buf.push(',');
    }
}

// =============================================================================
// CANONICAL RECORD TRAIT
// =============================================================================

/// A record kind with an explicit, versioned field list.
pub trait CanonicalRecord {
    /// Relation tag of this record kind.
    const RELATION: Relation;

    /// Write every data field, in declaration order, excluding the digest.
    fn write_canonical(&self, out: &mut CanonicalWriter);

    /// The stored digest (empty until computed).
    fn digest(&self) -> &Digest;

    /// Replace the stored digest.
    fn set_digest(&mut self, digest: Digest);
}

/// Produce the canonical form of a record.
#[must_use]
pub fn canonical_form<R: CanonicalRecord>(record: &R) -> String {
    let mut writer = CanonicalWriter::new(R::RELATION);
    record.write_canonical(&mut writer);
    writer.finish()
}

/// Compute the digest of a record's canonical form.
#[must_use]
pub fn compute_digest<R: CanonicalRecord>(record: &R, algorithm: DigestAlgorithm) -> Digest {
    algorithm.digest_bytes(canonical_form(record).as_bytes())
}

/// Compute a record's digest and store it in the record's digest field.
pub fn seal<R: CanonicalRecord>(record: &mut R, algorithm: DigestAlgorithm) -> Digest {
    let digest = compute_digest(record, algorithm);
    record.set_digest(digest.clone());
    digest
}

// =============================================================================
// TESTS
// =============================================================================
