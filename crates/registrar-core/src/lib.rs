//! # registrar-core
//!
//! The content-addressed academic record engine for Registrar - THE LOGIC.
//!
//! Institutions file three kinds of immutable record (student profiles,
//! taken-course results and course catalog entries). Each record is stored
//! under the digest of its canonical form, and a meta index keyed by
//! (owner, subject, digest) makes it discoverable again. Transcripts are
//! assembled by joining taken courses with catalog entries by course code.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies, NO logging (pure Rust)
//! - Deterministic: BTreeMap only, fixed canonical field order
//! - Every operation runs in one transaction and commits as a unit
//! - The only state is the key-value world state behind [`WorldState`]

// =============================================================================
// MODULES
// =============================================================================

pub mod canonical;
pub mod config;
pub mod meta;
pub mod pipeline;
pub mod primitives;
pub mod query;
pub mod record_store;
pub mod records;
pub mod registrar;
pub mod seed;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Digest, ErrorKind, RegistrarError, Relation};

// =============================================================================
// RE-EXPORTS: Records and Engine
// =============================================================================

pub use canonical::{
    CanonicalRecord, CanonicalWriter, DigestAlgorithm, canonical_form, compute_digest, seal,
};
pub use config::{DuplicatePolicy, JoinMode, RegistrarConfig};
pub use meta::{MetaIndex, MetaIndexEntry, Selector, composite_key};
pub use pipeline::{
    InsertOutcome, InsertionPipeline, NewCatalogEntry, NewStudentProfile, NewTakenCourse,
    Submission,
};
pub use query::{Projection, TranscriptReport};
pub use record_store::RecordStore;
pub use records::{
    CombinedCourseRecord, CourseCatalogEntry, StudentProfile, StudentTranscript,
    TakenCourseResult,
};
pub use registrar::{Registrar, StoreStats};
pub use seed::{SEED_INSTITUTION, SEED_STUDENT_ID, SeedReport};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use storage::{
    MemoryState, RedbState, StateBackend, StateReader, StateRows, Transaction, WorldState,
    WriteSet,
};
