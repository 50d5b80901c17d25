//! # Fixed Primitives
//!
//! Hardcoded runtime constants for the Registrar CORE.
//!
//! These values define the on-disk layout and the canonical record form.
//! Changing any of them changes record identities or key encodings,
//! so they are compiled in and immutable at runtime.

/// Version tag written at the head of every canonical record form.
///
/// Bump this when a record kind gains, loses or reorders a field.
pub const CANONICAL_SCHEMA: &str = "registrar/v1";

/// Object type of the composite meta-index key.
///
/// Composite keys have the shape `\0heiID\0<owner>\0<student_id>\0<digest>\0`.
pub const META_KEY_NAMESPACE: &str = "heiID";

/// Separator between composite key components.
pub const KEY_SEPARATOR: char = '\u{0}';

/// Key under which the store remembers the digest algorithm it was created with.
pub const DIGEST_ALGORITHM_KEY: &str = "\u{0}registrar\u{0}digest_algorithm\u{0}";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length in bytes for any text field of a submitted record.
///
/// Longer fields are rejected by the insertion pipeline.
pub const MAX_FIELD_LENGTH: usize = 512;

/// Maximum length in bytes for an institution name.
pub const MAX_INSTITUTION_LENGTH: usize = 256;

/// Prefix shared by every composite meta-index key.
#[must_use]
pub fn meta_key_prefix() -> String {
    format!("{KEY_SEPARATOR}{META_KEY_NAMESPACE}{KEY_SEPARATOR}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_prefix_is_namespaced() {
        assert_eq!(meta_key_prefix(), "\u{0}heiID\u{0}");
    }

    #[test]
    fn digest_key_outside_meta_family() {
        assert!(!DIGEST_ALGORITHM_KEY.starts_with(&meta_key_prefix()));
    }
}
