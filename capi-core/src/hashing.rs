//! PII normalization and hashing
//!
//! The Conversions API matches users on SHA-256 digests of normalized
//! identifiers. Values are lowercased and trimmed before hashing, so
//! `"Test@EXAMPLE.com "` and `"test@example.com"` produce the same digest.

use sha2::{Digest, Sha256};

/// Lowercase and trim a raw value, `None` when nothing is left
pub fn normalize(value: &str) -> Option<String> {
    let normalized = value.to_lowercase().trim().to_string();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Compute the lowercase hex SHA-256 digest of a string
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a PII value for the provider
///
/// Returns `None` for absent values and for values that normalize to the
/// empty string. The hash of `""` is never produced.
pub fn hash_pii(value: Option<&str>) -> Option<String> {
    value.and_then(normalize).map(|v| sha256_hex(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_values() {
        assert_eq!(hash_pii(None), None);
        assert_eq!(hash_pii(Some("")), None);
        assert_eq!(hash_pii(Some("   ")), None);
        assert_eq!(hash_pii(Some("\t\n")), None);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(
            hash_pii(Some("Test@EXAMPLE.com ")),
            hash_pii(Some("test@example.com"))
        );
        assert_eq!(hash_pii(Some("  JOHN")), hash_pii(Some("john")));
    }

    #[test]
    fn test_deterministic() {
        let first = hash_pii(Some("a@b.com"));
        let second = hash_pii(Some("a@b.com"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_digest() {
        // sha256("a@b.com")
        assert_eq!(
            hash_pii(Some("A@B.com")).unwrap(),
            "fb98d44ad7501a959f3f4f4a3f004fe2d9e581ea6207e218c4b02c08a4d75adf"
        );
    }

    #[test]
    fn test_digest_shape() {
        let digest = sha256_hex("anything");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" Jane "), Some("jane".to_string()));
        assert_eq!(normalize("  "), None);
    }
}
