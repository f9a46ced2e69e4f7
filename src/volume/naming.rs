//! Deterministic object naming
//!
//! PV and PVC names are a pure function of the volume descriptor id, so a
//! replayed request resolves to the objects created the first time.

use sha2::{Digest, Sha256};

/// Length of generated names in hex characters (128 bits of digest)
pub const OBJECT_NAME_LEN: usize = 32;

/// Cluster object name for a volume descriptor id.
///
/// Lowercase hex, so it is a valid DNS-1123 label.
pub fn object_name(id: &str) -> String {
    let digest = Sha256::digest(id.as_bytes());
    let mut name = String::with_capacity(OBJECT_NAME_LEN);
    for byte in digest.iter().take(OBJECT_NAME_LEN / 2) {
        name.push_str(&format!("{:02x}", byte));
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_stable() {
        assert_eq!(object_name("id1"), object_name("id1"));
        assert_eq!(object_name("id1").len(), OBJECT_NAME_LEN);
    }

    #[test]
    fn test_distinct_ids_get_distinct_names() {
        assert_ne!(object_name("id1"), object_name("id2"));
        assert_ne!(object_name(""), object_name(" "));
    }

    #[test]
    fn test_name_is_dns_label() {
        let name = object_name("1v42");
        assert!(name
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
