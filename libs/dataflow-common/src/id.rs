use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// A ULID is a millisecond timestamp followed by 80 random bits, so IDs are
/// unique for the lifetime of the process and sort by creation time.
///
/// # Examples
/// ```
/// let id = dataflow_common::id::prefixed_ulid("client");
/// assert!(id.starts_with("client_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// Real-time client connections.
    pub const CLIENT: &str = "client";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_ulid_format() {
        let id = prefixed_ulid("client");
        assert!(id.starts_with("client_"));
        // ULID is 26 chars, plus prefix + underscore
        assert_eq!(id.len(), 7 + 26);
    }

    #[test]
    fn test_uniqueness() {
        let a = prefixed_ulid("client");
        let b = prefixed_ulid("client");
        assert_ne!(a, b);
    }

    #[test]
    fn client_prefix_constant() {
        assert!(prefixed_ulid(prefix::CLIENT).starts_with("client_"));
    }
}
