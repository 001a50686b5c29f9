//! Identifier allocation for new entities
//!
//! Identifiers are opaque strings. Only uniqueness is load-bearing; the
//! default generator hands out UUID v4 strings.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh entity identifiers
pub trait IdGenerator: Send + Sync {
    /// Allocate a new identifier, never returned before by this generator
    fn next_id(&self) -> String;
}

/// Random UUID v4 identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `<prefix>-<n>` identifiers, starting at 1
///
/// Useful wherever readable, reproducible ids matter more than global
/// uniqueness (tests, fixtures, golden files).
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_generator_is_unique() {
        let generator = UuidGenerator;
        let ids: HashSet<String> = (0..500).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_uuid_generator_produces_v4() {
        let id = UuidGenerator.next_id();
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_sequential_generator() {
        let generator = SequentialIdGenerator::new("day");
        assert_eq!(generator.next_id(), "day-1");
        assert_eq!(generator.next_id(), "day-2");
        assert_eq!(generator.next_id(), "day-3");
    }
}
