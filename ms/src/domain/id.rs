//! Id generation and partial id resolution
//!
//! Task and step ids are UUID v7 strings, so they sort by creation time.

use std::collections::HashMap;

/// Opaque task identifier
pub type TaskId = String;

/// Opaque step identifier
pub type StepId = String;

/// Generate a fresh, time-ordered id
pub fn generate_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Current wall-clock time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Resolves a user-typed reference to a full task id
///
/// The map is `id -> title`.
pub struct IdResolver<'a> {
    ids: &'a HashMap<String, String>,
}

impl<'a> IdResolver<'a> {
    pub fn new(ids: &'a HashMap<String, String>) -> Self {
        Self { ids }
    }

    /// Resolve a partial reference to a full ID
    ///
    /// Returns:
    /// - Ok(Some(id)) if exactly one match
    /// - Ok(None) if no matches
    /// - Err with candidates if ambiguous
    pub fn resolve(&self, reference: &str) -> Result<Option<String>, Vec<String>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Ok(None);
        }

        // An exact id always wins, even if it is also a prefix of another id
        if self.ids.contains_key(reference) {
            return Ok(Some(reference.to_string()));
        }

        let mut matches: Vec<String> = self
            .ids
            .iter()
            .filter(|(id, title)| Self::matches(id, title, reference))
            .map(|(id, _)| id.clone())
            .collect();
        matches.sort();

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(matches),
        }
    }

    /// Check if an id or title matches a reference
    fn matches(id: &str, title: &str, reference: &str) -> bool {
        if id.starts_with(reference) {
            return true;
        }

        title.to_lowercase().contains(&reference.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ids() -> HashMap<String, String> {
        let mut ids = HashMap::new();
        ids.insert("0192a1b2-aaaa".to_string(), "洗澡睡觉".to_string());
        ids.insert("0192a1b2-bbbb".to_string(), "Write Report".to_string());
        ids.insert("0193ffff-cccc".to_string(), "Clean Desk".to_string());
        ids
    }

    #[test]
    fn test_generate_id_is_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_generate_id_is_time_ordered() {
        let a = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = generate_id();
        assert!(a < b);
    }

    #[test]
    fn test_resolve_exact_id() {
        let ids = sample_ids();
        let resolver = IdResolver::new(&ids);
        assert_eq!(
            resolver.resolve("0193ffff-cccc").unwrap(),
            Some("0193ffff-cccc".to_string())
        );
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let ids = sample_ids();
        let resolver = IdResolver::new(&ids);
        assert_eq!(resolver.resolve("0193").unwrap(), Some("0193ffff-cccc".to_string()));
    }

    #[test]
    fn test_resolve_ambiguous_prefix() {
        let ids = sample_ids();
        let resolver = IdResolver::new(&ids);
        let candidates = resolver.resolve("0192a1b2").unwrap_err();
        assert_eq!(candidates, vec!["0192a1b2-aaaa".to_string(), "0192a1b2-bbbb".to_string()]);
    }

    #[test]
    fn test_resolve_title_fragment() {
        let ids = sample_ids();
        let resolver = IdResolver::new(&ids);
        assert_eq!(resolver.resolve("report").unwrap(), Some("0192a1b2-bbbb".to_string()));
        assert_eq!(resolver.resolve("洗澡").unwrap(), Some("0192a1b2-aaaa".to_string()));
    }

    #[test]
    fn test_resolve_no_match() {
        let ids = sample_ids();
        let resolver = IdResolver::new(&ids);
        assert_eq!(resolver.resolve("nothing-like-this").unwrap(), None);
        assert_eq!(resolver.resolve("   ").unwrap(), None);
    }
}
