//! Folding enriched items into dashboard summaries.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Separators ignored when comparing tags.
static TAG_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-_]+").unwrap());

/// Substrings a tag must all contain to count as a recruitment tag.
pub const RECRUITMENT_TAG_TERMS: &[&str] = &["student", "recruitment"];

/// Sums per dimension value, in first-seen order.
///
/// Missing or blank keys are attributed to the sentinel, so the total of all
/// groups always equals the total of everything added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedCounts {
    sentinel: &'static str,
    groups: IndexMap<String, u64>,
}

/// One group of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: u64,
}

impl GroupedCounts {
    pub fn new(sentinel: &'static str) -> Self {
        Self {
            sentinel,
            groups: IndexMap::new(),
        }
    }

    pub fn add(&mut self, key: Option<&str>, count: u64) {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.sentinel);
        *self.groups.entry(key.to_string()).or_insert(0) += count;
    }

    pub fn total(&self) -> u64 {
        self.groups.values().sum()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.groups.get(key).copied()
    }

    /// Groups in first-seen order.
    pub fn as_map(&self) -> &IndexMap<String, u64> {
        &self.groups
    }

    /// All groups by count descending; equal counts keep first-seen order.
    pub fn ranked(&self) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .groups
            .iter()
            .map(|(key, count)| RankedEntry {
                key: key.clone(),
                count: *count,
            })
            .collect();
        // sort_by is stable
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }

    pub fn top_n(&self, n: usize) -> Vec<RankedEntry> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `part / total * 100`, rounded; `0.0` when `total` is zero.
pub fn percentage(part: u64, total: u64, decimals: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, decimals)
}

/// Lowercases and strips whitespace, hyphens and underscores.
pub fn normalize_tag(tag: &str) -> String {
    TAG_SEPARATORS.replace_all(&tag.to_lowercase(), "").into_owned()
}

/// True when the normalized tag contains every term as a substring.
///
/// Terms are matched independently, so their order and adjacency in the tag
/// do not matter.
pub fn tag_matches(tag: &str, terms: &[&str]) -> bool {
    let normalized = normalize_tag(tag);
    terms
        .iter()
        .all(|term| normalized.contains(&normalize_tag(term)))
}

/// True when any of `tags` matches `terms`.
pub fn any_tag_matches<S: AsRef<str>>(tags: &[S], terms: &[&str]) -> bool {
    tags.iter().any(|tag| tag_matches(tag.as_ref(), terms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grouping_uses_sentinel_for_missing_keys() {
        let mut groups = GroupedCounts::new("direct");
        groups.add(Some("t.co"), 3);
        groups.add(None, 2);
        groups.add(Some("  "), 1);
        groups.add(Some("t.co"), 4);

        assert_eq!(groups.get("t.co"), Some(7));
        assert_eq!(groups.get("direct"), Some(3));
        assert_eq!(groups.total(), 10);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_ranking_ties_keep_insertion_order() {
        let mut groups = GroupedCounts::new("Unknown");
        groups.add(Some("C"), 5);
        groups.add(Some("A"), 10);
        groups.add(Some("B"), 10);

        let keys: Vec<String> = groups.ranked().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_top_n_truncates() {
        let mut groups = GroupedCounts::new("Unknown");
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            groups.add(Some(key), i as u64);
        }
        let top = groups.top_n(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key, "d");
        assert_eq!(top[1].key, "c");
        assert!(GroupedCounts::new("x").top_n(10).is_empty());
    }

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(5, 0, 2), 0.0);
        assert_eq!(percentage(0, 0, 1), 0.0);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3, 2), 33.33);
        assert_eq!(percentage(2, 3, 1), 66.7);
        assert_eq!(percentage(3, 3, 2), 100.0);
        assert_eq!(round_to(-12.345, 1), -12.3);
    }

    #[test]
    fn test_recruitment_tag_variants_match() {
        for tag in [
            "Student-Recruitment",
            "student recruitment",
            "STUDENTRECRUITMENT",
            "student_recruitment 2025",
            "recruitment of students",
        ] {
            assert!(tag_matches(tag, RECRUITMENT_TAG_TERMS), "{tag} should match");
        }
    }

    #[test]
    fn test_partial_tags_do_not_match() {
        for tag in ["student", "recruitment", "Students", "staff-recruitment", ""] {
            assert!(!tag_matches(tag, RECRUITMENT_TAG_TERMS), "{tag} should not match");
        }
    }

    #[test]
    fn test_any_tag_matches() {
        assert!(any_tag_matches(&["events", "Student Recruitment"], RECRUITMENT_TAG_TERMS));
        assert!(!any_tag_matches(&["student", "recruitment"], RECRUITMENT_TAG_TERMS));
        let empty: [&str; 0] = [];
        assert!(!any_tag_matches(&empty, RECRUITMENT_TAG_TERMS));
    }
}
