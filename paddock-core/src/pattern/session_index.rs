//! A two-level candidate-filtering index over session aliases, bucketed
//! by first character and length (spec.md §4.5). Pure optimization: any
//! candidate that would pass the fuzzy-closeness predicate is guaranteed
//! to appear in `get_candidates`; correctness of matching never depends
//! on the bucketing.

use std::collections::HashMap;

const SIMILARITY_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default)]
pub struct SessionLookupIndex {
    direct: HashMap<String, String>,
    /// first_char -> length -> tokens at that length
    buckets: HashMap<char, HashMap<usize, Vec<String>>>,
}

impl SessionLookupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, canonical: &str) {
        let folded = key.to_lowercase();
        if folded.is_empty() {
            return;
        }
        self.direct.insert(folded.clone(), canonical.to_string());
        if let Some(first) = folded.chars().next() {
            self.buckets
                .entry(first)
                .or_default()
                .entry(folded.chars().count())
                .or_default()
                .push(folded);
        }
    }

    /// Exact lookup, O(1).
    pub fn get_direct(&self, token: &str) -> Option<&str> {
        self.direct.get(&token.to_lowercase()).map(String::as_str)
    }

    /// Candidates sharing the first character and within +/-1 length of
    /// `token`. A superset of everything that would pass the
    /// fuzzy-closeness predicate against `token`.
    pub fn get_candidates(&self, token: &str) -> Vec<&str> {
        let folded = token.to_lowercase();
        let Some(first) = folded.chars().next() else {
            return Vec::new();
        };
        let Some(lengths) = self.buckets.get(&first) else {
            return Vec::new();
        };
        let len = folded.chars().count();
        let mut out = Vec::new();
        for candidate_len in [len.saturating_sub(1), len, len + 1] {
            if let Some(tokens) = lengths.get(&candidate_len) {
                out.extend(tokens.iter().map(String::as_str));
            }
        }
        out.sort();
        out.dedup();
        out
    }

    /// Best fuzzy match for `token` among `get_candidates`, or `None` if
    /// nothing clears `SIMILARITY_THRESHOLD`.
    pub fn fuzzy_match(&self, token: &str) -> Option<(&str, f64)> {
        self.get_candidates(token)
            .into_iter()
            .map(|candidate| (candidate, similarity(token, candidate)))
            .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(candidate, score)| (self.direct.get(candidate).map(String::as_str).unwrap_or(candidate), score))
    }
}

/// Builds a sport-wide session index over every episode's session
/// tokens, keyed by each episode's `display_number` — used by
/// `StructuredParser`'s fallback pass, as distinct from the
/// per-pattern indexes `PatternCompiler` builds for the pattern pass.
pub fn build_show_session_index(show: &paddock_model::Show) -> SessionLookupIndex {
    let mut index = SessionLookupIndex::new();
    for season in &show.seasons {
        for episode in &season.episodes {
            for token in &episode.session_tokens {
                index.add(token, &episode.title);
            }
        }
    }
    index
}

/// Normalized string similarity in `[0.0, 1.0]` via Jaro-Winkler.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&a.to_lowercase(), &b.to_lowercase())
}

/// The fuzzy-closeness predicate the index's bucketing must never
/// under-approximate (spec.md §8 testable property).
pub fn is_fuzzy_close(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let same_first = a.chars().next() == b.chars().next();
    let len_close = (a.chars().count() as i64 - b.chars().count() as i64).abs() <= 1;
    same_first && len_close && similarity(&a, &b) >= SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_lookup_is_exact() {
        let mut index = SessionLookupIndex::new();
        index.add("qualifying", "Qualifying");
        assert_eq!(index.get_direct("Qualifying"), Some("Qualifying"));
        assert_eq!(index.get_direct("quali"), None);
    }

    #[test]
    fn candidates_are_superset_of_fuzzy_close_predicate() {
        let mut index = SessionLookupIndex::new();
        for token in ["qualifying", "qualifyin", "race", "sprint", "practice"] {
            index.add(token, token);
        }
        for candidate in ["qualifying", "qualifyin", "race", "sprint", "practice"] {
            if is_fuzzy_close("qualifying", candidate) {
                assert!(
                    index.get_candidates("qualifying").contains(&candidate),
                    "candidate '{candidate}' passed the predicate but was missing from get_candidates"
                );
            }
        }
    }

    #[test]
    fn fuzzy_match_finds_close_misspelling() {
        let mut index = SessionLookupIndex::new();
        index.add("qualifying", "Qualifying");
        let (canonical, score) = index.fuzzy_match("qualifing").unwrap();
        assert_eq!(canonical, "Qualifying");
        assert!(score >= 0.85);
    }

    #[test]
    fn fuzzy_match_rejects_dissimilar_tokens() {
        let mut index = SessionLookupIndex::new();
        index.add("qualifying", "Qualifying");
        assert!(index.fuzzy_match("race").is_none());
    }
}
