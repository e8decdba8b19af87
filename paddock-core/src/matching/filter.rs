//! File-level glob/extension filtering (spec.md §4.7 step 1), grounded
//! on `ferrex-core`'s `globset`-based library scan filters.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

#[derive(Debug, Clone)]
pub struct SourceFilter {
    globs: Option<GlobSet>,
    extensions: Vec<String>,
}

impl SourceFilter {
    pub fn new(source_globs: &[String], source_extensions: &[String]) -> Result<Self, globset::Error> {
        let globs = if source_globs.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in source_globs {
                builder.add(Glob::new(pattern)?);
            }
            Some(builder.build()?)
        };
        let extensions = source_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        Ok(Self { globs, extensions })
    }

    pub fn matches(&self, relative_path: &Path) -> bool {
        if let Some(globs) = &self.globs {
            if !globs.is_match(relative_path) {
                return false;
            }
        }
        if !self.extensions.is_empty() {
            let ext = relative_path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase);
            match ext {
                Some(ext) if self.extensions.contains(&ext) => {}
                _ => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = SourceFilter::new(&[], &[]).unwrap();
        assert!(filter.matches(&PathBuf::from("anything.mkv")));
    }

    #[test]
    fn extension_filter_rejects_unlisted_extensions() {
        let filter = SourceFilter::new(&[], &["mkv".to_string(), "mp4".to_string()]).unwrap();
        assert!(filter.matches(&PathBuf::from("race.MKV")));
        assert!(!filter.matches(&PathBuf::from("race.srt")));
    }

    #[test]
    fn glob_filter_requires_a_match() {
        let filter = SourceFilter::new(&["f1/**/*.mkv".to_string()], &[]).unwrap();
        assert!(filter.matches(&PathBuf::from("f1/2025/race.mkv")));
        assert!(!filter.matches(&PathBuf::from("nba/2025/game.mkv")));
    }
}
