//! Ignore-pattern classifier
//!
//! Decides whether a path should be excluded from monitoring. The check is
//! two-staged: a bloom filter seeded from pattern tokens rules out most
//! paths without touching the glob engine, then the exact matcher confirms.
//!
//! ## Pattern grammar
//!
//! One glob per line in the ignore file; blank lines and `#` comments are
//! skipped. Forward slashes only. A trailing `**` makes the pattern a
//! recursive prefix (`vendor/**` ignores everything under `vendor/`).

mod bloom;
mod tokens;

pub use bloom::BloomFilter;

use std::path::Path;

use glob::Pattern;
use tracing::{debug, warn};

use crate::domain::WatchError;

/// Design false-positive rate for the bloom pre-filter.
const BLOOM_FP_RATE: f64 = 0.01;

/// Set of normalized ignore patterns with a bloom pre-filter
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    filter: Option<BloomFilter>,
}

impl IgnoreSet {
    /// Builds a classifier from raw pattern strings.
    ///
    /// Patterns are slash-normalized; empty ones are dropped. The bloom
    /// filter is seeded from the token set of all patterns.
    pub fn new(raw_patterns: Vec<String>) -> Self {
        let patterns: Vec<String> = raw_patterns
            .into_iter()
            .map(|p| p.trim().replace('\\', "/"))
            .filter(|p| !p.is_empty())
            .collect();

        if patterns.is_empty() {
            return Self::default();
        }

        let mut seed_tokens = Vec::new();
        for pattern in &patterns {
            for token in tokens::pattern_tokens(pattern) {
                if !seed_tokens.contains(&token) {
                    seed_tokens.push(token);
                }
            }
        }

        let mut filter = BloomFilter::with_capacity(seed_tokens.len(), BLOOM_FP_RATE);
        for token in &seed_tokens {
            filter.add(token);
        }

        debug!(
            patterns = patterns.len(),
            tokens = seed_tokens.len(),
            bits = filter.bit_count(),
            "Built ignore classifier"
        );

        Self {
            patterns,
            filter: Some(filter),
        }
    }

    /// Empty classifier: nothing is ignored.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads patterns from an ignore file (one glob per line, `#` comments).
    ///
    /// # Errors
    /// Returns [`WatchError::PathIo`] when the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, WatchError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WatchError::path_io(path, e))?;

        let patterns = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        Ok(Self::new(patterns))
    }

    /// Number of active patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when no patterns are loaded.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns whether `path` matches any ignore pattern.
    ///
    /// With no patterns this short-circuits to `false`. Otherwise the bloom
    /// filter screens the path's tokens; only on a hit (or with no filter
    /// built) does the glob matcher run.
    pub fn should_ignore(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let normalized = normalize_slashes(path);

        let filter_hit = match &self.filter {
            Some(filter) => tokens::path_tokens(&normalized)
                .iter()
                .any(|t| filter.contains(t)),
            None => true,
        };
        if !filter_hit {
            return false;
        }

        let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
        self.patterns
            .iter()
            .any(|pattern| matches_one(pattern, &normalized, basename))
    }
}

/// Applies a single normalized pattern to a path.
///
/// A pattern ending in `**` is a recursive prefix: the remainder must be a
/// leading substring of the path (an empty remainder matches everything).
/// Anything else goes through the glob engine against the full path and
/// the basename; a leading `**/` also admits matches at the root itself.
fn matches_one(pattern: &str, path: &str, basename: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix("**") {
        return prefix.is_empty() || path.starts_with(prefix);
    }

    let glob_matches = |p: &str| match Pattern::new(p) {
        Ok(compiled) => compiled.matches(path) || compiled.matches(basename),
        Err(e) => {
            warn!(pattern = p, error = %e, "Skipping malformed ignore pattern");
            false
        }
    };

    if glob_matches(pattern) {
        return true;
    }
    // "**/x" should also ignore a bare "x" at the watch root
    pattern
        .strip_prefix("**/")
        .is_some_and(glob_matches)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn set(patterns: &[&str]) -> IgnoreSet {
        IgnoreSet::new(patterns.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_empty_set_ignores_nothing() {
        let ignore = IgnoreSet::empty();
        assert!(!ignore.should_ignore(Path::new("anything/at/all.log")));
        assert!(ignore.is_empty());
    }

    #[test]
    fn test_recursive_prefix_rule() {
        let ignore = set(&["vendor/**"]);
        assert!(ignore.should_ignore(Path::new("vendor/x.go")));
        assert!(ignore.should_ignore(Path::new("vendor/deep/nested/y.go")));
        assert!(!ignore.should_ignore(Path::new("src/app.go")));
    }

    #[test]
    fn test_recursive_extension_rule() {
        let ignore = set(&["**/*.log"]);
        assert!(ignore.should_ignore(Path::new("app.log")));
        assert!(ignore.should_ignore(Path::new("deep/nested/app.log")));
        assert!(!ignore.should_ignore(Path::new("app.go")));
    }

    #[test]
    fn test_combined_patterns() {
        let ignore = set(&["**/*.log", "vendor/**"]);
        assert!(ignore.should_ignore(Path::new("vendor/x.go")));
        assert!(ignore.should_ignore(Path::new("app.log")));
        assert!(!ignore.should_ignore(Path::new("app.go")));
    }

    #[test]
    fn test_basename_glob() {
        let ignore = set(&["*.tmp"]);
        assert!(ignore.should_ignore(Path::new("scratch.tmp")));
        assert!(ignore.should_ignore(Path::new("work/scratch.tmp")));
        assert!(!ignore.should_ignore(Path::new("scratch.txt")));
    }

    #[test]
    fn test_bare_double_star_matches_everything() {
        let ignore = set(&["**"]);
        assert!(ignore.should_ignore(Path::new("any/path.txt")));
    }

    #[test]
    fn test_backslashes_normalized() {
        let ignore = set(&["vendor\\**"]);
        assert!(ignore.should_ignore(Path::new("vendor/x.go")));
    }

    #[test]
    fn test_exact_match_implies_bloom_hit() {
        // Bloom has no false negatives: any path the exact matcher accepts
        // must pass the pre-filter, so should_ignore reports it.
        let patterns = ["**/*.log", "vendor/**", "build-output/*.o"];
        let ignore = set(&patterns);
        for path in [
            "vendor/a/b/c.go",
            "x/y/z.log",
            "build-output/main.o",
        ] {
            assert!(ignore.should_ignore(Path::new(path)), "missed {path}");
        }
    }

    #[test]
    fn test_from_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lowkey");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "# build artifacts").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "target/**").unwrap();
        writeln!(file, "  *.swp  ").unwrap();
        drop(file);

        let ignore = IgnoreSet::from_file(&path).unwrap();
        assert_eq!(ignore.len(), 2);
        assert!(ignore.should_ignore(Path::new("target/debug/foo")));
        assert!(ignore.should_ignore(Path::new("src/.main.rs.swp")));
        assert!(!ignore.should_ignore(Path::new("src/main.rs")));
    }

    #[test]
    fn test_from_file_missing_is_an_error() {
        let result = IgnoreSet::from_file(&PathBuf::from("/no/such/.lowkey"));
        assert!(result.is_err());
    }
}
