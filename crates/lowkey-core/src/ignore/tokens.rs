//! Token extraction for the bloom pre-filter
//!
//! Patterns and paths are broken into lowercase tokens so the bloom filter
//! can rule out most non-matching paths before the glob matcher runs. The
//! two extractors must stay aligned: every token the matcher could match on
//! has to surface from both sides, otherwise the filter would produce
//! false negatives.

/// Glob metacharacters stripped from pattern segments before tokenizing.
const GLOB_METACHARS: &[char] = &['*', '?', '[', ']', '{', '}', '!'];

/// Extracts tokens from a glob pattern.
///
/// Each `/`-separated segment is lowercased and stripped of glob
/// metacharacters to form a base token, which is then sub-tokenized.
/// Duplicates are removed, preserving first occurrence.
pub fn pattern_tokens(pattern: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for segment in pattern.split('/') {
        let base: String = segment
            .to_lowercase()
            .chars()
            .filter(|c| !GLOB_METACHARS.contains(c))
            .collect();
        sub_tokenize(&base, &mut tokens);
    }
    tokens
}

/// Extracts tokens from a cleaned forward-slash path.
///
/// Segments are lowercased and sub-tokenized the same way pattern segments
/// are; the first segment is additionally added.
pub fn path_tokens(path: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut segments = path.split('/').filter(|s| !s.is_empty());

    if let Some(first) = segments.next() {
        let first = first.to_lowercase();
        push_unique(&mut tokens, first.clone());
        sub_tokenize(&first, &mut tokens);
    }
    for segment in segments {
        sub_tokenize(&segment.to_lowercase(), &mut tokens);
    }
    tokens
}

/// Adds the base token plus its extension (with dot), stem, and
/// `-`/`_`/`.`-separated parts.
fn sub_tokenize(base: &str, out: &mut Vec<String>) {
    if base.is_empty() {
        return;
    }
    push_unique(out, base.to_string());

    if let Some(dot) = base.rfind('.') {
        let (stem, ext) = base.split_at(dot);
        if ext.len() > 1 {
            push_unique(out, ext.to_string());
        }
        if !stem.is_empty() {
            push_unique(out, stem.to_string());
        }
    }

    for part in base.split(['-', '_', '.']) {
        if !part.is_empty() {
            push_unique(out, part.to_string());
        }
    }
}

fn push_unique(tokens: &mut Vec<String>, token: String) {
    if !tokens.contains(&token) {
        tokens.push(token);
    }
}
