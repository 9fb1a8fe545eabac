//! Line-oriented substring and glob queries over rendered snapshot text.
//!
//! Queries are pipe-separated alternatives. Terms turn into globs when any
//! of them contains `*`, `?`, `{` or `}` (or when the caller forces glob
//! mode); globs are anchored to the whole line. Invalid glob patterns fall
//! back to literal substrings instead of failing the query.

use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobMatcher};
use serde::Serialize;

use crate::dom::Snapshot;
use crate::serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedLine {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextLine {
    pub index: usize,
    pub text: String,
    pub is_match: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    pub matched_lines: Vec<MatchedLine>,
    pub context_lines: Vec<ContextLine>,
    pub total_matches: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub use_glob: bool,
    pub context_levels: usize,
}

enum Term {
    Literal(String),
    Glob(GlobMatcher),
}

/// Find lines matching any query alternative, with ±`context_levels` lines
/// of merged context around each match. Empty queries match nothing.
pub fn search_snapshot_text(text: &str, query: &str, options: &SearchOptions) -> SearchResult {
    let raw_terms: Vec<&str> = query
        .split('|')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect();
    if raw_terms.is_empty() {
        return SearchResult::default();
    }

    let glob_mode = options.use_glob
        || raw_terms
            .iter()
            .any(|term| term.chars().any(|c| matches!(c, '*' | '?' | '{' | '}')));
    let terms: Vec<Term> = raw_terms
        .iter()
        .map(|term| compile_term(term, glob_mode, options.case_sensitive))
        .collect();

    let lines: Vec<&str> = text.lines().collect();
    let mut matched = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        if matches_any(line, &terms, options.case_sensitive) {
            matched.push(MatchedLine {
                index,
                text: (*line).to_string(),
            });
        }
    }

    // Merge overlapping ±context windows; matched lines keep their flag.
    let mut window: BTreeMap<usize, bool> = BTreeMap::new();
    for entry in &matched {
        let start = entry.index.saturating_sub(options.context_levels);
        let end = (entry.index + options.context_levels).min(lines.len().saturating_sub(1));
        for index in start..=end {
            window.entry(index).or_insert(false);
        }
    }
    for entry in &matched {
        window.insert(entry.index, true);
    }
    let context_lines = window
        .into_iter()
        .map(|(index, is_match)| ContextLine {
            index,
            text: lines[index].to_string(),
            is_match,
        })
        .collect();

    SearchResult {
        total_matches: matched.len(),
        matched_lines: matched,
        context_lines,
    }
}

fn compile_term(term: &str, glob_mode: bool, case_sensitive: bool) -> Term {
    if glob_mode {
        if let Ok(glob) = GlobBuilder::new(term)
            .case_insensitive(!case_sensitive)
            .build()
        {
            return Term::Glob(glob.compile_matcher());
        }
    }
    Term::Literal(if case_sensitive {
        term.to_string()
    } else {
        term.to_lowercase()
    })
}

fn matches_any(line: &str, terms: &[Term], case_sensitive: bool) -> bool {
    let lowered;
    let haystack = if case_sensitive {
        line
    } else {
        lowered = line.to_lowercase();
        &lowered
    };
    terms.iter().any(|term| match term {
        Term::Literal(needle) => haystack.contains(needle.as_str()),
        Term::Glob(matcher) => matcher.is_match(line),
    })
}

/// Render the snapshot, run the query, and project the matched lines (with
/// context) back out, `✓`-marking matches. `None` in, `None` out.
pub fn search_and_format(
    snapshot: Option<&Snapshot>,
    query: &str,
    context_levels: usize,
    options: &SearchOptions,
) -> Option<String> {
    let snapshot = snapshot?;
    let text = serialize::format(&serialize::build_text(snapshot, None));
    let search_options = SearchOptions {
        context_levels,
        ..options.clone()
    };
    let result = search_snapshot_text(&text, query, &search_options);
    if result.total_matches == 0 {
        return Some(format!("No matches found for \"{query}\""));
    }

    let mut output = String::new();
    for line in &result.context_lines {
        output.push_str(if line.is_match { "✓ " } else { "  " });
        output.push_str(&line.text);
        output.push('\n');
    }
    Some(output)
}
