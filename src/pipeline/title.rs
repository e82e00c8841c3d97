//! Title resolver: infers a paper title from the extraction transcript.
//!
//! Strategies run in fixed priority order, each only when every earlier
//! one came up empty. The resolver never returns an empty string: with no
//! usable transcript the paper id wins.

use std::sync::OnceLock;

use regex::Regex;

/// Where a title candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleSource {
    /// A `# ` heading line in the transcript
    MarkdownHeading,
    /// A title-shaped line near the top of the body
    BodyPattern,
    /// A `**bold**` span near the top of the document
    BoldText,
    /// The paper identifier
    FallbackId,
}

/// A candidate title with its provenance and cascade rank
#[derive(Debug, Clone)]
pub struct TitleCandidate {
    pub text: String,
    pub source: TitleSource,
    pub rank: usize,
}

/// Heading lines to skip: section headers the extraction tool promotes
/// to `# ` that are never the paper title.
const NON_TITLE_WORDS: &[&str] = &["abstract", "introduction", "content", "table", "figure"];

/// How many leading lines each strategy inspects
const HEADING_SCAN_LINES: usize = 50;
const BODY_SCAN_LINES: usize = 20;
/// How much leading text the bold-span strategy inspects
const BOLD_SCAN_CHARS: usize = 2000;

/// Plausible title length bounds (exclusive)
const HEADING_MIN_LEN: usize = 10;
const BODY_MIN_LEN: usize = 20;
const MAX_LEN: usize = 200;

/// Resolve a human-readable title from the transcript, falling back to
/// `fallback_id` when no strategy produces a candidate.
pub fn resolve_title(markdown: Option<&str>, fallback_id: &str) -> String {
    let candidate = markdown
        .and_then(best_candidate)
        .unwrap_or_else(|| TitleCandidate {
            text: fallback_id.to_string(),
            source: TitleSource::FallbackId,
            rank: 3,
        });

    tracing::debug!(
        "title resolved via {:?} (rank {}): {}",
        candidate.source,
        candidate.rank,
        candidate.text
    );

    let cleaned = strip_emphasis(&candidate.text);
    if cleaned.is_empty() {
        fallback_id.to_string()
    } else {
        cleaned
    }
}

/// Run the strategy cascade and return the first hit.
fn best_candidate(markdown: &str) -> Option<TitleCandidate> {
    type Strategy = fn(&str) -> Option<String>;
    // Priority order is the contract: a heading always beats a body line,
    // which always beats a bold span.
    const CASCADE: &[(Strategy, TitleSource)] = &[
        (heading_title, TitleSource::MarkdownHeading),
        (body_line_title, TitleSource::BodyPattern),
        (bold_span_title, TitleSource::BoldText),
    ];

    CASCADE
        .iter()
        .enumerate()
        .find_map(|(rank, (strategy, source))| {
            strategy(markdown).map(|text| TitleCandidate {
                text,
                source: *source,
                rank,
            })
        })
}

/// Strategy 1: the first plausible `# ` heading.
fn heading_title(markdown: &str) -> Option<String> {
    for line in markdown.lines().take(HEADING_SCAN_LINES) {
        let line = line.trim();
        let Some(heading) = line.strip_prefix("# ") else {
            continue;
        };
        let heading = heading.trim();
        if heading.len() <= HEADING_MIN_LEN || heading.len() >= MAX_LEN {
            continue;
        }
        if contains_non_title_word(heading, NON_TITLE_WORDS) {
            continue;
        }
        return Some(heading.to_string());
    }
    None
}

/// Strategy 2: a title-shaped plain line near the top of the body.
///
/// Titles tend to be moderately long, carry capitals, avoid a leading
/// "Label:" shape and are not full sentences.
fn body_line_title(markdown: &str) -> Option<String> {
    for line in markdown.lines().take(BODY_SCAN_LINES) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('*') {
            continue;
        }
        let head: String = line.chars().take(20).collect();
        let len = line.chars().count();
        if len > BODY_MIN_LEN
            && len < MAX_LEN
            && line.chars().any(|c| c.is_uppercase())
            && !head.contains(':')
            && line.matches('.').count() < 3
        {
            return Some(line.to_string());
        }
    }
    None
}

/// Strategy 3: the first plausible `**bold**` span near the top.
fn bold_span_title(markdown: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));

    let head_end = markdown
        .char_indices()
        .nth(BOLD_SCAN_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(markdown.len());
    let head = &markdown[..head_end];

    for capture in re.captures_iter(head) {
        let span = capture[1].trim();
        if span.len() > BODY_MIN_LEN
            && span.len() < MAX_LEN
            && !contains_non_title_word(span, &["abstract", "figure", "table"])
        {
            return Some(span.to_string());
        }
    }
    None
}

fn contains_non_title_word(text: &str, words: &[&str]) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w))
}

/// Trim and drop markdown emphasis markers from the winning candidate.
fn strip_emphasis(text: &str) -> String {
    text.trim()
        .trim_start_matches('#')
        .replace(['*', '_', '`'], "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FALLBACK: &str = "2412.15289";

    #[test]
    fn test_heading_wins() {
        let md = "# Scaling Laws for Document Harvesting Pipelines\n\nSome body text here.";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "Scaling Laws for Document Harvesting Pipelines"
        );
    }

    #[test]
    fn test_heading_beats_bold_text() {
        let md = "# A Heading That Is Clearly The Paper Title\n\n\
                  **A Bold Span That Could Also Pass For A Title**";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "A Heading That Is Clearly The Paper Title"
        );
    }

    #[test]
    fn test_section_headings_skipped() {
        let md = "# Abstract\n# Introduction\n# Table of Contents\n\
                  # Neural Diagram Harvesting at Scale Works\nbody";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "Neural Diagram Harvesting at Scale Works"
        );
    }

    #[test]
    fn test_short_heading_rejected() {
        let md = "# Results\n\nbody text";
        assert_eq!(resolve_title(Some(md), FALLBACK), FALLBACK);
    }

    #[test]
    fn test_body_line_strategy() {
        let md = "Deep Residual Learning for Image Recognition\n\nKaiming He et al.";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "Deep Residual Learning for Image Recognition"
        );
    }

    #[test]
    fn test_body_line_skips_label_shaped_lines() {
        let md = "Abstract: this paper considers the problem of extraction\n\
                  A Genuinely Title Shaped Line For The Paper\nmore";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "A Genuinely Title Shaped Line For The Paper"
        );
    }

    #[test]
    fn test_bold_span_strategy() {
        let md = "x\n\n**Attention Is All You Need For Diagram Mining**\n\nbody";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "Attention Is All You Need For Diagram Mining"
        );
    }

    #[test]
    fn test_fallback_on_empty_transcript() {
        assert_eq!(resolve_title(None, FALLBACK), FALLBACK);
        assert_eq!(resolve_title(Some(""), FALLBACK), FALLBACK);
        assert_eq!(resolve_title(Some("   \n\n  "), FALLBACK), FALLBACK);
    }

    #[test]
    fn test_never_returns_empty_string() {
        // A heading of pure emphasis markers survives the length check but
        // strips to nothing; the fallback must still win.
        let md = "# ____________________\n";
        let title = resolve_title(Some(md), FALLBACK);
        assert_eq!(title, FALLBACK);
    }

    #[test]
    fn test_emphasis_markers_stripped() {
        let md = "# **Emphatic Titles Considered Harmful For Parsers**\n";
        assert_eq!(
            resolve_title(Some(md), FALLBACK),
            "Emphatic Titles Considered Harmful For Parsers"
        );
    }
}
