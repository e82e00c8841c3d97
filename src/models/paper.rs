//! Paper reference model: parsing and normalizing arXiv identifiers.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Base URL for arXiv abstract pages
const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
/// Base URL for arXiv PDFs
const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// Errors raised while parsing a paper reference
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The input is not a recognized arXiv URL or identifier
    #[error("unrecognized arXiv reference '{0}': expected a bare id or https://arxiv.org/{{abs,pdf}}/<id>")]
    Unrecognized(String),

    /// The extracted identifier does not match either arXiv id pattern
    #[error("'{0}' is not a valid arXiv identifier (expected YYMM.NNNNN[vN] or category/NNNNNNN)")]
    InvalidId(String),
}

/// A resolved reference to a single arXiv paper.
///
/// Immutable once parsed. The identifier is normalized across the
/// supported input shapes, so `abs/<id>`, `pdf/<id>` and `pdf/<id>.pdf`
/// all produce the same reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperReference {
    /// Normalized arXiv identifier, version suffix preserved if present
    pub id: String,
    /// The abstract page for this paper
    pub source_url: String,
    /// Direct PDF download URL
    pub pdf_url: String,
}

fn modern_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("valid regex"))
}

fn legacy_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Old-style ids: archive[.SUBJECT]/YYMMNNN, e.g. math.GT/0104020
    RE.get_or_init(|| Regex::new(r"^[a-z-]+(\.[A-Za-z]{2})?/\d{7}(v\d+)?$").expect("valid regex"))
}

impl PaperReference {
    /// Parse an arXiv URL or bare identifier.
    ///
    /// Recognized shapes:
    /// - `2412.15289`, `2412.15289v2`, `math.GT/0104020`
    /// - `https://arxiv.org/abs/<id>`
    /// - `https://arxiv.org/pdf/<id>`
    /// - `https://arxiv.org/pdf/<id>.pdf`
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ReferenceError::Unrecognized(input.to_string()));
        }

        let id = if input.contains("://") || input.starts_with("arxiv.org/") {
            Self::id_from_url(input)?
        } else {
            input.to_string()
        };

        // The pdf URL form may carry a trailing .pdf on the id itself
        let id = id.strip_suffix(".pdf").unwrap_or(&id).to_string();

        if !modern_id_re().is_match(&id) && !legacy_id_re().is_match(&id) {
            return Err(ReferenceError::InvalidId(id));
        }

        Ok(Self {
            source_url: format!("{}/{}", ARXIV_ABS_URL, id),
            pdf_url: format!("{}/{}.pdf", ARXIV_PDF_URL, id),
            id,
        })
    }

    fn id_from_url(input: &str) -> Result<String, ReferenceError> {
        let unrecognized = || ReferenceError::Unrecognized(input.to_string());

        let normalized = if input.contains("://") {
            input.to_string()
        } else {
            format!("https://{}", input)
        };

        let parsed = url::Url::parse(&normalized).map_err(|_| unrecognized())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(unrecognized());
        }
        if parsed.host_str() != Some("arxiv.org") {
            return Err(unrecognized());
        }

        let path = parsed.path();
        let id = path
            .strip_prefix("/abs/")
            .or_else(|| path.strip_prefix("/pdf/"))
            .ok_or_else(unrecognized)?
            .trim_end_matches('/');
        if id.is_empty() {
            return Err(unrecognized());
        }

        Ok(id.to_string())
    }
}

impl std::fmt::Display for PaperReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_id() {
        let r = PaperReference::parse("2412.15289").unwrap();
        assert_eq!(r.id, "2412.15289");
        assert_eq!(r.pdf_url, "https://arxiv.org/pdf/2412.15289.pdf");
    }

    #[test]
    fn test_parse_url_shapes_normalize_identically() {
        let shapes = [
            "https://arxiv.org/abs/2412.15289",
            "https://arxiv.org/pdf/2412.15289",
            "https://arxiv.org/pdf/2412.15289.pdf",
        ];
        for shape in shapes {
            let r = PaperReference::parse(shape).unwrap();
            assert_eq!(r.id, "2412.15289", "shape: {}", shape);
            assert_eq!(r.pdf_url, "https://arxiv.org/pdf/2412.15289.pdf");
        }
    }

    #[test]
    fn test_parse_keeps_version_suffix() {
        let r = PaperReference::parse("https://arxiv.org/abs/2301.12345v2").unwrap();
        assert_eq!(r.id, "2301.12345v2");
    }

    #[test]
    fn test_parse_legacy_id() {
        let r = PaperReference::parse("https://arxiv.org/abs/math.GT/0104020").unwrap();
        assert_eq!(r.id, "math.GT/0104020");
        assert_eq!(r.pdf_url, "https://arxiv.org/pdf/math.GT/0104020.pdf");
    }

    #[test]
    fn test_parse_http_scheme() {
        assert!(PaperReference::parse("http://arxiv.org/abs/2412.15289").is_ok());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PaperReference::parse("").is_err());
        assert!(PaperReference::parse("https://example.com/abs/2412.15289").is_err());
        assert!(PaperReference::parse("not-an-id").is_err());
        assert!(matches!(
            PaperReference::parse("https://arxiv.org/abs/not-an-id"),
            Err(ReferenceError::InvalidId(_))
        ));
    }
}
