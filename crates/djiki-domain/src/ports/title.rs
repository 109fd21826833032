//! Title normalization port

/// Converts between display titles and URL slugs
///
/// Implementations must be idempotent: `urlize(urlize(x)) == urlize(x)`.
pub trait TitleNormalizer: Send + Sync {
    /// Display title or slug to slug
    fn urlize(&self, text: &str) -> String;

    /// Slug to display title
    fn deurlize(&self, slug: &str) -> String;
}

/// Whitespace/underscore folding normalizer
///
/// Runs of whitespace and underscores become a single `_`, leading and
/// trailing separators are dropped. Case is preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTitleNormalizer;

impl TitleNormalizer for DefaultTitleNormalizer {
    fn urlize(&self, text: &str) -> String {
        text.split(|c: char| c.is_whitespace() || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    fn deurlize(&self, slug: &str) -> String {
        slug.replace('_', " ")
    }
}
