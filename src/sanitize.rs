use ammonia::Builder;
use std::collections::{HashMap, HashSet};

const ALLOWED_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "b", "i", "strong", "em", "br",
    "div", "span",
];

/// Disallowed tags are unwrapped; these lose their text too.
const DROPPED_WITH_CONTENT: &[&str] = &["script", "style", "textarea", "option", "noscript", "title", "template"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

fn allowlist() -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(DROPPED_WITH_CONTENT.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::new())
        .url_schemes(ALLOWED_SCHEMES.iter().copied().collect())
        .link_rel(None)
        .strip_comments(true);
    builder
}

/// Reduces rendered HTML to a small set of structural tags with no
/// attributes. `None` when nothing survives.
pub fn sanitize_html(html: &str) -> Option<String> {
    let cleaned = allowlist().clean(html).to_string();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
