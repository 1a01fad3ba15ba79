use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Element, ElementRef, Html, Node, Selector};

/// Elements whose whole subtree is chrome, scripts or widgets.
const NOISE_TAGS: &[&str] = &[
    "style", "script", "nav", "footer", "header", "noscript", "iframe", "svg", "link", "meta",
    "form", "input", "button", "select", "textarea", "option", "aside",
];

/// Elements that end a run of inline text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

static NOISE_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|[-_])(ads?|advert\w*|menu|sidebar|widget|social|share|sharing|related|comments?)([-_]|$)",
    )
    .expect("static regex")
});

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("static selector"));

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,!?;:\-()\[\]]").expect("static regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("static regex"));
static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").expect("static regex"));

/// Structural pruning followed by regex cleanup. `None` when nothing
/// readable is left.
pub fn clean_text(html: &str) -> Option<String> {
    let text = cleanup_text(&prune_text(html));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Body text with navigation, ads, widgets and scripts removed, whitespace
/// collapsed to single spaces.
pub fn prune_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&BODY)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut out = String::with_capacity(html.len() / 4);
    collect_text(root, &mut out);
    collapse_whitespace(&out)
}

/// Drops characters outside the word/punctuation allowlist and collapses
/// leftover whitespace. Running it twice changes nothing.
pub fn cleanup_text(text: &str) -> String {
    let text = DISALLOWED_CHARS.replace_all(text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = NEWLINE_RUN.replace_all(&text, "\n");
    text.trim().to_string()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Depth-first text walk. Iterative, so nesting depth is bounded by the heap
/// and not by the blocking thread's stack.
fn collect_text(root: ElementRef<'_>, out: &mut String) {
    // (is block element, remaining children)
    let mut stack = vec![(false, root.children())];

    while let Some((block, children)) = stack.last_mut() {
        match children.next() {
            Some(child) => match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) if is_noise(el) => {}
                Node::Element(el) => {
                    let is_block = BLOCK_TAGS.contains(&el.name());
                    if is_block {
                        out.push(' ');
                    }
                    stack.push((is_block, child.children()));
                }
                _ => {}
            },
            None => {
                if *block {
                    out.push(' ');
                }
                stack.pop();
            }
        }
    }
}

fn is_noise(el: &Element) -> bool {
    NOISE_TAGS.contains(&el.name()) || el.classes().any(|class| NOISE_CLASS.is_match(class))
}
