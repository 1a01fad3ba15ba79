use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::Serialize;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use utoipa::ToSchema;

use crate::clean::collapse_whitespace;

static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[name='description'], meta[property='og:description']")
        .expect("static selector")
});
static DOCUMENT_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("static selector"));

/// Main content found by the readability pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadableArticle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub main_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
}

/// Runs readability-style main content detection on a rendered page.
///
/// Returns `None` when the page URL is unusable, the algorithm errors or
/// panics, or no article text is found. Failures are logged and never
/// propagated.
pub fn extract_article(html: &str, url: &str) -> Option<ReadableArticle> {
    let page_url = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(url, "readability skipped, invalid url: {}", e);
            return None;
        }
    };

    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut reader = Cursor::new(html.as_bytes());
        readability::extractor::extract(&mut reader, &page_url)
    }));

    let product = match extracted {
        Ok(Ok(product)) => product,
        Ok(Err(e)) => {
            tracing::warn!(url, "readability failed: {:?}", e);
            return None;
        }
        Err(_) => {
            tracing::warn!(url, "readability panicked");
            return None;
        }
    };

    let main_text = collapse_whitespace(&product.text);
    if main_text.is_empty() {
        tracing::warn!(url, "readability found no article");
        return None;
    }

    let title = non_empty(&product.title).or_else(|| first_text(html, &DOCUMENT_TITLE));
    let excerpt = meta_description(html).or_else(|| first_paragraph(&product.content));

    Some(ReadableArticle {
        title,
        main_text,
        excerpt,
    })
}

fn non_empty(text: &str) -> Option<String> {
    let text = collapse_whitespace(text);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn meta_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let found = document
        .select(&META_DESCRIPTION)
        .filter_map(|el| el.value().attr("content"))
        .find_map(non_empty);
    found
}

fn first_text(html: &str, selector: &Selector) -> Option<String> {
    let document = Html::parse_document(html);
    let found = document
        .select(selector)
        .map(|el| el.text().collect::<String>())
        .find_map(|text| non_empty(&text));
    found
}

fn first_paragraph(article_html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(article_html);
    let found = fragment
        .select(&PARAGRAPH)
        .map(|el| el.text().collect::<String>())
        .find_map(|text| non_empty(&text));
    found
}
