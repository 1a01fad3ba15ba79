use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::clean;
use crate::readable::{self, ReadableArticle};
use crate::sanitize;

/// Which representations the caller wants for each page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    All,
    Clean,
    Readability,
    Sanitized,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::All => "all",
            ContentType::Clean => "clean",
            ContentType::Readability => "readability",
            ContentType::Sanitized => "sanitized",
        }
    }

    fn wants_clean(self) -> bool {
        matches!(self, ContentType::All | ContentType::Clean)
    }

    fn wants_readability(self) -> bool {
        matches!(self, ContentType::All | ContentType::Readability)
    }

    fn wants_sanitized(self) -> bool {
        matches!(self, ContentType::All | ContentType::Sanitized)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceOptions {
    pub content_type: ContentType,
    pub include_original_html: bool,
}

/// Fields produced by the reduction strategies for one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    pub html: Option<String>,
    pub readability_content: Option<ReadableArticle>,
    pub cleaned_plain_text: Option<String>,
    pub sanitized_html: Option<String>,
}

impl PageContent {
    pub fn is_empty(&self) -> bool {
        self.html.is_none()
            && self.readability_content.is_none()
            && self.cleaned_plain_text.is_none()
            && self.sanitized_html.is_none()
    }
}

/// Per-URL result. Either carries at least one content field or an error,
/// never both; the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    readability_content: Option<ReadableArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cleaned_plain_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sanitized_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ContentRecord {
    pub fn failure(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: None,
            readability_content: None,
            cleaned_plain_text: None,
            sanitized_html: None,
            error: Some(error.into()),
        }
    }

    /// A success record, or a failure if no strategy produced anything.
    pub fn from_content(url: impl Into<String>, content: PageContent, content_type: ContentType) -> Self {
        if content.is_empty() {
            return Self::failure(
                url,
                format!("no content could be extracted for contentType \"{}\"", content_type),
            );
        }
        Self {
            url: url.into(),
            html: content.html,
            readability_content: content.readability_content,
            cleaned_plain_text: content.cleaned_plain_text,
            sanitized_html: content.sanitized_html,
            error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    pub fn readability_content(&self) -> Option<&ReadableArticle> {
        self.readability_content.as_ref()
    }

    pub fn cleaned_plain_text(&self) -> Option<&str> {
        self.cleaned_plain_text.as_deref()
    }

    pub fn sanitized_html(&self) -> Option<&str> {
        self.sanitized_html.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Applies the strategies selected by `options` to one rendered page.
/// Each strategy runs on the raw HTML and fails on its own.
pub fn reduce(html: &str, url: &str, options: ReduceOptions) -> ContentRecord {
    let content_type = options.content_type;
    let mut content = PageContent::default();

    if options.include_original_html {
        content.html = Some(html.to_string());
    }
    if content_type.wants_clean() {
        content.cleaned_plain_text = clean::clean_text(html);
    }
    if content_type.wants_readability() {
        content.readability_content = readable::extract_article(html, url);
    }
    if content_type.wants_sanitized() {
        content.sanitized_html = sanitize::sanitize_html(html);
    }

    tracing::debug!(
        url,
        content_type = %content_type,
        clean = content.cleaned_plain_text.is_some(),
        readability = content.readability_content.is_some(),
        sanitized = content.sanitized_html.is_some(),
        "page reduced"
    );
    ContentRecord::from_content(url, content, content_type)
}
