use base64::Engine;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use reqwest::Url;
use scraper::{Html, Selector};
use std::fmt;

use crate::config::ScraperConfig;
use crate::error::HarvestError;
use crate::query::SearchQuery;

static USER_AGENTS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:124.0) Gecko/20100101 Firefox/124.0",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/123.0.0.0 Safari/537.36",
    ]
});

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Picks a desktop browser User-Agent. Engines serve degraded or blocked
/// pages to clients that do not look like a browser.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_USER_AGENT)
}

/// A result link in search-engine rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink(String);

impl CandidateLink {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        CandidateLink(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CandidateLink> for String {
    fn from(link: CandidateLink) -> Self {
        link.0
    }
}

/// Pulls organic result hrefs out of a result page, in page order.
///
/// This is the only place that knows the engine's markup; swap the
/// implementation when the markup changes.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, html: &str) -> Vec<String>;
}

static BING_RESULT_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li.b_algo h2 a").expect("static selector"));

/// Organic results on Bing's result page (`li.b_algo h2 a`).
#[derive(Debug, Default, Clone, Copy)]
pub struct BingOrganicLinks;

impl LinkExtractor for BingOrganicLinks {
    fn extract_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        document
            .select(&BING_RESULT_LINK)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect()
    }
}

pub struct SearchHarvester {
    client: reqwest::Client,
    search_url: Url,
    engine_domain: String,
    fan_out: usize,
    extractor: Box<dyn LinkExtractor>,
}

impl SearchHarvester {
    pub fn new(config: &ScraperConfig) -> Result<Self, HarvestError> {
        let search_url = Url::parse(&config.search_url)
            .map_err(|e| HarvestError::InvalidUrl(format!("{}: {}", config.search_url, e)))?;
        let engine_domain = search_url
            .host_str()
            .map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
            .ok_or_else(|| HarvestError::InvalidUrl(format!("{}: missing host", config.search_url)))?;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(config.search_timeout)
            .build()?;

        Ok(Self {
            client,
            search_url,
            engine_domain,
            fan_out: config.fan_out,
            extractor: Box::new(BingOrganicLinks),
        })
    }

    pub fn with_extractor(mut self, extractor: impl LinkExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Domain treated as "the engine itself"; links on it or its subdomains
    /// are navigation, not results.
    pub fn engine_domain(&self) -> &str {
        &self.engine_domain
    }

    pub fn request_url(&self, query: &SearchQuery) -> String {
        let base = self.search_url.as_str();
        let separator = if self.search_url.query().is_some() { '&' } else { '?' };
        format!("{}{}q={}", base, separator, query.as_query_param())
    }

    /// Runs the single search request and returns at most `fan_out` links.
    pub async fn harvest(&self, query: &SearchQuery) -> Result<Vec<CandidateLink>, HarvestError> {
        let url = self.request_url(query);
        tracing::info!(search_url = %url, "searching");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .header(reqwest::header::ACCEPT_LANGUAGE, "pt-BR,pt;q=0.9,en-US;q=0.8,en;q=0.7")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::Status { status: status.as_u16() });
        }

        let html = resp.text().await?;
        let raw = self.extractor.extract_links(&html);
        let raw_count = raw.len();
        let links = select_candidates(raw, &self.search_url, &self.engine_domain, self.fan_out);

        tracing::info!(
            html_len = html.len(),
            raw = raw_count,
            kept = links.len(),
            "harvested result links"
        );
        Ok(links)
    }
}

/// Resolves, unwraps, filters and truncates raw result hrefs, keeping page
/// order.
pub fn select_candidates(
    raw: Vec<String>,
    search_url: &Url,
    engine_domain: &str,
    limit: usize,
) -> Vec<CandidateLink> {
    raw.into_iter()
        .filter_map(|href| search_url.join(&href).ok())
        .map(|url| {
            if is_engine_host(&url, engine_domain) {
                unwrap_redirect(&url).unwrap_or(url)
            } else {
                url
            }
        })
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| !is_engine_host(url, engine_domain))
        .map(|url| CandidateLink(url.to_string()))
        .take(limit)
        .collect()
}

fn is_engine_host(url: &Url, engine_domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == engine_domain || host.ends_with(&format!(".{}", engine_domain))
        }
        None => true,
    }
}

/// Bing wraps organic links as `/ck/a?...&u=a1<base64>`; returns the
/// destination when the wrapper can be decoded.
pub fn unwrap_redirect(url: &Url) -> Option<Url> {
    if url.path() != "/ck/a" {
        return None;
    }
    let encoded = url
        .query_pairs()
        .find(|(key, _)| key == "u")
        .map(|(_, value)| value.into_owned())?;
    let payload = encoded.strip_prefix("a1").unwrap_or(&encoded).trim_end_matches('=');

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(payload))
        .ok()?;
    let target = String::from_utf8(bytes).ok()?;
    let target = Url::parse(&target).ok()?;
    tracing::debug!(redirect = %url, target = %target, "unwrapped search redirect");
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERP: &str = r#"
        <html><body>
        <ol id="b_results">
          <li class="b_algo"><h2><a href="https://g1.globo.com/economia/noticia.html">G1</a></h2><p>snippet</p></li>
          <li class="b_ad"><h2><a href="https://ads.example.com/buy">Ad</a></h2></li>
          <li class="b_algo"><h2><a href="https://www.bing.com/images/search?q=x">Images</a></h2></li>
          <li class="b_algo"><h2><a href="https://blog.example.org/post">Blog</a></h2></li>
          <li class="b_algo"><div><a href="https://not-a-title.example.com">no h2</a></div></li>
          <li class="b_algo"><h2><a href="/search?q=next">Next</a></h2></li>
          <li class="b_algo"><h2><a href="https://news.example.net/a">News</a></h2></li>
        </ol>
        </body></html>
    "#;

    fn bing() -> Url {
        Url::parse("https://www.bing.com/search").unwrap()
    }

    #[test]
    fn extracts_only_organic_title_links_in_order() {
        let links = BingOrganicLinks.extract_links(SERP);
        assert_eq!(
            links,
            vec![
                "https://g1.globo.com/economia/noticia.html",
                "https://www.bing.com/images/search?q=x",
                "https://blog.example.org/post",
                "/search?q=next",
                "https://news.example.net/a",
            ]
        );
    }

    #[test]
    fn drops_engine_links_and_keeps_order() {
        let raw = BingOrganicLinks.extract_links(SERP);
        let links = select_candidates(raw, &bing(), "bing.com", 5);
        let urls: Vec<&str> = links.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://g1.globo.com/economia/noticia.html",
                "https://blog.example.org/post",
                "https://news.example.net/a",
            ]
        );
        assert!(links.iter().all(|l| !l.as_str().contains("bing.com")));
    }

    #[test]
    fn truncates_to_limit() {
        let raw: Vec<String> = (0..9).map(|i| format!("https://site{}.example.com/", i)).collect();
        let links = select_candidates(raw, &bing(), "bing.com", 5);
        assert_eq!(links.len(), 5);
        assert_eq!(links[0].as_str(), "https://site0.example.com/");
        assert_eq!(links[4].as_str(), "https://site4.example.com/");
    }

    #[test]
    fn rejects_non_http_schemes() {
        let raw = vec!["javascript:void(0)".to_string(), "mailto:a@b.c".to_string()];
        assert!(select_candidates(raw, &bing(), "bing.com", 5).is_empty());
    }

    #[test]
    fn unwraps_bing_click_redirects() {
        let target = "https://www.example.com/artigo?id=1";
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(target);
        let wrapped = format!("https://www.bing.com/ck/a?!&&p=abc&u=a1{}&ntb=1", encoded);
        let links = select_candidates(vec![wrapped], &bing(), "bing.com", 5);
        assert_eq!(links, vec![CandidateLink(target.to_string())]);
    }

    #[test]
    fn undecodable_redirect_is_filtered() {
        let wrapped = "https://www.bing.com/ck/a?u=a1%%%".to_string();
        assert!(select_candidates(vec![wrapped], &bing(), "bing.com", 5).is_empty());
    }

    #[test]
    fn subdomains_of_engine_are_filtered() {
        let raw = vec!["https://cc.bing.com/x".to_string(), "https://notbing.com/x".to_string()];
        let links = select_candidates(raw, &bing(), "bing.com", 5);
        assert_eq!(links, vec![CandidateLink("https://notbing.com/x".to_string())]);
    }

    #[test]
    fn request_url_embeds_query() {
        let harvester = SearchHarvester::new(&ScraperConfig::default()).unwrap();
        let query = SearchQuery::new("eleições", "blog");
        assert_eq!(
            harvester.request_url(&query),
            "https://www.bing.com/search?q=eleicoes+blog"
        );
        assert_eq!(harvester.engine_domain(), "bing.com");
    }

    #[test]
    fn user_agent_looks_like_a_browser() {
        assert!(random_user_agent().starts_with("Mozilla/5.0"));
    }
}
