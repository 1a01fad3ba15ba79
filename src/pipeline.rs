use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use utoipa::ToSchema;

use crate::config::ScraperConfig;
use crate::error::{Result, ScrapeError};
use crate::harvester::{CandidateLink, SearchHarvester};
use crate::query::SearchQuery;
use crate::reducer::{self, ContentRecord, ReduceOptions};
use crate::render::{BrowserLauncher, ChromeLauncher, RenderOutcome, RenderPool};

/// Response for one scrape request; `results` follow search rank order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScrapeResponse {
    pub tema: String,
    pub results: Vec<ContentRecord>,
}

/// Search, render and reduce, wired together.
pub struct ScrapePipeline {
    harvester: SearchHarvester,
    launcher: Arc<dyn BrowserLauncher>,
    augmentation: String,
    render_timeout: Duration,
    render_concurrency: usize,
}

impl ScrapePipeline {
    pub fn new(
        config: &ScraperConfig,
        harvester: SearchHarvester,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            harvester,
            launcher,
            augmentation: config.augmentation.clone(),
            render_timeout: config.render_timeout,
            render_concurrency: config.render_concurrency.max(1),
        }
    }

    /// Production wiring: Bing harvester and a local headless Chrome.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let harvester = SearchHarvester::new(config)?;
        let launcher = ChromeLauncher::new(
            config.chrome_path.clone(),
            config.render_timeout + Duration::from_secs(30),
        );
        Ok(Self::new(config, harvester, Arc::new(launcher)))
    }

    pub async fn run(&self, tema: &str, options: ReduceOptions) -> Result<ScrapeResponse> {
        let query = SearchQuery::new(tema, &self.augmentation);
        let links = self.harvester.harvest(&query).await?;

        if links.is_empty() {
            tracing::warn!(query = query.topic(), "search returned no usable links");
            return Ok(ScrapeResponse {
                tema: tema.to_string(),
                results: Vec::new(),
            });
        }

        let launcher = Arc::clone(&self.launcher);
        let renderer = tokio::task::spawn_blocking(move || launcher.launch())
            .await
            .map_err(|e| ScrapeError::Internal(e.to_string()))?
            .map_err(|e| ScrapeError::BrowserLaunch(format!("{:#}", e)))?;

        // the browser shuts down once this pool and every in-flight render
        // have released their handle
        let pool = RenderPool::new(renderer, self.render_timeout);
        let results = process_links(&pool, links, options, self.render_concurrency).await;

        let failed = results.iter().filter(|r| r.is_failure()).count();
        tracing::info!(total = results.len(), failed, "scrape finished");

        Ok(ScrapeResponse {
            tema: tema.to_string(),
            results,
        })
    }
}

/// Renders and reduces every link, returning one record per link in link
/// order. With `concurrency` 1 each page is fully processed before the next
/// one starts.
pub async fn process_links(
    pool: &RenderPool,
    links: Vec<CandidateLink>,
    options: ReduceOptions,
    concurrency: usize,
) -> Vec<ContentRecord> {
    let mut records = Vec::with_capacity(links.len());

    if concurrency <= 1 {
        for link in links {
            let outcome = pool.render(&link).await;
            records.push(assemble_record(outcome, options).await);
        }
        return records;
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut handles = Vec::with_capacity(links.len());
    for link in links {
        let pool = pool.clone();
        let semaphore = Arc::clone(&semaphore);
        let url = link.as_str().to_string();
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let outcome = pool.render(&link).await;
            assemble_record(outcome, options).await
        });
        handles.push((url, handle));
    }

    // gathered by index, not completion order
    for (url, handle) in handles {
        let record = match handle.await {
            Ok(record) => record,
            Err(e) => ContentRecord::failure(url, format!("page task aborted: {}", e)),
        };
        records.push(record);
    }
    records
}

/// Turns one render outcome into its record. Failed renders skip the reducer.
pub async fn assemble_record(outcome: RenderOutcome, options: ReduceOptions) -> ContentRecord {
    tracing::debug!(url = outcome.url(), "assembling record");
    match outcome {
        RenderOutcome::Failed { url, message } => ContentRecord::failure(url, message),
        RenderOutcome::Rendered { url, html } => {
            let task_url = url.clone();
            let reduced =
                tokio::task::spawn_blocking(move || reducer::reduce(&html, &task_url, options)).await;
            match reduced {
                Ok(record) => record,
                Err(e) => {
                    tracing::error!(url = %url, "content extraction aborted: {}", e);
                    ContentRecord::failure(url, format!("content extraction aborted: {}", e))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::ContentType;
    use crate::render::PageRenderer;

    struct EchoRenderer;

    impl PageRenderer for EchoRenderer {
        fn render(&self, url: &str, _timeout: Duration) -> anyhow::Result<String> {
            if url.contains("fail") {
                anyhow::bail!("net::ERR_CONNECTION_REFUSED at {}", url);
            }
            if url.contains("slow") {
                std::thread::sleep(Duration::from_millis(60));
            }
            Ok(format!("<html><body><p>Página {}</p></body></html>", url))
        }
    }

    fn links(urls: &[&str]) -> Vec<CandidateLink> {
        urls.iter().map(|u| CandidateLink::new(*u)).collect()
    }

    fn clean() -> ReduceOptions {
        ReduceOptions {
            content_type: ContentType::Clean,
            include_original_html: false,
        }
    }

    #[tokio::test]
    async fn failed_outcome_short_circuits() {
        let record = assemble_record(
            RenderOutcome::Failed {
                url: "https://a.test/".into(),
                message: "boom".into(),
            },
            clean(),
        )
        .await;
        assert_eq!(record, ContentRecord::failure("https://a.test/", "boom"));
    }

    #[tokio::test]
    async fn sequential_preserves_order_and_isolates_failures() {
        let pool = RenderPool::new(Arc::new(EchoRenderer), Duration::from_secs(1));
        let urls = ["https://a.test/", "https://fail.test/", "https://c.test/"];
        let records = process_links(&pool, links(&urls), clean(), 1).await;

        let got: Vec<&str> = records.iter().map(|r| r.url()).collect();
        assert_eq!(got, urls);
        assert!(!records[0].is_failure());
        assert!(records[1].error().unwrap().contains("ERR_CONNECTION_REFUSED"));
        assert!(records[1].cleaned_plain_text().is_none());
        assert!(!records[2].is_failure());
    }

    #[tokio::test]
    async fn concurrent_gathers_by_index() {
        let pool = RenderPool::new(Arc::new(EchoRenderer), Duration::from_secs(1));
        let urls = [
            "https://slow1.test/",
            "https://b.test/",
            "https://slow2.test/",
            "https://fail.test/",
            "https://e.test/",
        ];
        let records = process_links(&pool, links(&urls), clean(), 3).await;

        let got: Vec<&str> = records.iter().map(|r| r.url()).collect();
        assert_eq!(got, urls);
        assert_eq!(records.iter().filter(|r| r.is_failure()).count(), 1);
        assert_eq!(
            records[1].cleaned_plain_text(),
            Some("Página https:b.test")
        );
    }
}
