use crate::stages::{Analyzer, LinkCollector, Scraper};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use scraipe_core::{
    AnalysisResult, AnalysisStatus, CollectQuery, CoreError, ErrorExt, ExportRow, ExportTable,
    Link, ScrapeResult, ScrapeStatus,
};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// Run-scoped store joining collected links with their scrape and analysis
/// results. Entries are keyed by link; a later result for the same link
/// replaces the earlier one.
#[derive(Debug)]
pub struct Workflow {
    links: Vec<Link>,
    scrapes: HashMap<Link, ScrapeStatus>,
    analyses: HashMap<Link, AnalysisResult>,
    concurrency: usize,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl Workflow {
    pub fn new(concurrency: usize) -> Self {
        Self {
            links: Vec::new(),
            scrapes: HashMap::new(),
            analyses: HashMap::new(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn clear_store(&mut self) {
        self.links.clear();
        self.scrapes.clear();
        self.analyses.clear();
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn scrape_count(&self) -> usize {
        self.scrapes.len()
    }

    /// Collects links into the store. A link already present is kept at its
    /// first position.
    pub async fn collect_links(
        &mut self,
        collector: &dyn LinkCollector,
        query: &CollectQuery,
    ) -> Result<&[Link], CoreError> {
        let collected = collector.collect_links(query).await?;

        let mut seen: HashSet<Link> = self.links.iter().cloned().collect();
        for link in collected {
            if seen.insert(link.clone()) {
                self.links.push(link);
            }
        }

        info!("Workflow holds {} links", self.links.len());
        Ok(&self.links)
    }

    /// Scrapes every stored link. `on_progress(completed, total)` fires once
    /// per link, in link order.
    pub async fn scrape<P>(
        &mut self,
        scraper: &dyn Scraper,
        mut on_progress: P,
    ) -> Vec<ScrapeResult>
    where
        P: FnMut(usize, usize) + Send,
    {
        let links = self.links.clone();
        let total = links.len();
        let mut results = Vec::with_capacity(total);

        let mut outcomes = stream::iter(links.into_iter().map(|link| async move {
            let outcome = AssertUnwindSafe(scraper.scrape(&link)).catch_unwind().await;
            let status = match outcome {
                Ok(Ok(content)) => ScrapeStatus::Success { content },
                Ok(Err(e)) => {
                    error!("Scrape failed for {}: {}", link, e);
                    ScrapeStatus::Failed {
                        error: e.user_friendly_message(),
                    }
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("Scraper panicked on {}: {}", link, message);
                    ScrapeStatus::Failed {
                        error: format!("scraper panicked: {}", message),
                    }
                }
            };
            ScrapeResult { link, status }
        }))
        .buffered(self.concurrency);

        while let Some(result) = outcomes.next().await {
            self.scrapes.insert(result.link.clone(), result.status.clone());
            results.push(result);
            on_progress(results.len(), total);
        }

        debug!(
            "Scraped {} links, {} failed",
            total,
            results.iter().filter(|r| !r.status.is_success()).count()
        );
        results
    }

    /// Analyzes every stored scrape result. Failed scrapes are not sent to the
    /// analyzer; they get a failure marker tagged with the analyzer's kind.
    pub async fn analyze<P>(
        &mut self,
        analyzer: &dyn Analyzer,
        mut on_progress: P,
    ) -> Vec<AnalysisResult>
    where
        P: FnMut(usize, usize) + Send,
    {
        let kind = analyzer.kind();
        let pending: Vec<(Link, ScrapeStatus)> = self
            .links
            .iter()
            .filter_map(|link| {
                self.scrapes
                    .get(link)
                    .map(|status| (link.clone(), status.clone()))
            })
            .collect();
        let total = pending.len();
        let mut results = Vec::with_capacity(total);

        let mut outcomes = stream::iter(pending.into_iter().map(|(link, scrape)| async move {
            let status = match scrape {
                ScrapeStatus::Success { content } => analyze_one(analyzer, &link, &content).await,
                ScrapeStatus::Failed { error } => AnalysisStatus::Failed {
                    error: format!("scrape failed: {}", error),
                },
            };
            AnalysisResult {
                link,
                analyzer: kind,
                status,
            }
        }))
        .buffered(self.concurrency);

        while let Some(result) = outcomes.next().await {
            self.analyses.insert(result.link.clone(), result.clone());
            results.push(result);
            on_progress(results.len(), total);
        }

        results
    }

    /// Joins links with their results, one row per link in collection order.
    pub fn export(&self) -> ExportTable {
        let rows = self
            .links
            .iter()
            .filter_map(|link| {
                let scrape = self.scrapes.get(link)?;
                let (analyzer, analysis) = match self.analyses.get(link) {
                    Some(result) => (Some(result.analyzer), result.status.clone()),
                    None => (
                        None,
                        AnalysisStatus::Failed {
                            error: "not analyzed".to_string(),
                        },
                    ),
                };
                Some(ExportRow {
                    link: link.clone(),
                    scrape: scrape.clone(),
                    analyzer,
                    analysis,
                })
            })
            .collect();

        ExportTable::new(rows)
    }
}

async fn analyze_one(analyzer: &dyn Analyzer, link: &Link, content: &str) -> AnalysisStatus {
    match AssertUnwindSafe(analyzer.analyze(content)).catch_unwind().await {
        Ok(Ok(output)) => AnalysisStatus::Success { output },
        Ok(Err(e)) => {
            error!("Analysis failed for {}: {}", link, e);
            AnalysisStatus::Failed {
                error: e.user_friendly_message(),
            }
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Analyzer panicked on {}: {}", link, message);
            AnalysisStatus::Failed {
                error: format!("analyzer panicked: {}", message),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
