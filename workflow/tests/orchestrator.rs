use async_trait::async_trait;
use scraipe_core::{
    AnalysisStatus, AnalyzerKind, Checked, CollectQuery, CoreError, ExportRow, ExportTable,
    LastExport, Link, LlmError, OpenAiCredentials, RedditApiError, RedditCredentials, RunForm,
    ScrapeStatus, SessionState, Settings, SortType, TimeFilter,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use workflow::{
    Analyzer, Backend, CredentialValidator, LinkCollector, Progress, RedditStages, RunError,
    RunEvent, RunNotice, RunOrchestrator, Scraper, Stage,
};

#[derive(Default)]
struct MockBackend {
    fail_collect: bool,
    fail_llm_construction: bool,
    reddit_probe_ok: bool,
    openai_probe_ok: bool,
    /// Post ids whose scrape fails.
    failing_posts: HashSet<String>,
    collect_calls: Arc<AtomicUsize>,
    probe_calls: AtomicUsize,
}

impl MockBackend {
    fn failing(mut self, posts: &[&str]) -> Self {
        self.failing_posts = posts.iter().map(|post| post.to_string()).collect();
        self
    }
}

struct MockCollector {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LinkCollector for MockCollector {
    async fn collect_links(&self, query: &CollectQuery) -> Result<Vec<Link>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CoreError::RedditApi(RedditApiError::SubredditNotFound {
                subreddit: query.subreddits.join(","),
            }));
        }

        Ok(query
            .subreddits
            .iter()
            .flat_map(|subreddit| {
                (0..query.limit.get()).map(move |i| {
                    Link::new(format!(
                        "https://www.reddit.com/r/{}/comments/p{}/",
                        subreddit, i
                    ))
                })
            })
            .collect())
    }
}

struct MockScraper {
    failing_posts: HashSet<String>,
}

#[async_trait]
impl Scraper for MockScraper {
    async fn scrape(&self, link: &Link) -> Result<String, CoreError> {
        let failing = self
            .failing_posts
            .iter()
            .any(|post| link.as_str().ends_with(&format!("/comments/{}/", post)));
        if failing {
            return Err(CoreError::RedditApi(RedditApiError::PostNotFound {
                post_id: link.to_string(),
            }));
        }
        Ok(format!("Post at {}. Tap early!", link))
    }
}

struct MockLlm {
    instruction: String,
}

#[async_trait]
impl Analyzer for MockLlm {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::OpenAi
    }

    async fn analyze(&self, content: &str) -> Result<serde_json::Value, CoreError> {
        Ok(json!({"instruction": self.instruction, "length": content.len()}))
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn reddit_stages(&self, _credentials: &RedditCredentials) -> Result<RedditStages, CoreError> {
        Ok(RedditStages {
            collector: Arc::new(MockCollector {
                fail: self.fail_collect,
                calls: self.collect_calls.clone(),
            }),
            scraper: Arc::new(MockScraper {
                failing_posts: self.failing_posts.clone(),
            }),
        })
    }

    fn llm_analyzer(
        &self,
        _credentials: &OpenAiCredentials,
        instruction: &str,
    ) -> Result<Arc<dyn Analyzer>, CoreError> {
        if self.fail_llm_construction {
            return Err(CoreError::Llm(LlmError::ServiceUnavailable {
                provider: "openai".to_string(),
            }));
        }
        Ok(Arc::new(MockLlm {
            instruction: instruction.to_string(),
        }))
    }

    async fn probe_reddit(&self, _credentials: &RedditCredentials) -> Result<(), CoreError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.reddit_probe_ok {
            Ok(())
        } else {
            Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "invalid_grant".to_string(),
            }))
        }
    }

    async fn probe_openai(&self, _credentials: &OpenAiCredentials) -> Result<(), CoreError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.openai_probe_ok {
            Ok(())
        } else {
            Err(CoreError::Llm(LlmError::InvalidApiKey {
                provider: "openai".to_string(),
            }))
        }
    }
}

fn form(subreddits: &str, post_limit: u32) -> RunForm {
    RunForm {
        subreddits: subreddits.to_string(),
        sort: SortType::Hot,
        post_limit,
        time_filter: TimeFilter::All,
        instruction: "Extract jokes".to_string(),
    }
}

fn reddit(valid: bool) -> Checked<RedditCredentials> {
    Checked::new(RedditCredentials::new("id", "secret"), valid)
}

fn openai(valid: bool) -> Checked<OpenAiCredentials> {
    Checked::new(OpenAiCredentials::new("sk-test"), valid)
}

fn orchestrator(backend: MockBackend) -> RunOrchestrator {
    RunOrchestrator::new(Arc::new(backend), Settings::default())
}

fn previous_export() -> ExportTable {
    ExportTable::new(vec![ExportRow {
        link: Link::new("https://www.reddit.com/r/old/comments/x/"),
        scrape: ScrapeStatus::Success {
            content: "old".to_string(),
        },
        analyzer: Some(AnalyzerKind::TextStats),
        analysis: AnalysisStatus::Success {
            output: json!({"words": 1}),
        },
    }])
}

#[tokio::test]
async fn invalid_reddit_credentials_abort_before_collecting() {
    let backend = MockBackend::default();
    let calls = backend.collect_calls.clone();
    let orchestrator = orchestrator(backend);

    let mut session = SessionState::new();
    session.set::<LastExport>(previous_export());

    let result = orchestrator
        .run(&mut session, form("bjj", 10), reddit(false), openai(true), |_| {})
        .await;

    assert_eq!(result, Err(RunError::InvalidRedditCredentials));
    assert_eq!(session.last_export(), Some(&previous_export()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn collect_failure_is_fatal_and_keeps_last_export() {
    let orchestrator = orchestrator(MockBackend {
        fail_collect: true,
        ..Default::default()
    });

    let mut session = SessionState::new();
    session.set::<LastExport>(previous_export());

    let result = orchestrator
        .run(&mut session, form("bjj", 10), reddit(true), openai(true), |_| {})
        .await;

    assert_eq!(
        result,
        Err(RunError::CollectFailed {
            message: "Subreddit r/bjj does not exist or is private.".to_string()
        })
    );
    assert_eq!(session.last_export(), Some(&previous_export()));
}

#[tokio::test]
async fn invalid_openai_credentials_degrade_to_text_stats() {
    let orchestrator = orchestrator(MockBackend::default());
    let mut session = SessionState::new();
    let mut notices = Vec::new();

    let table = orchestrator
        .run(&mut session, form("bjj", 5), reddit(true), openai(false), |event| {
            if let RunEvent::Notice(notice) = event {
                notices.push(notice);
            }
        })
        .await
        .unwrap();

    assert_eq!(table.len(), 5);
    assert!(table
        .rows()
        .iter()
        .all(|row| row.analyzer == Some(AnalyzerKind::TextStats)));
    assert!(matches!(
        notices.as_slice(),
        [RunNotice::DegradedAnalyzer { .. }]
    ));
}

#[tokio::test]
async fn analyzer_construction_failure_degrades() {
    let orchestrator = orchestrator(MockBackend {
        fail_llm_construction: true,
        ..Default::default()
    });
    let mut session = SessionState::new();
    let mut degraded = false;

    let table = orchestrator
        .run(&mut session, form("bjj", 2), reddit(true), openai(true), |event| {
            if let RunEvent::Notice(RunNotice::DegradedAnalyzer { .. }) = event {
                degraded = true;
            }
        })
        .await
        .unwrap();

    assert!(degraded);
    assert!(table
        .rows()
        .iter()
        .all(|row| row.analyzer == Some(AnalyzerKind::TextStats)));
}

#[tokio::test]
async fn failed_scrapes_still_get_a_row_and_analysis() {
    let orchestrator = orchestrator(MockBackend::default().failing(&["p1", "p3"]));
    let mut session = SessionState::new();

    let table = orchestrator
        .run(&mut session, form("bjj", 5), reddit(true), openai(true), |_| {})
        .await
        .unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(table.scrape_failures(), 2);
    for row in table.rows() {
        assert_eq!(row.analyzer, Some(AnalyzerKind::OpenAi));
        if row.scrape.is_success() {
            assert!(row.analysis.is_success());
        } else {
            assert!(matches!(row.analysis, AnalysisStatus::Failed { .. }));
        }
    }
    assert_eq!(session.last_export(), Some(&table));
}

#[tokio::test]
async fn progress_is_monotonic_and_complete() {
    let orchestrator = orchestrator(MockBackend::default().failing(&["p2"]));
    let mut session = SessionState::new();
    let mut events = Vec::new();

    orchestrator
        .run(&mut session, form("bjj, judo", 4), reddit(true), openai(true), |event| {
            events.push(event)
        })
        .await
        .unwrap();

    let stages: Vec<Stage> = events
        .iter()
        .filter_map(|event| match event {
            RunEvent::StageStarted(stage) => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![Stage::Collect, Stage::Scrape, Stage::Analyze, Stage::Export]
    );

    for stage in [Stage::Scrape, Stage::Analyze] {
        let progress: Vec<Progress> = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Progress(progress) if progress.stage == stage => Some(*progress),
                _ => None,
            })
            .collect();

        let completed: Vec<usize> = progress.iter().map(|p| p.completed).collect();
        assert_eq!(completed, (1..=8).collect::<Vec<_>>(), "{:?}", stage);
        assert!(progress.iter().all(|p| p.total == 8));
        assert_eq!(progress.last().map(|p| p.fraction()), Some(1.0));
    }
}

#[tokio::test]
async fn identical_runs_export_identical_json() {
    let orchestrator = orchestrator(MockBackend::default().failing(&["p0"]));

    let mut first_session = SessionState::new();
    let first = orchestrator
        .run(&mut first_session, form("r/bjj, judo", 6), reddit(true), openai(true), |_| {})
        .await
        .unwrap();

    let mut second_session = SessionState::new();
    let second = orchestrator
        .run(&mut second_session, form("r/bjj, judo", 6), reddit(true), openai(true), |_| {})
        .await
        .unwrap();

    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    // Rows follow subreddit order, then listing order
    assert_eq!(
        first.rows()[0].link.as_str(),
        "https://www.reddit.com/r/bjj/comments/p0/"
    );
    assert_eq!(
        first.rows()[6].link.as_str(),
        "https://www.reddit.com/r/judo/comments/p0/"
    );
}

#[tokio::test]
async fn rerun_replaces_previous_rows() {
    let orchestrator = orchestrator(MockBackend::default());
    let mut session = SessionState::new();

    orchestrator
        .run(&mut session, form("bjj", 10), reddit(true), openai(true), |_| {})
        .await
        .unwrap();
    assert_eq!(session.last_export().map(ExportTable::len), Some(10));

    let table = orchestrator
        .run(&mut session, form("bjj", 1), reddit(true), openai(true), |_| {})
        .await
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(session.last_export().map(ExportTable::len), Some(1));
}

#[tokio::test]
async fn empty_subreddits_use_default() {
    let orchestrator = orchestrator(MockBackend::default());
    let mut session = SessionState::new();
    let mut notices = Vec::new();

    let table = orchestrator
        .run(&mut session, form(" , ", 2), reddit(true), openai(true), |event| {
            if let RunEvent::Notice(notice) = event {
                notices.push(notice);
            }
        })
        .await
        .unwrap();

    assert_eq!(
        notices,
        vec![RunNotice::DefaultSubreddit {
            subreddit: "bjj".to_string()
        }]
    );
    assert!(table
        .rows()
        .iter()
        .all(|row| row.link.as_str().contains("/r/bjj/")));
}

#[tokio::test]
async fn invalid_post_limit_is_rejected() {
    let orchestrator = orchestrator(MockBackend::default());
    let mut session = SessionState::new();

    let result = orchestrator
        .run(&mut session, form("bjj", 0), reddit(true), openai(true), |_| {})
        .await;

    assert!(matches!(result, Err(RunError::InvalidRequest { .. })));
    assert!(session.last_export().is_none());
}

#[tokio::test]
async fn validator_skips_probe_for_incomplete_credentials() {
    let backend = Arc::new(MockBackend {
        reddit_probe_ok: true,
        openai_probe_ok: true,
        ..Default::default()
    });
    let validator = CredentialValidator::new(backend.clone());

    assert!(!validator.validate_social(&RedditCredentials::new("id", "")).await);
    assert!(!validator.validate_llm(&OpenAiCredentials::new("  ")).await);
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 0);

    assert!(validator.validate_social(&RedditCredentials::new("id", "secret")).await);
    assert!(validator.validate_llm(&OpenAiCredentials::new("sk-test")).await);
    assert_eq!(backend.probe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn validator_turns_probe_errors_into_false() {
    let validator = CredentialValidator::new(Arc::new(MockBackend::default()));

    assert!(!validator.validate_social(&RedditCredentials::new("id", "secret")).await);
    assert!(!validator.validate_llm(&OpenAiCredentials::new("sk-test")).await);
}
