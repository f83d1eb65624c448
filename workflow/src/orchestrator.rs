//! Run orchestration: resolves user input, picks the analyzer and drives the
//! collect, scrape, analyze and export stages in order.

use crate::stages::{Analyzer, Backend};
use crate::store::Workflow;
use crate::text_stats::TextStatsAnalyzer;
use scraipe_core::{
    parse_subreddits, Checked, ErrorExt, ExportTable, LastExport, OpenAiCredentials, PostLimit,
    RedditCredentials, RunForm, RunRequest, SessionState, Settings, SortType,
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Collect,
    Scrape,
    Analyze,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Collect => f.write_str("collecting links"),
            Stage::Scrape => f.write_str("scraping"),
            Stage::Analyze => f.write_str("analyzing"),
            Stage::Export => f.write_str("exporting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share in `0.0..=1.0`; an empty stage counts as done.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Non-fatal conditions reported while a run continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunNotice {
    DefaultSubreddit { subreddit: String },
    DegradedAnalyzer { reason: String },
}

impl fmt::Display for RunNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunNotice::DefaultSubreddit { subreddit } => {
                write!(f, "No subreddit entered, using r/{}", subreddit)
            }
            RunNotice::DegradedAnalyzer { reason } => {
                write!(f, "{}. Defaulting to the text statistics analyzer.", reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Notice(RunNotice),
    StageStarted(Stage),
    Progress(Progress),
}

/// Errors that abort a run before it produces a table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Reddit credentials are invalid. Please check your credentials.")]
    InvalidRedditCredentials,

    #[error("Invalid run request: {message}")]
    InvalidRequest { message: String },

    #[error("Collecting links failed: {message}")]
    CollectFailed { message: String },
}

/// Turns raw form input into a run request. An empty subreddit list is
/// replaced by `default_subreddit` and reported as a notice.
pub fn resolve_request(
    form: &RunForm,
    default_subreddit: &str,
) -> Result<(RunRequest, Option<RunNotice>), RunError> {
    let post_limit = PostLimit::new(form.post_limit).map_err(|e| RunError::InvalidRequest {
        message: e.user_friendly_message(),
    })?;

    let mut subreddits = parse_subreddits(&form.subreddits);
    let notice = if subreddits.is_empty() {
        subreddits.push(default_subreddit.to_string());
        Some(RunNotice::DefaultSubreddit {
            subreddit: default_subreddit.to_string(),
        })
    } else {
        None
    };

    let time_filter = (form.sort == SortType::Top).then_some(form.time_filter);

    let request = RunRequest {
        subreddits,
        sort: form.sort,
        post_limit,
        time_filter,
        instruction: form.instruction.clone(),
    };
    Ok((request, notice))
}

pub struct RunOrchestrator {
    backend: Arc<dyn Backend>,
    settings: Settings,
}

impl RunOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, settings: Settings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Executes one run. On success the table is stored as the session's last
    /// export and returned; on error the session is left untouched.
    pub async fn run<F>(
        &self,
        session: &mut SessionState,
        form: RunForm,
        reddit: Checked<RedditCredentials>,
        openai: Checked<OpenAiCredentials>,
        mut observer: F,
    ) -> Result<ExportTable, RunError>
    where
        F: FnMut(RunEvent) + Send,
    {
        let (request, notice) = resolve_request(&form, &self.settings.default_subreddit)?;
        if let Some(notice) = notice {
            warn!("{}", notice);
            observer(RunEvent::Notice(notice));
        }

        if !reddit.valid {
            error!("Refusing to run with invalid Reddit credentials");
            return Err(RunError::InvalidRedditCredentials);
        }

        let stages = self
            .backend
            .reddit_stages(&reddit.credentials)
            .map_err(|e| RunError::CollectFailed {
                message: e.log_error().user_friendly_message(),
            })?;
        let analyzer = self.resolve_analyzer(&openai, &request.instruction, &mut observer);

        info!(
            "Starting run over {:?} ({}, limit {}) with {} analyzer",
            request.subreddits,
            request.sort,
            request.post_limit.get(),
            analyzer.kind()
        );

        let mut workflow = Workflow::new(self.settings.concurrency);
        workflow.clear_store();

        observer(RunEvent::StageStarted(Stage::Collect));
        let link_count = workflow
            .collect_links(stages.collector.as_ref(), &request.collect_query())
            .await
            .map_err(|e| RunError::CollectFailed {
                message: e.log_error().user_friendly_message(),
            })?
            .len();
        info!("Collected {} links", link_count);

        observer(RunEvent::StageStarted(Stage::Scrape));
        workflow
            .scrape(stages.scraper.as_ref(), |completed, total| {
                observer(RunEvent::Progress(Progress {
                    stage: Stage::Scrape,
                    completed,
                    total,
                }))
            })
            .await;

        observer(RunEvent::StageStarted(Stage::Analyze));
        workflow
            .analyze(analyzer.as_ref(), |completed, total| {
                observer(RunEvent::Progress(Progress {
                    stage: Stage::Analyze,
                    completed,
                    total,
                }))
            })
            .await;

        observer(RunEvent::StageStarted(Stage::Export));
        let table = workflow.export();
        info!(
            "Run finished: {} rows, {} scrape failures",
            table.len(),
            table.scrape_failures()
        );

        session.set::<LastExport>(table.clone());
        Ok(table)
    }

    fn resolve_analyzer<F>(
        &self,
        openai: &Checked<OpenAiCredentials>,
        instruction: &str,
        observer: &mut F,
    ) -> Arc<dyn Analyzer>
    where
        F: FnMut(RunEvent),
    {
        let reason = if openai.valid {
            match self.backend.llm_analyzer(&openai.credentials, instruction) {
                Ok(analyzer) => return analyzer,
                Err(e) => format!(
                    "OpenAI analyzer unavailable: {}",
                    e.log_error().user_friendly_message()
                ),
            }
        } else {
            "OpenAI credentials are invalid".to_string()
        };

        let notice = RunNotice::DegradedAnalyzer { reason };
        warn!("{}", notice);
        observer(RunEvent::Notice(notice));
        Arc::new(TextStatsAnalyzer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraipe_core::TimeFilter;

    fn form(subreddits: &str) -> RunForm {
        RunForm {
            subreddits: subreddits.to_string(),
            sort: SortType::Hot,
            post_limit: 10,
            time_filter: TimeFilter::Week,
            instruction: "Summarize".to_string(),
        }
    }

    #[test]
    fn test_progress_fraction() {
        let empty = Progress {
            stage: Stage::Scrape,
            completed: 0,
            total: 0,
        };
        assert_eq!(empty.fraction(), 1.0);

        let half = Progress {
            stage: Stage::Analyze,
            completed: 2,
            total: 4,
        };
        assert_eq!(half.fraction(), 0.5);
    }

    #[test]
    fn test_resolve_request_normalizes_names() {
        let (request, notice) =
            resolve_request(&form("r/bjj, judo ,r/r/wrestling"), "bjj").unwrap();
        assert_eq!(request.subreddits, vec!["bjj", "judo", "r/wrestling"]);
        assert!(notice.is_none());
        assert_eq!(request.time_filter, None);
    }

    #[test]
    fn test_resolve_request_substitutes_default() {
        for input in ["", "  ", " , r/ "] {
            let (request, notice) = resolve_request(&form(input), "bjj").unwrap();
            assert_eq!(request.subreddits, vec!["bjj"]);
            assert_eq!(
                notice,
                Some(RunNotice::DefaultSubreddit {
                    subreddit: "bjj".to_string()
                })
            );
        }
    }

    #[test]
    fn test_time_filter_only_for_top() {
        let mut top = form("bjj");
        top.sort = SortType::Top;
        let (request, _) = resolve_request(&top, "bjj").unwrap();
        assert_eq!(request.time_filter, Some(TimeFilter::Week));
    }

    #[test]
    fn test_out_of_range_limit_is_rejected() {
        for limit in [0, 101] {
            let mut invalid = form("bjj");
            invalid.post_limit = limit;
            assert!(matches!(
                resolve_request(&invalid, "bjj"),
                Err(RunError::InvalidRequest { .. })
            ));
        }
    }
}
