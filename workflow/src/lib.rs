pub mod live;
pub mod orchestrator;
pub mod stages;
pub mod store;
pub mod text_stats;
pub mod validator;

pub use live::LiveBackend;
pub use orchestrator::{Progress, RunError, RunEvent, RunNotice, RunOrchestrator, Stage};
pub use stages::{Analyzer, Backend, LinkCollector, RedditStages, Scraper};
pub use store::Workflow;
pub use text_stats::TextStatsAnalyzer;
pub use validator::CredentialValidator;
