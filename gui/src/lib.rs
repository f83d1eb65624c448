pub mod run;
mod view;

use iced::widget::text_editor;
use iced::{Command, Element, Subscription, Theme};
use run::RunJob;
use scraipe_core::{
    AppConfig, Checked, ExportTable, InitialOpenAiValid, InitialRedditValid, LastExport,
    OpenAiCredentials, RedditCredentials, RunForm, SavedOpenAi, SavedReddit, SessionState,
    SortType, TimeFilter,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use workflow::{
    Backend, CredentialValidator, LiveBackend, Progress, RunEvent, RunOrchestrator, Stage,
};

#[derive(Debug, Clone)]
pub enum Message {
    InitialRedditChecked(bool),
    InitialOpenAiChecked(bool),
    RedditClientIdChanged(String),
    RedditClientSecretChanged(String),
    SaveReddit,
    RedditSaved(Checked<RedditCredentials>),
    OpenAiKeyChanged(String),
    SaveOpenAi,
    OpenAiSaved(Checked<OpenAiCredentials>),
    SubredditsChanged(String),
    SortSelected(SortType),
    PostLimitChanged(u8),
    TimeFilterSelected(TimeFilter),
    InstructionEdited(text_editor::Action),
    Run,
    RunEvent(Uuid, RunEvent),
    RunFinished {
        id: Uuid,
        session: Box<SessionState>,
        outcome: Result<ExportTable, String>,
    },
}

/// Validity shown next to a credential section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Checking,
    Valid,
    Invalid,
}

impl CheckStatus {
    fn from_valid(valid: bool) -> Self {
        if valid {
            CheckStatus::Valid
        } else {
            CheckStatus::Invalid
        }
    }
}

pub struct App {
    config: AppConfig,
    orchestrator: Arc<RunOrchestrator>,
    validator: Arc<CredentialValidator>,
    session: SessionState,

    reddit_client_id: String,
    reddit_client_secret: String,
    reddit_saving: bool,
    openai_api_key: String,
    openai_saving: bool,

    subreddits: String,
    sort: SortType,
    post_limit: u8,
    time_filter: TimeFilter,
    instruction: text_editor::Content,

    active_run: Option<RunJob>,
    stage: Option<Stage>,
    scrape_progress: Option<Progress>,
    analyze_progress: Option<Progress>,
    notices: Vec<String>,
    run_error: Option<String>,
}

impl App {
    /// Builds the app against the live services and starts probing the
    /// configured default credentials.
    pub fn new(config: AppConfig) -> (Self, Command<Message>) {
        let backend = Arc::new(LiveBackend::new(config.settings.clone()));
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: AppConfig, backend: Arc<dyn Backend>) -> (Self, Command<Message>) {
        let orchestrator = Arc::new(RunOrchestrator::new(backend.clone(), config.settings.clone()));
        let validator = Arc::new(CredentialValidator::new(backend));

        let app = Self {
            orchestrator,
            validator,
            session: SessionState::new(),
            reddit_client_id: String::new(),
            reddit_client_secret: String::new(),
            reddit_saving: false,
            openai_api_key: String::new(),
            openai_saving: false,
            subreddits: String::new(),
            sort: SortType::default(),
            post_limit: 10,
            time_filter: TimeFilter::default(),
            instruction: text_editor::Content::with_text(&config.settings.instruction),
            active_run: None,
            stage: None,
            scrape_progress: None,
            analyze_progress: None,
            notices: Vec::new(),
            run_error: None,
            config,
        };

        let reddit = app.config.reddit.clone();
        let openai = app.config.openai.clone();
        let reddit_validator = app.validator.clone();
        let openai_validator = app.validator.clone();
        let command = Command::batch(vec![
            Command::perform(
                async move { reddit_validator.validate_social(&reddit).await },
                Message::InitialRedditChecked,
            ),
            Command::perform(
                async move { openai_validator.validate_llm(&openai).await },
                Message::InitialOpenAiChecked,
            ),
        ]);

        (app, command)
    }

    pub fn title(&self) -> String {
        "Scraipe Reddit".to_string()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.active_run.is_some()
    }

    /// A run needs a settled Reddit check: until the startup probe or a save
    /// finishes, the credentials would resolve as invalid.
    pub fn can_run(&self) -> bool {
        !self.is_running() && self.reddit_status() != CheckStatus::Checking
    }

    pub fn reddit_status(&self) -> CheckStatus {
        if self.reddit_saving {
            return CheckStatus::Checking;
        }
        match (
            self.session.get::<SavedReddit>(),
            self.session.get::<InitialRedditValid>(),
        ) {
            (Some(saved), _) => CheckStatus::from_valid(saved.valid),
            (None, Some(valid)) => CheckStatus::from_valid(*valid),
            (None, None) => CheckStatus::Checking,
        }
    }

    pub fn openai_status(&self) -> CheckStatus {
        if self.openai_saving {
            return CheckStatus::Checking;
        }
        match (
            self.session.get::<SavedOpenAi>(),
            self.session.get::<InitialOpenAiValid>(),
        ) {
            (Some(saved), _) => CheckStatus::from_valid(saved.valid),
            (None, Some(valid)) => CheckStatus::from_valid(*valid),
            (None, None) => CheckStatus::Checking,
        }
    }

    fn form(&self) -> RunForm {
        RunForm {
            subreddits: self.subreddits.clone(),
            sort: self.sort,
            post_limit: u32::from(self.post_limit),
            time_filter: self.time_filter,
            instruction: self.instruction.text().trim_end().to_string(),
        }
    }

    pub fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::InitialRedditChecked(valid) => {
                self.session.get_or_default::<InitialRedditValid>(valid);
                Command::none()
            }
            Message::InitialOpenAiChecked(valid) => {
                self.session.get_or_default::<InitialOpenAiValid>(valid);
                Command::none()
            }
            Message::RedditClientIdChanged(value) => {
                self.reddit_client_id = value;
                Command::none()
            }
            Message::RedditClientSecretChanged(value) => {
                self.reddit_client_secret = value;
                Command::none()
            }
            Message::SaveReddit => {
                let credentials = RedditCredentials::new(
                    self.reddit_client_id.clone(),
                    self.reddit_client_secret.clone(),
                )
                .or_defaults(&self.config.reddit);
                self.reddit_saving = true;

                let validator = self.validator.clone();
                Command::perform(
                    async move {
                        let valid = validator.validate_social(&credentials).await;
                        Checked::new(credentials, valid)
                    },
                    Message::RedditSaved,
                )
            }
            Message::RedditSaved(checked) => {
                info!("Saved Reddit credentials (valid: {})", checked.valid);
                self.reddit_saving = false;
                self.session.set::<SavedReddit>(checked);
                Command::none()
            }
            Message::OpenAiKeyChanged(value) => {
                self.openai_api_key = value;
                Command::none()
            }
            Message::SaveOpenAi => {
                let credentials = OpenAiCredentials::new(self.openai_api_key.clone())
                    .or_defaults(&self.config.openai);
                self.openai_saving = true;

                let validator = self.validator.clone();
                Command::perform(
                    async move {
                        let valid = validator.validate_llm(&credentials).await;
                        Checked::new(credentials, valid)
                    },
                    Message::OpenAiSaved,
                )
            }
            Message::OpenAiSaved(checked) => {
                info!("Saved OpenAI key (valid: {})", checked.valid);
                self.openai_saving = false;
                self.session.set::<SavedOpenAi>(checked);
                Command::none()
            }
            Message::SubredditsChanged(value) => {
                self.subreddits = value;
                Command::none()
            }
            Message::SortSelected(sort) => {
                self.sort = sort;
                Command::none()
            }
            Message::PostLimitChanged(limit) => {
                self.post_limit = limit;
                Command::none()
            }
            Message::TimeFilterSelected(filter) => {
                self.time_filter = filter;
                Command::none()
            }
            Message::InstructionEdited(action) => {
                self.instruction.perform(action);
                Command::none()
            }
            Message::Run => {
                if self.is_running() {
                    warn!("Run requested while another run is active");
                    return Command::none();
                }
                if !self.can_run() {
                    warn!("Run requested before the Reddit credential check finished");
                    return Command::none();
                }

                let job = RunJob {
                    id: Uuid::new_v4(),
                    orchestrator: self.orchestrator.clone(),
                    session: self.session.clone(),
                    form: self.form(),
                    reddit: self.session.resolved_reddit(&self.config.reddit),
                    openai: self.session.resolved_openai(&self.config.openai),
                };
                info!("Starting run {}", job.id);

                self.stage = None;
                self.scrape_progress = None;
                self.analyze_progress = None;
                self.notices.clear();
                self.run_error = None;
                self.active_run = Some(job);
                Command::none()
            }
            Message::RunEvent(id, event) => {
                if self.active_run.as_ref().map(|job| job.id) != Some(id) {
                    return Command::none();
                }
                match event {
                    RunEvent::Notice(notice) => self.notices.push(notice.to_string()),
                    RunEvent::StageStarted(stage) => self.stage = Some(stage),
                    RunEvent::Progress(progress) => match progress.stage {
                        Stage::Scrape => self.scrape_progress = Some(progress),
                        Stage::Analyze => self.analyze_progress = Some(progress),
                        Stage::Collect | Stage::Export => {}
                    },
                }
                Command::none()
            }
            Message::RunFinished {
                id,
                session,
                outcome,
            } => {
                if self.active_run.as_ref().map(|job| job.id) != Some(id) {
                    return Command::none();
                }
                self.active_run = None;
                self.stage = None;

                match outcome {
                    Ok(table) => {
                        info!("Run {} produced {} rows", id, table.len());
                        // Only the export comes from the run's snapshot; checks
                        // and saves made meanwhile stay in the live session.
                        if let Some(export) = session.last_export() {
                            self.session.set::<LastExport>(export.clone());
                        }
                    }
                    Err(message) => {
                        warn!("Run {} failed: {}", id, message);
                        self.run_error = Some(message);
                    }
                }
                Command::none()
            }
        }
    }

    pub fn view(&self) -> Element<Message, Theme> {
        view::render(self)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        match &self.active_run {
            Some(job) => run::subscription(job.clone()),
            None => Subscription::none(),
        }
    }
}
