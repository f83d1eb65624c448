use gui::App;
use iced::{Application, Command, Element, Settings, Subscription, Theme};
use scraipe_core::{AppConfig, CoreError, ErrorExt};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "scraipe_reddit=info,workflow=info,reddit_client=info,llm_interface=info,gui=info";

fn main() -> Result<(), CoreError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting Scraipe Reddit");

    let config = AppConfig::load().map_err(|e| {
        e.log_error();
        e
    })?;
    config.warn_unconfigured();

    let mut settings = Settings::with_flags(config);
    settings.window.size = iced::Size::new(1200.0, 900.0);
    settings.window.min_size = Some(iced::Size::new(800.0, 600.0));

    ScraipeApp::run(settings).map_err(|e| {
        tracing::error!("Application error: {}", e);
        CoreError::Internal {
            message: format!("GUI error: {e}"),
        }
    })
}

struct ScraipeApp {
    app: App,
}

impl Application for ScraipeApp {
    type Message = gui::Message;
    type Theme = Theme;
    type Executor = iced::executor::Default;
    type Flags = AppConfig;

    fn new(config: Self::Flags) -> (Self, Command<Self::Message>) {
        tracing::info!("Initializing application");
        let (app, command) = App::new(config);
        (Self { app }, command)
    }

    fn title(&self) -> String {
        self.app.title()
    }

    fn update(&mut self, message: Self::Message) -> Command<Self::Message> {
        self.app.update(message)
    }

    fn view(&self) -> Element<Self::Message> {
        self.app.view()
    }

    fn subscription(&self) -> Subscription<Self::Message> {
        self.app.subscription()
    }
}
