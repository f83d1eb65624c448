use crate::{App, CheckStatus, Message};
use iced::widget::{
    button, column, container, pick_list, progress_bar, row, scrollable, slider, text,
    text_editor, text_input, Column,
};
use iced::{Color, Element, Length, Theme};
use scraipe_core::{ExportTable, SortType, TimeFilter};
use workflow::Progress;

const ERROR_COLOR: Color = Color {
    r: 0.8,
    g: 0.2,
    b: 0.2,
    a: 1.0,
};
const WARNING_COLOR: Color = Color {
    r: 0.85,
    g: 0.55,
    b: 0.1,
    a: 1.0,
};
const OK_COLOR: Color = Color {
    r: 0.2,
    g: 0.6,
    b: 0.3,
    a: 1.0,
};

pub(crate) fn render(app: &App) -> Element<Message, Theme> {
    let title: Element<Message, Theme> = text("Scraipe Reddit").size(28).into();

    let content = column![
        title,
        credentials_section(app),
        workflow_section(app),
        run_section(app),
        results_section(app),
    ]
    .spacing(24);

    container(scrollable(content.padding(20)))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn status_label(label: &str, status: CheckStatus) -> Element<'static, Message, Theme> {
    match status {
        CheckStatus::Checking => text(format!("{}: checking...", label)).size(14).into(),
        CheckStatus::Valid => text(format!("{} credentials are valid", label))
            .size(14)
            .style(OK_COLOR)
            .into(),
        CheckStatus::Invalid => text(format!("{} credentials are invalid", label))
            .size(14)
            .style(ERROR_COLOR)
            .into(),
    }
}

fn credentials_section(app: &App) -> Element<Message, Theme> {
    let reddit = column![
        text("Reddit").size(20),
        text_input("Client ID (blank uses the configured default)", &app.reddit_client_id)
            .on_input(Message::RedditClientIdChanged)
            .secure(true),
        text_input(
            "Client secret (blank uses the configured default)",
            &app.reddit_client_secret
        )
        .on_input(Message::RedditClientSecretChanged)
        .secure(true),
        row![
            button("Save").on_press_maybe((!app.reddit_saving).then_some(Message::SaveReddit)),
            status_label("Reddit", app.reddit_status()),
        ]
        .spacing(12),
    ]
    .spacing(8)
    .width(Length::FillPortion(1));

    let openai = column![
        text("OpenAI").size(20),
        text_input("API key (blank uses the configured default)", &app.openai_api_key)
            .on_input(Message::OpenAiKeyChanged)
            .secure(true),
        row![
            button("Save").on_press_maybe((!app.openai_saving).then_some(Message::SaveOpenAi)),
            status_label("OpenAI", app.openai_status()),
        ]
        .spacing(12),
    ]
    .spacing(8)
    .width(Length::FillPortion(1));

    row![reddit, openai].spacing(24).into()
}

fn workflow_section(app: &App) -> Element<Message, Theme> {
    let mut options = row![
        column![
            text("Sort").size(14),
            pick_list(&SortType::ALL[..], Some(app.sort), Message::SortSelected),
        ]
        .spacing(4),
        column![
            text(format!("Post limit: {}", app.post_limit)).size(14),
            slider(1..=100u8, app.post_limit, Message::PostLimitChanged),
        ]
        .spacing(4)
        .width(Length::Fixed(240.0)),
    ]
    .spacing(24);

    if app.sort == SortType::Top {
        options = options.push(
            column![
                text("Time filter").size(14),
                pick_list(
                    &TimeFilter::ALL[..],
                    Some(app.time_filter),
                    Message::TimeFilterSelected
                ),
            ]
            .spacing(4),
        );
    }

    column![
        text("Workflow").size(20),
        text_input("Subreddits, comma separated (e.g. bjj, judo)", &app.subreddits)
            .on_input(Message::SubredditsChanged),
        options,
        text("Instruction").size(14),
        text_editor(&app.instruction)
            .on_action(Message::InstructionEdited)
            .height(Length::Fixed(120.0)),
    ]
    .spacing(10)
    .into()
}

fn progress_row<'a>(label: &str, progress: Option<Progress>) -> Element<'a, Message, Theme> {
    let (fraction, caption) = match progress {
        Some(progress) => (
            progress.fraction(),
            format!("{} {} of {}", label, progress.completed, progress.total),
        ),
        None => (0.0, label.to_string()),
    };

    column![
        text(caption).size(14),
        progress_bar(0.0..=1.0, fraction).height(Length::Fixed(12.0)),
    ]
    .spacing(4)
    .into()
}

fn run_section(app: &App) -> Element<Message, Theme> {
    let status = match (&app.stage, app.is_running()) {
        (Some(stage), true) => format!("Running workflow: {}...", stage),
        (None, true) => "Starting workflow...".to_string(),
        (_, false) if app.reddit_status() == CheckStatus::Checking => {
            "Waiting for the Reddit credential check...".to_string()
        }
        (_, false) => String::new(),
    };

    let mut section = Column::new().spacing(10).push(
        row![
            button("Run").on_press_maybe(app.can_run().then_some(Message::Run)),
            text(status).size(14),
        ]
        .spacing(12),
    );

    if app.is_running() || app.scrape_progress.is_some() {
        section = section
            .push(progress_row("Scraping", app.scrape_progress))
            .push(progress_row("Analyzing", app.analyze_progress));
    }

    for notice in &app.notices {
        section = section.push(text(notice).size(14).style(WARNING_COLOR));
    }
    if let Some(error) = &app.run_error {
        section = section.push(text(error).size(14).style(ERROR_COLOR));
    }

    section.into()
}

fn results_section(app: &App) -> Element<Message, Theme> {
    match app.session().last_export() {
        Some(table) => results_table(table),
        None => text("No results yet").size(14).into(),
    }
}

fn results_table(table: &ExportTable) -> Element<Message, Theme> {
    let header = row![
        text("Link").size(14).width(Length::FillPortion(3)),
        text("Scrape").size(14).width(Length::FillPortion(1)),
        text("Analyzer").size(14).width(Length::FillPortion(1)),
        text("Analysis").size(14).width(Length::FillPortion(5)),
    ]
    .spacing(12);

    let rows = table.rows().iter().fold(Column::new().spacing(6), |rows, row| {
        let scrape = text(row.scrape_label()).size(13).width(Length::FillPortion(1));
        let scrape = if row.scrape.is_success() {
            scrape
        } else {
            scrape.style(ERROR_COLOR)
        };

        rows.push(
            row![
                text(row.link.as_str()).size(13).width(Length::FillPortion(3)),
                scrape,
                text(row.analyzer_label()).size(13).width(Length::FillPortion(1)),
                text(row.analysis_label()).size(13).width(Length::FillPortion(5)),
            ]
            .spacing(12),
        )
    });

    column![
        text(format!("Results ({} rows)", table.len())).size(20),
        header,
        scrollable(rows).height(Length::Fixed(400.0)),
    ]
    .spacing(8)
    .into()
}
