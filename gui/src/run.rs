use crate::Message;
use futures::SinkExt;
use iced::subscription::{self, Subscription};
use scraipe_core::{Checked, OpenAiCredentials, RedditCredentials, RunForm, SessionState};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;
use workflow::RunOrchestrator;

/// Everything a run needs, captured when the user presses Run.
#[derive(Clone)]
pub struct RunJob {
    pub id: Uuid,
    pub orchestrator: Arc<RunOrchestrator>,
    pub session: SessionState,
    pub form: RunForm,
    pub reddit: Checked<RedditCredentials>,
    pub openai: Checked<OpenAiCredentials>,
}

impl std::fmt::Debug for RunJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunJob")
            .field("id", &self.id)
            .field("form", &self.form)
            .finish_non_exhaustive()
    }
}

/// Drives one run on the runtime and streams its events back as messages.
/// The subscription is keyed by the run id, so it starts once per run.
pub fn subscription(job: RunJob) -> Subscription<Message> {
    let id = job.id;

    subscription::channel(id, 100, move |mut output| async move {
        let RunJob {
            id,
            orchestrator,
            session,
            form,
            reddit,
            openai,
        } = job;
        let snapshot = session.clone();
        let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut session = session;
            let result = orchestrator
                .run(&mut session, form, reddit, openai, move |event| {
                    let _ = events_tx.send(event);
                })
                .await;
            (session, result)
        });

        while let Some(event) = events_rx.recv().await {
            let _ = output.send(Message::RunEvent(id, event)).await;
        }

        let finished = match handle.await {
            Ok((session, result)) => Message::RunFinished {
                id,
                session: Box::new(session),
                outcome: result.map_err(|e| e.to_string()),
            },
            Err(e) => {
                error!("Run task ended abnormally: {}", e);
                Message::RunFinished {
                    id,
                    session: Box::new(snapshot),
                    outcome: Err("The run stopped unexpectedly.".to_string()),
                }
            }
        };
        let _ = output.send(finished).await;

        loop {
            std::future::pending::<()>().await;
        }
    })
}
