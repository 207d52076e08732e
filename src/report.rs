//! Incremental accumulation of streamed fragments
//!
//! Generation runs on its own task and publishes [`GenerationEvent`]s. The UI
//! drains them on every tick and folds them into a [`Report`].

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::client::Generator;
use crate::prompt::GenerationRequest;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReportState {
    #[default]
    Idle,
    Generating,
    Done,
    Failed(String),
}

/// The growing document
#[derive(Debug, Default)]
pub struct Report {
    text: String,
    fragments: usize,
    state: ReportState,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &ReportState {
        &self.state
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn is_generating(&self) -> bool {
        self.state == ReportState::Generating
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn begin(&mut self) {
        self.text.clear();
        self.fragments = 0;
        self.state = ReportState::Generating;
    }

    /// Returns true when the document changed
    pub fn append(&mut self, fragment: &str) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
        true
    }

    pub fn finish(&mut self) {
        self.state = ReportState::Done;
    }

    /// Partial text is kept so the user still sees what arrived
    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = ReportState::Failed(message.into());
    }

    pub fn cancel(&mut self) {
        if self.is_generating() {
            self.state = ReportState::Idle;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Fragment { id: u64, text: String },
    Finished { id: u64 },
    Failed { id: u64, message: String },
}

impl GenerationEvent {
    pub fn id(&self) -> u64 {
        match self {
            GenerationEvent::Fragment { id, .. }
            | GenerationEvent::Finished { id }
            | GenerationEvent::Failed { id, .. } => *id,
        }
    }
}

/// Drive one generation to completion, forwarding everything to `tx`
pub fn spawn_generation(
    id: u64,
    generator: Arc<dyn Generator>,
    request: GenerationRequest,
    tx: UnboundedSender<GenerationEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(id, "generation started");
        tracing::debug!(id, prompt = %request.user_text(), "composed prompt");
        let mut stream = generator.stream(request);
        let mut count = 0usize;

        while let Some(item) = stream.next().await {
            match item {
                Ok(text) => {
                    count += 1;
                    if tx.send(GenerationEvent::Fragment { id, text }).is_err() {
                        tracing::debug!(id, "receiver gone, dropping generation");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(id, fragments = count, error = %e, "generation failed");
                    let _ = tx.send(GenerationEvent::Failed {
                        id,
                        message: e.to_string(),
                    });
                    return;
                }
            }
        }

        tracing::info!(id, fragments = count, "generation finished");
        let _ = tx.send(GenerationEvent::Finished { id });
    })
}
