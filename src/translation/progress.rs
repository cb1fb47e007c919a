/*!
 * Progress reporting over a channel.
 *
 * The pipeline is the only producer; consumers read `ProgressEvent`s from
 * the receiving end. Progress never decreases within a job, stage changes are
 * always delivered, and in-stage updates are debounced.
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Initializing,
    Analyzing,
    Researching,
    AnalyzingContent,
    Translating,
    Finalizing,
    Completed,
    Error,
}

impl ProgressStage {
    /// Percentage at which the stage starts
    pub fn base_percent(&self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::Analyzing => 5,
            Self::Researching => 10,
            Self::AnalyzingContent => 20,
            Self::Translating => TRANSLATING_BASE,
            Self::Finalizing => 95,
            Self::Completed => 100,
            Self::Error => 0,
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Analyzing => "analyzing",
            Self::Researching => "researching",
            Self::AnalyzingContent => "analyzing_content",
            Self::Translating => "translating",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Percentage where the translating stage begins
pub const TRANSLATING_BASE: u8 = 25;

/// Share of the bar covered by the translating stage
pub const TRANSLATING_WIDTH: u8 = 65;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Producer side of the progress stream
#[derive(Debug)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
    debounce: Duration,
    stage: ProgressStage,
    last_progress: u8,
    last_emit: Option<Instant>,
}

impl ProgressReporter {
    /// Reporter plus the receiving end of its stream
    pub fn channel(debounce: Duration) -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = unbounded_channel();
        (Self::with_sender(Some(sender), debounce), receiver)
    }

    /// Reporter that drops every event
    pub fn silent() -> Self {
        Self::with_sender(None, Duration::ZERO)
    }

    fn with_sender(sender: Option<UnboundedSender<ProgressEvent>>, debounce: Duration) -> Self {
        Self {
            sender,
            debounce,
            stage: ProgressStage::Initializing,
            last_progress: 0,
            last_emit: None,
        }
    }

    /// Current stage
    pub fn current_stage(&self) -> ProgressStage {
        self.stage
    }

    /// Highest progress reported so far
    pub fn last_progress(&self) -> u8 {
        self.last_progress
    }

    /// Enter a stage at its base percentage; always delivered
    pub fn stage(&mut self, stage: ProgressStage, details: Option<String>) {
        self.stage_at(stage, stage.base_percent(), details);
    }

    /// Enter a stage at an explicit percentage; always delivered
    pub fn stage_at(&mut self, stage: ProgressStage, progress: u8, details: Option<String>) {
        self.stage = stage;
        self.emit(progress, details);
    }

    /// Progress within the current stage; dropped inside the debounce window
    pub fn update(&mut self, progress: u8, details: Option<String>) {
        if let Some(last) = self.last_emit {
            if last.elapsed() < self.debounce {
                debug!("Debounced progress update {}%", progress);
                return;
            }
        }
        self.emit(progress, details);
    }

    /// Report a failure at the current progress
    pub fn error(&mut self, details: impl Into<String>) {
        self.stage = ProgressStage::Error;
        self.emit(self.last_progress, Some(details.into()));
    }

    fn emit(&mut self, progress: u8, details: Option<String>) {
        let progress = progress.clamp(self.last_progress, 100);
        self.last_progress = progress;
        self.last_emit = Some(Instant::now());

        let event = ProgressEvent {
            stage: self.stage,
            progress,
            details,
        };

        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                debug!("Progress receiver dropped");
                self.sender = None;
            }
        }
    }
}

/// Progress for the translating stage after `completed` of `total` batches
pub fn translating_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return TRANSLATING_BASE + TRANSLATING_WIDTH;
    }
    let share = completed.min(total) as f64 / total as f64;
    TRANSLATING_BASE + (share * TRANSLATING_WIDTH as f64).round() as u8
}
