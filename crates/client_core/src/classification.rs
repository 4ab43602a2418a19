use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::domain::{ArticleInput, ClassificationResult, ExampleKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    error::{ServiceError, ValidationError},
    ClassificationService,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationPhase {
    Idle,
    Submitting,
    Succeeded(ClassificationResult),
    Failed(ServiceError),
}

impl ClassificationPhase {
    pub fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationState {
    pub input: ArticleInput,
    pub phase: ClassificationPhase,
}

impl Default for ClassificationState {
    fn default() -> Self {
        Self {
            input: ArticleInput::default(),
            phase: ClassificationPhase::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded(ClassificationResult),
    Failed(ServiceError),
    /// Another submission is still pending; nothing was sent.
    AlreadySubmitting,
}

enum SubmitGate {
    Busy,
    Incomplete,
    Start { payload: ArticleInput, request: u64 },
}

pub struct ClassificationController {
    service: Arc<dyn ClassificationService>,
    state: watch::Sender<ClassificationState>,
    latest_request: AtomicU64,
}

impl ClassificationController {
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        let (state, _) = watch::channel(ClassificationState::default());
        Self {
            service,
            state,
            latest_request: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> ClassificationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClassificationState> {
        self.state.subscribe()
    }

    pub fn set_title(&self, text: impl Into<String>) -> Result<(), ValidationError> {
        let text = text.into();
        self.edit("set_title", |input| input.title = text)
    }

    pub fn set_content(&self, text: impl Into<String>) -> Result<(), ValidationError> {
        let text = text.into();
        self.edit("set_content", |input| input.content = text)
    }

    pub fn load_example(&self, kind: ExampleKind) -> Result<(), ValidationError> {
        self.edit("load_example", |input| *input = kind.article().to_input())
    }

    fn edit(
        &self,
        intent: &'static str,
        apply: impl FnOnce(&mut ArticleInput),
    ) -> Result<(), ValidationError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            if state.phase.is_submitting() {
                outcome = Err(ValidationError::InputLocked);
                return false;
            }
            apply(&mut state.input);
            state.phase = ClassificationPhase::Idle;
            true
        });
        if outcome.is_err() {
            debug!(intent, "ignored input edit while a classification is pending");
        }
        outcome
    }

    /// Sends the trimmed input to the service. At most one call is outstanding per
    /// controller; re-entrant calls while `Submitting` return `AlreadySubmitting`.
    pub async fn submit(&self) -> Result<SubmitOutcome, ValidationError> {
        let mut gate = SubmitGate::Busy;
        self.state.send_if_modified(|state| {
            if state.phase.is_submitting() {
                return false;
            }
            if !state.input.is_complete() {
                gate = SubmitGate::Incomplete;
                return false;
            }
            let request = self.latest_request.fetch_add(1, Ordering::AcqRel) + 1;
            gate = SubmitGate::Start {
                payload: state.input.trimmed(),
                request,
            };
            state.phase = ClassificationPhase::Submitting;
            true
        });

        let (payload, request) = match gate {
            SubmitGate::Busy => {
                debug!("classification already pending; submit ignored");
                return Ok(SubmitOutcome::AlreadySubmitting);
            }
            SubmitGate::Incomplete => {
                warn!("rejected submission with empty title or content");
                return Err(ValidationError::MissingFields);
            }
            SubmitGate::Start { payload, request } => (payload, request),
        };

        info!(
            request,
            title_chars = payload.title.chars().count(),
            content_chars = payload.content.chars().count(),
            "submitting article for classification"
        );
        let pending = PendingSubmission::new(self, request);
        let response = self.service.classify(&payload).await;

        let outcome = match response {
            Ok(result) => {
                info!(
                    request,
                    prediction = %result.prediction,
                    confidence = result.confidence,
                    "article classified"
                );
                pending.settle(ClassificationPhase::Succeeded(result.clone()));
                SubmitOutcome::Succeeded(result)
            }
            Err(err) => {
                warn!(request, error = %err, "classification failed");
                pending.settle(ClassificationPhase::Failed(err.clone()));
                SubmitOutcome::Failed(err)
            }
        };
        Ok(outcome)
    }

    fn finish(&self, request: u64, phase: ClassificationPhase) -> bool {
        let applied = self.state.send_if_modified(|state| {
            if !state.phase.is_submitting()
                || self.latest_request.load(Ordering::Acquire) != request
            {
                return false;
            }
            state.phase = phase;
            true
        });
        if !applied {
            warn!(request, "discarded stale classification response");
        }
        applied
    }
}

/// Leaves `Submitting` even when the awaiting future is dropped.
struct PendingSubmission<'a> {
    controller: &'a ClassificationController,
    request: u64,
    settled: bool,
}

impl<'a> PendingSubmission<'a> {
    fn new(controller: &'a ClassificationController, request: u64) -> Self {
        Self {
            controller,
            request,
            settled: false,
        }
    }

    fn settle(mut self, phase: ClassificationPhase) {
        self.settled = true;
        self.controller.finish(self.request, phase);
    }
}

impl Drop for PendingSubmission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.finish(
                self.request,
                ClassificationPhase::Failed(ServiceError::cancelled(
                    "classification request was cancelled",
                )),
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/classification_tests.rs"]
mod tests;
