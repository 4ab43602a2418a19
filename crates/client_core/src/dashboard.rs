use std::sync::Arc;

use shared::{domain::ModelInfo, protocol::TrainAcknowledgement};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{error::ServiceError, ClassificationService};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadPhase {
    Loading,
    Ready,
    LoadError(ServiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainPhase {
    Idle,
    Retraining,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub info: Option<ModelInfo>,
    pub phase: LoadPhase,
    pub fetch_in_flight: bool,
    pub retrain_phase: RetrainPhase,
    pub last_retrain_error: Option<ServiceError>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            info: None,
            phase: LoadPhase::Loading,
            fetch_in_flight: false,
            retrain_phase: RetrainPhase::Idle,
            last_retrain_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Ready(ModelInfo),
    Failed(ServiceError),
    AlreadyLoading,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    Retrained {
        acknowledgement: TrainAcknowledgement,
        refresh: FetchOutcome,
    },
    Failed(ServiceError),
    AlreadyRetraining,
}

pub struct ModelDashboardController {
    service: Arc<dyn ClassificationService>,
    state: watch::Sender<DashboardState>,
}

impl ModelDashboardController {
    /// Builds the controller in `Loading` without contacting the service.
    /// Use [`ModelDashboardController::open`] for the usual load-on-open behavior.
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self { service, state }
    }

    pub async fn open(service: Arc<dyn ClassificationService>) -> Self {
        let controller = Self::new(service);
        controller.fetch_info().await;
        controller
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn can_refresh(&self) -> bool {
        !self.state.borrow().fetch_in_flight
    }

    pub fn can_retrain(&self) -> bool {
        self.state.borrow().retrain_phase == RetrainPhase::Idle
    }

    pub async fn fetch_info(&self) -> FetchOutcome {
        let started = self.state.send_if_modified(|state| {
            if state.fetch_in_flight {
                return false;
            }
            state.fetch_in_flight = true;
            state.phase = LoadPhase::Loading;
            true
        });
        if !started {
            debug!("model info fetch already pending; request ignored");
            return FetchOutcome::AlreadyLoading;
        }

        let pending = PendingFetch::new(self);
        match self.service.model_info().await {
            Ok(info) => {
                info!(
                    model_type = info.model_type.as_deref().unwrap_or("unknown"),
                    test_accuracy = info.metrics.test_accuracy,
                    "model info loaded"
                );
                let snapshot = info.clone();
                pending.settle(move |state| {
                    state.info = Some(snapshot);
                    state.phase = LoadPhase::Ready;
                });
                FetchOutcome::Ready(info)
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch model info");
                let reason = err.clone();
                pending.settle(move |state| state.phase = LoadPhase::LoadError(reason));
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Retrains the model, then refreshes the displayed info once the retrain is done.
    /// Confirming the action with the user is the caller's job.
    pub async fn retrain(&self) -> RetrainOutcome {
        let started = self.state.send_if_modified(|state| {
            if state.retrain_phase == RetrainPhase::Retraining {
                return false;
            }
            state.retrain_phase = RetrainPhase::Retraining;
            state.last_retrain_error = None;
            true
        });
        if !started {
            debug!("retrain already pending; request ignored");
            return RetrainOutcome::AlreadyRetraining;
        }

        info!("retraining model");
        let pending = PendingRetrain::new(self);
        let response = self.service.retrain().await;

        match response {
            Ok(acknowledgement) => {
                pending.settle(None);
                info!(
                    message = acknowledgement.message.as_deref().unwrap_or(""),
                    "model retrained; refreshing model info"
                );
                let refresh = self.refresh_after_retrain().await;
                RetrainOutcome::Retrained {
                    acknowledgement,
                    refresh,
                }
            }
            Err(err) => {
                warn!(error = %err, "retrain failed");
                pending.settle(Some(err.clone()));
                RetrainOutcome::Failed(err)
            }
        }
    }

    /// Waits out a fetch started before the retrain finished so that the refresh
    /// observes the retrained model.
    async fn refresh_after_retrain(&self) -> FetchOutcome {
        let mut updates = self.state.subscribe();
        loop {
            let _ = updates.wait_for(|state| !state.fetch_in_flight).await;
            match self.fetch_info().await {
                FetchOutcome::AlreadyLoading => continue,
                outcome => return outcome,
            }
        }
    }
}

/// Clears `fetch_in_flight` even when the awaiting future is dropped.
struct PendingFetch<'a> {
    controller: &'a ModelDashboardController,
    settled: bool,
}

impl<'a> PendingFetch<'a> {
    fn new(controller: &'a ModelDashboardController) -> Self {
        Self {
            controller,
            settled: false,
        }
    }

    fn settle(mut self, apply: impl FnOnce(&mut DashboardState)) {
        self.settled = true;
        self.controller.state.send_modify(|state| {
            apply(state);
            state.fetch_in_flight = false;
        });
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.state.send_modify(|state| {
                state.fetch_in_flight = false;
                state.phase =
                    LoadPhase::LoadError(ServiceError::cancelled("model info fetch was cancelled"));
            });
        }
    }
}

/// Returns the retrain machine to `Idle` even when the awaiting future is dropped.
struct PendingRetrain<'a> {
    controller: &'a ModelDashboardController,
    settled: bool,
}

impl<'a> PendingRetrain<'a> {
    fn new(controller: &'a ModelDashboardController) -> Self {
        Self {
            controller,
            settled: false,
        }
    }

    fn settle(mut self, error: Option<ServiceError>) {
        self.settled = true;
        self.controller.state.send_modify(|state| {
            state.retrain_phase = RetrainPhase::Idle;
            state.last_retrain_error = error;
        });
    }
}

impl Drop for PendingRetrain<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.controller.state.send_modify(|state| {
                state.retrain_phase = RetrainPhase::Idle;
                state.last_retrain_error =
                    Some(ServiceError::cancelled("retrain request was cancelled"));
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
