use super::*;
use crate::{
    error::ServiceErrorKind,
    test_support::{acknowledgement, model_info, Call, StubService},
    view::{MetricsSummary, NOT_AVAILABLE},
};
use std::time::Duration;

fn controller_with(stub: StubService) -> (ModelDashboardController, Arc<StubService>) {
    let stub = Arc::new(stub);
    (ModelDashboardController::new(stub.clone()), stub)
}

async fn opened_with(stub: StubService) -> (ModelDashboardController, Arc<StubService>) {
    let stub = Arc::new(stub);
    (ModelDashboardController::open(stub.clone()).await, stub)
}

#[tokio::test]
async fn new_controller_is_loading_without_contacting_the_service() {
    let (controller, stub) = controller_with(StubService::new());

    let state = controller.state();
    assert_eq!(state.phase, LoadPhase::Loading);
    assert_eq!(state.retrain_phase, RetrainPhase::Idle);
    assert!(state.info.is_none());
    assert!(controller.can_refresh());
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn open_fetches_once_and_renders_available_figures() {
    let (controller, stub) =
        opened_with(StubService::new().with_model_info(Ok(model_info(0.87, 4000)))).await;

    let state = controller.state();
    assert_eq!(state.phase, LoadPhase::Ready);
    assert!(!state.fetch_in_flight);
    assert_eq!(stub.calls(), vec![Call::ModelInfo]);

    let summary = MetricsSummary::from(state.info.as_ref().expect("info loaded"));
    assert_eq!(summary.test_accuracy, "87.0%");
    assert_eq!(summary.training_samples, "4000");
    assert_eq!(summary.features_count, NOT_AVAILABLE);
}

#[tokio::test]
async fn failed_fetch_keeps_previously_loaded_info() {
    let (controller, _) = opened_with(
        StubService::new()
            .with_model_info(Ok(model_info(0.87, 4000)))
            .with_model_info(Err(ServiceError::status(500, "Error: boom"))),
    )
    .await;

    let outcome = controller.fetch_info().await;

    assert!(matches!(outcome, FetchOutcome::Failed(_)));
    let state = controller.state();
    assert!(matches!(state.phase, LoadPhase::LoadError(ref err) if err.status == Some(500)));
    assert_eq!(state.info, Some(model_info(0.87, 4000)));
}

#[tokio::test]
async fn failed_first_fetch_leaves_info_absent_and_allows_retry() {
    let (controller, stub) = opened_with(
        StubService::new()
            .with_model_info(Err(ServiceError::network("connection refused")))
            .with_model_info(Ok(model_info(0.9, 100))),
    )
    .await;

    let state = controller.state();
    assert!(matches!(state.phase, LoadPhase::LoadError(_)));
    assert!(state.info.is_none());

    assert!(matches!(
        controller.fetch_info().await,
        FetchOutcome::Ready(_)
    ));
    assert_eq!(controller.state().phase, LoadPhase::Ready);
    assert_eq!(stub.count(Call::ModelInfo), 2);
}

#[tokio::test]
async fn fetch_is_refused_while_another_is_pending() {
    let (stub, gate) = StubService::new()
        .with_model_info(Ok(model_info(0.87, 4000)))
        .gated();
    let (controller, stub) = controller_with(stub);

    let first = controller.fetch_info();
    let second = async {
        tokio::task::yield_now().await;
        assert!(!controller.can_refresh());
        let outcome = controller.fetch_info().await;
        gate.add_permits(1);
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, FetchOutcome::Ready(_)));
    assert_eq!(second, FetchOutcome::AlreadyLoading);
    assert_eq!(stub.count(Call::ModelInfo), 1);
}

#[tokio::test]
async fn successful_retrain_triggers_exactly_one_refresh() {
    let (controller, stub) = opened_with(
        StubService::new()
            .with_model_info(Ok(model_info(0.80, 3000)))
            .with_retrain(Ok(acknowledgement()))
            .with_model_info(Ok(model_info(0.87, 4000))),
    )
    .await;

    let outcome = controller.retrain().await;

    let (ack, refresh) = match outcome {
        RetrainOutcome::Retrained {
            acknowledgement,
            refresh,
        } => (acknowledgement, refresh),
        other => panic!("expected retrain success, got {other:?}"),
    };
    assert_eq!(ack.message.as_deref(), Some("Model trained successfully"));
    assert_eq!(refresh, FetchOutcome::Ready(model_info(0.87, 4000)));
    assert_eq!(
        stub.calls(),
        vec![Call::ModelInfo, Call::Retrain, Call::ModelInfo]
    );

    let state = controller.state();
    assert_eq!(state.info, Some(model_info(0.87, 4000)));
    assert_eq!(state.retrain_phase, RetrainPhase::Idle);
    assert!(state.last_retrain_error.is_none());
}

#[tokio::test]
async fn failed_retrain_triggers_no_refresh() {
    let (controller, stub) = opened_with(
        StubService::new()
            .with_model_info(Ok(model_info(0.80, 3000)))
            .with_retrain(Err(ServiceError::status(500, "Training error: disk full"))),
    )
    .await;

    let outcome = controller.retrain().await;

    assert!(matches!(outcome, RetrainOutcome::Failed(ref err) if err.status == Some(500)));
    assert_eq!(stub.calls(), vec![Call::ModelInfo, Call::Retrain]);

    let state = controller.state();
    assert_eq!(state.info, Some(model_info(0.80, 3000)));
    assert_eq!(state.phase, LoadPhase::Ready);
    assert_eq!(state.retrain_phase, RetrainPhase::Idle);
    assert_eq!(
        state.last_retrain_error.map(|err| err.message),
        Some("Training error: disk full".to_string())
    );
}

#[tokio::test]
async fn retrain_is_refused_while_retraining_and_leaves_load_phase_alone() {
    let (stub, gate) = StubService::new()
        .with_model_info(Ok(model_info(0.80, 3000)))
        .with_retrain(Ok(acknowledgement()))
        .with_model_info(Ok(model_info(0.87, 4000)))
        .gated();
    gate.add_permits(1);
    let (controller, stub) = opened_with(stub).await;

    let first = controller.retrain();
    let second = async {
        tokio::task::yield_now().await;
        let state = controller.state();
        assert_eq!(state.retrain_phase, RetrainPhase::Retraining);
        assert_eq!(state.phase, LoadPhase::Ready);
        assert!(!controller.can_retrain());
        let outcome = controller.retrain().await;
        gate.add_permits(2);
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first, RetrainOutcome::Retrained { .. }));
    assert_eq!(second, RetrainOutcome::AlreadyRetraining);
    assert_eq!(stub.count(Call::Retrain), 1);
    assert!(controller.can_retrain());
}

#[tokio::test]
async fn refresh_after_retrain_waits_for_a_pending_fetch() {
    let (stub, gate) = StubService::new()
        .with_model_info(Ok(model_info(0.80, 3000)))
        .with_retrain(Ok(acknowledgement()))
        .with_model_info(Ok(model_info(0.87, 4000)))
        .gated();
    let (controller, stub) = controller_with(stub);

    let fetch = controller.fetch_info();
    let retrain = controller.retrain();
    let release = async {
        tokio::task::yield_now().await;
        gate.add_permits(3);
    };
    let (fetched, retrained, ()) = tokio::join!(fetch, retrain, release);

    assert!(matches!(fetched, FetchOutcome::Ready(_)));
    assert!(matches!(
        retrained,
        RetrainOutcome::Retrained {
            refresh: FetchOutcome::Ready(_),
            ..
        }
    ));
    assert_eq!(stub.count(Call::ModelInfo), 2);
    assert_eq!(controller.state().info, Some(model_info(0.87, 4000)));
}

#[tokio::test]
async fn dropped_fetch_and_retrain_do_not_leave_controller_stuck() {
    let (stub, _gate) = StubService::new().gated();
    let (controller, _) = controller_with(stub);

    let fetch = tokio::time::timeout(Duration::from_millis(20), controller.fetch_info()).await;
    assert!(fetch.is_err());
    let retrain = tokio::time::timeout(Duration::from_millis(20), controller.retrain()).await;
    assert!(retrain.is_err());

    let state = controller.state();
    assert!(!state.fetch_in_flight);
    assert!(
        matches!(state.phase, LoadPhase::LoadError(ref err) if err.kind == ServiceErrorKind::Cancelled)
    );
    assert_eq!(state.retrain_phase, RetrainPhase::Idle);
    assert!(controller.can_refresh());
    assert!(controller.can_retrain());
}
