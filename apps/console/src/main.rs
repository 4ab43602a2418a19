use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::normalize_service_url,
    load_settings,
    view::{MetricsSummary, ResultSummary},
    ClassificationController, ClassificationPhase, ClassificationService, DashboardState,
    FetchOutcome, HttpClassificationService, LoadPhase, ModelDashboardController,
    RetrainOutcome, ServiceError, SubmitOutcome,
};
use shared::domain::ExampleKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "news-console")]
#[command(about = "Classify news articles and inspect the credibility model")]
#[command(version)]
struct Args {
    /// Base URL of the classification service (overrides client.toml and environment)
    #[arg(long)]
    service_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify an article
    Classify {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Classify one of the built-in example articles (real or fake)
    Example { kind: ExampleKind },
    /// Show model metrics and the per-class report
    ModelInfo,
    /// Retrain the model and show the refreshed metrics
    Retrain {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check that the service is up and has a model loaded
    Health,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(url) = args.service_url.as_deref() {
        settings.service_url = normalize_service_url(url)?;
    }
    let service = Arc::new(HttpClassificationService::from_settings(&settings));
    info!(service_url = service.server_url(), "using classification service");

    let ok = match args.command {
        Command::Classify { title, content } => {
            let controller = ClassificationController::new(service);
            controller.set_title(title)?;
            controller.set_content(content)?;
            classify(&controller).await
        }
        Command::Example { kind } => {
            let controller = ClassificationController::new(service);
            controller.load_example(kind)?;
            let input = controller.state().input;
            println!("Example ({kind:?}): {}", input.title);
            classify(&controller).await
        }
        Command::ModelInfo => {
            let dashboard = ModelDashboardController::open(service).await;
            print_dashboard(&dashboard.state())
        }
        Command::Retrain { yes } => retrain(service, yes).await?,
        Command::Health => match service.health().await {
            Ok(health) => {
                println!("Status: {}", health.status);
                println!(
                    "Model: {}",
                    health.model_status.as_deref().unwrap_or("unknown")
                );
                health.model_loaded()
            }
            Err(err) => {
                report_service_error("Health check failed", &err);
                false
            }
        },
    };

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn classify(controller: &ClassificationController) -> bool {
    match controller.submit().await {
        Err(err) => {
            eprintln!("Cannot classify: {err}");
            false
        }
        Ok(SubmitOutcome::AlreadySubmitting) => false,
        Ok(SubmitOutcome::Failed(err)) => {
            report_service_error("Failed to classify article", &err);
            false
        }
        Ok(SubmitOutcome::Succeeded(_)) => {
            if let ClassificationPhase::Succeeded(result) = controller.state().phase {
                let summary = ResultSummary::from(&result);
                println!("Prediction:        {}", summary.prediction);
                println!("Confidence:        {}", summary.confidence);
                println!("Real probability:  {}", summary.probability_real);
                println!("Fake probability:  {}", summary.probability_fake);
                println!("Processed words:   {}", summary.processed_text_length);
                println!("Classified at:     {}", summary.classified_at);
            }
            true
        }
    }
}

async fn retrain(service: Arc<dyn ClassificationService>, confirmed: bool) -> Result<bool> {
    let dashboard = ModelDashboardController::open(service).await;
    if let LoadPhase::LoadError(err) = &dashboard.state().phase {
        report_service_error("Could not load current model info", err);
    }

    if !confirmed && !confirm("Retrain the model? This may take a few minutes. [y/N] ")? {
        println!("Retrain cancelled.");
        return Ok(true);
    }

    println!("Training model...");
    match dashboard.retrain().await {
        RetrainOutcome::Retrained { refresh, .. } => {
            println!("Model retrained successfully.");
            if let FetchOutcome::Failed(err) = &refresh {
                report_service_error("Failed to refresh model info", err);
            }
            Ok(print_dashboard(&dashboard.state()))
        }
        RetrainOutcome::Failed(err) => {
            report_service_error("Failed to retrain model", &err);
            Ok(false)
        }
        RetrainOutcome::AlreadyRetraining => Ok(false),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn print_dashboard(state: &DashboardState) -> bool {
    let Some(info) = &state.info else {
        if let LoadPhase::LoadError(err) = &state.phase {
            report_service_error("Failed to fetch model information", err);
        }
        return false;
    };

    if let Some(status) = &info.status {
        println!("Service status:    {status}");
    }
    let summary = MetricsSummary::from(info);
    println!("Model type:        {}", summary.model_type);
    println!("Trained:           {}", summary.trained_at);
    println!("Training accuracy: {}", summary.train_accuracy);
    println!("Test accuracy:     {}", summary.test_accuracy);
    println!("Training samples:  {}", summary.training_samples);
    println!("Test samples:      {}", summary.test_samples);
    println!("Features:          {}", summary.features_count);

    if !summary.report_rows.is_empty() {
        println!();
        println!(
            "{:<16} {:>10} {:>10} {:>10} {:>8}",
            "Class", "Precision", "Recall", "F1-Score", "Support"
        );
        for row in &summary.report_rows {
            println!(
                "{:<16} {:>10} {:>10} {:>10} {:>8}",
                row.label, row.precision, row.recall, row.f1_score, row.support
            );
        }
    }

    state.phase == LoadPhase::Ready
}

fn report_service_error(context: &str, err: &ServiceError) {
    eprintln!("{context}: {err}");
    if err.is_transient() {
        eprintln!("The service looks unreachable or busy; retry once it is available.");
    }
}
