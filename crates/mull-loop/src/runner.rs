//! Continuous loop: run cycles, persist loop state, sleep, repeat

use mull_core::{LoopSettings, Result};
use mull_drift::ThemeExtractor;
use mull_report::{ExplorationEvent, ReportGenerator};
use mull_store::PerspectiveStore;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::cycle::{CycleOutcome, ReportCycle};
use crate::state::{load_state, save_state};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxIterations,
    Shutdown,
}

/// Totals for one `run_loop` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSummary {
    pub iterations: u64,
    pub reports_generated: usize,
    pub failed_iterations: usize,
    pub stop_reason: StopReason,
}

/// Run cycles until `settings.max_iterations` (0 = unlimited) or `shutdown`
///
/// Iteration numbers continue from `state_path`. A recoverable iteration
/// error is logged and the loop moves on; a fatal one is returned.
pub async fn run_loop<S, G, E, F>(
    cycle: &mut ReportCycle<S, G, E>,
    settings: &LoopSettings,
    state_path: &Path,
    shutdown: F,
) -> Result<LoopSummary>
where
    S: PerspectiveStore,
    G: ReportGenerator,
    E: ThemeExtractor,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut state = load_state(state_path).await?;
    let interval = Duration::from_secs(settings.iteration_sleep_seconds);
    let max_display = if settings.max_iterations == 0 {
        "unlimited".to_string()
    } else {
        settings.max_iterations.to_string()
    };
    info!(
        "Starting loop at iteration {} (max {}, sleep {}s)",
        state.iteration + 1,
        max_display,
        settings.iteration_sleep_seconds
    );

    let mut summary = LoopSummary {
        iterations: 0,
        reports_generated: 0,
        failed_iterations: 0,
        stop_reason: StopReason::MaxIterations,
    };

    loop {
        state.iteration += 1;
        summary.iterations += 1;
        let iteration = state.iteration;

        info!("=== Iteration {} ===", iteration);
        cycle
            .record(ExplorationEvent::IterationStart { iteration })
            .await;

        let mut collected = 0;
        match cycle.run_once(iteration).await {
            Ok(outcome) => {
                let decision = outcome.decision();
                collected = state.observe(decision.current_count, decision.engagement);

                match &outcome {
                    CycleOutcome::Generated { report, decision } => {
                        state.record_report(iteration, decision.current_count);
                        summary.reports_generated += 1;
                        info!("Report v{} published", report.version);
                    }
                    CycleOutcome::GenerationFailed { error, .. } => {
                        summary.failed_iterations += 1;
                        warn!("Report still pending after failure: {}", error);
                    }
                    CycleOutcome::Waiting(_) => {}
                }
            }
            Err(e) if e.is_recoverable() => {
                summary.failed_iterations += 1;
                error!("Iteration {} failed: {}", iteration, e);
            }
            Err(e) => return Err(e),
        }

        if let Err(e) = save_state(&state, state_path).await {
            error!("Failed to save loop state: {}", e);
        }
        cycle
            .record(ExplorationEvent::IterationEnd {
                iteration,
                perspectives_collected: collected,
            })
            .await;

        if settings.max_iterations > 0 && summary.iterations >= settings.max_iterations as u64 {
            warn!("Max iterations ({}) reached", settings.max_iterations);
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping after iteration {}", iteration);
                summary.stop_reason = StopReason::Shutdown;
                break;
            }
        }
    }

    info!(
        "Loop finished: {} iterations, {} reports",
        summary.iterations, summary.reports_generated
    );
    Ok(summary)
}
