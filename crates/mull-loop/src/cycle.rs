//! One report cycle: evaluate the guard, generate when READY, commit on success
//!
//! The baseline only moves after the generator confirms a written report.
//! A failed generation leaves the guard READY so the next cycle retries.

use mull_core::{NewPerspective, PerspectiveId, Result};
use mull_drift::{
    transition, GuardAction, GuardDecision, GuardEvent, GuardPhase, KeyIdeaExtractor,
    ReportGuard, ShiftBaseline, ThemeExtractor,
};
use mull_report::{
    EvolutionEntry, EvolutionLog, ExplorationEvent, ExplorationLog, GeneratedReport,
    ReportGenerator, ReportRequest,
};
use mull_store::PerspectiveStore;
use std::path::PathBuf;
use tracing::{info, warn};

/// What one cycle did
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// Guard not satisfied; nothing written
    Waiting(GuardDecision),
    /// Report written and baseline committed
    Generated {
        decision: GuardDecision,
        report: GeneratedReport,
    },
    /// Guard READY but the generator failed; baseline untouched
    GenerationFailed {
        decision: GuardDecision,
        error: String,
    },
}

impl CycleOutcome {
    pub fn decision(&self) -> &GuardDecision {
        match self {
            Self::Waiting(decision) => decision,
            Self::Generated { decision, .. } => decision,
            Self::GenerationFailed { decision, .. } => decision,
        }
    }

    pub fn report(&self) -> Option<&GeneratedReport> {
        match self {
            Self::Generated { report, .. } => Some(report),
            _ => None,
        }
    }
}

pub struct ReportCycle<S, G, E = KeyIdeaExtractor>
where
    S: PerspectiveStore,
    G: ReportGenerator,
    E: ThemeExtractor,
{
    store: S,
    generator: G,
    guard: ReportGuard,
    extractor: E,
    evolution: EvolutionLog,
    exploration: Option<ExplorationLog>,
    phase: GuardPhase,
    baseline: ShiftBaseline,
}

impl<S, G> ReportCycle<S, G, KeyIdeaExtractor>
where
    S: PerspectiveStore,
    G: ReportGenerator,
{
    /// Build a cycle, restoring the baseline from the evolution log
    pub async fn new(
        store: S,
        generator: G,
        guard: ReportGuard,
        evolution_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let evolution = EvolutionLog::load(evolution_path).await?;
        let baseline = evolution.baseline();

        Ok(Self {
            store,
            generator,
            guard,
            extractor: KeyIdeaExtractor,
            evolution,
            exploration: None,
            phase: GuardPhase::Waiting,
            baseline,
        })
    }
}

impl<S, G, E> ReportCycle<S, G, E>
where
    S: PerspectiveStore,
    G: ReportGenerator,
    E: ThemeExtractor,
{
    /// Swap the theme extraction strategy
    pub fn with_extractor<E2: ThemeExtractor>(self, extractor: E2) -> ReportCycle<S, G, E2> {
        ReportCycle {
            store: self.store,
            generator: self.generator,
            guard: self.guard,
            extractor,
            evolution: self.evolution,
            exploration: self.exploration,
            phase: self.phase,
            baseline: self.baseline,
        }
    }

    pub fn with_exploration_log(mut self, log: ExplorationLog) -> Self {
        self.exploration = Some(log);
        self
    }

    pub fn phase(&self) -> GuardPhase {
        self.phase
    }

    pub fn baseline(&self) -> &ShiftBaseline {
        &self.baseline
    }

    pub fn guard(&self) -> &ReportGuard {
        &self.guard
    }

    pub fn evolution(&self) -> &EvolutionLog {
        &self.evolution
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Append to the exploration log, if one is attached
    pub async fn record(&self, event: ExplorationEvent) {
        if let Some(log) = &self.exploration {
            log.record(event).await;
        }
    }

    /// Save a perspective and note it in the exploration log
    pub async fn save_perspective(&mut self, draft: NewPerspective) -> Result<PerspectiveId> {
        let author = draft.author.clone();
        let post_id = draft.post_id.clone();
        let id = self.store.save(draft).await?;
        let preview = self.store.get(&id).await?.preview(100);

        info!("Perspective found: {} by {}", id, author);
        self.record(ExplorationEvent::PerspectiveFound {
            id: id.clone(),
            author,
            post_id,
            preview,
        })
        .await;
        Ok(id)
    }

    /// Evaluate the guard without changing anything
    pub async fn check(&self) -> Result<GuardDecision> {
        let perspectives = self.store.list().await?;
        let themes = self.extractor.extract(&perspectives);
        Ok(self.guard.evaluate(perspectives.len(), &themes, &self.baseline))
    }

    /// Run one cycle
    pub async fn run_once(&mut self, iteration: u64) -> Result<CycleOutcome> {
        let perspectives = self.store.list().await?;
        let themes = self.extractor.extract(&perspectives);
        let decision = self.guard.evaluate(perspectives.len(), &themes, &self.baseline);

        info!(
            "Iteration {}: {} perspectives, {} themes, guard {}",
            iteration,
            perspectives.len(),
            themes.len(),
            if decision.ready { "ready" } else { "waiting" }
        );
        for check in decision.checks() {
            info!(
                "  [{}] {}: {}",
                if check.passed { "PASS" } else { "FAIL" },
                check.name,
                check.message
            );
            self.record(ExplorationEvent::GuardStatus {
                guard: check.name,
                passed: check.passed,
                message: check.message,
            })
            .await;
        }

        let (phase, actions) = transition(
            self.phase,
            GuardEvent::Evaluated {
                ready: decision.ready,
            },
        );
        self.phase = phase;
        log_actions(&actions);

        if !actions.contains(&GuardAction::GenerateReport) {
            return Ok(CycleOutcome::Waiting(decision));
        }

        let request = ReportRequest::new(perspectives, themes, self.baseline.clone());
        match self.generator.generate(&request).await {
            Ok(report) => {
                let (phase, actions) = transition(
                    self.phase,
                    GuardEvent::ReportGenerated {
                        version: report.version,
                    },
                );
                for action in &actions {
                    if let GuardAction::CommitBaseline { version } = action {
                        self.commit_baseline(*version, &request).await?;
                    }
                }
                // only after the commit landed
                self.phase = phase;
                log_actions(&actions);

                self.record(ExplorationEvent::ReportGenerated {
                    version: report.version,
                    output_path: report.path.clone(),
                })
                .await;
                Ok(CycleOutcome::Generated { decision, report })
            }
            Err(e) => {
                let error = e.to_string();
                let (phase, actions) = transition(
                    self.phase,
                    GuardEvent::ReportFailed {
                        error: error.clone(),
                    },
                );
                self.phase = phase;
                warn!("Report generation failed: {}", error);
                log_actions(&actions);
                Ok(CycleOutcome::GenerationFailed { decision, error })
            }
        }
    }

    async fn commit_baseline(&mut self, version: u32, request: &ReportRequest) -> Result<()> {
        let entry = EvolutionEntry::new(version, &request.perspectives, &self.extractor);
        self.evolution.append_and_save(entry.clone()).await?;
        self.baseline = entry.baseline();
        info!(
            "Baseline v{} committed: {} themes, {} perspectives",
            version,
            self.baseline.themes.len(),
            self.baseline.perspective_count
        );
        Ok(())
    }
}

fn log_actions(actions: &[GuardAction]) {
    for action in actions {
        if let GuardAction::LogActivity { message } = action {
            info!("{}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mull_report::MarkdownReportGenerator;
    use mull_store::MemoryPerspectiveStore;
    use tempfile::tempdir;

    fn draft(n: u32, ideas: &[&str]) -> NewPerspective {
        NewPerspective::new(format!("mb_{}", n), format!("agent_{}", n), format!("quote {}", n))
            .with_submolt("/m/philosophy")
            .with_timestamp("2026-02-01T09:30:00Z")
            .with_key_ideas(ideas.iter().copied())
    }

    #[tokio::test]
    async fn test_waiting_without_engagement() {
        let dir = tempdir().unwrap();
        let mut cycle = ReportCycle::new(
            MemoryPerspectiveStore::new(),
            MarkdownReportGenerator::new(dir.path().join("output")),
            ReportGuard::new(3, 0.3, 1),
            dir.path().join("output/evolution_log.json"),
        )
        .await
        .unwrap();

        cycle.save_perspective(draft(1, &["identity"])).await.unwrap();
        let outcome = cycle.run_once(1).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Waiting(_)));
        assert_eq!(outcome.decision().engagement, 1);
        assert_eq!(cycle.phase(), GuardPhase::Waiting);
        assert!(!dir.path().join("output/synthesis_v1.md").exists());
    }

    #[tokio::test]
    async fn test_check_is_read_only() {
        let dir = tempdir().unwrap();
        let mut cycle = ReportCycle::new(
            MemoryPerspectiveStore::new(),
            MarkdownReportGenerator::new(dir.path().join("output")),
            ReportGuard::new(1, 0.3, 1),
            dir.path().join("output/evolution_log.json"),
        )
        .await
        .unwrap();

        cycle.save_perspective(draft(1, &["identity"])).await.unwrap();
        let decision = cycle.check().await.unwrap();
        assert!(decision.ready);
        assert_eq!(decision.min_conversations, cycle.guard().min_conversations());
        assert_eq!(cycle.guard().detector().threshold(), 0.3);
        assert_eq!(cycle.phase(), GuardPhase::Waiting);
        assert!(cycle.baseline().is_initial());
    }

    #[tokio::test]
    async fn test_vocabulary_extractor_plugs_in() {
        let dir = tempdir().unwrap();
        let mut cycle = ReportCycle::new(
            MemoryPerspectiveStore::new(),
            MarkdownReportGenerator::new(dir.path().join("output")),
            ReportGuard::new(1, 0.3, 1),
            dir.path().join("output/evolution_log.json"),
        )
        .await
        .unwrap()
        .with_extractor(mull_drift::VocabularyExtractor::default());

        cycle
            .save_perspective(
                NewPerspective::new("mb_1", "Nyx", "Consciousness without memory")
                    .with_submolt("/m/philosophy")
                    .with_timestamp("2026-02-01T09:30:00Z"),
            )
            .await
            .unwrap();

        let outcome = cycle.run_once(1).await.unwrap();
        assert!(outcome.report().is_some());
        assert!(cycle.baseline().themes.contains("consciousness"));
        assert!(cycle.baseline().themes.contains("memory"));
    }

    #[tokio::test]
    async fn test_exploration_events_recorded() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("workspace/exploration.log");
        let mut cycle = ReportCycle::new(
            MemoryPerspectiveStore::new(),
            MarkdownReportGenerator::new(dir.path().join("output")),
            ReportGuard::new(1, 0.3, 1),
            dir.path().join("output/evolution_log.json"),
        )
        .await
        .unwrap()
        .with_exploration_log(ExplorationLog::new(&log_path));

        cycle.save_perspective(draft(1, &["identity"])).await.unwrap();
        cycle.run_once(1).await.unwrap();

        let records = ExplorationLog::new(&log_path).read_all().await.unwrap();
        let kinds: Vec<&str> = records
            .iter()
            .map(|r| match r.event {
                ExplorationEvent::PerspectiveFound { .. } => "perspective_found",
                ExplorationEvent::GuardStatus { .. } => "guard_status",
                ExplorationEvent::ReportGenerated { .. } => "report_generated",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["perspective_found", "guard_status", "guard_status", "report_generated"]
        );
    }
}
