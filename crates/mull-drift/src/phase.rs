//! Pure phase machine for the report guard
//!
//! - Pure function: transition(phase, event) -> (phase, actions)
//! - No async, no I/O
//! - READY is sticky until a report is confirmed written, so a failed
//!   generation is retried on the next evaluation instead of forgotten
//! - Unexpected events never panic; they are logged and ignored

/// Guard phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuardPhase {
    /// Not enough engagement, or no shift yet
    #[default]
    Waiting,
    /// Both guards passed; a report is owed
    Ready,
}

impl std::fmt::Display for GuardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Ready => write!(f, "READY"),
        }
    }
}

/// Events that drive the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEvent {
    /// The guard was evaluated for this iteration
    Evaluated { ready: bool },
    /// The report generator confirmed a written artifact
    ReportGenerated { version: u32 },
    /// The report generator failed
    ReportFailed { error: String },
}

/// Side effects the caller must carry out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Invoke the report generator
    GenerateReport,
    /// Persist the current themes and count as the new baseline
    CommitBaseline { version: u32 },
    /// Log activity
    LogActivity { message: String },
}

/// Pure transition function
///
/// Takes the current phase and an event, returns the next phase and the
/// actions to execute. Deterministic and side-effect free.
pub fn transition(phase: GuardPhase, event: GuardEvent) -> (GuardPhase, Vec<GuardAction>) {
    match (phase, event) {
        (GuardPhase::Waiting, GuardEvent::Evaluated { ready: false }) => (
            GuardPhase::Waiting,
            vec![GuardAction::LogActivity {
                message: "Report guards not satisfied, waiting".to_string(),
            }],
        ),

        (GuardPhase::Waiting, GuardEvent::Evaluated { ready: true }) => (
            GuardPhase::Ready,
            vec![
                GuardAction::LogActivity {
                    message: "Report guards satisfied".to_string(),
                },
                GuardAction::GenerateReport,
            ],
        ),

        // Conditions were already met once; the baseline has not moved since
        (GuardPhase::Ready, GuardEvent::Evaluated { .. }) => (
            GuardPhase::Ready,
            vec![
                GuardAction::LogActivity {
                    message: "Retrying pending report".to_string(),
                },
                GuardAction::GenerateReport,
            ],
        ),

        (GuardPhase::Ready, GuardEvent::ReportGenerated { version }) => (
            GuardPhase::Waiting,
            vec![
                GuardAction::CommitBaseline { version },
                GuardAction::LogActivity {
                    message: format!("Report v{} committed as new baseline", version),
                },
            ],
        ),

        (GuardPhase::Ready, GuardEvent::ReportFailed { error }) => (
            GuardPhase::Ready,
            vec![GuardAction::LogActivity {
                message: format!("Report generation failed, will retry: {}", error),
            }],
        ),

        (GuardPhase::Waiting, event) => (
            GuardPhase::Waiting,
            vec![GuardAction::LogActivity {
                message: format!("Ignoring {:?} while WAITING", event),
            }],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_cycle() {
        let (phase, actions) = transition(GuardPhase::Waiting, GuardEvent::Evaluated { ready: true });
        assert_eq!(phase, GuardPhase::Ready);
        assert!(actions.contains(&GuardAction::GenerateReport));

        let (phase, actions) = transition(phase, GuardEvent::ReportGenerated { version: 2 });
        assert_eq!(phase, GuardPhase::Waiting);
        assert_eq!(actions[0], GuardAction::CommitBaseline { version: 2 });
    }

    #[test]
    fn test_waiting_stays_waiting() {
        let (phase, actions) =
            transition(GuardPhase::Waiting, GuardEvent::Evaluated { ready: false });
        assert_eq!(phase, GuardPhase::Waiting);
        assert!(!actions.contains(&GuardAction::GenerateReport));
    }

    #[test]
    fn test_failure_keeps_ready_without_commit() {
        let (phase, actions) = transition(
            GuardPhase::Ready,
            GuardEvent::ReportFailed {
                error: "disk full".to_string(),
            },
        );
        assert_eq!(phase, GuardPhase::Ready);
        assert!(actions
            .iter()
            .all(|a| !matches!(a, GuardAction::CommitBaseline { .. })));
    }

    #[test]
    fn test_ready_is_sticky_across_evaluations() {
        let (phase, actions) = transition(GuardPhase::Ready, GuardEvent::Evaluated { ready: false });
        assert_eq!(phase, GuardPhase::Ready);
        assert!(actions.contains(&GuardAction::GenerateReport));
    }

    #[test]
    fn test_stray_events_while_waiting_ignored() {
        let (phase, actions) =
            transition(GuardPhase::Waiting, GuardEvent::ReportGenerated { version: 9 });
        assert_eq!(phase, GuardPhase::Waiting);
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], GuardAction::LogActivity { .. }));

        let (phase, _) = transition(
            GuardPhase::Waiting,
            GuardEvent::ReportFailed {
                error: "late".to_string(),
            },
        );
        assert_eq!(phase, GuardPhase::Waiting);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(GuardPhase::Waiting.to_string(), "WAITING");
        assert_eq!(GuardPhase::Ready.to_string(), "READY");
    }
}
