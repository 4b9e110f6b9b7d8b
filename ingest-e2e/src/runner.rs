use ingest_config::shared::RetryConfig;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::case::Case;
use crate::error::IngestError;
use crate::outcome::{Defect, VerificationOutcome};

/// Why a run did not end with a converged table.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("setting up the case failed: {0}")]
    Setup(#[source] IngestError),

    #[error("sending the records failed: {0}")]
    Send(#[source] IngestError),

    #[error("verification attempt {attempt} found a defect: {defect}")]
    Defect { attempt: u32, defect: Defect },

    #[error("table did not converge after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("table did not converge within {timeout:?} ({attempts} attempts)")]
    TimedOut { attempts: u32, timeout: Duration },
}

/// Summary of a converged run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Number of verification attempts, the converged one included.
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Drives a [`Case`] from setup to cleanup.
///
/// Verification is retried with exponential backoff while the outcome is retryable, until the
/// attempts or the time budget of the [`RetryConfig`] are exhausted. The case is cleaned in every
/// path.
#[derive(Debug, Clone)]
pub struct CaseRunner {
    retry: RetryConfig,
}

impl CaseRunner {
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    pub async fn run<C: Case>(&self, case: &C) -> Result<RunReport, RunError> {
        let started = Instant::now();
        info!(config = %case.config_file_name(), "starting case");

        if let Err(err) = case.setup().await {
            error!(error = %err, "case setup failed");
            case.clean().await;
            return Err(RunError::Setup(err));
        }

        if let Err(err) = case.send().await {
            error!(error = %err, "sending records failed");
            case.clean().await;
            return Err(RunError::Send(err));
        }

        let result = self.poll(case, started).await;
        case.clean().await;

        match &result {
            Ok(report) => info!(
                attempts = report.attempts,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "case passed"
            ),
            Err(err) => error!(error = %err, "case failed"),
        }

        result
    }

    async fn poll<C: Case>(&self, case: &C, started: Instant) -> Result<RunReport, RunError> {
        let timeout = self.retry.timeout();
        let deadline = started + timeout;

        for attempt in 0..self.retry.max_attempts {
            match case.verify(attempt).await {
                VerificationOutcome::Converged => {
                    return Ok(RunReport {
                        attempts: attempt + 1,
                        elapsed: started.elapsed(),
                    });
                }
                VerificationOutcome::NonRetryable(defect) => {
                    return Err(RunError::Defect { attempt, defect });
                }
                VerificationOutcome::Retryable(_) => {}
            }

            if attempt + 1 == self.retry.max_attempts {
                break;
            }

            let delay = self.retry.delay_for_attempt(attempt);
            if Instant::now() + delay > deadline {
                return Err(RunError::TimedOut {
                    attempts: attempt + 1,
                    timeout,
                });
            }

            warn!(attempt, delay_ms = delay.as_millis() as u64, "retrying verification");
            sleep(delay).await;
        }

        Err(RunError::AttemptsExhausted {
            attempts: self.retry.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, IngestResult};
    use crate::outcome::RetryReason;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ScriptedCase {
        fail_setup: bool,
        fail_send: bool,
        outcomes: Mutex<VecDeque<VerificationOutcome>>,
        attempts: Mutex<Vec<u32>>,
        cleaned: Mutex<u32>,
    }

    impl ScriptedCase {
        fn with_outcomes(outcomes: impl IntoIterator<Item = VerificationOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                ..Self::default()
            }
        }

        fn attempts(&self) -> Vec<u32> {
            self.attempts.lock().unwrap().clone()
        }

        fn cleaned(&self) -> u32 {
            *self.cleaned.lock().unwrap()
        }
    }

    impl Case for ScriptedCase {
        fn config_file_name(&self) -> String {
            "scripted.json".to_string()
        }

        async fn setup(&self) -> IngestResult<()> {
            if self.fail_setup {
                return Err(IngestError::from((
                    ErrorKind::StoreQueryFailed,
                    "Statement execution failed",
                )));
            }
            Ok(())
        }

        async fn send(&self) -> IngestResult<()> {
            if self.fail_send {
                return Err(IngestError::from((
                    ErrorKind::TransportConnectionFailed,
                    "Transport is unreachable",
                )));
            }
            Ok(())
        }

        async fn verify(&self, attempt: u32) -> VerificationOutcome {
            self.attempts.lock().unwrap().push(attempt);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(VerificationOutcome::Retryable(RetryReason::NoRowsYet))
        }

        async fn clean(&self) {
            *self.cleaned.lock().unwrap() += 1;
        }
    }

    fn retryable() -> VerificationOutcome {
        VerificationOutcome::Retryable(RetryReason::NoRowsYet)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_converged() {
        let case = ScriptedCase::with_outcomes([
            retryable(),
            retryable(),
            VerificationOutcome::Converged,
        ]);
        let runner = CaseRunner::new(RetryConfig::default());

        let report = runner.run(&case).await.unwrap();

        assert_eq!(report.attempts, 3);
        // 500ms then 1s of backoff.
        assert_eq!(report.elapsed, Duration::from_millis(1_500));
        assert_eq!(case.attempts(), vec![0, 1, 2]);
        assert_eq!(case.cleaned(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defect_stops_retrying() {
        let case = ScriptedCase::with_outcomes([
            retryable(),
            VerificationOutcome::NonRetryable(Defect::RowCountMismatch {
                expected: 200,
                observed: 150,
            }),
            VerificationOutcome::Converged,
        ]);
        let runner = CaseRunner::new(RetryConfig::default());

        let err = runner.run(&case).await.unwrap_err();

        assert!(matches!(
            err,
            RunError::Defect {
                attempt: 1,
                defect: Defect::RowCountMismatch { .. }
            }
        ));
        assert_eq!(case.attempts(), vec![0, 1]);
        assert_eq!(case.cleaned(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempts_are_bounded() {
        let case = ScriptedCase::default();
        let runner = CaseRunner::new(RetryConfig {
            max_attempts: 3,
            ..RetryConfig::default()
        });

        let err = runner.run(&case).await.unwrap_err();

        assert!(matches!(err, RunError::AttemptsExhausted { attempts: 3 }));
        assert_eq!(case.attempts(), vec![0, 1, 2]);
        assert_eq!(case.cleaned(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_enforced_between_attempts() {
        let case = ScriptedCase::default();
        let runner = CaseRunner::new(RetryConfig {
            max_attempts: 100,
            timeout_ms: 2_000,
            ..RetryConfig::default()
        });

        let err = runner.run(&case).await.unwrap_err();

        // 500ms + 1s fit in the budget, the next 2s delay does not.
        assert!(matches!(err, RunError::TimedOut { attempts: 3, .. }));
        assert_eq!(case.cleaned(), 1);
    }

    #[tokio::test]
    async fn test_setup_failure_still_cleans() {
        let case = ScriptedCase {
            fail_setup: true,
            ..ScriptedCase::default()
        };

        let err = CaseRunner::new(RetryConfig::default())
            .run(&case)
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::Setup(_)));
        assert!(case.attempts().is_empty());
        assert_eq!(case.cleaned(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_still_cleans() {
        let case = ScriptedCase {
            fail_send: true,
            ..ScriptedCase::default()
        };

        let err = CaseRunner::new(RetryConfig::default())
            .run(&case)
            .await
            .unwrap_err();

        match err {
            RunError::Send(err) => assert_eq!(err.kind(), ErrorKind::TransportConnectionFailed),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(case.cleaned(), 1);
    }
}
