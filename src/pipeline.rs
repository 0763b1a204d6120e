//! The retry/regeneration loop.
//!
//! Drives one request through the generate → test cycle: generate code from
//! the plan, generate tests, run them, and either finish or fold the failure
//! back into the plan and try again. Attempts are strictly sequential and
//! bounded; exhausting the ceiling fails the request without touching the
//! rest of the process.

use tracing::{info, warn};

use crate::language::LanguageSelection;
use crate::runner::{TestOutcome, TestRunner};
use crate::stages::Stages;

/// One piece of feedback recorded against the plan after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Diagnostic {
    /// Attempt that produced the failure.
    pub attempt: u32,
    /// Short failure description folded into later prompts.
    pub detail: String,
}

/// The plan for a request: planning-stage text plus accumulated feedback.
///
/// Feedback is kept as a structured list rather than appended to the text,
/// so attempts stay inspectable and rendering stays bounded per entry.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    text: String,
    diagnostics: Vec<Diagnostic>,
}

impl Plan {
    /// Wraps planning-stage output.
    pub fn new(text: String) -> Self {
        Self {
            text,
            diagnostics: Vec::new(),
        }
    }

    /// Records one failed attempt's diagnostic.
    pub fn record(&mut self, attempt: u32, detail: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            attempt,
            detail: detail.into(),
        });
    }

    /// Diagnostics recorded so far, in attempt order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Renders the plan plus feedback history for the next stage prompt.
    pub fn render(&self) -> String {
        if self.diagnostics.is_empty() {
            return self.text.clone();
        }

        let mut rendered = self.text.clone();
        rendered.push_str("\n\nFeedback from previous attempts:\n");
        for diagnostic in &self.diagnostics {
            rendered.push_str(&format!(
                "- Attempt {}: {}\n",
                diagnostic.attempt, diagnostic.detail
            ));
        }
        rendered
    }
}

/// Whether the final code was actually verified by executed tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verification {
    /// Tests ran and passed.
    Verified,
    /// Markup language: tests skipped by design.
    SkippedMarkup,
    /// No execution mapping: tests were generated but never run.
    Unverified,
}

/// Successful loop exit: the surviving code and tests.
#[derive(Debug)]
pub(crate) struct LoopOutcome {
    /// The final generated code.
    pub code: String,
    /// The final generated tests.
    pub tests: String,
    /// Attempt the loop succeeded on (1-based).
    pub attempts: u32,
    /// Whether tests actually verified the code.
    pub verification: Verification,
}

/// Loop-level failures.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Every attempt failed; the request is abandoned.
    #[error("all {max_attempts} generation attempts exhausted")]
    AttemptsExhausted { max_attempts: u32 },
}

/// The bounded generate → test loop for one request.
pub(crate) struct GenerationLoop<'a> {
    stages: &'a Stages<'a>,
    runner: &'a dyn TestRunner,
    max_attempts: u32,
}

impl<'a> GenerationLoop<'a> {
    /// Binds the loop to its collaborators.
    pub fn new(stages: &'a Stages<'a>, runner: &'a dyn TestRunner, max_attempts: u32) -> Self {
        Self {
            stages,
            runner,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Runs the loop until tests pass or attempts run out.
    ///
    /// Generation failures and test failures both consume an attempt and
    /// leave a diagnostic on the plan; only exhausting the ceiling is fatal,
    /// and then only for this request.
    pub async fn run(
        &self,
        plan: &mut Plan,
        languages: &LanguageSelection,
    ) -> Result<LoopOutcome, PipelineError> {
        let primary = languages.primary();

        for attempt in 1..=self.max_attempts {
            info!(
                "Generation attempt {attempt}/{} ({})",
                self.max_attempts, primary
            );
            let rendered = plan.render();

            let code = match self.stages.code(&rendered, languages).await {
                Ok(code) => code,
                Err(e) => {
                    warn!("Code generation failed on attempt {attempt}: {e}");
                    plan.record(attempt, "Failed to generate code.");
                    continue;
                }
            };

            let tests = match self.stages.tests(&rendered, &code, languages).await {
                Ok(tests) => tests,
                Err(e) => {
                    warn!("Test generation failed on attempt {attempt}: {e}");
                    plan.record(attempt, "Failed to generate tests.");
                    continue;
                }
            };

            match self.runner.run(&code, &tests, primary).await {
                Ok(TestOutcome::Passed) => {
                    info!("Tests passed on attempt {attempt}");
                    return Ok(LoopOutcome {
                        code,
                        tests,
                        attempts: attempt,
                        verification: Verification::Verified,
                    });
                }
                Ok(TestOutcome::SkippedMarkup) => {
                    // By-design skip: proceed as if tests passed.
                    return Ok(LoopOutcome {
                        code,
                        tests,
                        attempts: attempt,
                        verification: Verification::SkippedMarkup,
                    });
                }
                Ok(TestOutcome::Unsupported) => {
                    // Retrying cannot make the language runnable; accept the
                    // code but record that nothing verified it.
                    warn!("Tests for {primary} were not executed; code is unverified");
                    return Ok(LoopOutcome {
                        code,
                        tests,
                        attempts: attempt,
                        verification: Verification::Unverified,
                    });
                }
                Ok(TestOutcome::Failed { status }) => {
                    warn!("Tests failed on attempt {attempt} with exit status {status}");
                    plan.record(attempt, format!("Tests failed: exit status {status}."));
                }
                Err(e) => {
                    warn!("Test run failed on attempt {attempt}: {e}");
                    plan.record(attempt, format!("Tests failed: {e}."));
                }
            }
        }

        Err(PipelineError::AttemptsExhausted {
            max_attempts: self.max_attempts,
        })
    }
}
