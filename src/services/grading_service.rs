use std::sync::Arc;

use crate::metrics::{SUBMISSIONS_GRADED_TOTAL, TEST_CASES_EVALUATED_TOTAL};
use crate::models::submission::{ExecutionOutput, SubmitCodeRequest, TestResult, Verdict};
use crate::services::sandbox_client::CodeExecutor;

/// Result of grading one submission.
pub enum GradingOutcome {
    /// Test cases were present and every one was executed.
    Graded {
        verdict: Verdict,
        /// stderr of the first failing run, surfaced verbatim (compile
        /// errors must never be swallowed). Empty when nothing failed.
        stderr: String,
        compile_output: Option<String>,
    },
    /// No test cases: single run with empty stdin, raw output, no verdict.
    BareRun(ExecutionOutput),
    /// The runner itself was down; no partial results are reported.
    RunnerUnavailable(String),
}

pub struct GradingService {
    executor: Arc<dyn CodeExecutor>,
}

impl GradingService {
    pub fn new(executor: Arc<dyn CodeExecutor>) -> Self {
        Self { executor }
    }

    pub async fn grade(&self, req: &SubmitCodeRequest) -> GradingOutcome {
        if req.test_cases.is_empty() {
            // Playground mode: run once, surface raw output, no pass/fail
            return match self.executor.execute(req.language, &req.source, "").await {
                Ok(output) => GradingOutcome::BareRun(output),
                Err(e) => GradingOutcome::BareRun(ExecutionOutput::failure(e.to_string())),
            };
        }

        let mut results = Vec::with_capacity(req.test_cases.len());
        let mut first_stderr = String::new();
        let mut compile_output = None;

        // Strictly sequential, in declared order: the UI reports the first
        // failing case, so ordering is part of the contract
        for case in &req.test_cases {
            let output = match self
                .executor
                .execute(req.language, &req.source, &case.input)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!("Aborting grading run, runner unavailable: {}", e);
                    return GradingOutcome::RunnerUnavailable(e.to_string());
                }
            };

            let passed = outputs_match(&output.stdout, &case.expected_output);
            TEST_CASES_EVALUATED_TOTAL
                .with_label_values(&[if passed { "true" } else { "false" }])
                .inc();

            if first_stderr.is_empty() && output.exit_code != 0 {
                first_stderr = output.stderr.clone();
                compile_output = output.compile_output.clone();
            }

            results.push(TestResult {
                passed,
                input: case.input.clone(),
                expected_output: case.expected_output.clone(),
                actual_output: output.stdout.trim().to_string(),
                hidden: case.hidden,
            });
        }

        let verdict = Verdict::from_results(results);
        SUBMISSIONS_GRADED_TOTAL
            .with_label_values(&[if verdict.all_passed { "passed" } else { "failed" }])
            .inc();

        tracing::info!(
            "Submission graded: cases={}, passed={}",
            verdict.test_results.len(),
            verdict.all_passed
        );

        GradingOutcome::Graded {
            verdict,
            stderr: first_stderr,
            compile_output,
        }
    }
}

/// Exact string equality after a single leading/trailing trim of both
/// sides. Deliberately strict: internal whitespace differences fail, only
/// trailing-newline noise is forgiven.
fn outputs_match(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}
