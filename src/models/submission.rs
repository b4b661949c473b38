use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ContentType;

/// Languages the sandbox runner accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
}

/// One test case from the content catalog. `hidden` only controls whether
/// the UI may show the expected/actual output; it never affects grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub passed: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub hidden: bool,
}

/// What a single sandbox round trip (compile + run) produced. Mirrors the
/// runner's wire format; `timed_out` is a distinct signal, not a synonym for
/// a non-zero exit code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile_output: Option<String>,
}

impl ExecutionOutput {
    /// Non-success output used when a run could not be performed at all.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
            timed_out: false,
            compile_output: None,
        }
    }

    pub fn timed_out(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
            timed_out: true,
            compile_output: None,
        }
    }
}

/// Full pass/fail result for one submission across all its test cases.
/// `all_passed` is derived at construction and always agrees with
/// `test_results`; an empty list never passes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub test_results: Vec<TestResult>,
    pub all_passed: bool,
    pub exit_code: i32,
}

impl Verdict {
    pub fn from_results(test_results: Vec<TestResult>) -> Self {
        let all_passed = !test_results.is_empty() && test_results.iter().all(|r| r.passed);
        Self {
            all_passed,
            exit_code: if all_passed { 0 } else { 1 },
            test_results,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    pub language: Language,
    #[validate(length(min = 1, max = 65536, message = "source must be 1..=65536 bytes"))]
    pub source: String,
    #[serde(default)]
    pub content_slug: Option<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Response body of POST /api/v1/execute. Graded submissions carry
/// `test_results`/`all_tests_passed`; bare runs carry raw output instead.
/// Completion persistence is reported separately from the verdict so a
/// storage failure can never flip a pass into a failure or vice versa.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timed_out: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<Vec<TestResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_tests_passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_recorded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_error: Option<String>,
}

impl GradingResponse {
    pub fn graded(verdict: Verdict, stderr: String, compile_output: Option<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            exit_code: verdict.exit_code,
            timed_out: None,
            compile_output,
            test_results: Some(verdict.test_results),
            all_tests_passed: Some(verdict.all_passed),
            completion_recorded: None,
            completion_error: None,
        }
    }

    pub fn bare(output: ExecutionOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            timed_out: Some(output.timed_out),
            compile_output: output.compile_output,
            test_results: None,
            all_tests_passed: None,
            completion_recorded: None,
            completion_error: None,
        }
    }

    /// The runner itself was unreachable; still a renderable response, never
    /// a crash, and never a partial result list.
    pub fn runner_unavailable(message: String) -> Self {
        Self {
            stdout: String::new(),
            stderr: message,
            exit_code: 1,
            timed_out: None,
            compile_output: None,
            test_results: None,
            all_tests_passed: None,
            completion_recorded: None,
            completion_error: None,
        }
    }
}
