use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{RunStatus, StepStatus, TestExecutionResult, TestReport};

/// Accumulates per-step results into the final run report.
///
/// Every pushed result counts as exactly one of successful, failed or
/// skipped, so `success_steps + fail_steps + skipped_steps == total_steps`
/// holds by construction.
pub struct ReportBuilder {
    test_case_id: Uuid,
    name: String,
    start_time: OffsetDateTime,
    details: Vec<TestExecutionResult>,
}

impl ReportBuilder {
    pub fn new(test_case_id: Uuid, name: String) -> Self {
        Self {
            test_case_id,
            name,
            start_time: OffsetDateTime::now_utc(),
            details: Vec::new(),
        }
    }

    pub fn push(&mut self, result: TestExecutionResult) {
        self.details.push(result);
    }

    /// Close the report. A run is successful only when it completed and not
    /// a single step failed; skipped steps do not count against it.
    pub fn finish(self, status: RunStatus) -> TestReport {
        let end_time = OffsetDateTime::now_utc();

        let count = |wanted: StepStatus| {
            self.details.iter().filter(|r| r.status == wanted).count() as i32
        };
        let success_steps = count(StepStatus::Passed);
        let fail_steps = count(StepStatus::Failed);
        let skipped_steps = count(StepStatus::Skipped);

        TestReport {
            test_case_id: self.test_case_id,
            name: self.name,
            status,
            success: fail_steps == 0 && status == RunStatus::Completed,
            total_steps: self.details.len() as i32,
            success_steps,
            fail_steps,
            skipped_steps,
            start_time: self.start_time,
            end_time,
            duration: (end_time - self.start_time).whole_milliseconds() as i64,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(status: StepStatus) -> TestExecutionResult {
        TestExecutionResult {
            step_id: Uuid::new_v4(),
            step_name: "step".to_string(),
            status,
            success: status == StepStatus::Passed,
            response_time: 10,
            status_code: Some(200),
            response_data: None,
            error_message: None,
            attempts: 1,
            validations: Vec::new(),
            extracted: HashMap::new(),
        }
    }

    #[test]
    fn counts_partition_the_steps() {
        let mut builder = ReportBuilder::new(Uuid::new_v4(), "case".to_string());
        builder.push(result(StepStatus::Passed));
        builder.push(result(StepStatus::Failed));
        builder.push(result(StepStatus::Passed));
        builder.push(result(StepStatus::Skipped));

        let report = builder.finish(RunStatus::Completed);

        assert_eq!(report.total_steps, 4);
        assert_eq!(report.success_steps, 2);
        assert_eq!(report.fail_steps, 1);
        assert_eq!(report.skipped_steps, 1);
        assert_eq!(
            report.success_steps + report.fail_steps,
            report.total_steps - report.skipped_steps
        );
        assert!(!report.success);
    }

    #[test]
    fn success_requires_completion_and_zero_failures() {
        let mut builder = ReportBuilder::new(Uuid::new_v4(), "case".to_string());
        builder.push(result(StepStatus::Passed));
        let report = builder.finish(RunStatus::Aborted);
        assert!(!report.success);

        let mut builder = ReportBuilder::new(Uuid::new_v4(), "case".to_string());
        builder.push(result(StepStatus::Passed));
        builder.push(result(StepStatus::Skipped));
        let report = builder.finish(RunStatus::Completed);
        assert!(report.success);
    }

    #[test]
    fn empty_run_completes_successfully() {
        let report = ReportBuilder::new(Uuid::new_v4(), "case".to_string())
            .finish(RunStatus::Completed);

        assert_eq!(report.total_steps, 0);
        assert!(report.success);
        assert!(report.details.is_empty());
    }
}
