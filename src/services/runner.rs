use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{error, info};

use crate::error::{AppError, AppResult};
use crate::models::{
    Environment, Project, RunStatus, StepStatus, TestCase, TestExecutionResult, TestReport,
    TestStep,
};
use crate::services::executor::StepExecutor;
use crate::services::report::ReportBuilder;
use crate::services::store::VariableStore;
use crate::services::template::RunContext;
use crate::state::AppState;

/// Per-run knobs taken from the execute request body.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Extra values layered on top of every stored scope for this run only.
    pub temp_variables: HashMap<String, Value>,
    /// Promote the values extracted during the run to case-scope variables.
    pub persist_extracted: bool,
}

/// Drives a full case run: executes the enabled steps in order, collects
/// their results and closes the report.
///
/// Each run owns a private overlay, so concurrent runs of the same case
/// never observe each other's extracted values.
pub struct CaseRunner {
    store: VariableStore,
    executor: StepExecutor,
    cancel: watch::Receiver<bool>,
}

impl CaseRunner {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: VariableStore::new(state),
            executor: StepExecutor::new(state),
            cancel: state.shutdown.clone(),
        }
    }

    /// Run `steps` against `project`, reading variables through the scope
    /// chain of `case` and the optional `environment`.
    ///
    /// Step failures are recorded and the run carries on (or halts, when the
    /// case says so) with status `Completed`. Only engine-level errors and
    /// cancellation abort the run, skipping everything that has not started.
    pub async fn run(
        &self,
        project: &Project,
        case: &TestCase,
        environment: Option<&Environment>,
        steps: &[TestStep],
        options: RunOptions,
    ) -> AppResult<TestReport> {
        let chain = self
            .store
            .load_chain(Some(project), environment, Some(case.id))
            .await?;
        let mut ctx = RunContext::with_overlay(chain, options.temp_variables);

        info!(
            case = %case.id,
            steps = steps.len(),
            "starting test case run"
        );

        let mut builder = ReportBuilder::new(case.id, case.name.clone());
        let mut status = RunStatus::Completed;
        let mut halted = false;
        let mut extracted: HashMap<String, Value> = HashMap::new();

        for step in steps {
            if halted {
                builder.push(Self::skipped(step));
                continue;
            }

            if *self.cancel.borrow() {
                info!(case = %case.id, step = %step.id, "run cancelled, skipping remaining steps");
                status = RunStatus::Aborted;
                halted = true;
                builder.push(Self::skipped(step));
                continue;
            }

            match self.executor.execute_step(project, step, &mut ctx).await {
                Ok(result) => {
                    for (name, value) in &result.extracted {
                        extracted.insert(name.clone(), value.clone());
                    }
                    let failed = !result.success;
                    builder.push(result);
                    if failed && !case.continue_on_failure {
                        halted = true;
                    }
                }
                Err(err) => {
                    error!(case = %case.id, step = %step.id, error = %err, "engine error, aborting run");
                    builder.push(Self::engine_failure(step, &err));
                    status = RunStatus::Aborted;
                    halted = true;
                }
            }
        }

        if options.persist_extracted && !extracted.is_empty() {
            self.store.promote_case_variables(case.id, &extracted).await?;
        }

        let report = builder.finish(status);
        info!(
            case = %case.id,
            success = report.success,
            failed = report.fail_steps,
            skipped = report.skipped_steps,
            "test case run finished"
        );
        Ok(report)
    }

    /// Execute a single step with the full scope chain of its case. Disabled
    /// steps run too when addressed directly.
    pub async fn run_step(
        &self,
        project: &Project,
        case: &TestCase,
        environment: Option<&Environment>,
        step: &TestStep,
        options: RunOptions,
    ) -> AppResult<TestExecutionResult> {
        let chain = self
            .store
            .load_chain(Some(project), environment, Some(case.id))
            .await?;
        let mut ctx = RunContext::with_overlay(chain, options.temp_variables);

        let result = self.executor.execute_step(project, step, &mut ctx).await?;

        if options.persist_extracted && !result.extracted.is_empty() {
            self.store
                .promote_case_variables(case.id, &result.extracted)
                .await?;
        }

        Ok(result)
    }

    fn skipped(step: &TestStep) -> TestExecutionResult {
        TestExecutionResult {
            step_id: step.id,
            step_name: step.name.clone(),
            status: StepStatus::Skipped,
            success: false,
            response_time: 0,
            status_code: None,
            response_data: None,
            error_message: None,
            attempts: 0,
            validations: Vec::new(),
            extracted: HashMap::new(),
        }
    }

    fn engine_failure(step: &TestStep, err: &AppError) -> TestExecutionResult {
        TestExecutionResult {
            step_id: step.id,
            step_name: step.name.clone(),
            status: StepStatus::Failed,
            success: false,
            response_time: 0,
            status_code: None,
            response_data: None,
            error_message: Some(err.to_string()),
            attempts: 0,
            validations: Vec::new(),
            extracted: HashMap::new(),
        }
    }
}
