use serde_json::{json, Value};
use uuid::Uuid;

use caseflow::models::{
    CreateEnvironment, CreateProject, CreateTestCase, CreateTestStep, Environment, Project,
    TestCase, TestStep, STATUS_ENABLED,
};
use caseflow::repositories::{
    EnvironmentRepository, ProjectRepository, TestCaseRepository, TestStepRepository,
};
use caseflow::state::AppState;

/// Factory for creating test data
pub struct Factory<'a> {
    state: &'a AppState,
}

#[allow(dead_code)]
impl<'a> Factory<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    pub async fn create_project(&self, base_url: &str) -> Project {
        self.create_project_with(base_url, json!({}), json!({})).await
    }

    pub async fn create_project_with(
        &self,
        base_url: &str,
        headers: Value,
        variables: Value,
    ) -> Project {
        let input = CreateProject {
            name: format!("project-{}", Uuid::new_v4()),
            description: None,
            base_url: base_url.to_string(),
            headers: Some(headers),
            variables: Some(variables),
        };
        ProjectRepository::create(&self.state.db, &input)
            .await
            .unwrap()
    }

    pub async fn create_environment(
        &self,
        project_id: Uuid,
        name: &str,
        variables: Value,
    ) -> Environment {
        let input = CreateEnvironment {
            name: name.to_string(),
            description: None,
            variables: Some(variables),
            status: None,
        };
        EnvironmentRepository::create(&self.state.db, project_id, &input)
            .await
            .unwrap()
    }

    pub async fn create_disabled_environment(&self, project_id: Uuid, name: &str) -> Environment {
        let input = CreateEnvironment {
            name: name.to_string(),
            description: None,
            variables: None,
            status: Some(0),
        };
        EnvironmentRepository::create(&self.state.db, project_id, &input)
            .await
            .unwrap()
    }

    pub async fn create_case(&self, project_id: Uuid) -> TestCase {
        self.create_case_with(project_id, true, STATUS_ENABLED).await
    }

    pub async fn create_case_with(
        &self,
        project_id: Uuid,
        continue_on_failure: bool,
        status: i32,
    ) -> TestCase {
        let input = CreateTestCase {
            name: format!("case-{}", Uuid::new_v4()),
            description: None,
            pre_script: None,
            post_script: None,
            continue_on_failure: Some(continue_on_failure),
            status: Some(status),
        };
        TestCaseRepository::create(&self.state.db, project_id, &input)
            .await
            .unwrap()
    }

    /// Create a step from a partial JSON spec; anything absent gets a
    /// harmless default
    pub async fn create_step(&self, test_case_id: Uuid, order: i32, spec: Value) -> TestStep {
        let text = |k: &str, fallback: &str| {
            spec.get(k)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        let number = |k: &str, fallback: i64| spec.get(k).and_then(Value::as_i64).unwrap_or(fallback);
        let field = |k: &str, fallback: Value| spec.get(k).cloned().unwrap_or(fallback);

        let input = CreateTestStep {
            name: text("name", &format!("step-{}", order)),
            url: text("url", ""),
            method: text("method", "GET"),
            headers: field("headers", json!({})),
            params: field("params", json!({})),
            body: field("body", Value::Null),
            files: field("files", json!({})),
            auth: field("auth", Value::Null),
            extract: field("extract", json!({})),
            validate: field("validate", json!([])),
            sql_queries: field("sql_queries", json!([])),
            timeout: number("timeout", 10) as i32,
            retry: number("retry", 0) as i32,
            retry_interval: number("retry_interval", 0) as i32,
            order,
            status: number("status", STATUS_ENABLED as i64) as i32,
        };
        TestStepRepository::create(&self.state.db, test_case_id, &input)
            .await
            .unwrap()
    }
}
