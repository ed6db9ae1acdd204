use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{multipart, Client, Method};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    AuthSpec, Project, SqlQuery, StepStatus, TestExecutionResult, TestStep, ValidationRule,
};
use crate::services::sql::SqlPool;
use crate::services::template::{self, RunContext};
use crate::services::{document, validator};
use crate::state::AppState;

/// Applied when a step declares no positive timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Executes one step: resolve templates, issue the call, cross-check SQL,
/// extract and validate.
///
/// Failures split two ways. Anything that makes the step itself unrunnable
/// (unresolved variable, malformed spec, broken extraction) is returned as
/// an error for the runner to abort on. Outcomes of running it, including
/// exhausted transport retries and failed assertions, come back as an
/// ordinary failed result.
pub struct StepExecutor {
    client: Client,
    sql: SqlPool,
}

/// A step with every template resolved, ready to send
#[derive(Debug)]
struct PreparedStep {
    /// None for SQL-only steps
    url: Option<String>,
    method: Method,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    body: Option<Value>,
    files: Vec<(String, String)>,
    auth: AuthSpec,
    sql: Vec<SqlQuery>,
    validate: Vec<ValidationRule>,
    extract: Value,
    timeout: Duration,
}

struct LoadedFile {
    field: String,
    file_name: String,
    bytes: Vec<u8>,
}

impl StepExecutor {
    pub fn new(state: &AppState) -> Self {
        Self {
            client: state.http.clone(),
            sql: state.sql.clone(),
        }
    }

    pub async fn execute_step(
        &self,
        project: &Project,
        step: &TestStep,
        ctx: &mut RunContext,
    ) -> AppResult<TestExecutionResult> {
        let prepared = self.prepare(project, step, ctx)?;
        let files = Self::load_files(&prepared.files).await?;

        let mut attempts = 0;
        let mut status_code = None;
        let mut response_time = 0i64;
        let mut doc = serde_json::Map::new();

        if let Some(url) = &prepared.url {
            let max_attempts = step.retry.max(0) + 1;
            let pause = Duration::from_secs(step.retry_interval.max(0) as u64);

            let (status, headers, body, elapsed) = loop {
                attempts += 1;
                let started = Instant::now();
                match self.send_once(url, &prepared, &files).await {
                    Ok((status, headers, body)) => {
                        break (status, headers, body, started.elapsed().as_millis() as i64)
                    }
                    Err(err) if attempts < max_attempts => {
                        tracing::warn!(
                            step = %step.name,
                            attempt = attempts,
                            error = %err,
                            "transport failure, retrying"
                        );
                        tokio::time::sleep(pause).await;
                    }
                    Err(err) => {
                        return Ok(Self::step_failure(
                            step,
                            attempts,
                            None,
                            started.elapsed().as_millis() as i64,
                            None,
                            err.to_string(),
                        ))
                    }
                }
            };

            status_code = Some(status);
            response_time = elapsed;
            doc.insert("status_code".to_string(), json!(status));
            doc.insert("response_time".to_string(), json!(elapsed));
            doc.insert("headers".to_string(), headers);
            doc.insert("body".to_string(), body);
        }

        let sql_started = Instant::now();
        let mut sql_results = serde_json::Map::new();
        for query in &prepared.sql {
            match self.sql.run_query(query.database.as_deref(), &query.sql).await {
                Ok(rows) => {
                    sql_results.insert(query.name.clone(), Value::Array(rows));
                }
                Err(err) => {
                    if !sql_results.is_empty() {
                        doc.insert("sql".to_string(), Value::Object(sql_results));
                    }
                    return Ok(Self::step_failure(
                        step,
                        attempts,
                        status_code,
                        response_time,
                        Some(Value::Object(doc)),
                        format!("SQL query '{}' failed: {}", query.name, err),
                    ));
                }
            }
        }
        if prepared.url.is_none() {
            response_time = sql_started.elapsed().as_millis() as i64;
        }
        if !sql_results.is_empty() {
            doc.insert("sql".to_string(), Value::Object(sql_results));
        }

        let doc = Value::Object(doc);

        let extracted = document::apply_extract(&doc, &prepared.extract)?;
        for (name, value) in &extracted {
            ctx.overlay.insert(name.clone(), value.clone());
        }

        let validations = validator::run_validations(&doc, &prepared.validate);
        let success = validations.iter().all(|outcome| outcome.success);
        let error_message = validations
            .iter()
            .find(|outcome| !outcome.success)
            .and_then(|outcome| outcome.message.clone());

        Ok(TestExecutionResult {
            step_id: step.id,
            step_name: step.name.clone(),
            status: if success { StepStatus::Passed } else { StepStatus::Failed },
            success,
            response_time,
            status_code,
            response_data: Some(doc),
            error_message,
            attempts,
            validations,
            extracted,
        })
    }

    fn prepare(&self, project: &Project, step: &TestStep, ctx: &RunContext) -> AppResult<PreparedStep> {
        let url_text = template::resolve_text(&step.url, ctx)?;
        let url_text = url_text.trim().to_string();

        let sql = Self::parse_sql(step, ctx)?;

        let url = if url_text.is_empty() {
            if sql.is_empty() {
                return Err(AppError::Validation(format!(
                    "step '{}' has neither a url nor sql_queries",
                    step.name
                )));
            }
            None
        } else if url_text.starts_with("http://") || url_text.starts_with("https://") {
            Some(url_text)
        } else {
            let base = template::resolve_text(&project.base_url, ctx)?;
            let base = base.trim();
            if base.is_empty() {
                return Err(AppError::Validation(format!(
                    "step '{}' uses a relative url but the project has no base_url",
                    step.name
                )));
            }
            Some(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url_text.trim_start_matches('/')
            ))
        };

        let method = match &url {
            Some(_) => Self::parse_method(&template::resolve_text(&step.method, ctx)?)?,
            // Unused for SQL-only steps
            None => Method::GET,
        };

        let headers = Self::merged_headers(project, step, ctx)?;
        let params = Self::object_entries(&template::resolve_value(&step.params, ctx)?, "params")?;
        let body = match &step.body {
            Value::Null => None,
            other => Some(template::resolve_value(other, ctx)?),
        };
        let files = Self::object_entries(&template::resolve_value(&step.files, ctx)?, "files")?;
        let auth = Self::parse_auth(step, ctx)?;
        let validate = Self::parse_validations(step, ctx)?;
        let extract = template::resolve_value(&step.extract, ctx)?;

        let timeout = if step.timeout > 0 {
            Duration::from_secs(step.timeout as u64)
        } else {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        };

        Ok(PreparedStep {
            url,
            method,
            headers,
            params,
            body,
            files,
            auth,
            sql,
            validate,
            extract,
            timeout,
        })
    }

    async fn send_once(
        &self,
        url: &str,
        prepared: &PreparedStep,
        files: &[LoadedFile],
    ) -> AppResult<(u16, Value, Value)> {
        let mut request = self
            .client
            .request(prepared.method.clone(), url)
            .timeout(prepared.timeout)
            .headers(prepared.headers.clone());

        if !prepared.params.is_empty() {
            request = request.query(&prepared.params);
        }

        request = match &prepared.auth {
            AuthSpec::None => request,
            AuthSpec::Bearer { token } => request.bearer_auth(token),
            AuthSpec::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        if !files.is_empty() {
            let mut form = multipart::Form::new();
            if let Some(Value::Object(fields)) = &prepared.body {
                for (name, value) in fields {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    form = form.text(name.clone(), text);
                }
            }
            for file in files {
                let part = multipart::Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone());
                form = form.part(file.field.clone(), part);
            }
            request = request.multipart(form);
        } else if matches!(prepared.method, Method::POST | Method::PUT | Method::PATCH) {
            if let Some(body) = &prepared.body {
                request = request.json(body);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("request failed: {}", e)))?;

        let status = response.status().as_u16();
        let headers = Self::header_document(response.headers());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Transport(format!("reading response body failed: {}", e)))?;

        // Non-JSON bodies stay addressable as one string under `body`
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok((status, headers, body))
    }

    fn merged_headers(
        project: &Project,
        step: &TestStep,
        ctx: &RunContext,
    ) -> AppResult<HeaderMap> {
        let defaults =
            Self::object_entries(&template::resolve_value(&project.headers, ctx)?, "project headers")?;
        let own = Self::object_entries(&template::resolve_value(&step.headers, ctx)?, "headers")?;

        // Later inserts win, so step headers override project defaults
        let mut headers = HeaderMap::new();
        for (raw_name, raw_value) in defaults.into_iter().chain(own) {
            let name = HeaderName::try_from(raw_name.as_str()).map_err(|_| {
                AppError::Validation(format!("invalid header name '{}'", raw_name))
            })?;
            let value = HeaderValue::try_from(raw_value.as_str()).map_err(|_| {
                AppError::Validation(format!("invalid value for header '{}'", raw_name))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn object_entries(value: &Value, what: &str) -> AppResult<Vec<(String, String)>> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Object(map) => Ok(map
                .iter()
                .map(|(name, value)| {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), text)
                })
                .collect()),
            _ => Err(AppError::Validation(format!(
                "step {} must be a JSON object",
                what
            ))),
        }
    }

    fn parse_method(text: &str) -> AppResult<Method> {
        match text.to_uppercase().as_str() {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "DELETE" => Ok(Method::DELETE),
            "PATCH" => Ok(Method::PATCH),
            "HEAD" => Ok(Method::HEAD),
            "OPTIONS" => Ok(Method::OPTIONS),
            other => Err(AppError::Validation(format!(
                "Unsupported HTTP method: {}",
                other
            ))),
        }
    }

    fn parse_auth(step: &TestStep, ctx: &RunContext) -> AppResult<AuthSpec> {
        match &step.auth {
            Value::Null => Ok(AuthSpec::None),
            Value::Object(map) if map.is_empty() => Ok(AuthSpec::None),
            other => {
                let resolved = template::resolve_value(other, ctx)?;
                serde_json::from_value(resolved)
                    .map_err(|e| AppError::Validation(format!("invalid auth spec: {}", e)))
            }
        }
    }

    fn parse_validations(step: &TestStep, ctx: &RunContext) -> AppResult<Vec<ValidationRule>> {
        match &step.validate {
            Value::Null => Ok(Vec::new()),
            other => {
                let resolved = template::resolve_value(other, ctx)?;
                serde_json::from_value(resolved)
                    .map_err(|e| AppError::Validation(format!("invalid validation rules: {}", e)))
            }
        }
    }

    fn parse_sql(step: &TestStep, ctx: &RunContext) -> AppResult<Vec<SqlQuery>> {
        let queries: Vec<SqlQuery> = match &step.sql_queries {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other.clone())
                .map_err(|e| AppError::Validation(format!("invalid sql_queries: {}", e)))?,
        };

        queries
            .into_iter()
            .map(|query| {
                Ok(SqlQuery {
                    name: query.name,
                    sql: template::resolve_text(&query.sql, ctx)?,
                    database: query.database,
                })
            })
            .collect()
    }

    async fn load_files(entries: &[(String, String)]) -> AppResult<Vec<LoadedFile>> {
        let mut files = Vec::with_capacity(entries.len());
        for (field, path) in entries {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                AppError::Validation(format!("cannot read upload file '{}': {}", path, e))
            })?;
            let file_name = std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            files.push(LoadedFile {
                field: field.clone(),
                file_name,
                bytes,
            });
        }
        Ok(files)
    }

    fn header_document(headers: &HeaderMap) -> Value {
        let mut map = serde_json::Map::new();
        for (name, value) in headers {
            let text = String::from_utf8_lossy(value.as_bytes()).into_owned();
            match map.get_mut(name.as_str()) {
                None => {
                    map.insert(name.as_str().to_string(), Value::String(text));
                }
                Some(Value::String(first)) => {
                    let first = first.clone();
                    map.insert(name.as_str().to_string(), json!([first, text]));
                }
                Some(Value::Array(items)) => items.push(Value::String(text)),
                Some(_) => {}
            }
        }
        Value::Object(map)
    }

    fn step_failure(
        step: &TestStep,
        attempts: i32,
        status_code: Option<u16>,
        response_time: i64,
        response_data: Option<Value>,
        message: String,
    ) -> TestExecutionResult {
        TestExecutionResult {
            step_id: step.id,
            step_name: step.name.clone(),
            status: StepStatus::Failed,
            success: false,
            response_time,
            status_code,
            response_data,
            error_message: Some(message),
            attempts,
            validations: Vec::new(),
            extracted: HashMap::new(),
        }
    }
}
