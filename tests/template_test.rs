mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{Factory, TestApp};

async fn seed_variable(app: &TestApp, payload: serde_json::Value) {
    app.server
        .post("/api/variables")
        .json(&payload)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_resolves_global_variable_into_text() {
    let app = TestApp::new().await;
    seed_variable(&app, json!({ "name": "greeting", "value": "hello", "scope": "global" })).await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "{{greeting}} world" }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "hello world");
}

#[tokio::test]
async fn test_more_specific_scope_wins() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let project = factory
        .create_project_with("http://api.test", json!({}), json!({ "n": "project-bag" }))
        .await;
    let environment = factory
        .create_environment(project.id, "dev", json!({ "n": "env-bag" }))
        .await;
    let case = factory.create_case(project.id).await;

    seed_variable(&app, json!({ "name": "n", "value": "global", "scope": "global" })).await;
    seed_variable(
        &app,
        json!({ "name": "n", "value": "project-row", "scope": "project", "project_id": project.id }),
    )
    .await;
    seed_variable(
        &app,
        json!({ "name": "n", "value": "env-row", "scope": "environment", "environment_id": environment.id }),
    )
    .await;
    seed_variable(
        &app,
        json!({ "name": "n", "value": "case-row", "scope": "case", "case_id": case.id }),
    )
    .await;

    let resolve = |selection: serde_json::Value| {
        let server = &app.server;
        async move {
            let mut payload = selection;
            payload["template"] = json!("{{n}}");
            let response = server
                .post("/api/variables/process-template")
                .json(&payload)
                .await;
            response.assert_status(StatusCode::OK);
            let body: serde_json::Value = response.json();
            body["result"].as_str().unwrap().to_string()
        }
    };

    assert_eq!(
        resolve(json!({ "case_id": case.id, "environment_id": environment.id })).await,
        "case-row"
    );
    assert_eq!(
        resolve(json!({ "environment_id": environment.id })).await,
        "env-row"
    );
    assert_eq!(resolve(json!({ "project_id": project.id })).await, "project-row");
    assert_eq!(resolve(json!({})).await, "global");
}

#[tokio::test]
async fn test_embedded_bags_resolve_under_explicit_rows() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let project = factory
        .create_project_with("http://api.test", json!({}), json!({ "region": "eu-west" }))
        .await;
    let environment = factory
        .create_environment(project.id, "dev", json!({ "host": "dev.api.test" }))
        .await;

    // Bag entries are reachable on their own
    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({
            "template": "{{host}}/{{region}}",
            "environment_id": environment.id
        }))
        .await;
    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "dev.api.test/eu-west");

    // An explicit environment row shadows the bag entry of the same name
    seed_variable(
        &app,
        json!({ "name": "host", "value": "row.api.test", "scope": "environment", "environment_id": environment.id }),
    )
    .await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "{{host}}", "environment_id": environment.id }))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "row.api.test");
}

#[tokio::test]
async fn test_temp_variables_take_top_precedence() {
    let app = TestApp::new().await;
    seed_variable(&app, json!({ "name": "who", "value": "stored", "scope": "global" })).await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({
            "template": "{{who}}",
            "temp_variables": { "who": "temporary" }
        }))
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "temporary");
}

#[tokio::test]
async fn test_whole_placeholder_keeps_structure() {
    let app = TestApp::new().await;
    seed_variable(
        &app,
        json!({ "name": "payload", "value": { "items": [1, 2] }, "scope": "global" }),
    )
    .await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({
            "template": { "body": "{{payload}}", "note": "got {{payload}}" }
        }))
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["result"]["body"], json!({ "items": [1, 2] }));
    assert_eq!(body["result"]["note"].as_str().unwrap(), r#"got {"items":[1,2]}"#);
}

#[tokio::test]
async fn test_nested_templates_expand() {
    let app = TestApp::new().await;
    seed_variable(&app, json!({ "name": "host", "value": "api.test", "scope": "global" })).await;
    seed_variable(
        &app,
        json!({ "name": "base", "value": "https://{{host}}/v1", "scope": "global" }),
    )
    .await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "{{base}}/users" }))
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "https://api.test/v1/users");
}

#[tokio::test]
async fn test_unresolved_variable_names_the_missing_identifier() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "{{nope}}" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert!(body["details"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_circular_reference_is_reported() {
    let app = TestApp::new().await;
    seed_variable(&app, json!({ "name": "a", "value": "{{b}}", "scope": "global" })).await;
    seed_variable(&app, json!({ "name": "b", "value": "{{a}}", "scope": "global" })).await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "{{a}}" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"].as_str().unwrap(), "Circular template reference");
}

#[tokio::test]
async fn test_encrypted_variables_decrypt_during_resolution() {
    let app = TestApp::new().await;
    seed_variable(
        &app,
        json!({ "name": "api_key", "value": "sk-live-1", "scope": "global", "is_encrypted": true }),
    )
    .await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({ "template": "key={{api_key}}" }))
        .await;

    let body: serde_json::Value = response.json();
    assert_eq!(body["result"].as_str().unwrap(), "key=sk-live-1");
}

#[tokio::test]
async fn test_selection_across_projects_is_rejected() {
    let app = TestApp::new().await;
    let factory = Factory::new(&app.state);
    let project_a = factory.create_project("http://a.test").await;
    let project_b = factory.create_project("http://b.test").await;
    let environment = factory
        .create_environment(project_a.id, "dev", json!({}))
        .await;
    let case = factory.create_case(project_b.id).await;

    let response = app
        .server
        .post("/api/variables/process-template")
        .json(&json!({
            "template": "{{x}}",
            "environment_id": environment.id,
            "case_id": case.id
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}
