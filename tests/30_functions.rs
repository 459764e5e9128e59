mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

async fn call(method: Method, function: &str, token: Option<&str>, body: Option<Value>) -> Result<reqwest::Response> {
    let server = common::ensure_server().await?;
    let mut req = reqwest::Client::new().request(method, server.function_url(function));
    if let Some(token) = token {
        req = req.bearer_auth(token);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }
    Ok(req.send().await?)
}

#[tokio::test]
async fn all_http_methods_walks_a_todo_through_every_verb() -> Result<()> {
    let token = common::user_token();
    let task = common::unique("task");

    let res = call(Method::POST, "all-http-methods", Some(&token), Some(json!({"task": task}))).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = res.json::<Value>().await?;
    assert_eq!(created["method"], "POST");
    assert_eq!(created["methodType"], "simple - no Access-Control-Allow-Methods needed");
    assert_eq!(created["data"]["user_id"], "00000000-0000-0000-0000-000000000001");
    let id = created["data"]["id"].clone();

    let res = call(Method::GET, "all-http-methods", Some(&token), None).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let listed = res.json::<Value>().await?;
    let todos = listed["data"].as_array().cloned().unwrap_or_default();
    assert!(todos.iter().any(|t| t["task"] == json!(task)));
    let ids: Vec<f64> = todos.iter().filter_map(|t| t["id"].as_f64()).collect();
    assert!(ids.windows(2).all(|w| w[0] <= w[1]), "todos not ordered by id: {:?}", ids);

    let res = call(Method::PATCH, "all-http-methods", Some(&token), Some(json!({"id": id, "is_complete": true}))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let patched = res.json::<Value>().await?;
    assert_eq!(patched["methodType"], "non-simple - REQUIRES Access-Control-Allow-Methods");
    assert_eq!(patched["data"]["is_complete"], true);
    assert_eq!(patched["data"]["task"], json!(task));

    let res = call(Method::PUT, "all-http-methods", Some(&token), Some(json!({"id": id, "task": "renamed"}))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?["data"]["task"], "renamed");

    let res = call(Method::DELETE, "all-http-methods", Some(&token), Some(json!({"id": id}))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let deleted = res.json::<Value>().await?;
    assert_eq!(deleted["data"]["id"], id);
    assert!(deleted["corsNote"].as_str().unwrap_or_default().starts_with("DELETE requires"));
    Ok(())
}

#[tokio::test]
async fn all_http_methods_validates_input() -> Result<()> {
    let token = common::user_token();

    let res = call(Method::GET, "all-http-methods", None, None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = call(Method::POST, "all-http-methods", Some(&token), Some(json!({"user_id": "u"}))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Missing 'task' field");

    let res = call(Method::PUT, "all-http-methods", Some(&token), Some(json!({"task": "x"}))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Missing 'id' field");
    Ok(())
}

#[tokio::test]
async fn all_http_methods_rejects_unsupported_verbs() -> Result<()> {
    let token = common::user_token();
    let res = call(Method::from_bytes(b"TRACE")?, "all-http-methods", Some(&token), None).await?;

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET, POST, PUT, PATCH, DELETE, OPTIONS");
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Method TRACE not supported");
    assert_eq!(body["supportedMethods"], json!(["GET", "POST", "PUT", "PATCH", "DELETE"]));
    Ok(())
}

#[tokio::test]
async fn delete_method_checks_the_verb_before_the_caller() -> Result<()> {
    let res = call(Method::GET, "delete-method", None, None).await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "DELETE, OPTIONS");
    assert_eq!(res.json::<Value>().await?["error"], "Method not allowed. Use DELETE method.");

    let res = call(Method::DELETE, "delete-method", None, Some(json!({"id": 1}))).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn delete_method_removes_a_todo() -> Result<()> {
    let token = common::user_token();

    let res = call(Method::POST, "all-http-methods", Some(&token), Some(json!({"task": common::unique("doomed")}))).await?;
    let id = res.json::<Value>().await?["data"]["id"].clone();

    let res = call(Method::DELETE, "delete-method", Some(&token), Some(json!({}))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Missing 'id' field in request body");

    let res = call(Method::DELETE, "delete-method", Some(&token), Some(json!({"id": id}))).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "DELETE");
    assert_eq!(body["deletedTodo"]["id"], id);

    let res = call(Method::DELETE, "delete-method", Some(&token), Some(json!({"id": id}))).await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.json::<Value>().await?["code"], "UPSTREAM_ERROR");
    Ok(())
}

#[tokio::test]
async fn get_claims_demo_echoes_verified_claims() -> Result<()> {
    let token = common::token("user-42", Some("ada@example.com"), "authenticated");

    let res = call(Method::GET, "get-claims-demo", Some(&token), None).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<Value>().await?;
    assert_eq!(body["message"], "Hello ada@example.com!");
    assert_eq!(body["user"], json!({"id": "user-42", "email": "ada@example.com", "role": "authenticated"}));
    assert_eq!(body["claims"]["sub"], "user-42");

    let anon = common::token("anon-1", None, "anon");
    let res = call(Method::POST, "get-claims-demo", Some(&anon), None).await?;
    assert_eq!(res.json::<Value>().await?["message"], "Hello user!");
    Ok(())
}

#[tokio::test]
async fn get_claims_demo_rejects_bad_tokens() -> Result<()> {
    let res = call(Method::GET, "get-claims-demo", None, None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>().await?["error"], "Missing Authorization header");

    let foreign = edge_playground::auth::JwtKeys::new("some-other-secret-that-is-long-enough", None)?
        .sign(&edge_playground::auth::Claims::new(None, None, "anon", 1))?;
    let res = call(Method::GET, "get-claims-demo", Some(&foreign), None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["error"], "Invalid JWT");
    assert!(body["details"].is_string());
    Ok(())
}

#[tokio::test]
async fn upload_url_requires_a_file_name() -> Result<()> {
    let res = call(Method::POST, "generate-upload-url", None, Some(json!({"bucketName": "b"}))).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "fileName is required");

    let res = call(
        Method::POST,
        "generate-upload-url",
        None,
        Some(json!({"fileName": "a.txt", "bucketName": "../../../bucket"})),
    )
    .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>().await?["error"], "Invalid bucketName: ../../../bucket");

    let res = call(Method::POST, "generate-upload-url", None, Some(json!({"fileName": "a.txt"}))).await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
