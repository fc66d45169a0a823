#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::{json, Value};

use conduit_api::store::AppState;

/// An API instance served in-process on an ephemeral port, backed by the
/// in-memory store so every test file gets an isolated world.
pub struct TestServer {
    pub base_url: String,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let state = AppState::memory();
    let app = conduit_api::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server");
    });

    Ok(TestServer {
        base_url: format!("http://{}", addr),
    })
}

/// Register a user and return the issued token.
pub async fn register(
    client: &reqwest::Client,
    server: &TestServer,
    username: &str,
) -> Result<String> {
    let res = client
        .post(server.url("/api/users"))
        .json(&json!({
            "user": {
                "email": format!("{username}@example.com"),
                "username": username,
                "password": "password123",
            }
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status().is_success(), "register failed: {}", res.status());

    let body: Value = res.json().await?;
    body["user"]["token"]
        .as_str()
        .map(str::to_string)
        .context("register response missing token")
}

/// Create an article as the given user and return its slug.
pub async fn create_article(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    title: &str,
    tags: &[&str],
) -> Result<String> {
    let res = client
        .post(server.url("/api/articles"))
        .header("Authorization", token)
        .json(&json!({
            "article": {
                "title": title,
                "description": "a description",
                "body": "a body",
                "tagList": tags,
            }
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status().is_success(), "create article failed: {}", res.status());

    let body: Value = res.json().await?;
    body["article"]["slug"]
        .as_str()
        .map(str::to_string)
        .context("create response missing slug")
}
