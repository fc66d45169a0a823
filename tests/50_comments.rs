mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn add_comment(
    client: &reqwest::Client,
    server: &common::TestServer,
    token: &str,
    slug: &str,
    body: &str,
) -> Result<Value> {
    let res = client
        .post(server.url(&format!("/api/articles/{slug}/comments")))
        .header("Authorization", token)
        .json(&json!({ "comment": { "body": body } }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "add comment: {}", res.status());
    Ok(res.json().await?)
}

#[tokio::test]
async fn comments_are_added_and_listed_publicly() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let author = common::register(&client, &server, "author").await?;
    let reader = common::register(&client, &server, "reader").await?;
    let slug = common::create_article(&client, &server, &author, "Commented", &[]).await?;

    add_comment(&client, &server, &reader, &slug, "First!").await?;
    add_comment(&client, &server, &reader, &slug, "Also this").await?;

    // Listing is public
    let res = client
        .get(server.url(&format!("/api/articles/{slug}/comments")))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let comments = body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["body"], "First!");
    assert_eq!(comments[0]["author"]["username"], "reader");
    assert_eq!(comments[0]["author"]["following"], false);
    Ok(())
}

#[tokio::test]
async fn blank_comment_body_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let token = common::register(&client, &server, "author").await?;
    let slug = common::create_article(&client, &server, &token, "Quiet", &[]).await?;

    let res = client
        .post(server.url(&format!("/api/articles/{slug}/comments")))
        .header("Authorization", &token)
        .json(&json!({ "comment": { "body": "   " } }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await?;
    assert_eq!(body["errors"]["body"][0], "can't be blank");
    Ok(())
}

#[tokio::test]
async fn only_the_comment_author_may_delete() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let author = common::register(&client, &server, "author").await?;
    let commenter = common::register(&client, &server, "commenter").await?;
    let slug = common::create_article(&client, &server, &author, "Debated", &[]).await?;

    let created = add_comment(&client, &server, &commenter, &slug, "hot take").await?;
    let id = created["comment"]["id"].as_str().unwrap().to_string();

    // The article author is not the comment author
    let res = client
        .delete(server.url(&format!("/api/articles/{slug}/comments/{id}")))
        .header("Authorization", &author)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The comment is still retrievable after the refused delete
    let res = client
        .get(server.url(&format!("/api/articles/{slug}/comments")))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert_eq!(body["comments"].as_array().unwrap().len(), 1);

    let res = client
        .delete(server.url(&format!("/api/articles/{slug}/comments/{id}")))
        .header("Authorization", &commenter)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/api/articles/{slug}/comments")))
        .send()
        .await?;
    let body: Value = res.json().await?;
    assert!(body["comments"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn comment_ids_are_scoped_to_their_article() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let token = common::register(&client, &server, "author").await?;
    let first = common::create_article(&client, &server, &token, "First", &[]).await?;
    let second = common::create_article(&client, &server, &token, "Second", &[]).await?;

    let created = add_comment(&client, &server, &token, &first, "on the first").await?;
    let id = created["comment"]["id"].as_str().unwrap().to_string();

    // Deleting through the wrong article's slug is a 404
    let res = client
        .delete(server.url(&format!("/api/articles/{second}/comments/{id}")))
        .header("Authorization", &token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn deleting_an_article_cascades_to_its_comments() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();
    let token = common::register(&client, &server, "author").await?;
    let slug = common::create_article(&client, &server, &token, "Doomed", &[]).await?;
    add_comment(&client, &server, &token, &slug, "soon gone").await?;

    let res = client
        .delete(server.url(&format!("/api/articles/{slug}")))
        .header("Authorization", &token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(server.url(&format!("/api/articles/{slug}/comments")))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}
