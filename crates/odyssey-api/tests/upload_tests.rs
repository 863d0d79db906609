//! File upload integration tests.

use common::jwt::Role;
use odyssey_test_utils::TestOdysseyServer;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

fn file_part(name: &str, bytes: &'static [u8]) -> Part {
    Part::bytes(bytes).file_name(name.to_string())
}

/// Test that an uploaded file is stored and served back.
#[tokio::test]
async fn test_upload_stores_and_serves_file() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let (_, token) = server.create_user("hubble", Role::User).await?;
    let client = reqwest::Client::new();

    let form = Form::new().part("file", file_part("deep-field.PNG", b"\x89PNG fake image"));
    let response = client
        .post(format!("{}/upload", server.url()))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    let file = body["file"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("missing file"))?
        .to_string();
    assert!(file.ends_with(".png"));
    assert_eq!(
        body["path"],
        format!("http://{}/uploads/{file}", server.addr())
    );
    assert!(server.upload_dir().join(&file).is_file());

    let response = client
        .get(format!("{}/uploads/{file}", server.url()))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.bytes().await?.as_ref(), b"\x89PNG fake image");

    Ok(())
}

/// Test that two uploads of the same name get distinct stored names.
#[tokio::test]
async fn test_uploads_do_not_overwrite() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let (_, token) = server.create_user("hubble", Role::User).await?;
    let client = reqwest::Client::new();

    let mut stored = Vec::new();
    for contents in [b"first".as_slice(), b"second".as_slice()] {
        let form = Form::new().part("file", Part::bytes(contents).file_name("m31.jpg"));
        let response = client
            .post(format!("{}/upload", server.url()))
            .bearer_auth(&token)
            .multipart(form)
            .send()
            .await?;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await?;
        stored.push(body["file"].as_str().unwrap_or_default().to_string());
    }

    assert_ne!(stored.first(), stored.last());
    assert_eq!(std::fs::read_dir(server.upload_dir())?.count(), 2);

    Ok(())
}

/// Test that a form without a file part is rejected.
#[tokio::test]
async fn test_upload_without_file() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let (_, token) = server.create_user("hubble", Role::User).await?;

    let form = Form::new().text("caption", "Pillars of Creation");
    let response = reqwest::Client::new()
        .post(format!("{}/upload", server.url()))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "No file provided");

    Ok(())
}

/// Test that only one file is accepted per request.
#[tokio::test]
async fn test_upload_rejects_second_file() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let (_, token) = server.create_user("hubble", Role::User).await?;

    let form = Form::new()
        .part("file", file_part("a.png", b"one"))
        .part("file", file_part("b.png", b"two"));
    let response = reqwest::Client::new()
        .post(format!("{}/upload", server.url()))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Only one file may be uploaded per request");
    assert_eq!(std::fs::read_dir(server.upload_dir())?.count(), 0);

    Ok(())
}

/// Test that a non-multipart body is a JSON 400.
#[tokio::test]
async fn test_upload_requires_multipart() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;
    let (_, token) = server.create_user("hubble", Role::User).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/upload", server.url()))
        .bearer_auth(&token)
        .json(&serde_json::json!({"file": "inline"}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], "Expected a multipart/form-data body");

    Ok(())
}

/// Test that uploading requires a session.
#[tokio::test]
async fn test_upload_requires_auth() -> Result<(), anyhow::Error> {
    let server = TestOdysseyServer::spawn().await?;

    let form = Form::new().part("file", file_part("a.png", b"one"));
    let response = reqwest::Client::new()
        .post(format!("{}/upload", server.url()))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), 401);
    assert_eq!(std::fs::read_dir(server.upload_dir())?.count(), 0);

    Ok(())
}
