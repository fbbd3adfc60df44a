//! API integration tests
//!
//! Reader and admin REST endpoints, plus the export and staged-import flow

use anyhow::Result;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use sea_orm::Database;
use serde_json::{json, Value};
use storyshelf::config::ServerConfig;
use storyshelf::database::connection::setup_database;
use storyshelf::exchange::{document, FileStagingArea, StagingArea};
use storyshelf::server::app::create_app;
use tempfile::{NamedTempFile, TempDir};

const PASSWORD: &str = "s3cret";

struct TestApp {
    server: TestServer,
    staging: FileStagingArea,
    _db_file: NamedTempFile,
    _staging_dir: TempDir,
}

/// Create a test server backed by a temporary database and staging directory
async fn setup_test_server() -> Result<TestApp> {
    let db_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let staging_dir = TempDir::new()?;
    let config = ServerConfig {
        staging_dir: staging_dir.path().to_path_buf(),
        upload_password: PASSWORD.to_string(),
        ..Default::default()
    };

    let app = create_app(db, &config).await?;
    let server = TestServer::new(app)?;

    Ok(TestApp {
        server,
        staging: FileStagingArea::new(staging_dir.path()),
        _db_file: db_file,
        _staging_dir: staging_dir,
    })
}

fn password_header() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-upload-password"),
        HeaderValue::from_static(PASSWORD),
    )
}

async fn create_story(server: &TestServer, title: &str, content: &str) -> Value {
    let (name, value) = password_header();
    let response = server
        .post("/api/v1/admin/stories")
        .add_header(name, value)
        .json(&json!({ "title": title, "author": "Lan", "content": content }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json()
}

fn import_form(password: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_text("password", password.to_string()).add_part(
        "import_file",
        Part::bytes(bytes)
            .file_name("films_export.json")
            .mime_type("application/json"),
    )
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let app = setup_test_server().await?;

    let response = app.server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "storyshelf-server");
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_openapi_document_lists_exchange_paths() -> Result<()> {
    let app = setup_test_server().await?;

    let response = app.server.get("/api-docs/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert!(body["paths"]["/api/v1/admin/export"].is_object());
    assert!(body["paths"]["/api/v1/admin/import/confirm"].is_object());

    Ok(())
}

#[tokio::test]
async fn test_admin_endpoints_require_password() -> Result<()> {
    let app = setup_test_server().await?;

    let response = app.server.post("/api/v1/admin/export").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let response = app
        .server
        .get("/api/v1/admin/stories")
        .add_header(
            HeaderName::from_static("x-upload-password"),
            HeaderValue::from_static("wrong"),
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_export_is_a_json_attachment() -> Result<()> {
    let app = setup_test_server().await?;
    create_story(&app.server, "The Fox", "Chapter one").await;

    let response = app
        .server
        .post("/api/v1/admin/export")
        .form(&[("password", PASSWORD)])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let disposition = response.header("content-disposition");
    let disposition = disposition.to_str()?;
    assert!(disposition.starts_with("attachment; filename=\"films_export_"));
    assert!(disposition.ends_with(".json\""));

    let body: Value = response.json();
    assert_eq!(body["stories"][0]["title"], "The Fox");
    assert_eq!(body["parts"][0]["content"], "Chapter one");
    assert!(body["videos"].as_array().is_some_and(Vec::is_empty));

    Ok(())
}

#[tokio::test]
async fn test_upload_without_collisions_imports_directly() -> Result<()> {
    let app = setup_test_server().await?;
    let upload = json!({
        "stories": [{"id": 3, "title": "Night Train", "author": "Mei"}],
        "parts": [{"id": 1, "story_id": 3, "part_number": 1, "content": "All aboard"}]
    });

    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(import_form(PASSWORD, upload.to_string().into_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({"status": "imported", "imported": 1, "overwritten": 0, "skipped": 0})
    );
    assert!(app.staging.pending().await?.is_empty());

    let results: Value = app.server.get("/api/v1/search").add_query_param("q", "night").await.json();
    assert_eq!(results[0]["title"], "Night Train");

    Ok(())
}

#[tokio::test]
async fn test_upload_with_collisions_is_staged_for_review() -> Result<()> {
    let app = setup_test_server().await?;
    let existing = create_story(&app.server, "The Fox", "Existing opening").await;
    let upload = json!({
        "stories": [
            {"id": 10, "title": "THE FOX"},
            {"id": 11, "title": "Night Train"}
        ],
        "parts": [
            {"id": 1, "story_id": 10, "part_number": 1, "content": "Incoming fox"},
            {"id": 2, "story_id": 11, "part_number": 1, "content": "All aboard"}
        ]
    });

    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(import_form(PASSWORD, upload.to_string().into_bytes()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "review");
    assert_eq!(body["clean_count"], 1);

    let token = body["token"].as_str().unwrap_or_default();
    assert!(!token.is_empty());
    assert_eq!(app.staging.pending().await?, vec![token.to_string()]);

    let duplicates = body["duplicates"].as_array().cloned().unwrap_or_default();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0]["incoming_id"], 10);
    assert_eq!(duplicates[0]["existing_id"], existing["id"]);
    assert_eq!(duplicates[0]["title"], "THE FOX");
    assert_eq!(duplicates[0]["existing_excerpt"], "Existing opening");
    assert_eq!(duplicates[0]["incoming_excerpt"], "Incoming fox");

    Ok(())
}

#[tokio::test]
async fn test_upload_rejects_bad_requests() -> Result<()> {
    let app = setup_test_server().await?;

    // No file part at all
    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(MultipartForm::new().add_text("password", PASSWORD))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "MISSING_FILE");

    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(import_form(PASSWORD, b"{\"stories\": [".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_DOCUMENT");

    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(import_form("wrong", b"{}".to_vec()))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    assert!(app.staging.pending().await?.is_empty());
    let listing: Value = app
        .server
        .get("/api/v1/admin/stories")
        .add_header(password_header().0, password_header().1)
        .await
        .json();
    assert_eq!(listing["stories"]["total"], 0);

    Ok(())
}

#[tokio::test]
async fn test_upload_accepts_documents_beyond_two_megabytes() -> Result<()> {
    let app = setup_test_server().await?;
    let content = "lorem ipsum ".repeat(300_000);
    let upload = json!({
        "stories": [{"id": 1, "title": "Long Haul"}],
        "parts": [{"id": 1, "story_id": 1, "part_number": 1, "content": content}]
    })
    .to_string()
    .into_bytes();
    assert!(upload.len() > 3 * 1024 * 1024);

    let response = app
        .server
        .post("/api/v1/admin/import")
        .multipart(import_form(PASSWORD, upload))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "imported");
    assert_eq!(body["imported"], 1);

    Ok(())
}

#[tokio::test]
async fn test_upload_limit_is_configurable() -> Result<()> {
    let db_file = NamedTempFile::new()?;
    let db = Database::connect(&format!("sqlite://{}?mode=rwc", db_file.path().display())).await?;
    setup_database(&db).await?;
    let staging_dir = TempDir::new()?;
    let config = ServerConfig {
        staging_dir: staging_dir.path().to_path_buf(),
        upload_password: PASSWORD.to_string(),
        max_upload_mb: 1,
        ..Default::default()
    };
    let server = TestServer::new(create_app(db, &config).await?)?;

    let upload = json!({
        "stories": [{"id": 1, "title": "Long Haul"}],
        "parts": [{"id": 1, "story_id": 1, "part_number": 1, "content": "x".repeat(2 * 1024 * 1024)}]
    })
    .to_string()
    .into_bytes();

    let response = server
        .post("/api/v1/admin/import")
        .multipart(import_form(PASSWORD, upload))
        .await;

    assert!(response.status_code().is_client_error());
    let listing: Value = server
        .get("/api/v1/admin/stories")
        .add_header(password_header().0, password_header().1)
        .await
        .json();
    assert_eq!(listing["stories"]["total"], 0);

    Ok(())
}

#[tokio::test]
async fn test_confirm_applies_staged_import() -> Result<()> {
    let app = setup_test_server().await?;
    create_story(&app.server, "The Fox", "Existing opening").await;

    let incoming = document::parse(
        json!({
            "stories": [
                {"id": 10, "title": "the fox"},
                {"id": 11, "title": "Night Train"}
            ],
            "parts": [
                {"id": 1, "story_id": 10, "part_number": 1, "content": "Incoming fox"},
                {"id": 2, "story_id": 11, "part_number": 1, "content": "All aboard"}
            ]
        })
        .to_string()
        .as_bytes(),
    )?;
    let token = app.staging.stage(&incoming).await?;

    let response = app
        .server
        .post("/api/v1/admin/import/confirm")
        .form(&[
            ("password", PASSWORD),
            ("token", token.as_str()),
            ("decision_10", "overwrite"),
        ])
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let outcome: Value = response.json();
    assert_eq!(outcome, json!({"imported": 2, "overwritten": 1, "skipped": 0}));
    assert!(app.staging.pending().await?.is_empty());

    let results: Value = app.server.get("/api/v1/search").add_query_param("q", "fox").await.json();
    let results = results.as_array().cloned().unwrap_or_default();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["title"], "the fox");

    // Consumed tokens are gone
    let response = app
        .server
        .post("/api/v1/admin/import/confirm")
        .form(&[("password", PASSWORD), ("token", token.as_str())])
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_discard_staged_import() -> Result<()> {
    let app = setup_test_server().await?;
    let token = app.staging.stage(&Default::default()).await?;

    let response = app
        .server
        .post("/api/v1/admin/import/discard")
        .form(&[("password", PASSWORD), ("token", token.as_str())])
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
    assert!(app.staging.pending().await?.is_empty());

    let response = app
        .server
        .post("/api/v1/admin/import/discard")
        .form(&[("password", PASSWORD), ("token", "../../etc/passwd")])
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_story_editing_and_reading() -> Result<()> {
    let app = setup_test_server().await?;
    let (name, value) = password_header();

    let response = app
        .server
        .post("/api/v1/admin/categories")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "names": ["Fantasy", "Mystery"] }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let created: Value = response.json();
    let fantasy_id = created[0]["id"].as_i64().unwrap_or_default();

    let response = app
        .server
        .post("/api/v1/admin/stories")
        .add_header(name.clone(), value.clone())
        .json(&json!({
            "title": "  The Fox  ",
            "story_type": "long",
            "category_ids": [fantasy_id],
            "content": "Chapter one",
            "video_urls": ["https://drive.google.com/file/d/abc/view", "  "]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let story: Value = response.json();
    let story_id = story["id"].as_i64().unwrap_or_default();
    assert_eq!(story["title"], "The Fox");
    assert_eq!(story["category_id"], fantasy_id);

    let response = app
        .server
        .post(&format!("/api/v1/admin/stories/{}/parts", story_id))
        .add_header(name.clone(), value.clone())
        .json(&json!({ "content": "Chapter two" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["part_number"], 2);

    let page: Value = app
        .server
        .get(&format!("/api/v1/stories/{}", story_id))
        .add_query_param("part", 1)
        .await
        .json();
    assert_eq!(page["total_parts"], 2);
    assert_eq!(page["current_part"]["content"], "Chapter one");
    assert_eq!(page["story"]["views"], 1);
    assert_eq!(
        page["videos"][0]["embed_url"],
        "https://drive.google.com/file/d/abc/preview"
    );

    let response = app
        .server
        .post(&format!("/api/v1/stories/{}/comments", story_id))
        .json(&json!({ "name": "", "content": "Loved it" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let comment: Value = response.json();
    assert_eq!(comment["url"], format!("/story/{}", story_id));
    assert!(comment["name"].is_null());

    let rating: Value = app
        .server
        .post(&format!("/api/v1/stories/{}/rating", story_id))
        .json(&json!({ "rating": 4 }))
        .await
        .json();
    assert_eq!(rating["rating_count"], 1);
    assert_eq!(rating["average_rating"], 4.0);

    let listing: Value = app
        .server
        .get(&format!("/api/v1/categories/{}/stories", fantasy_id))
        .await
        .json();
    assert_eq!(listing["category"]["name"], "Fantasy");
    assert_eq!(listing["stories"]["total"], 1);

    // A category in use cannot be deleted
    let response = app
        .server
        .delete(&format!("/api/v1/admin/categories/{}", fantasy_id))
        .add_header(name.clone(), value.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // Hidden stories drop out of reader listings
    app.server
        .post(&format!("/api/v1/admin/stories/{}/visibility", story_id))
        .add_header(name.clone(), value.clone())
        .await;
    let results: Value = app.server.get("/api/v1/search").add_query_param("q", "Fox").await.json();
    assert_eq!(results, json!([]));

    Ok(())
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() -> Result<()> {
    let app = setup_test_server().await?;

    let response = app.server.get("/api/v1/stories/999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    let response = app.server.get("/api/v1/types/novella/stories").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_purge_needs_matching_confirmation() -> Result<()> {
    let app = setup_test_server().await?;
    create_story(&app.server, "One", "a").await;
    create_story(&app.server, "Two", "b").await;
    let (name, value) = password_header();

    let response = app
        .server
        .post("/api/v1/admin/stories/purge")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "confirm_password": "nope" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/api/v1/admin/stories/purge")
        .add_header(name, value)
        .json(&json!({ "confirm_password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["deleted"], 2);

    let home: Value = app.server.get("/api/v1/home").await.json();
    assert_eq!(home["short"]["total"], 0);

    Ok(())
}
