//! HTTP API integration tests. Each test boots its own server process on an
//! isolated data directory, so tests can run in parallel safely.

mod common;

use serde_json::{Value, json};

use common::TestServer;

/// Creates a user through the admin API and returns `(user_id, token)`.
async fn create_user(
    client: &reqwest::Client,
    server: &TestServer,
    email: &str,
    role: &str,
) -> (String, String) {
    let resp = client
        .post(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({"email": email, "role": role}))
        .send()
        .await
        .expect("create user");
    assert_eq!(resp.status(), 201, "create user for {email}");
    let resp: Value = resp.json().await.expect("parse user response");

    let user_id = resp["data"]["profile"]["user_id"]
        .as_str()
        .expect("user id")
        .to_string();
    let token = resp["data"]["token"]
        .as_str()
        .expect("user token")
        .to_string();
    (user_id, token)
}

/// Creates a case and returns its JSON representation.
async fn create_case(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    body: Value,
) -> Value {
    let resp = client
        .post(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("create case");
    assert_eq!(resp.status(), 201, "create case");
    let resp: Value = resp.json().await.expect("parse case response");
    resp["data"].clone()
}

async fn patch_case(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    case_id: &str,
    body: Value,
) -> reqwest::Response {
    client
        .patch(format!("{}/api/v1/cases/{}", server.base_url, case_id))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("patch case")
}

// ============================================================================
// Health and Authentication
// ============================================================================

#[tokio::test]
async fn health_endpoint_needs_no_auth() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .expect("health");
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("health body"), "OK");
}

#[tokio::test]
async fn requests_without_valid_token_are_unauthorized() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let me_url = format!("{}/api/v1/me", server.base_url);

    // no Authorization header
    let resp = client.get(&me_url).send().await.expect("no auth");
    assert_eq!(resp.status(), 401);
    let challenge = resp
        .headers()
        .get("www-authenticate")
        .expect("challenge header")
        .to_str()
        .expect("header str");
    assert!(challenge.contains("Bearer"));
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Authentication required");
    assert!(body["data"].is_null());

    // wrong scheme
    let resp = client
        .get(&me_url)
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .expect("wrong scheme");
    assert_eq!(resp.status(), 401);

    // unknown token
    let resp = client
        .get(&me_url)
        .bearer_auth("cf_0000000000000000000000000000dead")
        .send()
        .await
        .expect("bad token");
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn deactivated_users_are_forbidden() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (user_id, token) = create_user(&client, &server, "former@example.com", "investigator").await;

    let resp = client
        .patch(format!("{}/api/v1/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({"is_active": false}))
        .send()
        .await
        .expect("deactivate user");
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .expect("me as deactivated");
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Account is deactivated");
}

#[tokio::test]
async fn me_returns_the_authenticated_profile() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("me");
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.expect("me body");
    assert_eq!(body["data"]["email"], "admin@localhost");
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["is_active"], true);
    // the token digest never leaves the server
    assert!(body["data"].get("token_hash").is_none());
}

// ============================================================================
// Case Lifecycle
// ============================================================================

#[tokio::test]
async fn case_creation_applies_defaults_and_numbers_sequentially() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let first = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Missing hiker", "case_type": "missing_person"}),
    )
    .await;

    assert_eq!(first["status"], "open");
    assert_eq!(first["priority"], "medium");
    assert!(first["description"].is_null());
    assert!(first["assigned_to"].is_null());
    assert!(first["closed_at"].is_null());

    let number = first["case_number"].as_str().expect("case number");
    assert!(number.starts_with("CF-"), "got {number}");
    assert!(number.ends_with("-001"), "got {number}");

    let second = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Warehouse fire", "case_type": "arson", "priority": "urgent"}),
    )
    .await;
    assert_eq!(second["priority"], "urgent");
    assert!(
        second["case_number"]
            .as_str()
            .expect("case number")
            .ends_with("-002")
    );
}

#[tokio::test]
async fn case_creation_requires_title_and_known_priority() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({"title": "   ", "case_type": "fraud"}))
        .send()
        .await
        .expect("blank title");
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({"title": "x", "case_type": "fraud", "priority": "catastrophic"}))
        .send()
        .await
        .expect("bad priority");
    // unknown enum value is rejected during deserialization
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn patch_updates_fields_and_null_clears_them() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({
            "title": "Original title",
            "case_type": "fraud",
            "description": "first description",
            "subject_name": "J. Doe"
        }),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    let resp = patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"title": "Renamed", "description": "second description"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("patch body");
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["description"], "second description");
    // fields absent from the patch keep their value
    assert_eq!(body["data"]["subject_name"], "J. Doe");

    // explicit null clears a nullable field
    let resp = patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"description": null}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("patch body");
    assert!(body["data"]["description"].is_null());
    assert_eq!(body["data"]["subject_name"], "J. Doe");
}

#[tokio::test]
async fn status_walks_the_lifecycle_and_rejects_shortcuts() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Lifecycle", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    // open -> archived is not a legal transition
    let resp = patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"status": "archived"}),
    )
    .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.expect("conflict body");
    assert!(
        body["error"]
            .as_str()
            .expect("error message")
            .contains("invalid status transition")
    );

    for (status, check) in [
        ("in_progress", "closed_at"),
        ("closed", "closed_at"),
        ("archived", "archived_at"),
    ] {
        let resp = patch_case(
            &client,
            &server,
            &server.admin_token,
            case_id,
            json!({"status": status}),
        )
        .await;
        assert_eq!(resp.status(), 200, "transition to {status}");
        let body: Value = resp.json().await.expect("transition body");
        assert_eq!(body["data"]["status"], status);
        if status == "in_progress" {
            assert!(body["data"][check].is_null());
        } else {
            assert!(body["data"][check].is_string(), "{check} set for {status}");
        }
    }

    // reopening clears the terminal timestamps (archived -> open is admin-only
    // and this caller is the admin)
    let resp = patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"status": "open"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("reopen body");
    assert!(body["data"]["closed_at"].is_null());
    assert!(body["data"]["archived_at"].is_null());
}

#[tokio::test]
async fn only_admins_reopen_archived_cases() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (_, inv_token) = create_user(&client, &server, "inv@example.com", "investigator").await;

    let case = create_case(
        &client,
        &server,
        &inv_token,
        json!({"title": "Cold case", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    for status in ["closed", "archived"] {
        let resp = patch_case(&client, &server, &inv_token, case_id, json!({"status": status})).await;
        assert_eq!(resp.status(), 200, "transition to {status}");
    }

    let resp = patch_case(&client, &server, &inv_token, case_id, json!({"status": "open"})).await;
    assert_eq!(resp.status(), 403);

    let resp = patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"status": "open"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn activity_log_traces_the_case_history() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Audited", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"title": "Audited v2"}),
    )
    .await;
    patch_case(
        &client,
        &server,
        &server.admin_token,
        case_id,
        json!({"status": "closed"}),
    )
    .await;

    let resp = client
        .get(format!("{}/api/v1/cases/{}/activity", server.base_url, case_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("activity");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("activity body");
    let entries = body["data"].as_array().expect("activity entries");

    // newest first: closed, updated, created
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["activity_type"], "closed");
    assert_eq!(entries[1]["activity_type"], "updated");
    assert_eq!(entries[2]["activity_type"], "created");
    // the field diff is captured on the update entry
    assert_eq!(entries[1]["old_values"]["title"], "Audited");
    assert_eq!(entries[1]["new_values"]["title"], "Audited v2");
}

#[tokio::test]
async fn delete_is_admin_only_and_removes_the_case() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (_, inv_token) = create_user(&client, &server, "inv@example.com", "investigator").await;
    let case = create_case(
        &client,
        &server,
        &inv_token,
        json!({"title": "Condemned", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");
    let case_url = format!("{}/api/v1/cases/{}", server.base_url, case_id);

    let resp = client
        .delete(&case_url)
        .bearer_auth(&inv_token)
        .send()
        .await
        .expect("delete as investigator");
    assert_eq!(resp.status(), 403);

    let resp = client
        .delete(&case_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("delete as admin");
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(&case_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("get deleted");
    assert_eq!(resp.status(), 404);
}

// ============================================================================
// Role Visibility
// ============================================================================

#[tokio::test]
async fn volunteers_see_only_cases_they_are_involved_in() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (vol_id, vol_token) = create_user(&client, &server, "vol@example.com", "volunteer").await;

    let unrelated = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Unrelated", "case_type": "fraud"}),
    )
    .await;
    let theirs = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Theirs", "case_type": "fraud", "assigned_to": vol_id}),
    )
    .await;

    let resp = client
        .get(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(&vol_token)
        .send()
        .await
        .expect("list as volunteer");
    let body: Value = resp.json().await.expect("list body");
    let cases = body["data"].as_array().expect("cases");
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0]["title"], "Theirs");

    // direct fetch of an invisible case looks like a missing case
    let resp = client
        .get(format!(
            "{}/api/v1/cases/{}",
            server.base_url,
            unrelated["id"].as_str().expect("case id")
        ))
        .bearer_auth(&vol_token)
        .send()
        .await
        .expect("get unrelated");
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!(
            "{}/api/v1/cases/{}",
            server.base_url,
            theirs["id"].as_str().expect("case id")
        ))
        .bearer_auth(&vol_token)
        .send()
        .await
        .expect("get theirs");
    assert_eq!(resp.status(), 200);

    // volunteers cannot open cases themselves
    let resp = client
        .post(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(&vol_token)
        .json(&json!({"title": "Mine", "case_type": "fraud"}))
        .send()
        .await
        .expect("create as volunteer");
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn readonly_views_everything_but_writes_nothing() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (_, ro_token) = create_user(&client, &server, "ro@example.com", "readonly").await;
    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Observed", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    let resp = client
        .get(format!("{}/api/v1/cases/{}", server.base_url, case_id))
        .bearer_auth(&ro_token)
        .send()
        .await
        .expect("get as readonly");
    assert_eq!(resp.status(), 200);

    let resp = patch_case(&client, &server, &ro_token, case_id, json!({"title": "Edited"})).await;
    assert_eq!(resp.status(), 403);

    let resp = client
        .post(format!("{}/api/v1/cases/{}/notes", server.base_url, case_id))
        .bearer_auth(&ro_token)
        .json(&json!({"note": "drive-by comment"}))
        .send()
        .await
        .expect("note as readonly");
    assert_eq!(resp.status(), 403);
}

// ============================================================================
// Notes
// ============================================================================

#[tokio::test]
async fn private_notes_are_visible_to_author_and_admin_only() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (_, author_token) = create_user(&client, &server, "author@example.com", "investigator").await;
    let (_, other_token) = create_user(&client, &server, "other@example.com", "investigator").await;

    let case = create_case(
        &client,
        &server,
        &author_token,
        json!({"title": "Noted", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");
    let notes_url = format!("{}/api/v1/cases/{}/notes", server.base_url, case_id);

    let resp = client
        .post(&notes_url)
        .bearer_auth(&author_token)
        .json(&json!({"note": "public observation"}))
        .send()
        .await
        .expect("public note");
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(&notes_url)
        .bearer_auth(&author_token)
        .json(&json!({"note": "source identity", "is_private": true}))
        .send()
        .await
        .expect("private note");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("note body");
    assert_eq!(body["data"]["is_private"], true);

    let list = |token: String| {
        let client = client.clone();
        let notes_url = notes_url.clone();
        async move {
            let body: Value = client
                .get(&notes_url)
                .bearer_auth(&token)
                .send()
                .await
                .expect("list notes")
                .json()
                .await
                .expect("notes body");
            body["data"].as_array().expect("notes array").len()
        }
    };

    assert_eq!(list(author_token.clone()).await, 2);
    assert_eq!(list(server.admin_token.clone()).await, 2);
    assert_eq!(list(other_token.clone()).await, 1);

    // blank notes are rejected
    let resp = client
        .post(&notes_url)
        .bearer_auth(&author_token)
        .json(&json!({"note": "   "}))
        .send()
        .await
        .expect("blank note");
    assert_eq!(resp.status(), 400);
}

// ============================================================================
// Documents
// ============================================================================

fn upload_form(file_name: &str, mime: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("part mime");
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn documents_upload_download_and_delete() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Evidence", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");
    let docs_url = format!("{}/api/v1/cases/{}/documents", server.base_url, case_id);

    let content = b"witness statement, signed".to_vec();
    let resp = client
        .post(&docs_url)
        .bearer_auth(&server.admin_token)
        .multipart(upload_form("statement.txt", "text/plain", &content))
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("upload body");
    assert_eq!(body["data"]["file_name"], "statement.txt");
    assert_eq!(body["data"]["mime_type"], "text/plain");
    assert_eq!(body["data"]["file_size"], content.len() as i64);
    let doc_id = body["data"]["id"].as_str().expect("doc id").to_string();
    // the storage key is internal
    assert!(body["data"].get("file_path").is_none());

    let resp = client
        .get(&docs_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("list documents");
    let body: Value = resp.json().await.expect("list body");
    assert_eq!(body["data"].as_array().expect("docs").len(), 1);

    let doc_url = format!("{}/api/v1/documents/{}", server.base_url, doc_id);
    let resp = client
        .get(&doc_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("download");
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()
            .get("content-type")
            .expect("content type")
            .to_str()
            .expect("header str"),
        "text/plain"
    );
    assert!(
        resp.headers()
            .get("content-disposition")
            .expect("disposition")
            .to_str()
            .expect("header str")
            .contains("statement.txt")
    );
    assert_eq!(resp.bytes().await.expect("bytes").to_vec(), content);

    let resp = client
        .delete(&doc_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("delete document");
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(&doc_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("download after delete");
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn document_upload_requires_the_file_field() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Evidence", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    let form = reqwest::multipart::Form::new().text("comment", "no file here");
    let resp = client
        .post(format!("{}/api/v1/cases/{}/documents", server.base_url, case_id))
        .bearer_auth(&server.admin_token)
        .multipart(form)
        .send()
        .await
        .expect("upload without file");
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn deleting_a_case_removes_its_documents() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Evidence", "case_type": "fraud"}),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");

    let resp = client
        .post(format!("{}/api/v1/cases/{}/documents", server.base_url, case_id))
        .bearer_auth(&server.admin_token)
        .multipart(upload_form("photo.jpg", "image/jpeg", b"\xff\xd8\xff"))
        .send()
        .await
        .expect("upload");
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("upload body");
    let doc_id = body["data"]["id"].as_str().expect("doc id").to_string();

    let resp = client
        .delete(format!("{}/api/v1/cases/{}", server.base_url, case_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("delete case");
    assert_eq!(resp.status(), 204);

    let resp = client
        .get(format!("{}/api/v1/documents/{}", server.base_url, doc_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("download orphaned");
    assert_eq!(resp.status(), 404);
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn dossier_export_bundles_the_case_record() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({
            "title": "Export me",
            "case_type": "fraud",
            "description": "Shell company invoices",
            "subject_name": "ACME Ltd"
        }),
    )
    .await;
    let case_id = case["id"].as_str().expect("case id");
    let case_number = case["case_number"].as_str().expect("case number").to_string();

    client
        .post(format!("{}/api/v1/cases/{}/notes", server.base_url, case_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({"note": "ledger copied", "is_private": true}))
        .send()
        .await
        .expect("note");

    let export_url = format!("{}/api/v1/cases/{}/export", server.base_url, case_id);
    let resp = client
        .get(&export_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("export");
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()
            .get("content-type")
            .expect("content type")
            .to_str()
            .expect("header str")
            .starts_with("text/plain")
    );
    assert_eq!(
        resp.headers()
            .get("content-disposition")
            .expect("disposition")
            .to_str()
            .expect("header str"),
        &format!("attachment; filename=\"Case_{case_number}_Export.txt\"")
    );

    let text = resp.text().await.expect("dossier text");
    assert!(text.contains("CASE EXPORT REPORT"));
    assert!(text.contains(&format!("Case Number:        {case_number}")));
    assert!(text.contains("Shell company invoices"));
    assert!(text.contains("ledger copied"));
    assert!(text.contains("(PRIVATE)"));
    assert!(text.contains(&format!("Password: {case_number}")));

    // identical state exports identical bytes
    let again = client
        .get(&export_url)
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("export again")
        .text()
        .await
        .expect("dossier text again");
    assert_eq!(text, again);
}

#[tokio::test]
async fn csv_export_lists_visible_cases() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Smith, John", "case_type": "missing_person", "priority": "high"}),
    )
    .await;
    create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Plain title", "case_type": "fraud"}),
    )
    .await;

    let resp = client
        .get(format!("{}/api/v1/cases/export.csv", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("csv export");
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()
            .get("content-type")
            .expect("content type")
            .to_str()
            .expect("header str")
            .starts_with("text/csv")
    );

    let text = resp.text().await.expect("csv text");
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Case Number,Title,Type,Status,Priority,Created Date")
    );
    // titles are always quoted, so the embedded comma survives
    assert!(text.contains("\"Smith, John\""));
    assert!(text.contains("\"Plain title\""));
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn export_requires_an_exporting_role() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (vol_id, vol_token) = create_user(&client, &server, "vol@example.com", "volunteer").await;
    let case = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Held close", "case_type": "fraud", "assigned_to": vol_id}),
    )
    .await;

    let resp = client
        .get(format!(
            "{}/api/v1/cases/{}/export",
            server.base_url,
            case["id"].as_str().expect("case id")
        ))
        .bearer_auth(&vol_token)
        .send()
        .await
        .expect("export as volunteer");
    assert_eq!(resp.status(), 403);

    let resp = client
        .get(format!("{}/api/v1/cases/export.csv", server.base_url))
        .bearer_auth(&vol_token)
        .send()
        .await
        .expect("csv as volunteer");
    assert_eq!(resp.status(), 403);
}

// ============================================================================
// Stats and Analytics
// ============================================================================

#[tokio::test]
async fn stats_and_analytics_summarize_visible_cases() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "One", "case_type": "fraud", "priority": "high"}),
    )
    .await;
    create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Two", "case_type": "fraud", "priority": "urgent"}),
    )
    .await;
    let third = create_case(
        &client,
        &server,
        &server.admin_token,
        json!({"title": "Three", "case_type": "missing_person"}),
    )
    .await;
    patch_case(
        &client,
        &server,
        &server.admin_token,
        third["id"].as_str().expect("case id"),
        json!({"status": "closed"}),
    )
    .await;

    let resp = client
        .get(format!("{}/api/v1/stats", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("stats");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("stats body");
    let stats = &body["data"];
    assert_eq!(stats["total_cases"], 3);
    assert_eq!(stats["open_cases"], 2);
    assert_eq!(stats["closed_cases"], 1);
    // the headline card counts high only
    assert_eq!(stats["high_priority_cases"], 1);
    assert_eq!(stats["monthly_new_cases"], 3);

    let resp = client
        .get(format!("{}/api/v1/analytics", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("analytics");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("analytics body");
    let analytics = &body["data"];
    assert_eq!(analytics["total_cases"], 3);
    assert_eq!(analytics["by_status"]["open"], 2);
    assert_eq!(analytics["by_status"]["closed"], 1);
    assert_eq!(analytics["by_type"]["fraud"], 2);
    assert_eq!(analytics["by_priority"]["high"], 1);
    let rate = analytics["resolution_rate"].as_f64().expect("rate");
    assert!((rate - 1.0 / 3.0).abs() < 1e-9);
    assert_eq!(
        analytics["monthly_created"]
            .as_array()
            .expect("buckets")
            .len(),
        1
    );
}

#[tokio::test]
async fn case_list_filters_compose() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (inv_id, inv_token) = create_user(&client, &server, "inv@example.com", "investigator").await;

    create_case(
        &client,
        &server,
        &inv_token,
        json!({"title": "Stolen van", "case_type": "theft", "priority": "high", "assigned_to": inv_id}),
    )
    .await;
    create_case(
        &client,
        &server,
        &inv_token,
        json!({"title": "Stolen bike", "case_type": "theft"}),
    )
    .await;
    create_case(
        &client,
        &server,
        &inv_token,
        json!({"title": "Forged check", "case_type": "fraud", "priority": "high"}),
    )
    .await;

    let list = |query: &'static str| {
        let client = client.clone();
        let url = format!("{}/api/v1/cases?{}", server.base_url, query);
        let token = inv_token.clone();
        async move {
            let body: Value = client
                .get(&url)
                .bearer_auth(&token)
                .send()
                .await
                .expect("filtered list")
                .json()
                .await
                .expect("list body");
            body["data"]
                .as_array()
                .expect("cases")
                .iter()
                .map(|c| c["title"].as_str().expect("title").to_string())
                .collect::<Vec<_>>()
        }
    };

    // the list comes back newest first and filters preserve that order
    assert_eq!(list("case_type=theft&priority=high").await, ["Stolen van"]);
    assert_eq!(list("search=stolen").await, ["Stolen bike", "Stolen van"]);
    assert_eq!(list("assignment=mine").await, ["Stolen van"]);
    assert_eq!(list("assignment=unassigned").await, ["Forged check", "Stolen bike"]);
    assert_eq!(list("status=closed").await, Vec::<String>::new());
}

// ============================================================================
// Admin Users
// ============================================================================

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (_, inv_token) = create_user(&client, &server, "inv@example.com", "investigator").await;

    let resp = client
        .get(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&inv_token)
        .send()
        .await
        .expect("list users as investigator");
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn user_management_round_trip() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (user_id, token) = create_user(&client, &server, "casey@example.com", "volunteer").await;
    assert!(token.starts_with("cf_"));

    // duplicate email is a conflict
    let resp = client
        .post(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&server.admin_token)
        .json(&json!({"email": "Casey@Example.com", "role": "volunteer"}))
        .send()
        .await
        .expect("duplicate user");
    assert_eq!(resp.status(), 409);

    let resp = client
        .get(format!("{}/api/v1/admin/users", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("list users");
    let body: Value = resp.json().await.expect("list body");
    // the bootstrap admin plus the new account
    assert_eq!(body["data"].as_array().expect("users").len(), 2);

    let resp = client
        .patch(format!("{}/api/v1/admin/users/{}", server.base_url, user_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({"role": "investigator", "full_name": "Casey Morgan"}))
        .send()
        .await
        .expect("promote user");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("patch body");
    assert_eq!(body["data"]["role"], "investigator");
    assert_eq!(body["data"]["full_name"], "Casey Morgan");

    // promoted account can now create cases
    let resp = client
        .post(format!("{}/api/v1/cases", server.base_url))
        .bearer_auth(&token)
        .json(&json!({"title": "Fresh powers", "case_type": "fraud"}))
        .send()
        .await
        .expect("create as promoted");
    assert_eq!(resp.status(), 201);
}

#[tokio::test]
async fn token_rotation_invalidates_the_old_token() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let (user_id, old_token) = create_user(&client, &server, "spin@example.com", "investigator").await;

    let resp = client
        .post(format!("{}/api/v1/admin/users/{}/token", server.base_url, user_id))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("rotate token");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("rotate body");
    let new_token = body["data"]["token"].as_str().expect("new token").to_string();
    assert_ne!(new_token, old_token);

    let resp = client
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&old_token)
        .send()
        .await
        .expect("me with old token");
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&new_token)
        .send()
        .await
        .expect("me with new token");
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn admins_cannot_lock_themselves_out() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let me: Value = client
        .get(format!("{}/api/v1/me", server.base_url))
        .bearer_auth(&server.admin_token)
        .send()
        .await
        .expect("me")
        .json()
        .await
        .expect("me body");
    let admin_id = me["data"]["user_id"].as_str().expect("admin id");

    for body in [json!({"role": "volunteer"}), json!({"is_active": false})] {
        let resp = client
            .patch(format!("{}/api/v1/admin/users/{}", server.base_url, admin_id))
            .bearer_auth(&server.admin_token)
            .json(&body)
            .send()
            .await
            .expect("self-lockout attempt");
        assert_eq!(resp.status(), 400);
    }

    // renaming yourself is still fine
    let resp = client
        .patch(format!("{}/api/v1/admin/users/{}", server.base_url, admin_id))
        .bearer_auth(&server.admin_token)
        .json(&json!({"full_name": "Head Admin"}))
        .send()
        .await
        .expect("rename self");
    assert_eq!(resp.status(), 200);
}
