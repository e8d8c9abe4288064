// tests/completion_tests.rs

use std::sync::Arc;

use academy_grading::{
    config::Config,
    models::{roster::RosterMember, submission::SubmissionRecord},
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::sign_jwt,
};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

const SECRET: &str = "completion_test_secret";
const CLASS_ID: i64 = 21;

async fn spawn_app() -> (String, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());

    let config = Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        max_upload_bytes: 64 * 1024,
    };

    let state = AppState {
        store: store.clone(),
        config,
    };
    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, store)
}

fn admin_token() -> String {
    format!("Bearer {}", sign_jwt(1, "admin", SECRET, 600).unwrap())
}

fn student(id: i64, name: &str, grade: &str) -> RosterMember {
    RosterMember {
        id,
        class_id: CLASS_ID,
        name: name.to_string(),
        student_code: format!("S2026-{:03}", id),
        grade: Some(grade.to_string()),
        section: Some("A".to_string()),
    }
}

fn submission(id: i64, student_id: i64, answer_key_id: i64, score: i64, minute: u32) -> SubmissionRecord {
    SubmissionRecord {
        id,
        student_id,
        answer_key_id,
        score,
        duration_seconds: 1500,
        submitted_at: Utc.with_ymd_and_hms(2026, 9, 14, 10, minute, 0).unwrap(),
    }
}

/// Creates a 30-point key (5 + 10 + 15) for the seeded class.
async fn create_key(client: &reqwest::Client, address: &str) -> i64 {
    let created: Value = client
        .post(format!("{}/api/admin/answer-keys", address))
        .header("Authorization", admin_token())
        .json(&json!({
            "exam_date": "2026-09-14",
            "subject": "Korean",
            "exam_title": "Reading comprehension",
            "exam_type": "midterm",
            "class_id": CLASS_ID,
            "rows": [
                {"question": 1, "answer": "A", "score": 5},
                {"question": 2, "answer": "B", "score": 10},
                {"question": 3, "answer": "C", "score": 15}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    created["id"].as_i64().unwrap()
}

async fn get_completion(client: &reqwest::Client, address: &str, id: i64, query: &str) -> reqwest::Response {
    client
        .get(format!("{}/api/admin/answer-keys/{}/completion{}", address, id, query))
        .header("Authorization", admin_token())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn completion_partitions_roster_with_statistics() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_key(&client, &address).await;

    store.add_student(student(1, "Ahn Jiwoo", "2")).unwrap();
    store.add_student(student(2, "Baek Seoyeon", "2")).unwrap();
    store.add_student(student(3, "Cho Minjun", "3")).unwrap();
    store.add_submission(submission(1, 1, id, 20, 5)).unwrap();
    store.add_submission(submission(2, 3, id, 25, 9)).unwrap();

    let response = get_completion(&client, &address, id, "").await;
    assert_eq!(response.status().as_u16(), 200);
    let status: Value = response.json().await.unwrap();

    assert_eq!(status["total_score"], 30);
    assert_eq!(status["completed_count"], 2);
    assert_eq!(status["not_completed_count"], 1);
    assert_eq!(status["average_score"], 22.5);
    assert_eq!(status["completed"][0]["score_percentage"], 67);
    assert_eq!(status["completed"][1]["score_percentage"], 83);
    assert_eq!(status["not_completed"][0]["name"], "Baek Seoyeon");
}

#[tokio::test]
async fn duplicate_submissions_use_the_latest() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_key(&client, &address).await;

    store.add_student(student(1, "Ahn Jiwoo", "2")).unwrap();
    store.add_submission(submission(1, 1, id, 12, 40)).unwrap();
    store.add_submission(submission(2, 1, id, 28, 10)).unwrap();

    let status: Value = get_completion(&client, &address, id, "").await.json().await.unwrap();

    assert_eq!(status["completed_count"], 1);
    assert_eq!(status["completed"][0]["submission_id"], 1);
    assert_eq!(status["completed"][0]["score"], 12);
}

#[tokio::test]
async fn roster_filters_narrow_the_denominator() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_key(&client, &address).await;

    store.add_student(student(1, "Ahn Jiwoo", "2")).unwrap();
    store.add_student(student(2, "Baek Seoyeon", "3")).unwrap();
    store.add_student(student(3, "Cho Minjun", "3")).unwrap();
    store.add_submission(submission(1, 1, id, 30, 1)).unwrap();
    store.add_submission(submission(2, 2, id, 10, 2)).unwrap();

    let by_grade: Value = get_completion(&client, &address, id, "?grade=3").await.json().await.unwrap();
    assert_eq!(by_grade["roster_size"], 2);
    assert_eq!(by_grade["completion_rate"], 0.5);
    assert_eq!(by_grade["average_score"], 10.0);

    let by_code: Value = get_completion(&client, &address, id, "?search=s2026-003").await.json().await.unwrap();
    assert_eq!(by_code["roster_size"], 1);
    assert_eq!(by_code["completed_count"], 0);
}

#[tokio::test]
async fn status_filter_trims_listing_only() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_key(&client, &address).await;

    store.add_student(student(1, "Ahn Jiwoo", "2")).unwrap();
    store.add_student(student(2, "Baek Seoyeon", "2")).unwrap();
    store.add_submission(submission(1, 1, id, 30, 1)).unwrap();

    let status: Value = get_completion(&client, &address, id, "?status=not_completed")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(status["completed"], json!([]));
    assert_eq!(status["not_completed"].as_array().unwrap().len(), 1);
    assert_eq!(status["completed_count"], 1);
    assert_eq!(status["completion_rate"], 0.5);
}

#[tokio::test]
async fn completion_for_missing_key_is_404() {
    let (address, _) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = get_completion(&client, &address, 999, "").await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn key_with_submissions_is_read_only() {
    let (address, store) = spawn_app().await;
    let client = reqwest::Client::new();
    let id = create_key(&client, &address).await;

    store.add_student(student(1, "Ahn Jiwoo", "2")).unwrap();
    store.add_submission(submission(1, 1, id, 30, 1)).unwrap();

    let import = client
        .post(format!("{}/api/admin/answer-keys/{}/import?mode=append", address, id))
        .header("Authorization", admin_token())
        .body("question,answer,score\n4,D,5\n")
        .send()
        .await
        .unwrap();
    assert_eq!(import.status().as_u16(), 409);

    let deleted = client
        .delete(format!("{}/api/admin/answer-keys/{}", address, id))
        .header("Authorization", admin_token())
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let after = get_completion(&client, &address, id, "").await;
    assert_eq!(after.status().as_u16(), 404);
}
