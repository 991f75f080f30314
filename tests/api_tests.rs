// tests/api_tests.rs
//
// Integration tests against a live Postgres. Run with a DATABASE_URL set:
//   cargo test -- --ignored

use std::sync::Arc;

use prepwise::ai::analyzer::ExamAnalyzer;
use prepwise::ai::generator::QuestionGenerator;
use prepwise::config::Config;
use prepwise::routes;
use prepwise::state::AppState;
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
///
/// The AI backend is left unconfigured, so generation serves fallback
/// templates and analysis returns generic summaries.
async fn spawn_app() -> String {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    // 1. Create a pool
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    // 2. Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    // 3. Create test configuration and state
    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        llm_api_key: None,
        llm_base_url: "http://127.0.0.1:1".to_string(),
        llm_model: "test-model".to_string(),
        llm_backup_model: "test-backup-model".to_string(),
        admin_username: None,
        admin_password: None,
    };

    let generator = Arc::new(QuestionGenerator::new(
        None,
        config.llm_model.clone(),
        config.llm_backup_model.clone(),
    ));
    let analyzer = Arc::new(ExamAnalyzer::new(None, config.llm_model.clone()));

    let state = AppState {
        pool,
        config,
        generator,
        analyzer,
    };

    // 4. Create the router with the app state
    let app = routes::create_router(state);

    // 5. Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // 6. Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn unique_username() -> String {
    format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8])
}

/// Registers and logs in a fresh user, returning their bearer token.
async fn register_and_login(client: &reqwest::Client, address: &str) -> String {
    let username = unique_username();
    let password = "password123";

    client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Register failed");

    let login_resp = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({
            "username": username,
            "password": password
        }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .expect("Failed to parse login json");

    login_resp["token"]
        .as_str()
        .expect("Token not found")
        .to_string()
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn health_check_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn register_works() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": unique_username(),
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn register_fails_validation() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act: Send a username that is too short
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "username": "yo",
            "password": "password123"
        }))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn generation_requires_auth() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/ai/questions", address))
        .json(&serde_json::json!({
            "subject": "mathematics",
            "count": 3
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn generation_without_api_key_serves_fallback_batch() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/ai/questions", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "subject": "mathematics",
            "count": 5
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 5);
    assert_eq!(body["ai_count"], 0);
    assert_eq!(body["fallback_count"], 5);
    for q in questions {
        assert_eq!(q["source"], "fallback");
        assert_eq!(q["options"].as_array().unwrap().len(), 4);
        assert!(!q["text"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn generation_rejects_oversized_count() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/ai/questions", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "subject": "mathematics",
            "count": 11
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn exam_submission_and_leaderboard_flow() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    // Record an exam
    let submit_resp = client
        .post(format!("{}/api/exams", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "subject": "physics",
            "score": 80,
            "total_questions": 10
        }))
        .send()
        .await
        .expect("Submit failed");

    assert_eq!(submit_resp.status().as_u16(), 201);

    // It shows up in the user's history
    let mine: Vec<serde_json::Value> = client
        .get(format!("{}/api/exams/mine", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("History fetch failed")
        .json()
        .await
        .unwrap();

    assert!(!mine.is_empty());
    assert_eq!(mine[0]["subject"], "physics");

    // Leaderboard is publicly readable
    let leaderboard_resp = client
        .get(format!("{}/api/exams/leaderboard", address))
        .send()
        .await
        .expect("Leaderboard fetch failed");

    assert_eq!(leaderboard_resp.status().as_u16(), 200);
}

#[tokio::test]
#[ignore = "requires a running Postgres"]
async fn analysis_without_api_key_returns_generic_summary() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let token = register_and_login(&client, &address).await;

    let response = client
        .post(format!("{}/api/ai/analysis", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "subject": "chemistry",
            "answers": [
                {"question": "Q1", "correct_answer": "A", "user_answer": "A"},
                {"question": "Q2", "correct_answer": "B", "user_answer": "C"}
            ]
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["correct_count"], 1);
    assert_eq!(body["total_questions"], 2);
    assert!(!body["overview"].as_str().unwrap().is_empty());
}
