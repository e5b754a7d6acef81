use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use game_catalog::api::{create_router, AppState};

fn create_test_server() -> TestServer {
    let state = AppState::new();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

async fn create_game(server: &TestServer, body: Value) -> Value {
    let response = server.post("/api/games/create").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// Three games with distinct genres, platforms, years, prices and scores
async fn seeded_server() -> TestServer {
    let server = create_test_server();

    create_game(
        &server,
        json!({
            "name": "Dark Souls III",
            "release_date": "2016-04-11",
            "price": "59.99",
            "windows": true,
            "metacritic_score": 89,
            "genres": ["Action", "RPG"],
            "tags": ["Souls-like", "Difficult"],
            "categories": ["Single-player"]
        }),
    )
    .await;
    create_game(
        &server,
        json!({
            "name": "Stardew Valley",
            "release_date": "2016-02-26",
            "price": "14.99",
            "windows": true,
            "mac": true,
            "linux": true,
            "genres": ["Simulation", "RPG"],
            "tags": ["Farming"],
            "categories": ["Single-player", "Co-op"]
        }),
    )
    .await;
    create_game(
        &server,
        json!({
            "name": "Elden Ring",
            "release_date": "2022-02-24",
            "price": "59.99",
            "windows": true,
            "metacritic_score": 94,
            "genres": ["Action", "RPG"],
            "tags": ["Souls-like", "Open World"],
            "categories": ["Single-player"]
        }),
    )
    .await;

    server
}

fn names(page: &Value) -> Vec<&str> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|game| game["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_list_games_unfiltered() {
    let server = seeded_server().await;

    let response = server.get("/api/games").await;
    response.assert_status_ok();
    let page: Value = response.json();

    assert_eq!(page["count"], 3);
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["previous"], Value::Null);
    assert_eq!(
        names(&page),
        vec!["Dark Souls III", "Stardew Valley", "Elden Ring"]
    );
}

#[tokio::test]
async fn test_list_games_filtered_and_sorted() {
    let server = seeded_server().await;

    let response = server
        .get("/api/games")
        .add_query_param("filterBy", "platform(windows),genre(action)")
        .add_query_param("sortBy", "metacriticScore")
        .add_query_param("sortOrder", "desc")
        .await;
    response.assert_status_ok();
    let page: Value = response.json();

    assert_eq!(page["count"], 2);
    assert_eq!(names(&page), vec!["Elden Ring", "Dark Souls III"]);

    let response = server
        .get("/api/games")
        .add_query_param("filterBy", "year(2016),platform(linux)")
        .await;
    let page: Value = response.json();
    assert_eq!(names(&page), vec!["Stardew Valley"]);
}

#[tokio::test]
async fn test_list_games_paginates() {
    let server = seeded_server().await;

    let response = server
        .get("/api/games")
        .add_query_param("sortBy", "price")
        .add_query_param("sortOrder", "asc")
        .add_query_param("page", "2")
        .add_query_param("pageSize", "2")
        .await;
    response.assert_status_ok();
    let page: Value = response.json();

    assert_eq!(page["count"], 3);
    assert_eq!(page["next"], Value::Null);
    assert_eq!(page["previous"], 1);
    assert_eq!(names(&page), vec!["Elden Ring"]);
}

#[tokio::test]
async fn test_malformed_query_string_is_json_error() {
    let server = seeded_server().await;

    let response = server.get("/api/games?page=1&page=2").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("page"));

    let response = server.get("/api/game?id=1&id=2").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_game_by_id_and_name() {
    let server = seeded_server().await;

    let response = server.get("/api/game").add_query_param("id", 2).await;
    response.assert_status_ok();
    let game: Value = response.json();
    assert_eq!(game["name"], "Stardew Valley");
    assert_eq!(game["price"], "14.99");

    let response = server
        .get("/api/game")
        .add_query_param("name", "elden")
        .await;
    response.assert_status_ok();
    let game: Value = response.json();
    assert_eq!(game["id"], 3);
}

#[tokio::test]
async fn test_get_game_errors() {
    let server = seeded_server().await;

    let response = server.get("/api/game").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Please provide either id or name parameter" }));

    let response = server.get("/api/game").add_query_param("id", 999).await;
    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_json(&json!({ "error": "Game does not exist" }));

    let response = server
        .get("/api/game")
        .add_query_param("name", "half-life")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommend_games() {
    let server = seeded_server().await;

    let response = server
        .get("/api/games/recommend")
        .add_query_param("name", "Dark Souls")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["reference_game"]["name"], "Dark Souls III");
    let recommended = body["recommended_games"].as_array().unwrap();
    assert_eq!(recommended.len(), 2);
    // Two genres, one tag and one category in common
    assert_eq!(recommended[0]["name"], "Elden Ring");
    assert_eq!(recommended[0]["score"], 9);
    assert_eq!(recommended[1]["name"], "Stardew Valley");
    assert_eq!(recommended[1]["score"], 4);

    let response = server.get("/api/games/recommend").await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_game_reports_every_violation() {
    let server = create_test_server();

    let response = server
        .post("/api/games/create")
        .json(&json!({
            "price": "9.999",
            "metacritic_score": 120,
            "website": "not-a-url"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();

    assert_eq!(body["error"], "Validation failed");
    for field in ["name", "release_date", "price", "metacritic_score", "website"] {
        assert!(body["fields"][field].is_array(), "missing error for {}", field);
    }

    let response = server.get("/api/games").await;
    let page: Value = response.json();
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_create_game_with_numeric_price() {
    let server = create_test_server();

    let game = create_game(
        &server,
        json!({
            "name": "Elden Ring",
            "release_date": "2022-02-24",
            "price": 29.99
        }),
    )
    .await;
    assert_eq!(game["price"], "29.99");

    let response = server
        .patch("/api/games/update")
        .add_query_param("id", game["id"].as_i64().unwrap())
        .json(&json!({ "price": 39.99 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["game"]["price"], "39.99");
}

#[tokio::test]
async fn test_create_game_rejects_malformed_body() {
    let server = create_test_server();

    let response = server.post("/api/games/create").text("not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_update_game() {
    let server = seeded_server().await;

    let response = server
        .patch("/api/games/update")
        .add_query_param("name", "stardew")
        .json(&json!({
            "price": "9.99",
            "website": "https://www.stardewvalley.net",
            "tags": ["Farming", "Relaxing"]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["message"], "Game updated successfully");
    assert_eq!(body["game"]["id"], 2);
    assert_eq!(body["game"]["price"], "9.99");
    assert_eq!(body["game"]["tags"], json!(["Farming", "Relaxing"]));
    assert_eq!(body["game"]["genres"], json!(["RPG", "Simulation"]));

    // null clears a nullable field
    let response = server
        .patch("/api/games/update")
        .add_query_param("id", 2)
        .json(&json!({ "website": null }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["game"]["website"], Value::Null);
    assert_eq!(body["game"]["price"], "9.99");
}

#[tokio::test]
async fn test_update_game_errors() {
    let server = seeded_server().await;

    let response = server
        .patch("/api/games/update")
        .json(&json!({ "price": "1.00" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .patch("/api/games/update")
        .add_query_param("id", 42)
        .json(&json!({ "price": "1.00" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .patch("/api/games/update")
        .add_query_param("id", 1)
        .json(&json!({ "required_age": 40 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["fields"]["required_age"].is_array());
}

#[tokio::test]
async fn test_update_game_rejects_null_for_required_fields() {
    let server = seeded_server().await;

    let response = server
        .patch("/api/games/update")
        .add_query_param("id", 3)
        .json(&json!({ "name": null, "price": null }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["fields"]["name"], json!(["may not be null"]));
    assert_eq!(body["fields"]["price"], json!(["may not be null"]));

    let game: Value = server.get("/api/game").add_query_param("id", 3).await.json();
    assert_eq!(game["name"], "Elden Ring");
    assert_eq!(game["price"], "59.99");
}

#[tokio::test]
async fn test_delete_game() {
    let server = seeded_server().await;

    let response = server
        .delete("/api/games/delete")
        .add_query_param("id", 1)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server.get("/api/game").add_query_param("id", 1).await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server
        .delete("/api/games/delete")
        .add_query_param("id", 1)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server.delete("/api/games/delete").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let page: Value = server.get("/api/games").await.json();
    assert_eq!(page["count"], 2);
}

#[tokio::test]
async fn test_request_id_header() {
    let server = create_test_server();
    let header = HeaderName::from_static("x-request-id");

    let response = server
        .get("/health")
        .add_header(header.clone(), HeaderValue::from_static("trace-me-123"))
        .await;
    assert_eq!(response.header(header.clone()), "trace-me-123");

    let response = server.get("/api/games").await;
    let generated = response.header(header);
    assert!(!generated.is_empty());
}
