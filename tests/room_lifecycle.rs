//! End-to-end HTTP flow: create a room, fill every prompt, reveal, replay,
//! and share the story, driving the router the same way a real client would.

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use storyfill_server::bus::EventBus;
use storyfill_server::config::Config;
use storyfill_server::http::{self, AppState};
use storyfill_server::moderation;
use storyfill_server::narration::NarrationService;
use storyfill_server::rate_limit::RateLimiter;
use storyfill_server::rooms::RoomStore;

fn test_server() -> TestServer {
    let config = Arc::new(Config::default());
    let store = Arc::new(RoomStore::new((*config).clone()));
    let bus = Arc::new(EventBus::new(config.event_buffer_size));
    let narration = Arc::new(NarrationService::new(store.clone(), bus.clone()));

    let state = AppState {
        store,
        bus,
        narration,
        filter: moderation::default_filter(),
        rate_limiter: Arc::new(RateLimiter::new()),
        config,
    };

    TestServer::new(http::router(state)).expect("router builds into a test server")
}

#[tokio::test]
async fn full_round_from_create_to_reveal_to_share() {
    let server = test_server();

    let created: Value = server
        .post("/v1/rooms")
        .json(&json!({ "display_name": "Host" }))
        .await
        .json();
    let room_code = created["room_code"].as_str().unwrap().to_string();
    let host_token = created["host_token"].as_str().unwrap().to_string();
    let host_player_token = created["player_token"].as_str().unwrap().to_string();
    let host_id = created["snapshot"]["players"][0]["id"].as_str().unwrap().to_string();

    let joined: Value = server
        .post(&format!("/v1/rooms/{room_code}/join"))
        .json(&json!({ "display_name": "Guest" }))
        .await
        .json();
    let guest_id = joined["player_id"].as_str().unwrap().to_string();
    let guest_token = joined["player_token"].as_str().unwrap().to_string();

    server
        .post(&format!("/v1/rooms/{room_code}/template"))
        .authorization_bearer(&host_token)
        .json(&json!({ "template_id": "t-forest-mishap" }))
        .await
        .assert_status_ok();

    let started: Value = server
        .post(&format!("/v1/rooms/{room_code}/start"))
        .authorization_bearer(&host_token)
        .await
        .json();
    assert_eq!(started["room_state"], "prompting");
    let round_id = started["round_id"].as_str().unwrap().to_string();

    let host_prompts: Value = server
        .get(&format!("/v1/rooms/{room_code}/rounds/{round_id}/prompts"))
        .add_query_param("player_id", &host_id)
        .add_query_param("player_token", &host_player_token)
        .await
        .json();
    let guest_prompts: Value = server
        .get(&format!("/v1/rooms/{room_code}/rounds/{round_id}/prompts"))
        .add_query_param("player_id", &guest_id)
        .add_query_param("player_token", &guest_token)
        .await
        .json();

    for (player_id, token, prompts) in [
        (&host_id, &host_player_token, &host_prompts),
        (&guest_id, &guest_token, &guest_prompts),
    ] {
        for prompt in prompts.as_array().unwrap() {
            let prompt_id = prompt["id"].as_str().unwrap();
            server
                .post(&format!(
                    "/v1/rooms/{room_code}/rounds/{round_id}/prompts/{prompt_id}"
                ))
                .authorization_bearer(token)
                .json(&json!({ "player_id": player_id, "value": "brave" }))
                .await
                .assert_status_ok();
        }
    }

    let revealed: Value = server
        .post(&format!("/v1/rooms/{room_code}/reveal"))
        .authorization_bearer(&host_token)
        .await
        .json();
    let story = revealed["story"].as_str().unwrap();
    assert!(!story.is_empty());
    assert!(!story.contains('{'));

    server
        .get(&format!("/v1/rooms/{room_code}/rounds/{round_id}/story"))
        .await
        .assert_status_ok();

    let share: Value = server
        .post(&format!("/v1/rooms/{room_code}/rounds/{round_id}/share"))
        .authorization_bearer(&host_token)
        .await
        .json();
    let share_token = share["share_token"].as_str().unwrap().to_string();

    // idempotent: requesting again within the same round returns the same token
    let share_again: Value = server
        .post(&format!("/v1/rooms/{room_code}/rounds/{round_id}/share"))
        .authorization_bearer(&host_token)
        .await
        .json();
    assert_eq!(share_again["share_token"], share["share_token"]);

    let shared_story: Value = server.get(&format!("/v1/share/{share_token}")).await.json();
    assert_eq!(shared_story["rendered_story"], story);

    let replayed: Value = server
        .post(&format!("/v1/rooms/{room_code}/replay"))
        .authorization_bearer(&host_token)
        .await
        .json();
    assert_eq!(replayed["room_state"], "prompting");
    assert_eq!(replayed["round_index"], 1);

    // the story rendered for the old round is no longer reachable via its
    // old round_id once replay has rotated the room onto a new one.
    server
        .get(&format!("/v1/rooms/{room_code}/rounds/{round_id}/story"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn joining_a_locked_room_is_rejected() {
    let server = test_server();

    let created: Value = server.post("/v1/rooms").json(&json!({})).await.json();
    let room_code = created["room_code"].as_str().unwrap().to_string();
    let host_token = created["host_token"].as_str().unwrap().to_string();

    server
        .post(&format!("/v1/rooms/{room_code}/lock"))
        .authorization_bearer(&host_token)
        .await
        .assert_status_ok();

    server
        .post(&format!("/v1/rooms/{room_code}/join"))
        .json(&json!({ "display_name": "LateGuest" }))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn starting_without_enough_players_is_rejected() {
    let server = test_server();

    let created: Value = server.post("/v1/rooms").json(&json!({})).await.json();
    let room_code = created["room_code"].as_str().unwrap().to_string();
    let host_token = created["host_token"].as_str().unwrap().to_string();

    server
        .post(&format!("/v1/rooms/{room_code}/template"))
        .authorization_bearer(&host_token)
        .json(&json!({ "template_id": "t-forest-mishap" }))
        .await
        .assert_status_ok();

    server
        .post(&format!("/v1/rooms/{room_code}/start"))
        .authorization_bearer(&host_token)
        .await
        .assert_status_conflict();
}

#[tokio::test]
async fn unknown_room_code_returns_not_found() {
    let server = test_server();
    server
        .post("/v1/rooms/ZZZZZZ/join")
        .json(&json!({ "display_name": "Nobody" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn only_the_host_can_create_a_share_link() {
    let server = test_server();

    let created: Value = server
        .post("/v1/rooms")
        .json(&json!({ "display_name": "Host" }))
        .await
        .json();
    let room_code = created["room_code"].as_str().unwrap().to_string();
    let host_token = created["host_token"].as_str().unwrap().to_string();

    let joined: Value = server
        .post(&format!("/v1/rooms/{room_code}/join"))
        .json(&json!({ "display_name": "Guest" }))
        .await
        .json();
    let guest_token = joined["player_token"].as_str().unwrap().to_string();

    server
        .post(&format!("/v1/rooms/{room_code}/template"))
        .authorization_bearer(&host_token)
        .json(&json!({ "template_id": "t-forest-mishap" }))
        .await
        .assert_status_ok();
    let started: Value = server
        .post(&format!("/v1/rooms/{room_code}/start"))
        .authorization_bearer(&host_token)
        .await
        .json();
    let round_id = started["round_id"].as_str().unwrap().to_string();

    // a non-host bearer token is rejected even though it's a valid player token
    server
        .post(&format!("/v1/rooms/{room_code}/rounds/{round_id}/share"))
        .authorization_bearer(&guest_token)
        .await
        .assert_status_forbidden();
}
