use axum::http::StatusCode;
use serde_json::json;

use crate::common::{error_code, TestApp};

#[tokio::test]
async fn test_vote_echo_precedes_broadcast() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut a = app.connect("a", "r1").await;
    let mut b = app.connect("b", "r1").await;
    let mut c = app.connect("c", "r2").await;

    let (status, body) = app
        .post_json("/vote", Some(&bearer), json!({ "memberId": "a", "storyId": "s1", "vote": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap()["delivered"], 2);

    let echo = a.next_json().await;
    assert_eq!(echo, json!({ "action": "self_voted", "memberId": "a", "storyId": "s1", "vote": 5 }));
    let public = a.next_json().await;
    assert_eq!(public, json!({ "action": "user_voted", "memberId": "a", "storyId": "s1" }));

    // Others never see the value
    assert_eq!(b.next_json().await, public);
    b.assert_idle();
    c.assert_idle();
}

#[tokio::test]
async fn test_null_vote_is_accepted() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut a = app.connect("a", "r1").await;

    let (status, _) = app
        .post_json("/vote", Some(&bearer), json!({ "memberId": "a", "storyId": "s1", "vote": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(a.next_json().await["vote"].is_null());
}

#[tokio::test]
async fn test_invalid_votes_rejected() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut a = app.connect("a", "r1").await;

    for body in [
        json!({ "memberId": "a", "storyId": "s1", "vote": 90 }),
        json!({ "memberId": "a", "storyId": "s1", "vote": -1 }),
        json!({ "memberId": "", "storyId": "s1", "vote": 1 }),
    ] {
        let (status, response) = app.post_json("/vote", Some(&bearer), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_code(&response), "VALIDATION_ERROR");
    }

    let (status, response) = app
        .post_json("/vote", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "BAD_REQUEST");

    a.assert_idle();
}

#[tokio::test]
async fn test_new_story_goes_to_story_room() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut r1 = app.connect("a", "r1").await;
    let mut r2 = app.connect("b", "r2").await;

    let story = json!({
        "id": "s1",
        "title": "Login page",
        "description": "As a user I want to log in",
        "isCompleted": false,
        "roomId": "r2",
        "createdAt": "2024-05-01T10:00:00Z"
    });
    let (status, _) = app.post_json("/story", Some(&bearer), story.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let frame = r2.next_json().await;
    assert_eq!(frame["action"], "new_story");
    assert_eq!(frame["story"], story);
    r1.assert_idle();
}

#[tokio::test]
async fn test_story_validation() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");

    let (status, _) = app
        .post_json(
            "/story",
            Some(&bearer),
            json!({ "id": "s1", "title": "", "roomId": "r1", "createdAt": "2024-05-01T10:00:00Z" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post_json(
            "/story",
            Some(&bearer),
            json!({ "id": "s1", "title": "Login", "roomId": "r1", "createdAt": "yesterday" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reveal_sends_stored_votes() {
    let app = TestApp::new().await.with_votes_table().await;
    app.insert_vote("b", "s1", Some(8), 1_700_000_100).await;
    app.insert_vote("a", "s1", Some(5), 1_700_000_000).await;
    app.insert_vote("a", "s2", Some(1), 1_700_000_000).await;

    let bearer = app.bearer("a", "r1");
    let mut socket = app.connect("b", "r1").await;

    let (status, _) = app
        .post_json("/reveal-story", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let frame = socket.next_json().await;
    assert_eq!(frame["action"], "reveal_story");
    assert_eq!(frame["storyId"], "s1");
    assert_eq!(
        frame["votes"],
        json!([
            { "memberId": "a", "storyId": "s1", "vote": 5, "createdAt": "2023-11-14T22:13:20Z" },
            { "memberId": "b", "storyId": "s1", "vote": 8, "createdAt": "2023-11-14T22:15:00Z" }
        ])
    );
}

#[tokio::test]
async fn test_reveal_fails_when_votes_unavailable() {
    // No votes table
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut socket = app.connect("a", "r1").await;

    let (status, body) = app
        .post_json("/reveal-story", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "DATABASE_ERROR");
    socket.assert_idle();
}

#[tokio::test]
async fn test_unreveal_broadcasts_to_caller_room() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "r1");
    let mut a = app.connect("a", "r1").await;
    let mut b = app.connect("b", "r2").await;

    let (status, _) = app
        .post_json("/unreveal-story", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(a.next_json().await, json!({ "action": "unreveal_story", "storyId": "s1" }));
    b.assert_idle();
}

#[tokio::test]
async fn test_join_announces_member() {
    let app = TestApp::new().await;
    let bearer = app.bearer("host", "r1");
    let mut host = app.connect("host", "r1").await;

    let (status, body) = app
        .post_json(
            "/join",
            Some(&bearer),
            json!({ "roomId": "r1", "member": { "id": "m2", "name": "Grace" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap()["delivered"], 1);

    assert_eq!(
        host.next_json().await,
        json!({ "action": "member_joined", "member": { "id": "m2", "name": "Grace" } })
    );

    let (status, _) = app
        .post_json("/join", Some(&bearer), json!({ "roomId": "r1", "member": { "id": "m3", "name": "" } }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_broadcast_to_empty_room() {
    let app = TestApp::new().await;
    let bearer = app.bearer("a", "nobody-here");

    let (status, body) = app
        .post_json("/unreveal-story", Some(&bearer), json!({ "storyId": "s1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap()["delivered"], 0);
}
