//! End-to-end game flow over real WebSockets.


use serde_json::json;
use test_helpers::{
    connect_organizer, connect_player, connect_spectator, create_room, join, recv_json,
    recv_until, send_json, simple_quiz, start_test_server,
};

#[tokio::test]
async fn test_full_game_happy_path() {
    let addr = start_test_server().await;
    let (room_code, token) = create_room(addr, simple_quiz(), 10).await;

    let mut organizer = connect_organizer(addr, &room_code, "org-1", &token).await;
    let sync = recv_until(&mut organizer, "ORGANIZER_RECONNECTED").await;
    assert_eq!(sync["data"]["room_code"], room_code.as_str());
    assert_eq!(sync["data"]["total_questions"], 1);
    assert_eq!(sync["phase"], "LOBBY");

    let mut alice = connect_player(addr, &room_code, "client-a").await;
    let joined = join(&mut alice, "alice").await;
    assert_eq!(joined["data"]["nickname"], "alice");
    assert_eq!(joined["data"]["player_count"], 1);

    let roster = recv_until(&mut organizer, "PLAYER_JOINED").await;
    assert_eq!(roster["data"]["player_count"], 1);

    send_json(&mut organizer, json!({"type": "START_GAME"})).await;
    let starting = recv_until(&mut alice, "GAME_STARTING").await;
    assert_eq!(starting["phase"], "LOBBY");

    send_json(&mut organizer, json!({"type": "NEXT_QUESTION"})).await;
    let question = recv_until(&mut alice, "QUESTION").await;
    assert_eq!(question["phase"], "QUESTION");
    assert_eq!(question["data"]["prompt"], "2+2?");
    assert_eq!(question["data"]["question_number"], 1);
    assert!(
        question["data"].get("correct_index").is_none(),
        "players never see the correct index"
    );

    send_json(&mut alice, json!({"type": "ANSWER", "data": {"answer_index": 1}})).await;
    let result = recv_until(&mut alice, "ANSWER_RESULT").await;
    assert_eq!(result["data"]["correct"], true);
    let points = result["data"]["points"].as_u64().unwrap();
    assert!(
        (900..=1000).contains(&points),
        "near-instant answer scores close to 1000, got {points}"
    );
    assert_eq!(result["data"]["streak"], 1);

    // Sole player answered: the reveal is immediate.
    let over = recv_until(&mut alice, "QUESTION_OVER").await;
    assert_eq!(over["phase"], "REVEAL");
    assert_eq!(over["data"]["correct_index"], 1);
    assert_eq!(over["data"]["is_final"], true);
    assert_eq!(over["data"]["leaderboard"][0]["nickname"], "alice");
    assert_eq!(over["data"]["leaderboard"][0]["rank"], 1);

    send_json(&mut organizer, json!({"type": "NEXT_QUESTION"})).await;
    let podium = recv_until(&mut alice, "PODIUM").await;
    assert_eq!(podium["phase"], "PODIUM");
    assert_eq!(podium["data"]["leaderboard"][0]["nickname"], "alice");
}

#[tokio::test]
async fn test_answer_count_reaches_organizer_and_spectator() {
    let addr = start_test_server().await;
    let (room_code, token) = create_room(addr, simple_quiz(), 10).await;

    let mut organizer = connect_organizer(addr, &room_code, "org", &token).await;
    recv_until(&mut organizer, "ORGANIZER_RECONNECTED").await;
    let mut spectator = connect_spectator(addr, &room_code, "watcher").await;
    recv_until(&mut spectator, "JOINED_ROOM").await;

    let mut alice = connect_player(addr, &room_code, "client-a").await;
    join(&mut alice, "alice").await;
    let mut bob = connect_player(addr, &room_code, "client-b").await;
    join(&mut bob, "bob").await;

    send_json(&mut organizer, json!({"type": "START_GAME"})).await;
    send_json(&mut organizer, json!({"type": "NEXT_QUESTION"})).await;
    recv_until(&mut alice, "QUESTION").await;

    send_json(&mut alice, json!({"type": "ANSWER", "data": {"answer_index": 0}})).await;

    let count = recv_until(&mut organizer, "ANSWER_COUNT").await;
    assert_eq!(count["data"]["answered"], 1);
    let count = recv_until(&mut spectator, "ANSWER_COUNT").await;
    assert_eq!(count["data"]["answered"], 1);

    // The spectator never receives the player's private result.
    send_json(&mut bob, json!({"type": "ANSWER", "data": {"answer_index": 1}})).await;
    let over = recv_until(&mut spectator, "QUESTION_OVER").await;
    assert_eq!(over["data"]["correct_index"], 1);
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let addr = start_test_server().await;
    let (room_code, _token) = create_room(addr, simple_quiz(), 10).await;

    let mut alice = connect_player(addr, &room_code, "client-a").await;

    send_json(&mut alice, json!({"no_type": true})).await;
    let error = recv_until(&mut alice, "ERROR").await;
    assert_eq!(error["data"]["error_code"], "MALFORMED_FRAME");

    // Still attached: a JOIN goes through on the same socket.
    let joined = join(&mut alice, "alice").await;
    assert_eq!(joined["data"]["nickname"], "alice");
}

#[tokio::test]
async fn test_unknown_room_is_rejected_and_closed() {
    let addr = start_test_server().await;

    let mut socket = connect_player(addr, "ZZZZZZ", "client-a").await;
    let error = recv_json(&mut socket).await.expect("error frame");
    assert_eq!(error["type"], "ERROR");
    assert_eq!(error["data"]["error_code"], "ROOM_NOT_FOUND");
    assert!(recv_json(&mut socket).await.is_none(), "server closes");
}

#[tokio::test]
async fn test_bad_organizer_token_is_rejected() {
    let addr = start_test_server().await;
    let (room_code, _token) = create_room(addr, simple_quiz(), 10).await;

    let mut socket = connect_organizer(
        addr,
        &room_code,
        "imposter",
        "00000000-0000-0000-0000-000000000000",
    )
    .await;
    let error = recv_json(&mut socket).await.expect("error frame");
    assert_eq!(error["data"]["error_code"], "UNAUTHORIZED");
    assert!(recv_json(&mut socket).await.is_none(), "server closes");
}

#[tokio::test]
async fn test_nickname_takeover_over_sockets() {
    let addr = start_test_server().await;
    let (room_code, _token) = create_room(addr, simple_quiz(), 10).await;

    let mut first = connect_player(addr, &room_code, "phone").await;
    join(&mut first, "alice").await;

    let mut second = connect_player(addr, &room_code, "laptop").await;
    send_json(
        &mut second,
        json!({"type": "JOIN", "data": {"nickname": "alice"}}),
    )
    .await;
    let reconnected = recv_until(&mut second, "RECONNECTED").await;
    assert_eq!(reconnected["data"]["nickname"], "alice");

    // The displaced socket sees KICKED, then the server closes it.
    let kicked = recv_until(&mut first, "KICKED").await;
    assert_eq!(kicked["type"], "KICKED");
    assert!(recv_json(&mut first).await.is_none());
}

#[tokio::test]
async fn test_player_reconnect_keeps_score() {
    let addr = start_test_server().await;
    let (room_code, token) = create_room(addr, simple_quiz(), 10).await;

    let mut organizer = connect_organizer(addr, &room_code, "org", &token).await;
    recv_until(&mut organizer, "ORGANIZER_RECONNECTED").await;

    let mut alice = connect_player(addr, &room_code, "phone").await;
    join(&mut alice, "alice").await;
    let mut bob = connect_player(addr, &room_code, "tablet").await;
    join(&mut bob, "bob").await;

    send_json(&mut organizer, json!({"type": "START_GAME"})).await;
    send_json(&mut organizer, json!({"type": "NEXT_QUESTION"})).await;
    recv_until(&mut alice, "QUESTION").await;
    send_json(&mut alice, json!({"type": "ANSWER", "data": {"answer_index": 1}})).await;
    let result = recv_until(&mut alice, "ANSWER_RESULT").await;
    let earned = result["data"]["points"].as_u64().unwrap();

    // Drop alice's socket mid-question and come back under the same name.
    drop(alice);
    let disconnect = recv_until(&mut organizer, "PLAYER_DISCONNECTED").await;
    assert_eq!(disconnect["data"]["nickname"], "alice");

    let mut alice = connect_player(addr, &room_code, "phone-2").await;
    send_json(
        &mut alice,
        json!({"type": "JOIN", "data": {"nickname": "alice"}}),
    )
    .await;
    let reconnected = recv_until(&mut alice, "RECONNECTED").await;
    assert_eq!(reconnected["phase"], "QUESTION");
    assert_eq!(reconnected["data"]["score"].as_u64().unwrap(), earned);
    assert_eq!(reconnected["data"]["question_number"], 1);
    assert!(reconnected["data"]["question"].is_object());
    assert!(reconnected["data"]["time_remaining_seconds"].is_u64());
}
