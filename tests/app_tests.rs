#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration-style tests for `RemoteApp`.
//!
//! Uses the shared mocks from `tests/common` to script session API answers
//! and push frames, then checks local state, the rendered surface, alerts and
//! the frames sent back over the push channel.

mod common;

use pickleball_remote::protocol::{EndSetResponse, GameSnapshot, JoinResponse, NewSetResponse};
use pickleball_remote::{
    Element, GameState, InboundMessage, PushEvent, RemoteError, ScoreAction, ScoreView, Side,
};
use proptest::prelude::*;
use serde_json::json;

use common::{
    apply_next_push, join_ok, joined_app, match_complete_json, red_blue_snapshot,
    score_update_json, set_complete_json, start_app, start_app_with, test_config, ApiCall,
};

fn text(app: &common::TestApp, element: Element) -> String {
    app.surface().text(element).unwrap_or_default().to_string()
}

// ════════════════════════════════════════════════════════════════════
// Join
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn join_shows_scoring_view_and_opens_push_channel() {
    let (app, api, connector, push) = joined_app().await;

    assert_eq!(api.calls(), vec![ApiCall::Join("ABC123".into())]);
    assert_eq!(app.session_id(), Some("ABC123"));
    assert_eq!(app.surface().is_hidden(Element::SessionSection), Some(true));
    assert_eq!(app.surface().is_hidden(Element::ScoreSection), Some(false));

    assert_eq!(text(&app, Element::ScoreA), "0");
    assert_eq!(text(&app, Element::ScoreB), "0");
    assert_eq!(text(&app, Element::TeamA), "Red");
    assert_eq!(text(&app, Element::TeamB), "Blue");
    assert_eq!(text(&app, Element::ServerDisplay), "Aufschlag: Team A");
    assert_eq!(text(&app, Element::CurrentSet), "Satz 1");
    assert_eq!(text(&app, Element::SetScore), "0-0");
    assert!(app.surface().alerts().is_empty());

    assert_eq!(connector.connections().len(), 1);
    assert_eq!(push.url, "ws://scores.test:8001/ws/session/ABC123");
    assert!(app.is_push_open());
}

#[tokio::test]
async fn join_trims_session_id() {
    let (mut app, api, connector) = start_app();
    api.script_join(join_ok(red_blue_snapshot()));

    app.join("  ABC123\n").await.unwrap();

    assert_eq!(api.calls(), vec![ApiCall::Join("ABC123".into())]);
    assert_eq!(connector.last().url, "ws://scores.test:8001/ws/session/ABC123");
}

#[tokio::test]
async fn blank_session_id_is_rejected_without_request() {
    let (mut app, api, connector) = start_app();

    let err = app.join("   ").await.unwrap_err();

    assert!(matches!(err, RemoteError::EmptySessionId));
    assert!(api.calls().is_empty());
    assert!(connector.connections().is_empty());
    assert_eq!(app.surface().alerts().len(), 1);
    assert!(app.state().is_none());
}

#[tokio::test]
async fn rejected_join_leaves_state_untouched() {
    let (mut app, api, connector) = start_app();
    api.script_join(Ok(JoinResponse {
        success: false,
        session: None,
        error: Some("Session not found".into()),
    }));

    let err = app.join("NOPE").await.unwrap_err();

    match err {
        RemoteError::Api { message } => assert_eq!(message, "Session not found"),
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(
        app.surface().alerts(),
        ["Session join failed: Session not found".to_string()]
    );
    assert!(app.session_id().is_none());
    assert!(app.state().is_none());
    assert!(connector.connections().is_empty());
    assert_eq!(app.surface().is_hidden(Element::ScoreSection), Some(true));
}

#[tokio::test]
async fn rejected_join_without_reason_says_unknown_error() {
    let (mut app, api, _connector) = start_app();
    api.script_join(Ok(JoinResponse::default()));

    assert!(app.join("ABC123").await.is_err());
    assert_eq!(
        app.surface().alerts(),
        ["Session join failed: Unknown error".to_string()]
    );
}

#[tokio::test]
async fn network_failure_on_join_alerts_connection_error() {
    let (mut app, api, connector) = start_app();
    api.script_join(Err(RemoteError::Http("connection refused".into())));

    let err = app.join("ABC123").await.unwrap_err();

    assert!(matches!(err, RemoteError::Http(_)));
    let alerts = app.surface().alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].starts_with("Connection error:"), "{alerts:?}");
    assert!(app.state().is_none());
    assert!(connector.connections().is_empty());
}

#[tokio::test]
async fn push_connect_failure_does_not_fail_join() {
    let (mut app, api, connector) = start_app();
    connector.refuse_connections();
    api.script_join(join_ok(red_blue_snapshot()));

    app.join("ABC123").await.unwrap();

    assert!(!app.is_push_open());
    assert_eq!(text(&app, Element::TeamA), "Red");

    // Local scoring still works, nothing is sent anywhere.
    assert!(app.update_score(Side::B, ScoreAction::Add));
    assert_eq!(text(&app, Element::ScoreB), "1");
}

#[tokio::test]
async fn failed_rejoin_keeps_prior_session_and_channel() {
    let (mut app, api, connector, first) = joined_app().await;
    app.update_score(Side::A, ScoreAction::Add);
    let state_before = app.state().cloned();
    api.script_join(Ok(JoinResponse {
        success: false,
        session: None,
        error: Some("Session not found".into()),
    }));
    api.script_join(Err(RemoteError::Http("connection refused".into())));

    assert!(matches!(
        app.join("OTHER1").await,
        Err(RemoteError::Api { .. })
    ));
    assert!(matches!(
        app.join("OTHER2").await,
        Err(RemoteError::Http(_))
    ));

    assert_eq!(app.state().cloned(), state_before);
    assert_eq!(app.session_id(), Some("ABC123"));
    assert_eq!(connector.connections().len(), 1);
    assert!(!first.is_closed());
    assert!(app.is_push_open());
    assert_eq!(text(&app, Element::ScoreA), "1");
    assert_eq!(app.surface().alerts().len(), 2);

    // Scoring still goes out over the original channel.
    app.update_score(Side::A, ScoreAction::Add);
    let sent = first.wait_for_sent(2).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1]["scoreA"], 2);
}

#[tokio::test]
async fn rejoin_replaces_previous_push_channel() {
    let (mut app, api, connector, first) = joined_app().await;
    api.script_join(join_ok(red_blue_snapshot()));

    app.join("XYZ789").await.unwrap();

    assert!(first.is_closed());
    let connections = connector.connections();
    assert_eq!(connections.len(), 2);
    assert_eq!(connections[1].url, "ws://scores.test:8001/ws/session/XYZ789");
    assert_eq!(app.session_id(), Some("XYZ789"));
    assert!(app.is_push_open());
}

#[tokio::test]
async fn finished_match_snapshot_keeps_winner() {
    let (mut app, api, _connector) = start_app();
    let snapshot: GameSnapshot = serde_json::from_value(json!({
        "scoreA": 11,
        "scoreB": 4,
        "current_set": 3,
        "sets_won_A": 2,
        "sets_won_B": 0,
        "match_complete": true,
        "match_winner": "A"
    }))
    .unwrap();
    api.script_join(join_ok(snapshot));

    app.join("DONE").await.unwrap();

    let state = app.state().unwrap();
    assert!(state.is_match_complete());
    assert_eq!(state.match_winner(), Some(Side::A));
    assert_eq!(text(&app, Element::TeamA), "Team A");
    assert_eq!(text(&app, Element::CurrentSet), "Satz 3");
    assert_eq!(text(&app, Element::SetScore), "2-0");
}

// ════════════════════════════════════════════════════════════════════
// Local scoring
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn three_adds_render_and_send_increasing_scores() {
    let (mut app, _api, _connector, push) = joined_app().await;

    for _ in 0..3 {
        assert!(app.update_score(Side::A, ScoreAction::Add));
    }

    assert_eq!(text(&app, Element::ScoreA), "3");
    assert_eq!(text(&app, Element::ScoreB), "0");

    let sent = push.wait_for_sent(3).await;
    assert_eq!(sent.len(), 3);
    for (i, frame) in sent.iter().enumerate() {
        assert_eq!(frame["type"], "score_update");
        assert_eq!(frame["scoreA"], json!(i + 1));
        assert_eq!(frame["scoreB"], 0);
        assert_eq!(frame["server"], "A");
        assert!(frame.get("data").is_none(), "envelope must be flat");
    }
}

#[tokio::test]
async fn subtract_at_zero_stays_zero_and_is_still_sent() {
    let (mut app, _api, _connector, push) = joined_app().await;

    assert!(app.update_score(Side::B, ScoreAction::Subtract));

    assert_eq!(app.state().unwrap().score_b, 0);
    assert_eq!(text(&app, Element::ScoreB), "0");
    let sent = push.wait_for_sent(1).await;
    assert_eq!(sent[0]["scoreB"], 0);
}

#[tokio::test]
async fn update_score_before_join_is_a_no_op() {
    let (mut app, _api, connector) = start_app();

    assert!(!app.update_score(Side::A, ScoreAction::Add));

    assert!(app.state().is_none());
    assert_eq!(text(&app, Element::ScoreA), "");
    assert!(connector.connections().is_empty());
}

#[tokio::test]
async fn no_frame_is_sent_after_push_channel_closed() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.close();

    let event = apply_next_push(&mut app).await;
    assert_eq!(event, PushEvent::Closed { reason: None });
    assert!(!app.is_push_open());

    assert!(app.update_score(Side::A, ScoreAction::Add));
    assert_eq!(text(&app, Element::ScoreA), "1");

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(push.sent().is_empty());
    assert!(app.recv_push().await.is_none());
}

// ════════════════════════════════════════════════════════════════════
// Push handling
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn score_update_push_replaces_state_wholesale() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.push(score_update_json(json!({
        "scoreA": 5,
        "scoreB": 7,
        "teamA": "Green",
        "teamB": "Gold",
        "server": "B"
    })));

    apply_next_push(&mut app).await;

    let state = app.state().unwrap();
    assert_eq!((state.score_a, state.score_b), (5, 7));
    assert_eq!(state.server, Side::B);
    assert_eq!(text(&app, Element::TeamA), "Green");
    assert_eq!(text(&app, Element::TeamB), "Gold");
    assert_eq!(text(&app, Element::ServerDisplay), "Aufschlag: Team B");
}

#[tokio::test]
async fn partial_score_update_renders_defaults() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.push(score_update_json(json!({ "scoreA": 4 })));

    apply_next_push(&mut app).await;

    assert_eq!(text(&app, Element::ScoreA), "4");
    assert_eq!(text(&app, Element::ScoreB), "0");
    assert_eq!(text(&app, Element::TeamA), "Team A");
    assert_eq!(text(&app, Element::TeamB), "Team B");
    assert_eq!(text(&app, Element::ServerDisplay), "Aufschlag: Team A");
}

#[tokio::test]
async fn set_complete_push_resets_scores_and_alerts_once() {
    let (mut app, _api, _connector, push) = joined_app().await;
    for _ in 0..3 {
        app.update_score(Side::A, ScoreAction::Add);
    }
    push.push(set_complete_json(json!({
        "set_winner": "A",
        "current_set": 2,
        "sets_won_A": 1,
        "sets_won_B": 0,
        "scoreA": 0,
        "scoreB": 0
    })));

    apply_next_push(&mut app).await;

    assert_eq!(text(&app, Element::ScoreA), "0");
    assert_eq!(text(&app, Element::ScoreB), "0");
    assert_eq!(text(&app, Element::SetScore), "1-0");
    assert_eq!(text(&app, Element::CurrentSet), "Satz 2");
    // Team names are not part of a set_complete push.
    assert_eq!(text(&app, Element::TeamA), "Red");
    assert_eq!(text(&app, Element::TeamB), "Blue");
    assert_eq!(
        app.surface().alerts(),
        ["Satz beendet! Gewinner: Team A\nStand: 1-0".to_string()]
    );
}

#[tokio::test]
async fn set_complete_without_tally_keeps_previous_tally() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.push(set_complete_json(json!({ "set_winner": "B", "sets_won_B": 1 })));
    apply_next_push(&mut app).await;
    push.push(set_complete_json(json!({ "scoreA": 2 })));
    apply_next_push(&mut app).await;

    let state = app.state().unwrap();
    assert_eq!(state.sets_won(Side::A), 0);
    assert_eq!(state.sets_won(Side::B), 1);
    assert_eq!(state.score_a, 2);
    assert_eq!(app.surface().alerts().len(), 2);
    assert_eq!(
        app.surface().alerts()[1],
        "Satz beendet! Gewinner: Team ?\nStand: 0-1"
    );
}

#[tokio::test]
async fn match_complete_push_alerts_winner_and_final_score() {
    let (mut app, _api, _connector, push) = joined_app().await;
    app.update_score(Side::B, ScoreAction::Add);
    push.push(match_complete_json("B", "2-1"));

    apply_next_push(&mut app).await;

    let state = app.state().unwrap();
    assert!(state.is_match_complete());
    assert_eq!(state.match_winner(), Some(Side::B));
    assert_eq!(
        app.surface().alerts(),
        ["Match beendet!\nGewinner: Team B\nEndstand: 2-1".to_string()]
    );
    // The displayed score is left as it was.
    assert_eq!(text(&app, Element::ScoreB), "1");
}

#[tokio::test]
async fn match_complete_without_winner_still_alerts() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.push(r#"{"type":"match_complete","data":{"final_score":"2-1"}}"#);

    let event = apply_next_push(&mut app).await;

    assert!(matches!(event, PushEvent::Message(InboundMessage::MatchComplete(_))));
    assert_eq!(
        app.surface().alerts(),
        ["Match beendet!\nGewinner: Team ?\nEndstand: 2-1".to_string()]
    );
    let state = app.state().unwrap();
    assert!(!state.is_match_complete());
    assert_eq!(state.match_winner(), None);
}

#[tokio::test]
async fn malformed_and_unknown_frames_change_nothing() {
    let (mut app, _api, _connector, push) = joined_app().await;
    let before = app.state().cloned();

    push.push("not json at all");
    let event = apply_next_push(&mut app).await;
    assert!(matches!(event, PushEvent::Malformed { .. }));

    push.push(r#"{"type":"heartbeat","data":{}}"#);
    let event = apply_next_push(&mut app).await;
    assert_eq!(
        event,
        PushEvent::Message(InboundMessage::Unrecognized {
            kind: "heartbeat".into()
        })
    );

    assert_eq!(app.state().cloned(), before);
    assert!(app.surface().alerts().is_empty());
    assert!(app.is_push_open());

    // The channel keeps delivering afterwards.
    push.push(score_update_json(json!({ "scoreA": 1, "scoreB": 1 })));
    apply_next_push(&mut app).await;
    assert_eq!(text(&app, Element::ScoreB), "1");
}

#[tokio::test]
async fn receive_error_closes_channel_with_reason() {
    let (mut app, _api, _connector, push) = joined_app().await;
    push.fail("reset by peer");

    let event = apply_next_push(&mut app).await;

    match event {
        PushEvent::Closed { reason: Some(reason) } => {
            assert!(reason.contains("reset by peer"), "{reason}");
        }
        other => panic!("expected Closed with reason, got {other:?}"),
    }
    assert!(!app.is_push_open());
}

#[tokio::test]
async fn shutdown_closes_transport() {
    let (mut app, _api, _connector, push) = joined_app().await;

    app.shutdown().await;

    assert!(push.is_closed());
    assert!(!app.is_push_open());
}

#[tokio::test]
async fn shutdown_with_unread_full_event_queue_is_prompt() {
    let config = test_config()
        .with_event_channel_capacity(1)
        .with_shutdown_timeout(std::time::Duration::from_secs(2));
    let (mut app, api, connector) = start_app_with(config);
    api.script_join(join_ok(red_blue_snapshot()));
    app.join("ABC123").await.unwrap();
    let push = connector.last();
    // `Opened` is never read, so the single slot stays occupied.

    let started = std::time::Instant::now();
    app.shutdown().await;

    assert!(
        started.elapsed() < std::time::Duration::from_secs(1),
        "shutdown took {:?}",
        started.elapsed()
    );
    assert!(push.is_closed());
    assert!(!app.is_push_open());
}

#[tokio::test]
async fn rejoin_with_unread_full_event_queue_is_prompt() {
    let config = test_config()
        .with_event_channel_capacity(1)
        .with_shutdown_timeout(std::time::Duration::from_secs(2));
    let (mut app, api, connector) = start_app_with(config);
    api.script_join(join_ok(red_blue_snapshot()));
    api.script_join(join_ok(red_blue_snapshot()));
    app.join("ABC123").await.unwrap();
    let first = connector.last();

    let started = std::time::Instant::now();
    app.join("XYZ789").await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(1));
    assert!(first.is_closed());
    // The new channel's own events arrive on the fresh receiver.
    assert_eq!(app.recv_push().await, Some(PushEvent::Opened));
}

// ════════════════════════════════════════════════════════════════════
// Set / match lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn end_set_applies_tally_and_resets_scores() {
    let (mut app, api, _connector, _push) = joined_app().await;
    app.update_score(Side::A, ScoreAction::Add);
    app.update_score(Side::B, ScoreAction::Add);
    api.script_end_set(Ok(EndSetResponse {
        success: true,
        current_set: Some(2),
        sets_won_a: Some(1),
        sets_won_b: Some(0),
        ..EndSetResponse::default()
    }));

    let response = app.end_current_set(Side::A).await.unwrap();

    assert!(!response.match_complete);
    assert_eq!(
        api.calls().last(),
        Some(&ApiCall::EndSet("ABC123".into(), Side::A))
    );
    assert_eq!(text(&app, Element::ScoreA), "0");
    assert_eq!(text(&app, Element::ScoreB), "0");
    assert_eq!(text(&app, Element::CurrentSet), "Satz 2");
    assert_eq!(text(&app, Element::SetScore), "1-0");
    assert_eq!(
        app.surface().alerts(),
        ["Satz 1 beendet. Team A gewinnt den Satz!".to_string()]
    );
}

#[tokio::test]
async fn end_set_without_new_index_names_the_local_set() {
    let (mut app, api, _connector, _push) = joined_app().await;
    api.script_end_set(Ok(EndSetResponse {
        success: true,
        ..EndSetResponse::default()
    }));

    app.end_current_set(Side::A).await.unwrap();

    assert_eq!(app.state().unwrap().current_set, 1);
    assert_eq!(
        app.surface().alerts(),
        ["Satz 1 beendet. Team A gewinnt den Satz!".to_string()]
    );
}

#[tokio::test]
async fn end_set_that_finishes_match_announces_winner() {
    let (mut app, api, _connector, _push) = joined_app().await;
    api.script_end_set(Ok(EndSetResponse {
        success: true,
        current_set: Some(4),
        sets_won_a: Some(1),
        sets_won_b: Some(2),
        match_complete: true,
        match_winner: Some(Side::B),
        error: None,
    }));

    app.end_current_set(Side::B).await.unwrap();

    let state = app.state().unwrap();
    assert!(state.is_match_complete());
    assert_eq!(state.match_winner(), Some(Side::B));
    assert_eq!(
        app.surface().alerts(),
        ["Match beendet! Gewinner: Team B".to_string()]
    );
}

#[tokio::test]
async fn rejected_end_set_keeps_state_and_alerts_reason() {
    let (mut app, api, _connector, _push) = joined_app().await;
    app.update_score(Side::A, ScoreAction::Add);
    let before = app.state().cloned();
    api.script_end_set(Ok(EndSetResponse {
        success: false,
        error: Some("Match already complete".into()),
        ..EndSetResponse::default()
    }));

    let err = app.end_current_set(Side::A).await.unwrap_err();

    assert!(matches!(err, RemoteError::Api { .. }));
    assert_eq!(app.state().cloned(), before);
    assert_eq!(
        app.surface().alerts(),
        ["Fehler beim Beenden des Satzes: Match already complete".to_string()]
    );
}

#[tokio::test]
async fn end_set_network_failure_alerts_generic_message() {
    let (mut app, api, _connector, _push) = joined_app().await;
    api.script_end_set(Err(RemoteError::Http("timed out".into())));

    assert!(app.end_current_set(Side::B).await.is_err());
    assert_eq!(
        app.surface().alerts(),
        ["Fehler beim Beenden des Satzes".to_string()]
    );
}

#[tokio::test]
async fn lifecycle_calls_require_a_session() {
    let (mut app, api, _connector) = start_app();

    assert!(matches!(
        app.end_current_set(Side::A).await,
        Err(RemoteError::NotJoined)
    ));
    assert!(matches!(
        app.start_new_set().await,
        Err(RemoteError::NotJoined)
    ));
    assert!(api.calls().is_empty());
    assert!(app.surface().alerts().is_empty());
}

#[tokio::test]
async fn new_set_resets_scores_and_serve() {
    let (mut app, api, _connector, push) = joined_app().await;
    push.push(score_update_json(json!({
        "scoreA": 9,
        "scoreB": 11,
        "teamA": "Red",
        "teamB": "Blue",
        "server": "B"
    })));
    apply_next_push(&mut app).await;
    api.script_new_set(Ok(NewSetResponse {
        success: true,
        current_set: Some(3),
        error: None,
    }));

    app.start_new_set().await.unwrap();

    let state = app.state().unwrap();
    assert_eq!((state.score_a, state.score_b), (0, 0));
    assert_eq!(state.server, Side::A);
    assert_eq!(state.current_set, 3);
    assert_eq!(text(&app, Element::ServerDisplay), "Aufschlag: Team A");
    assert_eq!(text(&app, Element::CurrentSet), "Satz 3");
    assert_eq!(api.calls().last(), Some(&ApiCall::NewSet("ABC123".into())));
    assert_eq!(
        app.surface().alerts(),
        ["Neuer Satz 3 gestartet!".to_string()]
    );
}

#[tokio::test]
async fn new_set_failures_alert() {
    let (mut app, api, _connector, _push) = joined_app().await;
    api.script_new_set(Ok(NewSetResponse {
        success: false,
        current_set: None,
        error: Some("Set still running".into()),
    }));
    api.script_new_set(Err(RemoteError::Timeout));

    assert!(app.start_new_set().await.is_err());
    assert!(app.start_new_set().await.is_err());

    assert_eq!(
        app.surface().alerts(),
        [
            "Fehler beim Starten des neuen Satzes: Set still running".to_string(),
            "Fehler beim Starten des neuen Satzes".to_string(),
        ]
    );
}

// ════════════════════════════════════════════════════════════════════
// Properties
// ════════════════════════════════════════════════════════════════════

fn action() -> impl Strategy<Value = (Side, ScoreAction)> {
    (
        prop_oneof![Just(Side::A), Just(Side::B)],
        prop_oneof![Just(ScoreAction::Add), Just(ScoreAction::Subtract)],
    )
}

proptest! {
    #[test]
    fn scores_never_go_negative(actions in prop::collection::vec(action(), 0..200)) {
        let mut state = GameState::from_snapshot("P", red_blue_snapshot());
        let mut model = [0_i64, 0_i64];

        for (side, action) in actions {
            let slot = usize::from(side == Side::B);
            model[slot] = match action {
                ScoreAction::Add => model[slot] + 1,
                ScoreAction::Subtract => (model[slot] - 1).max(0),
            };
            let score = state.apply_score_action(side, action);
            prop_assert_eq!(i64::from(score), model[slot]);
        }

        let view = ScoreView::project(&state);
        prop_assert_eq!(view.score_a, model[0].to_string());
        prop_assert_eq!(view.score_b, model[1].to_string());
    }
}
