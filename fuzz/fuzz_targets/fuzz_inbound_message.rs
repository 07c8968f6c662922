#![no_main]

use libfuzzer_sys::fuzz_target;
use pickleball_remote::protocol::InboundMessage;
use pickleball_remote::{GameState, ScoreView};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(msg) = InboundMessage::decode(text) else {
        return;
    };

    // Whatever decodes must also apply and render without panicking.
    let mut state = GameState::from_snapshot("FUZZ", Default::default());
    match msg {
        InboundMessage::ScoreUpdate(update) => state.apply_score_update(&update),
        InboundMessage::SetComplete(payload) => state.apply_set_complete(&payload),
        InboundMessage::MatchComplete(payload) => {
            if let Some(winner) = payload.winner {
                state.mark_match_complete(winner);
            }
        }
        InboundMessage::Unrecognized { .. } => {}
    }
    let _ = ScoreView::project(&state);
});
