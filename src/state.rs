//! Client-side view-model of a joined scoring session.
//!
//! The server holds the authoritative copy. [`GameState`] is built wholesale
//! from the join snapshot and then patched, either optimistically by local
//! point changes or by server pushes and lifecycle responses. Every patch is
//! last-write-wins.

use crate::protocol::{
    EndSetResponse, GameSnapshot, OutboundMessage, ScoreUpdatePayload, SetCompletePayload, Side,
};

/// Direction of a local point change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreAction {
    /// One point more.
    Add,
    /// One point less, never below zero.
    Subtract,
}

/// Local copy of the session's game state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    session_id: String,
    pub score_a: u32,
    pub score_b: u32,
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    pub server: Side,
    pub current_set: u32,
    pub sets_won_a: u32,
    pub sets_won_b: u32,
    match_winner: Option<Side>,
}

impl GameState {
    /// Build the state for `session_id` from a join snapshot.
    ///
    /// `match_winner` is only honored when the snapshot also reports
    /// `match_complete`.
    pub fn from_snapshot(session_id: impl Into<String>, snapshot: GameSnapshot) -> Self {
        let match_winner = if snapshot.match_complete {
            if snapshot.match_winner.is_none() {
                tracing::warn!("snapshot reports a complete match without a winner");
            }
            snapshot.match_winner
        } else {
            None
        };

        Self {
            session_id: session_id.into(),
            score_a: snapshot.score_a,
            score_b: snapshot.score_b,
            team_a: snapshot.team_a,
            team_b: snapshot.team_b,
            server: snapshot.server,
            current_set: snapshot.current_set.unwrap_or(1).max(1),
            sets_won_a: snapshot.sets_won_a,
            sets_won_b: snapshot.sets_won_b,
            match_winner,
        }
    }

    /// Identifier of the joined session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current score of `side`.
    pub fn score(&self, side: Side) -> u32 {
        match side {
            Side::A => self.score_a,
            Side::B => self.score_b,
        }
    }

    /// Sets won so far by `side`.
    pub fn sets_won(&self, side: Side) -> u32 {
        match side {
            Side::A => self.sets_won_a,
            Side::B => self.sets_won_b,
        }
    }

    /// Display name of `side`, if the server supplied a non-empty one.
    pub fn team_name(&self, side: Side) -> Option<&str> {
        let name = match side {
            Side::A => self.team_a.as_deref(),
            Side::B => self.team_b.as_deref(),
        };
        name.filter(|n| !n.is_empty())
    }

    /// Whether the match is over.
    pub fn is_match_complete(&self) -> bool {
        self.match_winner.is_some()
    }

    /// Winner of the match, once it is complete.
    pub fn match_winner(&self) -> Option<Side> {
        self.match_winner
    }

    /// Apply a local point change and return the new score of `side`.
    pub fn apply_score_action(&mut self, side: Side, action: ScoreAction) -> u32 {
        let score = match side {
            Side::A => &mut self.score_a,
            Side::B => &mut self.score_b,
        };
        *score = match action {
            ScoreAction::Add => score.saturating_add(1),
            ScoreAction::Subtract => score.saturating_sub(1),
        };
        *score
    }

    /// Replace score, team and serve fields from a `score_update` push.
    pub fn apply_score_update(&mut self, update: &ScoreUpdatePayload) {
        self.score_a = update.score_a;
        self.score_b = update.score_b;
        self.team_a.clone_from(&update.team_a);
        self.team_b.clone_from(&update.team_b);
        self.server = update.server;
    }

    /// Merge a `set_complete` push.
    ///
    /// Only the set index, the set tally and the two scores change. Set
    /// fields absent from the payload keep their previous value.
    pub fn apply_set_complete(&mut self, payload: &SetCompletePayload) {
        if let Some(current_set) = payload.current_set {
            self.current_set = current_set.max(1);
        }
        if let Some(won) = payload.sets_won_a {
            self.sets_won_a = won;
        }
        if let Some(won) = payload.sets_won_b {
            self.sets_won_b = won;
        }
        self.score_a = payload.score_a;
        self.score_b = payload.score_b;
    }

    /// Apply a successful `end-set` response and reset both scores.
    pub fn apply_end_set(&mut self, response: &EndSetResponse) {
        if let Some(current_set) = response.current_set {
            self.current_set = current_set.max(1);
        }
        if let Some(won) = response.sets_won_a {
            self.sets_won_a = won;
        }
        if let Some(won) = response.sets_won_b {
            self.sets_won_b = won;
        }
        if response.match_complete {
            if let Some(winner) = response.match_winner {
                self.match_winner = Some(winner);
            }
        }
        self.score_a = 0;
        self.score_b = 0;
    }

    /// Reset for a freshly started set: scores to 0, serve to side A.
    pub fn reset_for_new_set(&mut self, current_set: Option<u32>) {
        if let Some(current_set) = current_set {
            self.current_set = current_set.max(1);
        }
        self.score_a = 0;
        self.score_b = 0;
        self.server = Side::default();
    }

    /// Record the end of the match.
    pub fn mark_match_complete(&mut self, winner: Side) {
        self.match_winner = Some(winner);
    }

    /// The outbound `score_update` carrying the current scores and serve.
    pub fn score_update_message(&self) -> OutboundMessage {
        OutboundMessage::ScoreUpdate {
            score_a: self.score_a,
            score_b: self.score_b,
            server: self.server,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn joined() -> GameState {
        GameState::from_snapshot(
            "ABC123",
            GameSnapshot {
                team_a: Some("Red".into()),
                team_b: Some("Blue".into()),
                ..GameSnapshot::default()
            },
        )
    }

    #[test]
    fn from_snapshot_defaults_current_set_to_one() {
        let state = joined();
        assert_eq!(state.session_id(), "ABC123");
        assert_eq!(state.current_set, 1);
        assert_eq!(state.server, Side::A);
        assert!(!state.is_match_complete());
    }

    #[test]
    fn from_snapshot_ignores_winner_of_unfinished_match() {
        let state = GameState::from_snapshot(
            "S",
            GameSnapshot {
                match_complete: false,
                match_winner: Some(Side::B),
                ..GameSnapshot::default()
            },
        );
        assert_eq!(state.match_winner(), None);
    }

    #[test]
    fn from_snapshot_keeps_winner_of_finished_match() {
        let state = GameState::from_snapshot(
            "S",
            GameSnapshot {
                match_complete: true,
                match_winner: Some(Side::B),
                ..GameSnapshot::default()
            },
        );
        assert!(state.is_match_complete());
        assert_eq!(state.match_winner(), Some(Side::B));
    }

    #[test]
    fn subtract_clamps_at_zero() {
        let mut state = joined();
        assert_eq!(state.apply_score_action(Side::B, ScoreAction::Subtract), 0);
        assert_eq!(state.apply_score_action(Side::B, ScoreAction::Add), 1);
        assert_eq!(state.apply_score_action(Side::B, ScoreAction::Subtract), 0);
        assert_eq!(state.apply_score_action(Side::B, ScoreAction::Subtract), 0);
        assert_eq!(state.score_a, 0);
    }

    #[test]
    fn add_saturates_instead_of_overflowing() {
        let mut state = joined();
        state.score_a = u32::MAX;
        assert_eq!(state.apply_score_action(Side::A, ScoreAction::Add), u32::MAX);
    }

    #[test]
    fn empty_team_name_counts_as_absent() {
        let mut state = joined();
        state.team_a = Some(String::new());
        assert_eq!(state.team_name(Side::A), None);
        assert_eq!(state.team_name(Side::B), Some("Blue"));
    }

    #[test]
    fn score_update_replaces_names_wholesale() {
        let mut state = joined();
        state.apply_score_update(&ScoreUpdatePayload {
            score_a: 4,
            ..ScoreUpdatePayload::default()
        });
        assert_eq!(state.score_a, 4);
        assert_eq!(state.score_b, 0);
        assert_eq!(state.team_a, None);
        assert_eq!(state.team_b, None);
    }

    #[test]
    fn set_complete_keeps_tally_fields_that_are_absent() {
        let mut state = joined();
        state.current_set = 2;
        state.sets_won_a = 1;
        state.score_a = 9;
        state.apply_set_complete(&SetCompletePayload {
            sets_won_b: Some(1),
            ..SetCompletePayload::default()
        });
        assert_eq!(state.current_set, 2);
        assert_eq!(state.sets_won_a, 1);
        assert_eq!(state.sets_won_b, 1);
        assert_eq!(state.score_a, 0);
        assert_eq!(state.team_name(Side::A), Some("Red"));
    }

    #[test]
    fn end_set_records_match_winner_only_when_complete() {
        let mut state = joined();
        state.apply_end_set(&EndSetResponse {
            success: true,
            match_complete: false,
            match_winner: Some(Side::A),
            ..EndSetResponse::default()
        });
        assert!(!state.is_match_complete());

        state.apply_end_set(&EndSetResponse {
            success: true,
            match_complete: true,
            match_winner: Some(Side::A),
            ..EndSetResponse::default()
        });
        assert_eq!(state.match_winner(), Some(Side::A));
    }

    #[test]
    fn new_set_resets_serve_to_side_a() {
        let mut state = joined();
        state.server = Side::B;
        state.score_b = 7;
        state.reset_for_new_set(Some(3));
        assert_eq!(state.server, Side::A);
        assert_eq!(state.score_b, 0);
        assert_eq!(state.current_set, 3);
    }

    #[test]
    fn score_update_message_mirrors_state() {
        let mut state = joined();
        state.score_a = 2;
        state.server = Side::B;
        assert_eq!(
            state.score_update_message(),
            OutboundMessage::ScoreUpdate {
                score_a: 2,
                score_b: 0,
                server: Side::B,
            }
        );
    }
}
