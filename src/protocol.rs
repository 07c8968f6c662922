//! Wire types for the scoreboard session API and push channel.
//!
//! The server mixes naming styles (`scoreA`, `sets_won_A`, `current_set`), so
//! every field carries an explicit `rename`. All inbound fields are optional
//! on the wire; defaults are filled in here, at the deserialization boundary,
//! and an explicit JSON `null` is treated the same as an absent field.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{RemoteError, Result};

/// Deserialize `null` as `T::default()`. Combine with `#[serde(default)]` so
/// that a missing field also yields the default.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ── Enums ───────────────────────────────────────────────────────────

/// One of the two sides on court.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// Side A. Holds serve at the start of every set.
    #[default]
    A,
    /// Side B.
    B,
}

impl Side {
    /// Wire and display letter of this side.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Placeholder team label used when no name is known.
    pub const fn default_team_label(self) -> &'static str {
        match self {
            Self::A => "Team A",
            Self::B => "Team B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = RemoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(RemoteError::UnknownSide(other.to_string())),
        }
    }
}

// ── HTTP payloads ───────────────────────────────────────────────────

/// Full game state as returned by the join endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    #[serde(rename = "scoreA", default, deserialize_with = "nullable")]
    pub score_a: u32,
    #[serde(rename = "scoreB", default, deserialize_with = "nullable")]
    pub score_b: u32,
    #[serde(rename = "teamA", default, skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(rename = "teamB", default, skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub server: Side,
    /// Index of the set in progress. `None` means the server did not say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_set: Option<u32>,
    #[serde(rename = "sets_won_A", default, deserialize_with = "nullable")]
    pub sets_won_a: u32,
    #[serde(rename = "sets_won_B", default, deserialize_with = "nullable")]
    pub sets_won_b: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub match_complete: bool,
    /// Only meaningful when `match_complete` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_winner: Option<Side>,
}

/// Response of `POST /api/session/{id}/join`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<GameSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JoinResponse {
    /// Extract the snapshot of a successful join.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Api`] when `success` is not true or the
    /// snapshot is missing. The server's `error` text is used when present.
    pub fn into_snapshot(self) -> Result<GameSnapshot> {
        match (self.success, self.session) {
            (true, Some(snapshot)) => Ok(snapshot),
            (true, None) => Err(RemoteError::Api {
                message: self
                    .error
                    .unwrap_or_else(|| "missing session snapshot".to_string()),
            }),
            (false, _) => Err(RemoteError::Api {
                message: self.error.unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }
}

/// Body of `POST /api/session/{id}/end-set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSetRequest {
    pub winner: Side,
}

/// Response of `POST /api/session/{id}/end-set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndSetResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_set: Option<u32>,
    #[serde(rename = "sets_won_A", default, skip_serializing_if = "Option::is_none")]
    pub sets_won_a: Option<u32>,
    #[serde(rename = "sets_won_B", default, skip_serializing_if = "Option::is_none")]
    pub sets_won_b: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub match_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_winner: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response of `POST /api/session/{id}/new-set`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSetResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_set: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Push payloads ───────────────────────────────────────────────────

/// Payload of a `score_update` push event. Replaces the displayed score,
/// team and serve fields wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreUpdatePayload {
    #[serde(rename = "scoreA", default, deserialize_with = "nullable")]
    pub score_a: u32,
    #[serde(rename = "scoreB", default, deserialize_with = "nullable")]
    pub score_b: u32,
    #[serde(rename = "teamA", default, skip_serializing_if = "Option::is_none")]
    pub team_a: Option<String>,
    #[serde(rename = "teamB", default, skip_serializing_if = "Option::is_none")]
    pub team_b: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub server: Side,
}

/// Payload of a `set_complete` push event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetCompletePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_winner: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_set: Option<u32>,
    #[serde(rename = "sets_won_A", default, skip_serializing_if = "Option::is_none")]
    pub sets_won_a: Option<u32>,
    #[serde(rename = "sets_won_B", default, skip_serializing_if = "Option::is_none")]
    pub sets_won_b: Option<u32>,
    #[serde(rename = "scoreA", default, deserialize_with = "nullable")]
    pub score_a: u32,
    #[serde(rename = "scoreB", default, deserialize_with = "nullable")]
    pub score_b: u32,
}

/// Payload of a `match_complete` push event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCompletePayload {
    /// `None` when the server left it out; the user is still notified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<String>,
}

// ── Messages ────────────────────────────────────────────────────────

/// Raw `{ type, data }` envelope of an inbound push frame.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Messages pushed from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Authoritative score/team/serve state.
    ScoreUpdate(ScoreUpdatePayload),
    /// A set just finished.
    SetComplete(SetCompletePayload),
    /// The match just finished.
    MatchComplete(MatchCompletePayload),
    /// Any `type` this client does not know about.
    Unrecognized { kind: String },
}

impl InboundMessage {
    /// Wire discriminator for `score_update`.
    pub const SCORE_UPDATE: &'static str = "score_update";
    /// Wire discriminator for `set_complete`.
    pub const SET_COMPLETE: &'static str = "set_complete";
    /// Wire discriminator for `match_complete`.
    pub const MATCH_COMPLETE: &'static str = "match_complete";

    /// Decode one JSON text frame.
    ///
    /// A missing or `null` `data` field decodes like an empty object. An
    /// unknown `type` yields [`InboundMessage::Unrecognized`] instead of an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Serialization`] if the frame is not a JSON
    /// envelope or the payload does not match its `type`.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let data = match envelope.data {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            other => other,
        };
        let message = match envelope.kind.as_str() {
            Self::SCORE_UPDATE => Self::ScoreUpdate(serde_json::from_value(data)?),
            Self::SET_COMPLETE => Self::SetComplete(serde_json::from_value(data)?),
            Self::MATCH_COMPLETE => Self::MatchComplete(serde_json::from_value(data)?),
            _ => Self::Unrecognized {
                kind: envelope.kind,
            },
        };
        Ok(message)
    }

    /// The `type` discriminator this message was decoded from.
    pub fn kind(&self) -> &str {
        match self {
            Self::ScoreUpdate(_) => Self::SCORE_UPDATE,
            Self::SetComplete(_) => Self::SET_COMPLETE,
            Self::MatchComplete(_) => Self::MATCH_COMPLETE,
            Self::Unrecognized { kind } => kind,
        }
    }
}

/// Messages sent from the client to the server over the push channel.
///
/// The envelope is flat: `{"type":"score_update","scoreA":1,"scoreB":0,"server":"A"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Optimistic local score change, for the server to reconcile.
    ScoreUpdate {
        #[serde(rename = "scoreA")]
        score_a: u32,
        #[serde(rename = "scoreB")]
        score_b: u32,
        server: Side,
    },
}
