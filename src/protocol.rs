//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ArtworkId, MembershipCode, RevealState, ScoreCounts};
use crate::session::{Activation, GameSession, SlotState};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    NewRound,
    Activate { index: usize },
    Scores,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Round {
        round: RoundOut,
    },
    /// One slot finished resolving (successfully or not).
    Artwork {
        generation: u64,
        artwork: ArtworkOut,
    },
    Activated {
        result: ActivateOut,
    },
    Scores {
        scores: ScoresOut,
    },
    Error {
        message: String,
    },
}

/// Round snapshot. Artist, title, year and codes are withheld until revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOut {
    pub session_id: String,
    pub player_id: String,
    pub generation: u64,
    pub reveal: RevealState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_artist: Option<String>,
    pub artworks: Vec<ArtworkOut>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkOut {
    pub index: usize,
    pub id: ArtworkId,
    pub status: SlotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<MembershipCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Convert slot `index` of a session into its public DTO.
pub fn artwork_out(session: &GameSession, index: usize) -> ArtworkOut {
    let revealed = session.reveal() == RevealState::Revealed;
    let id = session.round().map(|r| r.artwork_ids[index]).unwrap_or_default();
    let mut out = ArtworkOut {
        index,
        id,
        status: SlotStatus::Pending,
        image_url: None,
        alt_text: None,
        artist_name: None,
        title: None,
        year: None,
        code: None,
        error: None,
    };
    match &session.slots()[index] {
        SlotState::Pending => {}
        SlotState::Failed { message } => {
            out.status = SlotStatus::Failed;
            out.error = Some(message.clone());
        }
        SlotState::Resolved { artwork, code } => {
            out.status = SlotStatus::Ready;
            out.image_url = Some(artwork.image_url.clone());
            out.alt_text = Some(artwork.alt_text.clone());
            if revealed {
                out.artist_name = Some(artwork.artist_display_name.clone());
                out.title = Some(artwork.title.clone());
                out.year = Some(artwork.year);
                out.code = Some(*code);
            }
        }
    }
    out
}

/// Convert a whole session into the public round DTO.
pub fn round_out(session: &GameSession) -> RoundOut {
    let revealed = session.reveal() == RevealState::Revealed;
    let artworks = match session.round() {
        Some(_) => (0..session.slots().len()).map(|i| artwork_out(session, i)).collect(),
        None => Vec::new(),
    };
    RoundOut {
        session_id: session.id.clone(),
        player_id: session.player.clone(),
        generation: session.generation(),
        reveal: session.reveal(),
        correct_artist: session.round().filter(|_| revealed).map(|r| r.correct_artist.clone()),
        artworks,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresOut {
    pub correct: u64,
    pub incorrect: u64,
    pub correct_label: String,
    pub incorrect_label: String,
}

impl From<ScoreCounts> for ScoresOut {
    fn from(c: ScoreCounts) -> Self {
        Self {
            correct: c.correct,
            incorrect: c.incorrect,
            correct_label: c.correct_label().into(),
            incorrect_label: c.incorrect_label().into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeOut {
    Scored,
    Unscored,
    AlreadyRevealed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateOut {
    pub outcome: OutcomeOut,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<MembershipCode>,
    pub round: RoundOut,
    pub scores: ScoresOut,
}

pub fn outcome_out(a: &Activation) -> (OutcomeOut, Option<MembershipCode>) {
    match a {
        Activation::Scored(code) => (OutcomeOut::Scored, Some(*code)),
        Activation::Unscored => (OutcomeOut::Unscored, None),
        Activation::AlreadyRevealed => (OutcomeOut::AlreadyRevealed, None),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoundIn {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateIn {
    pub session_id: String,
    pub index: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresQuery {
    pub player_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
