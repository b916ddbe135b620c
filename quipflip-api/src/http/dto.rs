//! Wire-shape structs for responses. Kept separate from `quipflip_core`'s
//! domain types so storage and internal-only fields (password hashes,
//! `queue_position`) never leak onto the wire.

use chrono::{DateTime, NaiveDate, Utc};
use quipflip_core::types::{Phraseset, Player, Round, RoundPayload, RoundRole, RoundStatus};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
pub struct PlayerView {
    pub player_id: Uuid,
    pub username: String,
    pub balance: i64,
    pub last_login_date: NaiveDate,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        PlayerView {
            player_id: p.player_id.0,
            username: p.username.clone(),
            balance: p.balance,
            last_login_date: p.last_login_date,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RoundView {
    Prompt {
        round_id: Uuid,
        status: &'static str,
        expires_at: DateTime<Utc>,
        prompt_text: String,
        submitted_phrase: Option<String>,
    },
    Copy {
        round_id: Uuid,
        status: &'static str,
        expires_at: DateTime<Utc>,
        original_phrase: String,
        submitted_phrase: Option<String>,
    },
    Vote {
        round_id: Uuid,
        status: &'static str,
        expires_at: DateTime<Utc>,
        phraseset_id: Uuid,
        shuffled_phrases: [String; 3],
    },
}

fn status_str(status: RoundStatus) -> &'static str {
    match status {
        RoundStatus::Active => "active",
        RoundStatus::Submitted => "submitted",
        RoundStatus::Expired => "expired",
        RoundStatus::Abandoned => "abandoned",
    }
}

impl From<&Round> for RoundView {
    fn from(r: &Round) -> Self {
        let status = status_str(r.status);
        match (&r.role, &r.payload) {
            (RoundRole::Prompt, RoundPayload::Prompt { prompt_text, .. }) => RoundView::Prompt {
                round_id: r.round_id.0,
                status,
                expires_at: r.expires_at,
                prompt_text: prompt_text.clone(),
                submitted_phrase: r.submitted_phrase.clone(),
            },
            (RoundRole::Copy, RoundPayload::Copy { original_phrase, .. }) => RoundView::Copy {
                round_id: r.round_id.0,
                status,
                expires_at: r.expires_at,
                original_phrase: original_phrase.clone(),
                submitted_phrase: r.submitted_phrase.clone(),
            },
            (
                RoundRole::Vote,
                RoundPayload::Vote {
                    phraseset_id,
                    shuffled_phrases,
                },
            ) => RoundView::Vote {
                round_id: r.round_id.0,
                status,
                expires_at: r.expires_at,
                phraseset_id: phraseset_id.0,
                shuffled_phrases: shuffled_phrases.clone(),
            },
            _ => unreachable!("role and payload are always set together"),
        }
    }
}

#[derive(Serialize)]
pub struct PhrasesetView {
    pub phraseset_id: Uuid,
    pub prompt_text: String,
    pub status: &'static str,
    pub vote_count: i32,
    pub total_pool: i64,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

fn phraseset_status_str(status: quipflip_core::types::PhrasesetStatus) -> &'static str {
    use quipflip_core::types::PhrasesetStatus::*;
    match status {
        Open => "open",
        Closing => "closing",
        Closed => "closed",
        Finalized => "finalized",
    }
}

impl From<&Phraseset> for PhrasesetView {
    fn from(p: &Phraseset) -> Self {
        PhrasesetView {
            phraseset_id: p.phraseset_id.0,
            prompt_text: p.prompt_text.clone(),
            status: phraseset_status_str(p.status),
            vote_count: p.vote_count,
            total_pool: p.total_pool,
            created_at: p.created_at,
            finalized_at: p.finalized_at,
        }
    }
}
