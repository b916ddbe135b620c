use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(PlayerId);
id_type!(RoundId);
id_type!(PhrasesetId);
id_type!(VoteId);
id_type!(TransactionId);
id_type!(SessionId);

/// Which of the three round roles a [`Round`] is playing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundRole {
    Prompt,
    Copy,
    Vote,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    Active,
    Submitted,
    Expired,
    Abandoned,
}

/// Role-specific payload carried by a [`Round`]. Prompt rounds never carry
/// `original_phrase`; copy rounds never carry `prompt_text` until the
/// phraseset is assembled; vote rounds carry the per-voter shuffle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPayload {
    Prompt {
        prompt_id: Uuid,
        prompt_text: String,
    },
    Copy {
        prompt_round_id: RoundId,
        original_phrase: String,
    },
    Vote {
        phraseset_id: PhrasesetId,
        /// The three phrases in the per-voter shuffle order chosen at issue.
        shuffled_phrases: [String; 3],
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: RoundId,
    pub player_id: PlayerId,
    pub role: RoundRole,
    pub status: RoundStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cost: i64,
    /// Copy rounds only: the house's top-up when the copy was started under
    /// discount pricing (glossary: system contribution).
    pub system_contribution: i64,
    pub submitted_phrase: Option<String>,
    pub payload: RoundPayload,
}

impl Round {
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhrasesetStatus {
    Open,
    Closing,
    Closed,
    Finalized,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phraseset {
    pub phraseset_id: PhrasesetId,
    pub prompt_round_id: RoundId,
    pub copy_round_1_id: RoundId,
    pub copy_round_2_id: RoundId,
    pub prompt_text: String,
    pub original: String,
    pub copy_1: String,
    pub copy_2: String,
    pub status: PhrasesetStatus,
    pub vote_count: i32,
    pub third_vote_at: Option<DateTime<Utc>>,
    pub fifth_vote_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub total_pool: i64,
    pub system_contribution: i64,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Which of the three phrases a vote names, denormalised for scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteTarget {
    Original,
    Copy1,
    Copy2,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: VoteId,
    pub phraseset_id: PhrasesetId,
    pub voter_id: PlayerId,
    pub voted_index: i16,
    pub voted_phrase: String,
    pub correct: bool,
    pub payout: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub phraseset_id: PhrasesetId,
    pub player_id: PlayerId,
    pub payout_claimed: bool,
    pub payout_amount: i64,
    pub first_viewed_at: Option<DateTime<Utc>>,
    pub payout_claimed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    PromptEntry,
    CopyEntry,
    VoteEntry,
    VotePayout,
    PrizePayout,
    Refund,
    Penalty,
    DailyBonus,
    SystemContribution,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub player_id: PlayerId,
    pub amount: i64,
    pub kind: TransactionKind,
    pub reference_id: Option<Uuid>,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: PlayerId,
    pub username: String,
    pub email: String,
    pub balance: i64,
    pub last_login_date: NaiveDate,
    pub creation_date: NaiveDate,
    pub active_round_id: Option<RoundId>,
    pub api_key: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBonus {
    pub player_id: PlayerId,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbandonedAssignment {
    pub prompt_round_id: RoundId,
    pub player_id: PlayerId,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token_hash: String,
    pub player_id: PlayerId,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}
