use thiserror::Error;

use crate::types::RoundId;

/// The engine's error taxonomy.
///
/// Grouped by category, with a short block comment per group. Variants carry
/// the machine-readable `detail` string the wire protocol sends back, via
/// [`Error::code`], instead of a numeric repr.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------
    #[error("invalid_credentials")]
    InvalidCredentials,
    #[error("token_expired")]
    TokenExpired,
    #[error("token_revoked")]
    TokenRevoked,
    #[error("username_not_found")]
    UsernameNotFound,

    // ------------------------------------------------------------------
    // Invariant
    // ------------------------------------------------------------------
    /// Carries the id of the round already in progress, so the caller can
    /// resume it instead of just being told no.
    #[error("already_in_round")]
    AlreadyInRound(RoundId),
    #[error("max_outstanding_prompts")]
    MaxOutstandingPrompts,
    #[error("insufficient_balance")]
    InsufficientBalance,
    #[error("already_claimed_today")]
    AlreadyClaimedToday,

    // ------------------------------------------------------------------
    // Availability
    // ------------------------------------------------------------------
    #[error("no_prompts_available")]
    NoPromptsAvailable,
    #[error("no_wordsets_available")]
    NoWordsetsAvailable,

    // ------------------------------------------------------------------
    // Phrase
    // ------------------------------------------------------------------
    #[error("invalid_phrase")]
    InvalidPhrase,
    #[error("duplicate_phrase")]
    DuplicatePhrase,

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------
    #[error("expired")]
    Expired,
    #[error("already_voted")]
    AlreadyVoted,
    #[error("not_a_contributor")]
    NotAContributor,
    #[error("not_found")]
    NotFound,

    // ------------------------------------------------------------------
    // Rate / infra
    // ------------------------------------------------------------------
    #[error("rate_limited")]
    RateLimited,
    #[error("dependency_unavailable")]
    DependencyUnavailable,
}

impl Error {
    /// The stable machine-readable code sent over the wire as `{"detail": ...}`.
    pub fn code(self) -> &'static str {
        match self {
            Error::InvalidCredentials => "invalid_credentials",
            Error::TokenExpired => "token_expired",
            Error::TokenRevoked => "token_revoked",
            Error::UsernameNotFound => "username_not_found",
            Error::AlreadyInRound(_) => "already_in_round",
            Error::MaxOutstandingPrompts => "max_outstanding_prompts",
            Error::InsufficientBalance => "insufficient_balance",
            Error::AlreadyClaimedToday => "already_claimed_today",
            Error::NoPromptsAvailable => "no_prompts_available",
            Error::NoWordsetsAvailable => "no_wordsets_available",
            Error::InvalidPhrase => "invalid_phrase",
            Error::DuplicatePhrase => "duplicate_phrase",
            Error::Expired => "expired",
            Error::AlreadyVoted => "already_voted",
            Error::NotAContributor => "not_a_contributor",
            Error::NotFound => "not_found",
            Error::RateLimited => "rate_limited",
            Error::DependencyUnavailable => "dependency_unavailable",
        }
    }

    /// True for errors caused by infra (dependency down), which must surface
    /// as 5xx and roll back the in-flight transaction rather than recover as
    /// a 4xx business error.
    pub fn is_infra(self) -> bool {
        matches!(self, Error::DependencyUnavailable)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
