//! Pure phraseset timeline transitions, factored out of the storage-touching
//! engine code so the decision logic is testable without a database.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::types::PhrasesetStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineState {
    pub status: PhrasesetStatus,
    pub vote_count: i32,
    pub third_vote_at: Option<DateTime<Utc>>,
    pub fifth_vote_at: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
}

/// Apply the effect of one newly-accepted vote to the timeline. Caller has
/// already verified `vote_count < max_votes` before accepting the vote.
pub fn record_vote(state: &mut TimelineState, now: DateTime<Utc>, cfg: &Config) {
    state.vote_count += 1;

    if state.vote_count == cfg.min_votes_to_close {
        state.third_vote_at = Some(now);
    }

    if state.vote_count == 5 && state.status == PhrasesetStatus::Open {
        state.fifth_vote_at = Some(now);
        state.status = PhrasesetStatus::Closing;
        state.closes_at = Some(now + cfg.fifth_vote_rapid_window);
    }

    if state.vote_count as i64 >= cfg.max_votes as i64 {
        // The cap is absolute: no further vote can ever be accepted once hit,
        // so there is nothing left for "closing" to wait on.
        state.status = PhrasesetStatus::Closed;
        state.closes_at = Some(now);
    }
}

/// Idle-timeout transition: 10 minutes since the 3rd vote with no 5th vote
/// yet. Checked by the sweeper and lazily on read, never by `record_vote`.
pub fn check_idle_timeout(state: &mut TimelineState, now: DateTime<Utc>, cfg: &Config) -> bool {
    if state.status != PhrasesetStatus::Open {
        return false;
    }
    let Some(third) = state.third_vote_at else {
        return false;
    };
    if now >= third + cfg.third_vote_window {
        state.status = PhrasesetStatus::Closing;
        state.closes_at = Some(now);
        return true;
    }
    false
}

/// Whether a `closing` phraseset may transition to `closed`: its deadline
/// has passed and no voter holds a grace-hold on it.
pub fn can_close(closes_at: Option<DateTime<Utc>>, now: DateTime<Utc>, has_grace_holds: bool) -> bool {
    match closes_at {
        Some(t) => now >= t && !has_grace_holds,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn cfg() -> Config {
        Config::default()
    }

    fn base(_now: DateTime<Utc>) -> TimelineState {
        TimelineState {
            status: PhrasesetStatus::Open,
            vote_count: 0,
            third_vote_at: None,
            fifth_vote_at: None,
            closes_at: None,
        }
    }

    #[test]
    fn third_vote_sets_timestamp_and_stays_open() {
        let now = Utc::now();
        let mut s = base(now);
        for _ in 0..3 {
            record_vote(&mut s, now, &cfg());
        }
        assert_eq!(s.status, PhrasesetStatus::Open);
        assert_eq!(s.third_vote_at, Some(now));
    }

    #[test]
    fn fifth_vote_closes_with_rapid_window() {
        let now = Utc::now();
        let mut s = base(now);
        for _ in 0..5 {
            record_vote(&mut s, now, &cfg());
        }
        assert_eq!(s.status, PhrasesetStatus::Closing);
        assert_eq!(s.fifth_vote_at, Some(now));
        assert_eq!(s.closes_at, Some(now + Duration::seconds(60)));
    }

    #[test]
    fn twentieth_vote_closes_immediately() {
        let now = Utc::now();
        let mut s = base(now);
        for _ in 0..20 {
            record_vote(&mut s, now, &cfg());
        }
        assert_eq!(s.status, PhrasesetStatus::Closed);
        assert_eq!(s.vote_count, 20);
    }

    #[test]
    fn idle_timeout_closes_without_fifth_vote() {
        let now = Utc::now();
        let mut s = base(now);
        for _ in 0..3 {
            record_vote(&mut s, now, &cfg());
        }
        let later = now + Duration::seconds(601);
        assert!(check_idle_timeout(&mut s, later, &cfg()));
        assert_eq!(s.status, PhrasesetStatus::Closing);
        assert_eq!(s.fifth_vote_at, None);
    }

    #[test]
    fn idle_timeout_does_not_fire_before_window() {
        let now = Utc::now();
        let mut s = base(now);
        for _ in 0..3 {
            record_vote(&mut s, now, &cfg());
        }
        let soon = now + Duration::seconds(599);
        assert!(!check_idle_timeout(&mut s, soon, &cfg()));
        assert_eq!(s.status, PhrasesetStatus::Open);
    }

    #[test]
    fn can_close_waits_for_grace_holds() {
        let now = Utc::now();
        assert!(!can_close(Some(now), now, true));
        assert!(can_close(Some(now), now, false));
        assert!(!can_close(None, now, false));
    }
}
