//! End-to-end scenarios against a real Postgres schema, exercising the
//! engine modules together the way a request sequence would.

use std::time::Duration as StdDuration;

use chrono::Utc;
use quipflip_core::prompts::WordListPromptSource;
use quipflip_core::similarity::TrigramCosineModel;
use quipflip_core::types::{PhrasesetId, PhrasesetStatus, PlayerId, RoundRole};
use quipflip_core::validator::WordSetDictionary;
use quipflip_core::Config;
use quipflip_engine::round::{self, Engine, SubmitOutcome};
use quipflip_engine::{player, queue, results, sweeper, vote, Locks};
use sqlx::PgPool;
use uuid::Uuid;

const WORDS: &[&str] = &[
    "FAMOUS", "ACTOR", "WEALTHY", "SINGER", "POPULAR", "ARTIST", "QUICK", "ATHLETE", "WRITER",
    "RUNNER", "FAST", "STAR", "DOG", "CAT", "BIRD", "LION", "TIGER", "HAWK", "WOLF", "BEAR",
];

fn base_config() -> Config {
    Config {
        grace_band: StdDuration::from_millis(10),
        vote_window: StdDuration::from_millis(50),
        fifth_vote_rapid_window: StdDuration::from_millis(20),
        ..Config::default()
    }
}

fn engine_with(pool: PgPool, cfg: Config) -> Engine {
    Engine {
        pool,
        config: cfg,
        locks: Locks::default(),
        dictionary: Box::new(WordSetDictionary::from_words(
            WORDS.iter().map(|w| w.to_string()),
        )),
        similarity: Box::new(TrigramCosineModel),
        prompts: Box::new(WordListPromptSource::from_lines(["FAMOUS ACTOR".to_string()])),
    }
}

async fn register(pool: &PgPool, cfg: &Config, name: &str) -> PlayerId {
    player::register(pool, cfg, name, &format!("{name}@example.com"), "hunter2")
        .await
        .unwrap()
        .player
        .player_id
}

async fn latest_phraseset_id(pool: &PgPool) -> PhrasesetId {
    let id: Uuid = sqlx::query_scalar("SELECT phraseset_id FROM phrasesets ORDER BY created_at DESC LIMIT 1")
        .fetch_one(pool)
        .await
        .unwrap();
    PhrasesetId(id)
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn happy_path_phraseset_and_claim(pool: PgPool) {
    let cfg = base_config();
    let engine = engine_with(pool.clone(), cfg.clone());

    let prompter = register(&pool, &cfg, "prompter").await;
    let copier1 = register(&pool, &cfg, "copier1").await;
    let copier2 = register(&pool, &cfg, "copier2").await;

    let prompt_round = round::start_prompt_round(&engine, prompter).await.unwrap();
    assert_eq!(prompt_round.role, RoundRole::Prompt);
    round::submit(&engine, prompter, prompt_round.round_id, "FAMOUS ACTOR")
        .await
        .unwrap();

    let copy_round_1 = round::start_copy_round(&engine, copier1).await.unwrap();
    let outcome1 = round::submit(&engine, copier1, copy_round_1.round_id, "WEALTHY SINGER")
        .await
        .unwrap();
    assert!(matches!(outcome1, SubmitOutcome::Copy { phraseset_created: false }));

    let copy_round_2 = round::start_copy_round(&engine, copier2).await.unwrap();
    let outcome2 = round::submit(&engine, copier2, copy_round_2.round_id, "POPULAR ARTIST")
        .await
        .unwrap();
    assert!(matches!(outcome2, SubmitOutcome::Copy { phraseset_created: true }));

    let phraseset_id = latest_phraseset_id(&pool).await;

    let ballots = [
        "FAMOUS ACTOR",
        "FAMOUS ACTOR",
        "FAMOUS ACTOR",
        "FAMOUS ACTOR",
        "WEALTHY SINGER",
        "WEALTHY SINGER",
        "WEALTHY SINGER",
        "POPULAR ARTIST",
        "POPULAR ARTIST",
        "POPULAR ARTIST",
    ];
    for (i, phrase) in ballots.iter().enumerate() {
        let voter = register(&pool, &cfg, &format!("voter{i}")).await;
        let vote_round = round::start_vote_round(&engine, voter).await.unwrap();
        vote::cast_vote(&pool, &engine.locks, &cfg, voter, &vote_round, phrase)
            .await
            .unwrap();
    }

    // The 10 vote rounds are still `active` (grace holds); let them expire
    // and let the phraseset's closing deadline pass, then sweep.
    tokio::time::sleep(cfg.vote_window + cfg.grace_band + StdDuration::from_millis(50)).await;
    sweeper::sweep_once(&engine).await;

    let phraseset = quipflip_db::phrasesets::get_by_id(&pool, phraseset_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Finalized);
    assert_eq!(phraseset.total_pool, 300);

    let prompter_result = quipflip_db::results::get(&pool, phraseset_id, prompter)
        .await
        .unwrap()
        .unwrap();
    let copier1_result = quipflip_db::results::get(&pool, phraseset_id, copier1)
        .await
        .unwrap()
        .unwrap();
    let copier2_result = quipflip_db::results::get(&pool, phraseset_id, copier2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(prompter_result.payout_amount, 70);
    assert_eq!(copier1_result.payout_amount, 105);
    assert_eq!(copier2_result.payout_amount, 105);

    let claim = results::claim(&pool, &engine.locks, phraseset_id, prompter).await.unwrap();
    assert_eq!(claim.amount, 70);
    assert!(!claim.already_claimed);
    let claim_again = results::claim(&pool, &engine.locks, phraseset_id, prompter).await.unwrap();
    assert!(claim_again.already_claimed);
    assert_eq!(claim_again.amount, 70);
    assert!(claim_again.new_balance.is_none());
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn copy_abandon_reassigns_prompt(pool: PgPool) {
    let cfg = base_config();
    let engine = engine_with(pool.clone(), cfg.clone());

    let prompter = register(&pool, &cfg, "prompter").await;
    let copier1 = register(&pool, &cfg, "copier1").await;
    let copier2 = register(&pool, &cfg, "copier2").await;
    let copier3 = register(&pool, &cfg, "copier3").await;

    let prompt_round = round::start_prompt_round(&engine, prompter).await.unwrap();
    round::submit(&engine, prompter, prompt_round.round_id, "FAMOUS ACTOR")
        .await
        .unwrap();

    let abandoning_round = round::start_copy_round(&engine, copier1).await.unwrap();
    round::apply_timeout(&engine, &abandoning_round).await.unwrap();

    // copier1 is on cooldown for the prompt it just abandoned, and nothing
    // else is queued, so a second attempt finds no eligible prompt.
    let retry = round::start_copy_round(&engine, copier1).await;
    assert!(matches!(retry, Err(quipflip_core::Error::NoPromptsAvailable)));

    let copy_round_2 = round::start_copy_round(&engine, copier2).await.unwrap();
    let outcome = round::submit(&engine, copier2, copy_round_2.round_id, "WEALTHY SINGER")
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Copy { phraseset_created: false }));

    let copy_round_3 = round::start_copy_round(&engine, copier3).await.unwrap();
    let outcome = round::submit(&engine, copier3, copy_round_3.round_id, "POPULAR ARTIST")
        .await
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Copy { phraseset_created: true }));
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn discount_activates_once_queue_threshold_exceeded(pool: PgPool) {
    let mut cfg = base_config();
    cfg.copy_discount_queue_threshold = 2;
    let engine = engine_with(pool.clone(), cfg.clone());

    for i in 0..3 {
        let prompter = register(&pool, &cfg, &format!("prompter{i}")).await;
        let prompt_round = round::start_prompt_round(&engine, prompter).await.unwrap();
        round::submit(&engine, prompter, prompt_round.round_id, "FAMOUS ACTOR")
            .await
            .unwrap();
    }

    assert_eq!(queue::prompt_queue_depth(&pool).await.unwrap(), 3);
    assert!(queue::is_discount_active(&pool, &cfg).await.unwrap());

    let copier = register(&pool, &cfg, "copier").await;
    let balance_before = quipflip_db::players::get_by_id(&pool, copier)
        .await
        .unwrap()
        .unwrap()
        .balance;
    let copy_round = round::start_copy_round(&engine, copier).await.unwrap();
    assert_eq!(copy_round.cost, cfg.copy_cost_discount);
    assert_eq!(copy_round.system_contribution, cfg.system_contribution());

    let balance_after = quipflip_db::players::get_by_id(&pool, copier)
        .await
        .unwrap()
        .unwrap()
        .balance;
    assert_eq!(balance_before - balance_after, cfg.copy_cost_discount);
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn outstanding_prompt_cap_blocks_further_prompts(pool: PgPool) {
    let mut cfg = base_config();
    cfg.max_outstanding_prompts = 1;
    let engine = engine_with(pool.clone(), cfg.clone());

    let prompter = register(&pool, &cfg, "prompter").await;
    let copier1 = register(&pool, &cfg, "copier1").await;
    let copier2 = register(&pool, &cfg, "copier2").await;

    let prompt_round = round::start_prompt_round(&engine, prompter).await.unwrap();
    round::submit(&engine, prompter, prompt_round.round_id, "FAMOUS ACTOR")
        .await
        .unwrap();

    let copy_round_1 = round::start_copy_round(&engine, copier1).await.unwrap();
    round::submit(&engine, copier1, copy_round_1.round_id, "WEALTHY SINGER")
        .await
        .unwrap();
    let copy_round_2 = round::start_copy_round(&engine, copier2).await.unwrap();
    round::submit(&engine, copier2, copy_round_2.round_id, "POPULAR ARTIST")
        .await
        .unwrap();

    // The prompter's phraseset is now open, pinning one outstanding slot.
    let second_attempt = round::start_prompt_round(&engine, prompter).await;
    assert!(matches!(
        second_attempt,
        Err(quipflip_core::Error::MaxOutstandingPrompts)
    ));
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn insufficient_balance_blocks_round_start(pool: PgPool) {
    let cfg = base_config();
    let engine = engine_with(pool.clone(), cfg.clone());

    let player_id = register(&pool, &cfg, "broke").await;
    quipflip_db::players::set_balance(&pool, player_id, 0).await.unwrap();

    let result = round::start_prompt_round(&engine, player_id).await;
    assert!(matches!(result, Err(quipflip_core::Error::InsufficientBalance)));
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn daily_bonus_requires_a_day_since_registration(pool: PgPool) {
    let cfg = base_config();
    let player_id = register(&pool, &cfg, "newbie").await;

    // Freshly registered: last_login_date == creation_date, so the bonus
    // is not yet available.
    let player = quipflip_db::players::get_by_id(&pool, player_id).await.unwrap().unwrap();
    assert!(!player::daily_bonus_available(&player, Utc::now()));
    let claim_attempt = player::claim_daily_bonus(&pool, &Locks::default(), &cfg, player_id).await;
    assert!(matches!(claim_attempt, Err(quipflip_core::Error::AlreadyClaimedToday)));

    // Back-date the login so tomorrow's calendar date clears the invariant.
    let yesterday = (Utc::now() - chrono::Duration::days(1)).date_naive();
    quipflip_db::players::set_last_login_date(&pool, player_id, yesterday)
        .await
        .unwrap();
    sqlx::query("UPDATE players SET creation_date = $1 WHERE player_id = $2")
        .bind(yesterday - chrono::Duration::days(1))
        .bind(player_id.0)
        .execute(&pool)
        .await
        .unwrap();

    let balance_before = quipflip_db::players::get_by_id(&pool, player_id)
        .await
        .unwrap()
        .unwrap()
        .balance;
    let new_balance = player::claim_daily_bonus(&pool, &Locks::default(), &cfg, player_id)
        .await
        .unwrap();
    assert_eq!(new_balance, balance_before + cfg.daily_bonus);

    let second_claim = player::claim_daily_bonus(&pool, &Locks::default(), &cfg, player_id).await;
    assert!(matches!(second_claim, Err(quipflip_core::Error::AlreadyClaimedToday)));
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn login_advances_stale_last_login_date(pool: PgPool) {
    let cfg = base_config();
    let player_id = register(&pool, &cfg, "returning").await;

    // Simulate an account that registered a few days ago and was never
    // touched since: last_login_date still pinned at creation_date, exactly
    // as registration leaves it.
    let three_days_ago = (Utc::now() - chrono::Duration::days(3)).date_naive();
    quipflip_db::players::set_last_login_date(&pool, player_id, three_days_ago)
        .await
        .unwrap();
    sqlx::query("UPDATE players SET creation_date = $1 WHERE player_id = $2")
        .bind(three_days_ago)
        .bind(player_id.0)
        .execute(&pool)
        .await
        .unwrap();

    let stale = quipflip_db::players::get_by_id(&pool, player_id).await.unwrap().unwrap();
    assert_eq!(stale.last_login_date, stale.creation_date);

    quipflip_engine::auth::login(&pool, &cfg, "test-secret", "returning", "hunter2")
        .await
        .unwrap();

    let refreshed = quipflip_db::players::get_by_id(&pool, player_id).await.unwrap().unwrap();
    assert_eq!(refreshed.last_login_date, Utc::now().date_naive());
    assert!(refreshed.last_login_date > refreshed.creation_date);
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn already_in_round_reports_the_active_round_id(pool: PgPool) {
    let cfg = base_config();
    let engine = engine_with(pool.clone(), cfg.clone());

    let prompter = register(&pool, &cfg, "prompter").await;
    let first = round::start_prompt_round(&engine, prompter).await.unwrap();

    let second = round::start_prompt_round(&engine, prompter).await;
    match second {
        Err(quipflip_core::Error::AlreadyInRound(round_id)) => {
            assert_eq!(round_id, first.round_id);
        }
        other => panic!("expected AlreadyInRound({:?}), got {other:?}", first.round_id),
    }
}

#[sqlx::test(migrations = "../quipflip-db/migrations")]
async fn idle_phraseset_closes_without_a_fifth_vote(pool: PgPool) {
    let mut cfg = base_config();
    cfg.third_vote_window = StdDuration::from_millis(30);
    let engine = engine_with(pool.clone(), cfg.clone());

    let prompter = register(&pool, &cfg, "prompter").await;
    let copier1 = register(&pool, &cfg, "copier1").await;
    let copier2 = register(&pool, &cfg, "copier2").await;

    let prompt_round = round::start_prompt_round(&engine, prompter).await.unwrap();
    round::submit(&engine, prompter, prompt_round.round_id, "FAMOUS ACTOR")
        .await
        .unwrap();
    let copy_round_1 = round::start_copy_round(&engine, copier1).await.unwrap();
    round::submit(&engine, copier1, copy_round_1.round_id, "WEALTHY SINGER")
        .await
        .unwrap();
    let copy_round_2 = round::start_copy_round(&engine, copier2).await.unwrap();
    round::submit(&engine, copier2, copy_round_2.round_id, "POPULAR ARTIST")
        .await
        .unwrap();

    let phraseset_id = latest_phraseset_id(&pool).await;

    // Exactly three votes: enough to set `third_vote_at`, not enough to
    // trigger the rapid-window close on a fifth vote.
    for (i, phrase) in ["FAMOUS ACTOR", "WEALTHY SINGER", "POPULAR ARTIST"].iter().enumerate() {
        let voter = register(&pool, &cfg, &format!("voter{i}")).await;
        let vote_round = round::start_vote_round(&engine, voter).await.unwrap();
        vote::cast_vote(&pool, &engine.locks, &cfg, voter, &vote_round, phrase)
            .await
            .unwrap();
    }

    let phraseset = quipflip_db::phrasesets::get_by_id(&pool, phraseset_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Open);
    assert_eq!(phraseset.vote_count, 3);

    // Let the three vote rounds' grace holds expire and the idle window
    // since the third vote lapse, then let the sweeper pick it up.
    tokio::time::sleep(cfg.vote_window + cfg.grace_band + cfg.third_vote_window + StdDuration::from_millis(50)).await;
    sweeper::sweep_once(&engine).await;

    let phraseset = quipflip_db::phrasesets::get_by_id(&pool, phraseset_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(phraseset.status, PhrasesetStatus::Finalized);
    assert_eq!(phraseset.vote_count, 3);
    assert!(phraseset.fifth_vote_at.is_none());
}
