use std::time::Duration;

/// Global economic and timing configuration, built once at process startup
/// from the environment and handed around as an `Arc<Config>`.
#[derive(Clone, Debug)]
pub struct Config {
    pub starting_balance: i64,
    pub daily_bonus: i64,
    pub prompt_cost: i64,
    pub copy_cost_normal: i64,
    pub copy_cost_discount: i64,
    pub vote_cost: i64,
    pub correct_vote_payout: i64,
    pub base_prize_pool: i64,
    pub copy_discount_queue_threshold: i64,
    pub max_outstanding_prompts: i64,
    pub prompt_window: Duration,
    pub copy_window: Duration,
    pub vote_window: Duration,
    pub grace_band: Duration,
    pub third_vote_window: Duration,
    pub fifth_vote_rapid_window: Duration,
    pub max_votes: i32,
    pub min_votes_to_close: i32,
    pub abandoned_assignment_cooldown: Duration,
    pub similarity_threshold: f32,
    pub prompt_timeout_penalty: i64,
    pub copy_timeout_penalty: i64,
    pub sweep_interval: Duration,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl Default for Config {
    /// Production defaults.
    fn default() -> Self {
        Config {
            starting_balance: 1000,
            daily_bonus: 100,
            prompt_cost: 100,
            copy_cost_normal: 100,
            copy_cost_discount: 90,
            vote_cost: 1,
            correct_vote_payout: 5,
            base_prize_pool: 300,
            copy_discount_queue_threshold: 10,
            max_outstanding_prompts: 10,
            prompt_window: Duration::from_secs(180),
            copy_window: Duration::from_secs(180),
            vote_window: Duration::from_secs(60),
            grace_band: Duration::from_secs(5),
            third_vote_window: Duration::from_secs(600),
            fifth_vote_rapid_window: Duration::from_secs(60),
            max_votes: 20,
            min_votes_to_close: 3,
            abandoned_assignment_cooldown: Duration::from_secs(24 * 3600),
            similarity_threshold: 0.85,
            prompt_timeout_penalty: 10,
            copy_timeout_penalty: 10,
            sweep_interval: Duration::from_secs(5),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(30 * 24 * 3600),
        }
    }
}

impl Config {
    /// The per-copy-round system contribution implied by paying the discount
    /// price (glossary: "system contribution").
    pub fn system_contribution(&self) -> i64 {
        self.copy_cost_normal - self.copy_cost_discount
    }
}
