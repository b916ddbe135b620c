//! Postgres repository layer. Row structs mirror table columns exactly;
//! domain types (from `quipflip_core::types`) are reached only through the
//! `From` conversions in each module, never constructed straight from SQL.

pub mod abandoned;
pub mod daily_bonus;
pub mod phrasesets;
pub mod players;
pub mod pool;
pub mod results;
pub mod rounds;
pub mod sessions;
pub mod transactions;
pub mod votes;

pub use pool::{connect, migrate};
pub use sqlx::{PgPool, Postgres, Transaction};
