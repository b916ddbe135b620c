pub mod auth;
pub mod ledger;
pub mod locks;
pub mod player;
pub mod queue;
pub mod results;
pub mod round;
pub mod sweeper;
pub mod vote;

pub use locks::Locks;
pub use round::Engine;
