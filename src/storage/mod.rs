mod counters;
mod db;

pub use counters::CARDS_VIEWED_KEY;
pub use db::Database;
