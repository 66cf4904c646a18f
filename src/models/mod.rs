//! Domain models for scraped weekly statistics.

mod stats;

pub use stats::{
    average_rate, parse_rate, sort_by_rate, top_by_rate, AgentStat, Category, MapStat,
    StatRecord, WeaponStat, WeekSnapshot,
};
