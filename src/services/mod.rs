//! Clients for external stat services.

mod leaderboard;

pub use leaderboard::{Agent, AgentRole, LeaderboardClient, TopPlayer};
