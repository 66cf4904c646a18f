//! Thin clients for the roster and leaderboard services.
//!
//! These are plain request/response wrappers over external JSON APIs; no
//! retry or transform logic lives here. Both services answer with a
//! `{status, data}` envelope.

use serde::Deserialize;
use tracing::debug;

const ROSTER_API_BASE: &str = "https://valorant-api.com/v1";

/// Response envelope shared by both services.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: u16,
    data: Option<T>,
}

/// An agent's role as reported by the roster service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRole {
    pub uuid: String,
    pub display_name: String,
    pub display_icon: String,
}

/// One playable agent from the roster service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub uuid: String,
    pub display_name: String,
    pub description: String,
    pub display_icon: String,
    pub role: Option<AgentRole>,
}

/// One ranked player from the leaderboard service.
#[derive(Debug, Clone, Deserialize)]
pub struct TopPlayer {
    pub puuid: String,
    pub name: String,
    pub tag: String,
    pub leaderboard_rank: u32,
    pub tier: u32,
    pub rr: i64,
    pub wins: u32,
}

#[derive(Debug, Deserialize)]
struct LeaderboardData {
    players: Vec<TopPlayer>,
}

/// API-key-authenticated client for third-party stat lookups.
pub struct LeaderboardClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LeaderboardClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch the playable agent roster.
    pub async fn agent_roster(&self) -> anyhow::Result<Vec<Agent>> {
        let url = format!("{ROSTER_API_BASE}/agents?isPlayableCharacter=true");
        debug!("fetching agent roster from {url}");

        let envelope: Envelope<Vec<Agent>> =
            self.client.get(&url).send().await?.json().await?;

        if envelope.status != 200 {
            anyhow::bail!("roster service answered status {}", envelope.status);
        }
        Ok(envelope.data.unwrap_or_default())
    }

    /// Fetch the top ranked players for a region.
    pub async fn top_players(&self, region: &str, size: usize) -> anyhow::Result<Vec<TopPlayer>> {
        let url = format!("{}/v3/leaderboard/{region}/pc?size={size}", self.base_url);
        debug!("fetching leaderboard from {url}");

        let envelope: Envelope<LeaderboardData> = self
            .client
            .get(&url)
            .header("Authorization", &self.api_key)
            .send()
            .await?
            .json()
            .await?;

        if envelope.status != 200 {
            anyhow::bail!("leaderboard service answered status {}", envelope.status);
        }
        Ok(envelope.data.map(|d| d.players).unwrap_or_default())
    }
}
