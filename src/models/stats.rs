//! Stat record types captured from the statistics origin.
//!
//! Rate fields stay as the display strings the origin renders ("12.3%"),
//! so the dashboard shows exactly what the source showed. [`parse_rate`]
//! recovers a numeric value when sorting or aggregation needs one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the three scraped statistics categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Category {
    Agents,
    Maps,
    Weapons,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Agents => "agents",
            Category::Maps => "maps",
            Category::Weapons => "weapons",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agents" => Ok(Category::Agents),
            "maps" => Ok(Category::Maps),
            "weapons" => Ok(Category::Weapons),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common access to the fields every stat record carries.
pub trait StatRecord {
    fn name(&self) -> &str;
    /// The rate field whose presence qualifies the record for retention.
    fn primary_rate(&self) -> &str;
}

/// Weekly per-agent performance numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStat {
    pub agent_name: String,
    pub agent_icon: String,
    pub tier: String,
    pub pick_rate: String,
    pub win_rate: String,
    #[serde(rename = "avgKDA")]
    pub avg_kda: String,
    pub avg_score: String,
    pub avg_damage: String,
}

impl StatRecord for AgentStat {
    fn name(&self) -> &str {
        &self.agent_name
    }

    fn primary_rate(&self) -> &str {
        &self.pick_rate
    }
}

/// Weekly per-map performance numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStat {
    pub map_name: String,
    pub map_icon: String,
    pub pick_rate: String,
    pub win_rate_attack: String,
    pub win_rate_defense: String,
    pub avg_rounds: String,
}

impl StatRecord for MapStat {
    fn name(&self) -> &str {
        &self.map_name
    }

    fn primary_rate(&self) -> &str {
        &self.pick_rate
    }
}

/// Weekly per-weapon performance numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponStat {
    pub weapon_name: String,
    pub weapon_icon: String,
    pub pick_rate: String,
    pub kill_rate: String,
    pub headshot_rate: String,
    pub avg_damage: String,
}

impl StatRecord for WeaponStat {
    fn name(&self) -> &str {
        &self.weapon_name
    }

    fn primary_rate(&self) -> &str {
        &self.pick_rate
    }
}

/// Full captured dataset for one calendar week.
///
/// At most one snapshot exists per week identifier; re-scraping the same
/// week replaces the stored snapshot entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSnapshot {
    pub week: String,
    pub scraped_at: DateTime<Utc>,
    pub agents: Vec<AgentStat>,
    pub maps: Vec<MapStat>,
    pub weapons: Vec<WeaponStat>,
}

impl WeekSnapshot {
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty() && self.maps.is_empty() && self.weapons.is_empty()
    }
}

/// Parse a formatted rate string ("54.2%", "1.08") back to a number.
/// Unparseable input yields 0.0 rather than an error.
pub fn parse_rate(raw: &str) -> f64 {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse()
        .unwrap_or(0.0)
}

/// Sort records by their primary rate, highest first.
pub fn sort_by_rate<T: StatRecord>(records: &mut [T]) {
    records.sort_by(|a, b| {
        parse_rate(b.primary_rate())
            .partial_cmp(&parse_rate(a.primary_rate()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// The `n` records with the highest primary rate.
pub fn top_by_rate<T: StatRecord + Clone>(records: &[T], n: usize) -> Vec<T> {
    let mut sorted = records.to_vec();
    sort_by_rate(&mut sorted);
    sorted.truncate(n);
    sorted
}

/// Mean of the primary rates across a record set, 0.0 when empty.
pub fn average_rate<T: StatRecord>(records: &[T]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let sum: f64 = records.iter().map(|r| parse_rate(r.primary_rate())).sum();
    sum / records.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rate_strips_percent_sign() {
        assert_eq!(parse_rate("54.2%"), 54.2);
        assert_eq!(parse_rate(" 12% "), 12.0);
        assert_eq!(parse_rate("1.08"), 1.08);
    }

    #[test]
    fn parse_rate_defaults_to_zero() {
        assert_eq!(parse_rate(""), 0.0);
        assert_eq!(parse_rate("N/A"), 0.0);
        assert_eq!(parse_rate("%"), 0.0);
    }

    fn agent(name: &str, pick: &str) -> AgentStat {
        AgentStat {
            agent_name: name.to_string(),
            agent_icon: String::new(),
            tier: String::new(),
            pick_rate: pick.to_string(),
            win_rate: "50%".to_string(),
            avg_kda: String::new(),
            avg_score: String::new(),
            avg_damage: String::new(),
        }
    }

    #[test]
    fn top_by_rate_orders_descending() {
        let records = vec![agent("Sage", "9.8%"), agent("Jett", "12.4%"), agent("Omen", "8%")];

        let top = top_by_rate(&records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].agent_name, "Jett");
        assert_eq!(top[1].agent_name, "Sage");
    }

    #[test]
    fn average_rate_handles_empty_sets() {
        let records: Vec<AgentStat> = vec![];
        assert_eq!(average_rate(&records), 0.0);

        let records = vec![agent("Jett", "10%"), agent("Sage", "20%")];
        assert_eq!(average_rate(&records), 15.0);
    }

    #[test]
    fn category_round_trips_through_str() {
        for cat in [Category::Agents, Category::Maps, Category::Weapons] {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert!("players".parse::<Category>().is_err());
    }

    #[test]
    fn snapshot_serializes_with_source_field_names() {
        let snapshot = WeekSnapshot {
            week: "2024-W02".to_string(),
            scraped_at: Utc::now(),
            agents: vec![AgentStat {
                agent_name: "Jett".to_string(),
                agent_icon: String::new(),
                tier: "Duelist".to_string(),
                pick_rate: "12.3%".to_string(),
                win_rate: "50.1%".to_string(),
                avg_kda: "1.2".to_string(),
                avg_score: "240".to_string(),
                avg_damage: "150".to_string(),
            }],
            maps: vec![],
            weapons: vec![],
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["agents"][0]["agentName"], "Jett");
        assert_eq!(json["agents"][0]["pickRate"], "12.3%");
        assert_eq!(json["agents"][0]["avgKDA"], "1.2");
        assert!(json.get("scrapedAt").is_some());
    }
}
