//! Weekly statistics repository.
//!
//! All persisted state is partitioned by week identifier: one snapshot row
//! per week plus three flattened per-category tables. Saves use replace
//! semantics (delete the week's rows, insert the new set) inside a single
//! transaction per table, which makes re-running a scrape for the same
//! week idempotent.
//!
//! Failure policy follows the split between ingestion and serving: write
//! errors propagate so a scrape run knows persistence failed; read errors
//! are logged and degrade to empty results so the API stays available.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{info, warn};

use super::{connect, to_option, Result};
use crate::error::StoreError;
use crate::models::{AgentStat, Category, MapStat, WeaponStat, WeekSnapshot};

/// SQLite-backed store for weekly stat snapshots.
pub struct StatsRepository {
    db_path: PathBuf,
}

impl StatsRepository {
    /// Open (creating if needed) the stats database.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                week TEXT PRIMARY KEY,
                scraped_at TEXT NOT NULL,
                agents TEXT NOT NULL,
                maps TEXT NOT NULL,
                weapons TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS agent_stats (
                week TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT NOT NULL,
                tier TEXT NOT NULL,
                pick_rate TEXT NOT NULL,
                win_rate TEXT NOT NULL,
                avg_kda TEXT NOT NULL,
                avg_score TEXT NOT NULL,
                avg_damage TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS map_stats (
                week TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT NOT NULL,
                pick_rate TEXT NOT NULL,
                win_rate_attack TEXT NOT NULL,
                win_rate_defense TEXT NOT NULL,
                avg_rounds TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS weapon_stats (
                week TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT NOT NULL,
                pick_rate TEXT NOT NULL,
                kill_rate TEXT NOT NULL,
                headshot_rate TEXT NOT NULL,
                avg_damage TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Create the lookup indexes. Idempotent.
    pub fn ensure_indexes(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_snapshots_week ON snapshots(week);
            CREATE INDEX IF NOT EXISTS idx_snapshots_scraped_at ON snapshots(scraped_at DESC);
            CREATE INDEX IF NOT EXISTS idx_agent_stats_week_name ON agent_stats(week, name);
            CREATE INDEX IF NOT EXISTS idx_map_stats_week_name ON map_stats(week, name);
            CREATE INDEX IF NOT EXISTS idx_weapon_stats_week_name ON weapon_stats(week, name);
        "#,
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Writes (errors propagate)
    // ------------------------------------------------------------------

    /// Replace the stored snapshot for this snapshot's week.
    pub fn save_snapshot(&self, snapshot: &WeekSnapshot) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM snapshots WHERE week = ?",
            params![snapshot.week],
        )?;
        tx.execute(
            "INSERT INTO snapshots (week, scraped_at, agents, maps, weapons)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.week,
                snapshot.scraped_at.to_rfc3339(),
                serde_json::to_string(&snapshot.agents)?,
                serde_json::to_string(&snapshot.maps)?,
                serde_json::to_string(&snapshot.weapons)?,
            ],
        )?;

        tx.commit()?;
        info!("saved snapshot for week {}", snapshot.week);
        Ok(())
    }

    /// Replace the stored agent records for a week.
    pub fn save_agents(&self, agents: &[AgentStat], week: &str) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute("DELETE FROM agent_stats WHERE week = ?", params![week])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO agent_stats
                 (week, name, icon, tier, pick_rate, win_rate, avg_kda, avg_score, avg_damage, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for agent in agents {
                stmt.execute(params![
                    week,
                    agent.agent_name,
                    agent.agent_icon,
                    agent.tier,
                    agent.pick_rate,
                    agent.win_rate,
                    agent.avg_kda,
                    agent.avg_score,
                    agent.avg_damage,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        info!("saved {} agent records for week {week}", agents.len());
        Ok(())
    }

    /// Replace the stored map records for a week.
    pub fn save_maps(&self, maps: &[MapStat], week: &str) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute("DELETE FROM map_stats WHERE week = ?", params![week])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO map_stats
                 (week, name, icon, pick_rate, win_rate_attack, win_rate_defense, avg_rounds, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for map in maps {
                stmt.execute(params![
                    week,
                    map.map_name,
                    map.map_icon,
                    map.pick_rate,
                    map.win_rate_attack,
                    map.win_rate_defense,
                    map.avg_rounds,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        info!("saved {} map records for week {week}", maps.len());
        Ok(())
    }

    /// Replace the stored weapon records for a week.
    pub fn save_weapons(&self, weapons: &[WeaponStat], week: &str) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute("DELETE FROM weapon_stats WHERE week = ?", params![week])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO weapon_stats
                 (week, name, icon, pick_rate, kill_rate, headshot_rate, avg_damage, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for weapon in weapons {
                stmt.execute(params![
                    week,
                    weapon.weapon_name,
                    weapon.weapon_icon,
                    weapon.pick_rate,
                    weapon.kill_rate,
                    weapon.headshot_rate,
                    weapon.avg_damage,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        info!("saved {} weapon records for week {week}", weapons.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads (errors degrade to empty results)
    // ------------------------------------------------------------------

    /// Most recently captured snapshot, if any.
    pub fn get_latest(&self) -> Option<WeekSnapshot> {
        match self.try_get_latest() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("failed to read latest snapshot: {err}");
                None
            }
        }
    }

    fn try_get_latest(&self) -> Result<Option<WeekSnapshot>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT week, scraped_at, agents, maps, weapons
             FROM snapshots ORDER BY scraped_at DESC LIMIT 1",
        )?;

        let row = to_option(stmt.query_row([], |row| {
            Ok((
                row.get::<_, String>("week")?,
                row.get::<_, String>("scraped_at")?,
                row.get::<_, String>("agents")?,
                row.get::<_, String>("maps")?,
                row.get::<_, String>("weapons")?,
            ))
        }))?;

        row.map(|(week, scraped_at, agents, maps, weapons)| {
            Ok::<_, StoreError>(WeekSnapshot {
                week,
                scraped_at: parse_datetime(&scraped_at),
                agents: serde_json::from_str(&agents)?,
                maps: serde_json::from_str(&maps)?,
                weapons: serde_json::from_str(&weapons)?,
            })
        })
        .transpose()
    }

    /// Agent records for a week, or for the most recent stored week.
    pub fn get_agents(&self, week: Option<&str>) -> Vec<AgentStat> {
        self.read_or_empty(Category::Agents, || self.try_get_agents(week))
    }

    fn try_get_agents(&self, week: Option<&str>) -> Result<Vec<AgentStat>> {
        let conn = self.connect()?;
        let week = match self.resolve_week(&conn, "agent_stats", week)? {
            Some(week) => week,
            None => return Ok(Vec::new()),
        };

        let mut stmt = conn.prepare(
            "SELECT name, icon, tier, pick_rate, win_rate, avg_kda, avg_score, avg_damage
             FROM agent_stats WHERE week = ?",
        )?;
        let records = stmt
            .query_map(params![week], |row| {
                Ok(AgentStat {
                    agent_name: row.get("name")?,
                    agent_icon: row.get("icon")?,
                    tier: row.get("tier")?,
                    pick_rate: row.get("pick_rate")?,
                    win_rate: row.get("win_rate")?,
                    avg_kda: row.get("avg_kda")?,
                    avg_score: row.get("avg_score")?,
                    avg_damage: row.get("avg_damage")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Map records for a week, or for the most recent stored week.
    pub fn get_maps(&self, week: Option<&str>) -> Vec<MapStat> {
        self.read_or_empty(Category::Maps, || self.try_get_maps(week))
    }

    fn try_get_maps(&self, week: Option<&str>) -> Result<Vec<MapStat>> {
        let conn = self.connect()?;
        let week = match self.resolve_week(&conn, "map_stats", week)? {
            Some(week) => week,
            None => return Ok(Vec::new()),
        };

        let mut stmt = conn.prepare(
            "SELECT name, icon, pick_rate, win_rate_attack, win_rate_defense, avg_rounds
             FROM map_stats WHERE week = ?",
        )?;
        let records = stmt
            .query_map(params![week], |row| {
                Ok(MapStat {
                    map_name: row.get("name")?,
                    map_icon: row.get("icon")?,
                    pick_rate: row.get("pick_rate")?,
                    win_rate_attack: row.get("win_rate_attack")?,
                    win_rate_defense: row.get("win_rate_defense")?,
                    avg_rounds: row.get("avg_rounds")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Weapon records for a week, or for the most recent stored week.
    pub fn get_weapons(&self, week: Option<&str>) -> Vec<WeaponStat> {
        self.read_or_empty(Category::Weapons, || self.try_get_weapons(week))
    }

    fn try_get_weapons(&self, week: Option<&str>) -> Result<Vec<WeaponStat>> {
        let conn = self.connect()?;
        let week = match self.resolve_week(&conn, "weapon_stats", week)? {
            Some(week) => week,
            None => return Ok(Vec::new()),
        };

        let mut stmt = conn.prepare(
            "SELECT name, icon, pick_rate, kill_rate, headshot_rate, avg_damage
             FROM weapon_stats WHERE week = ?",
        )?;
        let records = stmt
            .query_map(params![week], |row| {
                Ok(WeaponStat {
                    weapon_name: row.get("name")?,
                    weapon_icon: row.get("icon")?,
                    pick_rate: row.get("pick_rate")?,
                    kill_rate: row.get("kill_rate")?,
                    headshot_rate: row.get("headshot_rate")?,
                    avg_damage: row.get("avg_damage")?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// All stored week identifiers, most recent first.
    ///
    /// Descending lexicographic order is chronological because the
    /// identifier format is fixed-width.
    pub fn list_weeks(&self) -> Vec<String> {
        let result = (|| -> Result<Vec<String>> {
            let conn = self.connect()?;
            let mut stmt =
                conn.prepare("SELECT DISTINCT week FROM snapshots ORDER BY week DESC")?;
            let weeks = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(weeks)
        })();

        match result {
            Ok(weeks) => weeks,
            Err(err) => {
                warn!("failed to list weeks: {err}");
                Vec::new()
            }
        }
    }

    /// Stored record counts for a week, per category.
    pub fn category_counts(&self, week: &str) -> (usize, usize, usize) {
        let count = |table: &str| -> usize {
            let result = (|| -> Result<usize> {
                let conn = self.connect()?;
                let n: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE week = ?"),
                    params![week],
                    |row| row.get(0),
                )?;
                Ok(n as usize)
            })();
            result.unwrap_or_else(|err| {
                warn!("failed to count {table} rows: {err}");
                0
            })
        };

        (
            count("agent_stats"),
            count("map_stats"),
            count("weapon_stats"),
        )
    }

    /// When no week is given, pin the query to the newest week present so
    /// results never mix weeks.
    fn resolve_week(
        &self,
        conn: &Connection,
        table: &str,
        week: Option<&str>,
    ) -> Result<Option<String>> {
        if let Some(week) = week {
            return Ok(Some(week.to_string()));
        }

        let max: Option<String> = conn.query_row(
            &format!("SELECT MAX(week) FROM {table}"),
            [],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    fn read_or_empty<T>(
        &self,
        category: Category,
        read: impl FnOnce() -> Result<Vec<T>>,
    ) -> Vec<T> {
        match read() {
            Ok(records) => records,
            Err(err) => {
                warn!("failed to read {category} records: {err}");
                Vec::new()
            }
        }
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
