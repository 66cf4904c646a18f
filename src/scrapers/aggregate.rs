//! Snapshot assembly.

use chrono::{DateTime, Utc};

use super::week::week_id_for;
use crate::models::{AgentStat, MapStat, WeaponStat, WeekSnapshot};

/// Assemble one dated snapshot from the per-category record sets.
///
/// Pure function; the week identifier is derived from the capture
/// timestamp so two captures in the same calendar week collide on it.
pub fn aggregate(
    agents: Vec<AgentStat>,
    maps: Vec<MapStat>,
    weapons: Vec<WeaponStat>,
    scraped_at: DateTime<Utc>,
) -> WeekSnapshot {
    WeekSnapshot {
        week: week_id_for(scraped_at),
        scraped_at,
        agents,
        maps,
        weapons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_week_comes_from_the_capture_timestamp() {
        let captured = Utc.with_ymd_and_hms(2024, 1, 8, 4, 30, 0).unwrap();
        let snapshot = aggregate(vec![], vec![], vec![], captured);

        assert_eq!(snapshot.week, "2024-W02");
        assert_eq!(snapshot.scraped_at, captured);
        assert!(snapshot.is_empty());
    }
}
