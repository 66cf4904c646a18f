//! Text and URL sanitization for scraped content.
//!
//! Everything extracted from the origin's markup passes through here before
//! it reaches storage or the API, so hostile or malformed markup cannot
//! propagate past this boundary.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::models::{AgentStat, MapStat, WeaponStat};

/// Maximum length of any stored text field, in characters.
const MAX_TEXT_LEN: usize = 200;

/// Characters stripped from scraped text fields.
const STRIPPED: &[char] = &['<', '>', '"', '\'', '&', '/'];

/// Strip markup-significant characters, trim, and bound the length.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .trim()
        .chars()
        .take(MAX_TEXT_LEN)
        .collect()
}

/// Resolve and validate a scraped image URL.
///
/// Relative paths resolve against the origin. The result is kept only when
/// it is https or points back at the trusted origin host; anything else
/// becomes an empty string so one bad icon never drops a whole record.
pub fn validate_image_url(raw: &str, base: &Url) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    match base.join(raw) {
        Ok(resolved) => {
            let trusted_host = base.host_str().is_some() && resolved.host_str() == base.host_str();
            if resolved.scheme() == "https" || trusted_host {
                resolved.to_string()
            } else {
                debug!("rejected image url {resolved}");
                String::new()
            }
        }
        Err(_) => String::new(),
    }
}

/// Check a client-supplied week identifier (`YYYY-Wnn`).
pub fn is_valid_week_param(week: &str) -> bool {
    static WEEK_RE: OnceLock<Regex> = OnceLock::new();
    let re = WEEK_RE.get_or_init(|| Regex::new(r"^\d{4}-W\d\d$").expect("valid week regex"));
    week.len() <= 8 && re.is_match(week)
}

/// A record type whose text fields can be sanitized in place.
///
/// Returns false when the record should be dropped (name emptied out by
/// sanitization, or no rate data survived).
pub trait Sanitize {
    fn sanitize(&mut self, origin: &Url) -> bool;
}

impl Sanitize for AgentStat {
    fn sanitize(&mut self, origin: &Url) -> bool {
        self.agent_name = sanitize_text(&self.agent_name);
        self.agent_icon = validate_image_url(&self.agent_icon, origin);
        self.tier = sanitize_text(&self.tier);
        self.pick_rate = sanitize_text(&self.pick_rate);
        self.win_rate = sanitize_text(&self.win_rate);
        self.avg_kda = sanitize_text(&self.avg_kda);
        self.avg_score = sanitize_text(&self.avg_score);
        self.avg_damage = sanitize_text(&self.avg_damage);

        !self.agent_name.is_empty() && !(self.pick_rate.is_empty() && self.win_rate.is_empty())
    }
}

impl Sanitize for MapStat {
    fn sanitize(&mut self, origin: &Url) -> bool {
        self.map_name = sanitize_text(&self.map_name);
        self.map_icon = validate_image_url(&self.map_icon, origin);
        self.pick_rate = sanitize_text(&self.pick_rate);
        self.win_rate_attack = sanitize_text(&self.win_rate_attack);
        self.win_rate_defense = sanitize_text(&self.win_rate_defense);
        self.avg_rounds = sanitize_text(&self.avg_rounds);

        !self.map_name.is_empty() && !self.pick_rate.is_empty()
    }
}

impl Sanitize for WeaponStat {
    fn sanitize(&mut self, origin: &Url) -> bool {
        self.weapon_name = sanitize_text(&self.weapon_name);
        self.weapon_icon = validate_image_url(&self.weapon_icon, origin);
        self.pick_rate = sanitize_text(&self.pick_rate);
        self.kill_rate = sanitize_text(&self.kill_rate);
        self.headshot_rate = sanitize_text(&self.headshot_rate);
        self.avg_damage = sanitize_text(&self.avg_damage);

        !self.weapon_name.is_empty() && !self.pick_rate.is_empty()
    }
}

/// Sanitize every record, dropping the ones that fail validation.
pub fn sanitize_records<T: Sanitize>(records: Vec<T>, origin: &Url) -> Vec<T> {
    let before = records.len();
    let kept: Vec<T> = records
        .into_iter()
        .filter_map(|mut record| record.sanitize(origin).then_some(record))
        .collect();

    if kept.len() < before {
        debug!("dropped {} invalid records", before - kept.len());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://op.gg/valorant/statistics").unwrap()
    }

    #[test]
    fn strips_markup_characters() {
        assert_eq!(sanitize_text("<script>Jett</script>"), "scriptJettscript");
        assert_eq!(sanitize_text("  \"Sage\" & 'Omen'  "), "Sage  Omen");
    }

    #[test]
    fn truncates_to_200_characters() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_text(&long).chars().count(), 200);

        let exact = "y".repeat(200);
        assert_eq!(sanitize_text(&exact), exact);
    }

    #[test]
    fn image_url_resolves_relative_paths() {
        assert_eq!(
            validate_image_url("/images/jett.png", &origin()),
            "https://op.gg/images/jett.png"
        );
    }

    #[test]
    fn image_url_accepts_https_anywhere() {
        assert_eq!(
            validate_image_url("https://cdn.example.com/a.png", &origin()),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn image_url_rejects_non_https_foreign_hosts() {
        assert_eq!(validate_image_url("http://evil.example/a.png", &origin()), "");
        assert_eq!(validate_image_url("javascript:alert(1)", &origin()), "");
        assert_eq!(validate_image_url("", &origin()), "");
    }

    #[test]
    fn week_param_validation() {
        assert!(is_valid_week_param("2024-W02"));
        assert!(is_valid_week_param("1999-W53"));
        assert!(!is_valid_week_param("2024-W2"));
        assert!(!is_valid_week_param("2024-W002"));
        assert!(!is_valid_week_param("24-W02"));
        assert!(!is_valid_week_param("2024W02"));
        assert!(!is_valid_week_param("2024-W02; DROP TABLE"));
    }

    #[test]
    fn sanitize_drops_records_without_names() {
        let records = vec![
            AgentStat {
                agent_name: "Jett".to_string(),
                agent_icon: "/jett.png".to_string(),
                tier: "Duelist".to_string(),
                pick_rate: "12%".to_string(),
                win_rate: "50%".to_string(),
                avg_kda: "1.1".to_string(),
                avg_score: "230".to_string(),
                avg_damage: "145".to_string(),
            },
            AgentStat {
                agent_name: "<>&".to_string(),
                agent_icon: String::new(),
                tier: String::new(),
                pick_rate: "9%".to_string(),
                win_rate: "48%".to_string(),
                avg_kda: String::new(),
                avg_score: String::new(),
                avg_damage: String::new(),
            },
        ];

        let kept = sanitize_records(records, &origin());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].agent_name, "Jett");
        assert_eq!(kept[0].agent_icon, "https://op.gg/jett.png");
    }
}
