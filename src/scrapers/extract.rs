//! HTML extraction with layered selector strategies.
//!
//! The origin's markup is versioned and changes without notice, so no
//! single selector can be trusted. Each category runs an ordered chain of
//! strategies over the parsed document: dedicated class selectors first,
//! attribute selectors second. The first strategy producing records wins.
//! The main statistics page instead runs two independent passes (a generic
//! table scan and a link-anchor scan) and merges them, first seen wins.
//!
//! Extraction is pure: same document in, same records out, no I/O. An
//! empty result is a content signal for the caller, never an error.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::models::{AgentStat, Category, MapStat, StatRecord, WeaponStat};

/// Minimum data cells for a generic table row to be considered aligned.
const MIN_TABLE_CELLS: usize = 5;

/// One way of reading records for a category out of a document.
pub trait ExtractStrategy<T> {
    fn name(&self) -> &'static str;
    fn extract(&self, doc: &Html) -> Vec<T>;
}

/// Run a strategy chain; first non-empty result wins.
fn run_chain<T>(doc: &Html, category: Category, strategies: &[&dyn ExtractStrategy<T>]) -> Vec<T> {
    for strategy in strategies {
        let records = strategy.extract(doc);
        if !records.is_empty() {
            debug!(
                "{category}: strategy {} matched {} records",
                strategy.name(),
                records.len()
            );
            return records;
        }
    }

    // Absence of matches is a valid outcome (markup changed or page is
    // empty); the caller decides what to do with zero records.
    warn!("{category}: no selector strategy matched any records");
    Vec::new()
}

/// Merge extraction passes, keeping the first record seen for each name.
fn merge_first_seen<T: StatRecord>(passes: Vec<Vec<T>>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for pass in passes {
        for record in pass {
            if seen.insert(record.name().to_string()) {
                merged.push(record);
            }
        }
    }
    merged
}

/// Extract agent records from the dedicated agents page.
pub fn extract_agents(doc: &Html) -> Vec<AgentStat> {
    run_chain(
        doc,
        Category::Agents,
        &[&AgentClassRows, &AgentAttrRows],
    )
}

/// Extract map records from the dedicated maps page.
pub fn extract_maps(doc: &Html) -> Vec<MapStat> {
    run_chain(doc, Category::Maps, &[&MapClassRows, &MapAttrRows])
}

/// Extract weapon records from the dedicated weapons page.
pub fn extract_weapons(doc: &Html) -> Vec<WeaponStat> {
    run_chain(doc, Category::Weapons, &[&WeaponClassRows, &WeaponAttrRows])
}

/// Extract agent records from the combined main statistics page.
///
/// Both passes always run; anchor-scan records for a name the table scan
/// already produced are dropped as duplicates.
pub fn extract_main_agents(doc: &Html) -> Vec<AgentStat> {
    let table = MainTableScan.extract(doc);
    let anchors = AgentAnchorScan.extract(doc);
    debug!(
        "main page: table scan {} records, anchor scan {} records",
        table.len(),
        anchors.len()
    );
    merge_first_seen(vec![table, anchors])
}

// ---------------------------------------------------------------------------
// Shared selector helpers
// ---------------------------------------------------------------------------

fn sel(selector: &str) -> Selector {
    // All selectors in this module are static strings.
    Selector::parse(selector).expect("static selector parses")
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First non-empty text under any of the given selectors, searched in order.
fn first_text(scope: ElementRef, selectors: &[&str]) -> String {
    for s in selectors {
        if let Some(el) = scope.select(&sel(s)).next() {
            let text = element_text(el);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

/// `src` of the first image under any of the given selectors.
fn first_img_src(scope: ElementRef, selectors: &[&str]) -> String {
    for s in selectors {
        if let Some(img) = scope.select(&sel(s)).next() {
            if let Some(src) = img.value().attr("src") {
                return src.trim().to_string();
            }
        }
    }
    String::new()
}

/// Text of every `td` in a row, in document order.
fn cell_texts(row: ElementRef) -> Vec<String> {
    row.select(&sel("td")).map(element_text).collect()
}

fn nth(cells: &[String], index: usize) -> String {
    cells.get(index).cloned().unwrap_or_default()
}

fn has_rate(fields: &[&str]) -> bool {
    fields.iter().any(|f| f.contains('%'))
}

/// Nearest enclosing table row (or row-classed container) of an element.
fn closest_row(el: ElementRef) -> Option<ElementRef> {
    el.ancestors().filter_map(ElementRef::wrap).find(|e| {
        e.value().name() == "tr"
            || e.value()
                .attr("class")
                .is_some_and(|c| c.contains("row"))
    })
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

/// Dedicated agent table rows keyed on statistics-table classes.
struct AgentClassRows;

impl ExtractStrategy<AgentStat> for AgentClassRows {
    fn name(&self) -> &'static str {
        "agent-class-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<AgentStat> {
        let rows = sel(".agent-statistics-table tr, .agent-stats-row");
        doc.select(&rows)
            .filter_map(|row| {
                let record = AgentStat {
                    agent_name: first_text(row, &[".agent-name", ".name"]),
                    agent_icon: first_img_src(row, &[".agent-icon img", ".icon img"]),
                    tier: first_text(row, &[".tier", ".rank", ".rating"]),
                    pick_rate: first_text(row, &[".pick-rate"]),
                    win_rate: first_text(row, &[".win-rate"]),
                    avg_kda: first_text(row, &[".kda", ".avg-kda"]),
                    avg_score: first_text(row, &[".score", ".avg-score"]),
                    avg_damage: first_text(row, &[".damage", ".avg-damage"]),
                };
                qualify_agent(record)
            })
            .collect()
    }
}

/// Fallback over `data-agent-name` attribute markup.
struct AgentAttrRows;

impl ExtractStrategy<AgentStat> for AgentAttrRows {
    fn name(&self) -> &'static str {
        "agent-attr-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<AgentStat> {
        doc.select(&sel("[data-agent-name]"))
            .filter_map(|row| {
                let name = row
                    .value()
                    .attr("data-agent-name")
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| first_text(row, &[".name"]));

                let record = AgentStat {
                    agent_name: name,
                    agent_icon: first_img_src(row, &["img"]),
                    tier: first_text(row, &["[data-tier]", ".tier"]),
                    pick_rate: first_text(row, &["[data-pick-rate]", ".pick-rate"]),
                    win_rate: first_text(row, &["[data-win-rate]", ".win-rate"]),
                    avg_kda: first_text(row, &["[data-kda]", ".kda"]),
                    avg_score: first_text(row, &["[data-score]", ".score"]),
                    avg_damage: first_text(row, &["[data-damage]", ".damage"]),
                };
                qualify_agent(record)
            })
            .collect()
    }
}

/// Generic table-row scan over the main page using column positions.
struct MainTableScan;

impl ExtractStrategy<AgentStat> for MainTableScan {
    fn name(&self) -> &'static str {
        "main-table-scan"
    }

    fn extract(&self, doc: &Html) -> Vec<AgentStat> {
        let agent_link = sel(r#"a[href*="/valorant/agents/"], a[href*="/agents/"]"#);
        let role_el = sel(
            "[class*=\"role\"], [class*=\"duelist\"], [class*=\"controller\"], \
             [class*=\"initiator\"], [class*=\"sentinel\"]",
        );
        let header = sel("th");
        let img = sel("img");

        doc.select(&sel("table tr, tbody tr"))
            .filter_map(|row| {
                // Header rows carry no data.
                if row.select(&header).next().is_some() {
                    return None;
                }

                let cells = cell_texts(row);
                if cells.len() < MIN_TABLE_CELLS {
                    return None;
                }

                let name = row
                    .select(&agent_link)
                    .next()
                    .map(element_text)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| nth(&cells, 1));

                // A percentage or ordinal in the name position means the
                // column heuristic misfired on this row.
                if name.is_empty() || name.contains('%') || name.contains('#') {
                    return None;
                }

                let icon = row
                    .select(&img)
                    .next()
                    .and_then(|i| i.value().attr("src"))
                    .unwrap_or("")
                    .trim()
                    .to_string();

                let tier = row
                    .select(&role_el)
                    .next()
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string());

                let record = AgentStat {
                    agent_name: name,
                    agent_icon: icon,
                    tier,
                    // Column positions observed on the origin's main table.
                    win_rate: nth(&cells, 2),
                    pick_rate: nth(&cells, 3),
                    avg_kda: nth(&cells, 4),
                    avg_score: nth(&cells, 6),
                    avg_damage: String::new(),
                };
                qualify_agent(record)
            })
            .collect()
    }
}

/// Anchor scan keyed on agent detail links.
struct AgentAnchorScan;

impl ExtractStrategy<AgentStat> for AgentAnchorScan {
    fn name(&self) -> &'static str {
        "agent-anchor-scan"
    }

    fn extract(&self, doc: &Html) -> Vec<AgentStat> {
        let img = sel("img");

        doc.select(&sel(r#"a[href*="/agents/"]"#))
            .filter_map(|link| {
                let name = element_text(link);
                if name.is_empty() {
                    return None;
                }

                let row = closest_row(link)?;
                let cells = cell_texts(row);
                if cells.len() < 3 {
                    return None;
                }

                let icon = row
                    .select(&img)
                    .next()
                    .and_then(|i| i.value().attr("src"))
                    .unwrap_or("")
                    .trim()
                    .to_string();

                let win_rate = cells
                    .iter()
                    .find(|c| c.contains('%') && crate::models::parse_rate(c) < 100.0)
                    .cloned()
                    .unwrap_or_default();
                let pick_rate = cells
                    .iter()
                    .find(|c| c.contains('%'))
                    .cloned()
                    .unwrap_or_default();

                let record = AgentStat {
                    agent_name: name,
                    agent_icon: icon,
                    tier: "Unknown".to_string(),
                    pick_rate,
                    win_rate,
                    avg_kda: nth(&cells, 4),
                    avg_score: nth(&cells, 6),
                    avg_damage: String::new(),
                };
                qualify_agent(record)
            })
            .collect()
    }
}

fn qualify_agent(record: AgentStat) -> Option<AgentStat> {
    let qualifies = !record.agent_name.is_empty()
        && has_rate(&[&record.pick_rate, &record.win_rate]);
    qualifies.then_some(record)
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

struct MapClassRows;

impl ExtractStrategy<MapStat> for MapClassRows {
    fn name(&self) -> &'static str {
        "map-class-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<MapStat> {
        let rows = sel(".map-statistics-table tr, .map-stats-row");
        doc.select(&rows)
            .filter_map(|row| {
                let record = MapStat {
                    map_name: first_text(row, &[".map-name", ".name"]),
                    map_icon: first_img_src(row, &[".map-icon img", ".icon img"]),
                    pick_rate: first_text(row, &[".pick-rate"]),
                    win_rate_attack: first_text(row, &[".win-rate-attack"]),
                    win_rate_defense: first_text(row, &[".win-rate-defense"]),
                    avg_rounds: first_text(row, &[".avg-rounds"]),
                };
                qualify_map(record)
            })
            .collect()
    }
}

struct MapAttrRows;

impl ExtractStrategy<MapStat> for MapAttrRows {
    fn name(&self) -> &'static str {
        "map-attr-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<MapStat> {
        doc.select(&sel("[data-map-name]"))
            .filter_map(|row| {
                let name = row
                    .value()
                    .attr("data-map-name")
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| first_text(row, &[".name"]));

                let record = MapStat {
                    map_name: name,
                    map_icon: first_img_src(row, &["img"]),
                    pick_rate: first_text(row, &["[data-pick-rate]", ".pick-rate"]),
                    win_rate_attack: first_text(
                        row,
                        &["[data-win-rate-attack]", ".win-rate-attack"],
                    ),
                    win_rate_defense: first_text(
                        row,
                        &["[data-win-rate-defense]", ".win-rate-defense"],
                    ),
                    avg_rounds: first_text(row, &["[data-avg-rounds]", ".avg-rounds"]),
                };
                qualify_map(record)
            })
            .collect()
    }
}

fn qualify_map(record: MapStat) -> Option<MapStat> {
    let qualifies = !record.map_name.is_empty()
        && has_rate(&[
            &record.pick_rate,
            &record.win_rate_attack,
            &record.win_rate_defense,
        ]);
    qualifies.then_some(record)
}

// ---------------------------------------------------------------------------
// Weapons
// ---------------------------------------------------------------------------

struct WeaponClassRows;

impl ExtractStrategy<WeaponStat> for WeaponClassRows {
    fn name(&self) -> &'static str {
        "weapon-class-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<WeaponStat> {
        let rows = sel(".weapon-statistics-table tr, .weapon-stats-row");
        doc.select(&rows)
            .filter_map(|row| {
                let record = WeaponStat {
                    weapon_name: first_text(row, &[".weapon-name", ".name"]),
                    weapon_icon: first_img_src(row, &[".weapon-icon img", ".icon img"]),
                    pick_rate: first_text(row, &[".pick-rate"]),
                    kill_rate: first_text(row, &[".kill-rate"]),
                    headshot_rate: first_text(row, &[".headshot-rate"]),
                    avg_damage: first_text(row, &[".damage", ".avg-damage"]),
                };
                qualify_weapon(record)
            })
            .collect()
    }
}

struct WeaponAttrRows;

impl ExtractStrategy<WeaponStat> for WeaponAttrRows {
    fn name(&self) -> &'static str {
        "weapon-attr-rows"
    }

    fn extract(&self, doc: &Html) -> Vec<WeaponStat> {
        doc.select(&sel("[data-weapon-name]"))
            .filter_map(|row| {
                let name = row
                    .value()
                    .attr("data-weapon-name")
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| first_text(row, &[".name"]));

                let record = WeaponStat {
                    weapon_name: name,
                    weapon_icon: first_img_src(row, &["img"]),
                    pick_rate: first_text(row, &["[data-pick-rate]", ".pick-rate"]),
                    kill_rate: first_text(row, &["[data-kill-rate]", ".kill-rate"]),
                    headshot_rate: first_text(
                        row,
                        &["[data-headshot-rate]", ".headshot-rate"],
                    ),
                    avg_damage: first_text(row, &["[data-damage]", ".damage"]),
                };
                qualify_weapon(record)
            })
            .collect()
    }
}

fn qualify_weapon(record: WeaponStat) -> Option<WeaponStat> {
    let qualifies = !record.weapon_name.is_empty()
        && has_rate(&[
            &record.pick_rate,
            &record.kill_rate,
            &record.headshot_rate,
        ]);
    qualifies.then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN_PAGE: &str = r#"
        <html><body>
        <table><tbody>
          <tr><th>#</th><th>Agent</th><th>Win</th><th>Pick</th><th>KDA</th></tr>
          <tr>
            <td>1</td>
            <td><a href="/valorant/agents/jett">Jett</a><img src="/imgs/jett.png"></td>
            <td>51.2%</td><td>12.4%</td><td>1.12</td><td>-</td><td>231</td>
          </tr>
          <tr>
            <td>2</td>
            <td><a href="/valorant/agents/sage">Sage</a></td>
            <td>49.8%</td><td>10.1%</td><td>1.02</td><td>-</td><td>208</td>
          </tr>
          <tr><td>totals</td><td>#</td><td>100%</td><td>100%</td><td>-</td></tr>
        </tbody></table>
        <table><tbody>
          <tr>
            <td><a href="/valorant/agents/omen">Omen</a></td>
            <td>47.5%</td><td>8.3%</td>
          </tr>
        </tbody></table>
        </body></html>
    "#;

    const AGENTS_PAGE: &str = r#"
        <html><body>
        <table class="agent-statistics-table">
          <tr>
            <td>
              <span class="agent-name">Jett</span>
              <span class="agent-icon"><img src="/imgs/jett.png"></span>
              <span class="tier">S</span>
              <span class="pick-rate">12.4%</span>
              <span class="win-rate">51.2%</span>
              <span class="kda">1.12</span>
              <span class="score">231</span>
              <span class="damage">152</span>
            </td>
          </tr>
          <tr>
            <td><span class="agent-name"></span><span class="pick-rate">0%</span></td>
          </tr>
        </table>
        </body></html>
    "#;

    const AGENTS_ATTR_PAGE: &str = r#"
        <html><body>
        <div data-agent-name="Sage">
          <img src="/imgs/sage.png">
          <span data-pick-rate>10.1%</span>
          <span data-win-rate>49.8%</span>
        </div>
        </body></html>
    "#;

    #[test]
    fn main_page_table_scan_uses_column_positions() {
        let doc = Html::parse_document(MAIN_PAGE);
        let agents = extract_main_agents(&doc);

        let jett = agents.iter().find(|a| a.agent_name == "Jett").unwrap();
        assert_eq!(jett.win_rate, "51.2%");
        assert_eq!(jett.pick_rate, "12.4%");
        assert_eq!(jett.avg_kda, "1.12");
        assert_eq!(jett.avg_score, "231");
        assert_eq!(jett.agent_icon, "/imgs/jett.png");
    }

    #[test]
    fn main_page_skips_header_and_misaligned_rows() {
        let doc = Html::parse_document(MAIN_PAGE);
        let agents = extract_main_agents(&doc);

        // The totals row has "#" in the name position and must be dropped.
        assert!(agents.iter().all(|a| !a.agent_name.contains('#')));
        assert!(agents.iter().all(|a| !a.agent_name.contains('%')));
    }

    #[test]
    fn anchor_scan_supplements_rows_the_table_scan_missed() {
        let doc = Html::parse_document(MAIN_PAGE);
        let agents = extract_main_agents(&doc);

        // Omen's row has only 3 cells, so only the anchor scan finds it.
        let omen = agents.iter().find(|a| a.agent_name == "Omen").unwrap();
        assert_eq!(omen.win_rate, "47.5%");
        assert_eq!(omen.tier, "Unknown");
    }

    #[test]
    fn duplicate_names_keep_the_first_seen_record() {
        let doc = Html::parse_document(MAIN_PAGE);
        let agents = extract_main_agents(&doc);

        let jetts: Vec<_> = agents.iter().filter(|a| a.agent_name == "Jett").collect();
        assert_eq!(jetts.len(), 1);
        // The table scan ran first, so its tiered record wins over the
        // anchor scan's "Unknown".
        assert_eq!(agents.len(), 3);
    }

    #[test]
    fn category_page_class_selectors_extract_fields() {
        let doc = Html::parse_document(AGENTS_PAGE);
        let agents = extract_agents(&doc);

        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_name, "Jett");
        assert_eq!(agents[0].tier, "S");
        assert_eq!(agents[0].avg_damage, "152");
    }

    #[test]
    fn attribute_strategy_is_used_when_class_rows_miss() {
        let doc = Html::parse_document(AGENTS_ATTR_PAGE);
        let agents = extract_agents(&doc);

        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].agent_name, "Sage");
        assert_eq!(agents[0].pick_rate, "10.1%");
        assert_eq!(agents[0].agent_icon, "/imgs/sage.png");
    }

    #[test]
    fn empty_category_yields_empty_not_error() {
        // An agents page has no map markup at all.
        let doc = Html::parse_document(AGENTS_PAGE);
        let maps = extract_maps(&doc);
        let weapons = extract_weapons(&doc);
        assert!(maps.is_empty());
        assert!(weapons.is_empty());

        // And extracting maps first does not disturb agent extraction.
        let agents = extract_agents(&doc);
        assert_eq!(agents.len(), 1);
    }

    #[test]
    fn records_without_rate_fields_are_dropped() {
        let html = r#"
            <table class="weapon-statistics-table">
              <tr><td><span class="weapon-name">Vandal</span>
                  <span class="pick-rate">15.2%</span></td></tr>
              <tr><td><span class="weapon-name">Ghost</span>
                  <span class="avg-damage">78</span></td></tr>
            </table>
        "#;
        let doc = Html::parse_document(html);
        let weapons = extract_weapons(&doc);

        assert_eq!(weapons.len(), 1);
        assert_eq!(weapons[0].weapon_name, "Vandal");
    }
}
