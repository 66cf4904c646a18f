//! Scrape pipeline: fetch, extract, sanitize, aggregate, store.
//!
//! A run is sequential and best-effort. Individual bad records are dropped,
//! empty categories are warnings, and only two things fail the run: the
//! origin exhausting every fetch attempt, or a storage write failing.

pub mod admission;
pub mod aggregate;
pub mod extract;
pub mod http_client;
pub mod sanitize;
pub mod week;

pub use http_client::HttpClient;

use anyhow::Context;
use chrono::Utc;
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::config::Settings;
use crate::models::Category;
use crate::repository::StatsRepository;

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    pub week: String,
    pub agents: usize,
    pub maps: usize,
    pub weapons: usize,
}

/// Run the full pipeline: main page (agents) plus the map and weapon pages.
pub async fn run_scrape(settings: &Settings) -> anyhow::Result<ScrapeSummary> {
    let client = HttpClient::new(settings)?;
    let origin = Url::parse(&settings.base_url)
        .with_context(|| format!("invalid base url {}", settings.base_url))?;

    info!("starting scrape of {}", settings.base_url);

    let main_html = client.fetch(&settings.base_url).await?;
    let maps_html = client
        .fetch(&format!("{}/maps", settings.base_url))
        .await?;
    let weapons_html = client
        .fetch(&format!("{}/weapons", settings.base_url))
        .await?;

    // Parse and extract in a sync scope: the parsed document must not be
    // held across an await.
    let agents = {
        let doc = Html::parse_document(&main_html);
        extract::extract_main_agents(&doc)
    };
    let maps = {
        let doc = Html::parse_document(&maps_html);
        extract::extract_maps(&doc)
    };
    let weapons = {
        let doc = Html::parse_document(&weapons_html);
        extract::extract_weapons(&doc)
    };

    let agents = sanitize::sanitize_records(agents, &origin);
    let maps = sanitize::sanitize_records(maps, &origin);
    let weapons = sanitize::sanitize_records(weapons, &origin);

    let snapshot = aggregate::aggregate(agents, maps, weapons, Utc::now());
    let summary = ScrapeSummary {
        week: snapshot.week.clone(),
        agents: snapshot.agents.len(),
        maps: snapshot.maps.len(),
        weapons: snapshot.weapons.len(),
    };

    if snapshot.is_empty() {
        warn!("no records extracted; selectors may be stale against current markup");
        return Ok(summary);
    }

    let repo = StatsRepository::new(&settings.database_path)?;
    repo.ensure_indexes()?;
    repo.save_snapshot(&snapshot)?;

    // Per-category saves are separate logical operations; a failure here
    // leaves the snapshot in place and fails the run.
    if !snapshot.agents.is_empty() {
        repo.save_agents(&snapshot.agents, &snapshot.week)?;
    }
    if !snapshot.maps.is_empty() {
        repo.save_maps(&snapshot.maps, &snapshot.week)?;
    }
    if !snapshot.weapons.is_empty() {
        repo.save_weapons(&snapshot.weapons, &snapshot.week)?;
    }

    info!(
        "scrape complete for {}: {} agents, {} maps, {} weapons",
        summary.week, summary.agents, summary.maps, summary.weapons
    );
    Ok(summary)
}

/// Scrape and persist a single category from its dedicated page.
pub async fn run_scrape_category(
    settings: &Settings,
    category: Category,
) -> anyhow::Result<usize> {
    let client = HttpClient::new(settings)?;
    let origin = Url::parse(&settings.base_url)
        .with_context(|| format!("invalid base url {}", settings.base_url))?;

    let url = format!("{}/{}", settings.base_url, category.as_str());
    info!("scraping {category} from {url}");
    let html = client.fetch(&url).await?;

    let week = week::week_id_for(Utc::now());
    let repo = StatsRepository::new(&settings.database_path)?;
    repo.ensure_indexes()?;

    let count = match category {
        Category::Agents => {
            let records = {
                let doc = Html::parse_document(&html);
                extract::extract_agents(&doc)
            };
            let records = sanitize::sanitize_records(records, &origin);
            if records.is_empty() {
                warn!("no agent records extracted, keeping existing data for {week}");
                return Ok(0);
            }
            repo.save_agents(&records, &week)?;
            records.len()
        }
        Category::Maps => {
            let records = {
                let doc = Html::parse_document(&html);
                extract::extract_maps(&doc)
            };
            let records = sanitize::sanitize_records(records, &origin);
            if records.is_empty() {
                warn!("no map records extracted, keeping existing data for {week}");
                return Ok(0);
            }
            repo.save_maps(&records, &week)?;
            records.len()
        }
        Category::Weapons => {
            let records = {
                let doc = Html::parse_document(&html);
                extract::extract_weapons(&doc)
            };
            let records = sanitize::sanitize_records(records, &origin);
            if records.is_empty() {
                warn!("no weapon records extracted, keeping existing data for {week}");
                return Ok(0);
            }
            repo.save_weapons(&records, &week)?;
            records.len()
        }
    };

    info!("scraped {count} {category} records for week {week}");
    Ok(count)
}
