//! CLI commands.

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::models::Category;
use crate::repository::StatsRepository;
use crate::scheduler;
use crate::scrapers;
use crate::server;
use crate::services::LeaderboardClient;

#[derive(Parser)]
#[command(name = "valstats")]
#[command(about = "Weekly Valorant statistics scraper, store, and read API")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scrape pipeline once (all categories, or just one)
    Scrape {
        /// Scrape a single category from its dedicated page
        category: Option<Category>,
    },

    /// Run the read API server
    Serve {
        /// Bind host (defaults to API_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (defaults to API_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run scrapes on the configured cron schedule
    Schedule {
        /// Run one scrape immediately instead of starting the scheduler
        #[arg(long)]
        run_now: bool,
    },

    /// Summarize stored weeks and record counts
    Verify,

    /// Show the playable agent roster from the roster service
    Roster,

    /// Show top ranked players from the leaderboard service
    Leaderboard {
        /// Leaderboard region
        #[arg(long, default_value = "eu")]
        region: String,
        /// Number of players to fetch
        #[arg(long, default_value = "5")]
        size: usize,
    },
}

/// Parse arguments and dispatch the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Scrape { category } => match category {
            Some(category) => {
                let count = scrapers::run_scrape_category(&settings, category).await?;
                println!("scraped {count} {category} records");
                Ok(())
            }
            None => {
                let summary = scrapers::run_scrape(&settings).await?;
                println!(
                    "week {}: {} agents, {} maps, {} weapons",
                    summary.week, summary.agents, summary.maps, summary.weapons
                );
                Ok(())
            }
        },

        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.api_host.clone());
            let port = port.unwrap_or(settings.api_port);
            server::serve(&settings, &host, port).await
        }

        Commands::Schedule { run_now } => {
            if run_now {
                let summary = scrapers::run_scrape(&settings).await?;
                println!(
                    "week {}: {} agents, {} maps, {} weapons",
                    summary.week, summary.agents, summary.maps, summary.weapons
                );
                Ok(())
            } else {
                scheduler::run(settings).await
            }
        }

        Commands::Verify => verify(&settings),

        Commands::Roster => {
            let client =
                LeaderboardClient::new(&settings.leaderboard_api_url, &settings.leaderboard_api_key);
            let roster = client.agent_roster().await?;
            println!("{} playable agents:", roster.len());
            for agent in roster {
                let role = agent
                    .role
                    .map(|r| r.display_name)
                    .unwrap_or_else(|| "-".to_string());
                println!("  {:20} {role}", agent.display_name);
            }
            Ok(())
        }

        Commands::Leaderboard { region, size } => {
            let client =
                LeaderboardClient::new(&settings.leaderboard_api_url, &settings.leaderboard_api_key);
            let players = client.top_players(&region, size).await?;
            println!("top {} players ({region}):", players.len());
            for player in players {
                println!(
                    "  #{:<4} {}#{} ({} RR, {} wins)",
                    player.leaderboard_rank, player.name, player.tag, player.rr, player.wins
                );
            }
            Ok(())
        }
    }
}

/// Print a summary of what the store currently holds.
fn verify(settings: &Settings) -> anyhow::Result<()> {
    let repo = StatsRepository::new(&settings.database_path)?;

    let weeks = repo.list_weeks();
    if weeks.is_empty() {
        println!("store is empty (no snapshots)");
        return Ok(());
    }

    println!("{} stored weeks:", weeks.len());
    for week in &weeks {
        let (agents, maps, weapons) = repo.category_counts(week);
        println!("  {week}: {agents} agents, {maps} maps, {weapons} weapons");
    }

    if let Some(latest) = repo.get_latest() {
        println!(
            "latest snapshot: {} captured at {}",
            latest.week,
            latest.scraped_at.to_rfc3339()
        );
        println!(
            "  mean pick rate: {:.1}% across {} agents",
            crate::models::average_rate(&latest.agents),
            latest.agents.len()
        );
        for agent in crate::models::top_by_rate(&latest.agents, 5) {
            println!(
                "    {:20} pick {:>7} win {:>7}",
                agent.agent_name, agent.pick_rate, agent.win_rate
            );
        }
    }

    Ok(())
}
