use anyhow::Result;
use owo_colors::OwoColorize;
use tracing::info;
use webcal_sync_core::config::{Config, FeedConfig};
use webcal_sync_core::sync::{BatchStats, apply_plan};
use webcal_sync_google::GoogleCalendar;

use super::plan_feed;
use crate::render::{PlanRender, Render};
use crate::utils::tui::create_spinner;

pub async fn run(config: &Config, feeds: &[FeedConfig], verbose: bool) -> Result<()> {
    let store = GoogleCalendar::connect(&config.calendar_id).await?;

    let mut stats = Vec::new();
    let mut failed = 0;

    for (i, feed) in feeds.iter().enumerate() {
        let spinner = create_spinner(feed.render());
        let result = plan_feed(&store, feed).await;
        spinner.finish_and_clear();

        println!("{}", feed.render());

        match result {
            Ok(feed_plan) => {
                println!("{}", feed_plan.render(verbose));

                match apply_plan(&store, &feed_plan.plan).await {
                    Ok(applied) => {
                        info!(
                            url = %feed.url,
                            created = applied.created,
                            updated = applied.updated,
                            deleted = applied.deleted,
                            converged = applied.converged,
                            "Finished feed"
                        );
                        stats.push(applied);
                    }
                    Err(e) => {
                        println!("   {}", e.to_string().red());
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                println!("   {}", format!("{:#}", e).red());
                failed += 1;
            }
        }

        // Add spacing between feeds (but not after the last one)
        if i < feeds.len() - 1 {
            println!();
        }
    }

    let totals = BatchStats(stats).totals();

    if totals.created > 0 || totals.updated > 0 || totals.deleted > 0 {
        println!(
            "\nSynced: {} created, {} updated, {} deleted",
            totals.created, totals.updated, totals.deleted
        );
    }

    if failed > 0 {
        anyhow::bail!("{} of {} feeds failed", failed, feeds.len());
    }

    Ok(())
}
