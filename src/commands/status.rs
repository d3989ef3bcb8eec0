use anyhow::Result;
use owo_colors::OwoColorize;
use webcal_sync_core::config::{Config, FeedConfig};
use webcal_sync_google::GoogleCalendar;

use super::plan_feed;
use crate::render::{PlanRender, Render};
use crate::utils::tui::create_spinner;

pub async fn run(config: &Config, feeds: &[FeedConfig], verbose: bool) -> Result<()> {
    let store = GoogleCalendar::connect(&config.calendar_id).await?;

    for (i, feed) in feeds.iter().enumerate() {
        let spinner = create_spinner(feed.render());
        let result = plan_feed(&store, feed).await;
        spinner.finish_and_clear();

        println!("{}", feed.render());

        match result {
            Ok(feed_plan) => println!("{}", feed_plan.render(verbose)),
            Err(e) => println!("   {}", format!("{:#}", e).red()),
        }

        // Add spacing between feeds (but not after the last one)
        if i < feeds.len() - 1 {
            println!();
        }
    }

    Ok(())
}
