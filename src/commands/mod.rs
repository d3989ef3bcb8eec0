pub mod auth;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use tracing::info;
use webcal_sync_core::config::FeedConfig;
use webcal_sync_core::reconcile::{ReconciliationPlan, reconcile};
use webcal_sync_core::sync::EventStore;
use webcal_sync_core::DestinationEvent;

use crate::feed;

/// A feed's plan together with the events it was computed against
pub struct FeedPlan {
    pub plan: ReconciliationPlan,
    pub existing: Vec<DestinationEvent>,
}

/// Fetch the feed, list what the store holds for it, and diff the two.
pub async fn plan_feed<S: EventStore>(store: &S, feed: &FeedConfig) -> Result<FeedPlan> {
    info!(url = %feed.url, "Syncing feed");

    let sources = feed::load_sources(&feed.url).await?;
    let existing = store
        .list_events(&feed.owner_tag())
        .await
        .context("Failed to list existing events")?;

    let plan = reconcile(feed, &sources, &existing)?;

    let (creates, updates, deletes) = plan.counts();
    info!(
        url = %feed.url,
        sources = sources.len(),
        existing = existing.len(),
        creates,
        updates,
        deletes,
        "Planned feed"
    );

    Ok(FeedPlan { plan, existing })
}
