//! Colored terminal rendering for feeds and plans.

use owo_colors::OwoColorize;
use webcal_sync_core::config::FeedConfig;
use webcal_sync_core::reconcile::{EventPatch, NewEvent};
use webcal_sync_core::{DestinationEvent, EventTime};

use crate::commands::FeedPlan;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for FeedConfig {
    fn render(&self) -> String {
        format!("📅 {}", self.url)
    }
}

impl Render for NewEvent {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            "+".green(),
            self.summary.green(),
            render_time(&self.start).dimmed()
        )
    }
}

fn render_time(time: &EventTime) -> String {
    match time {
        EventTime::Date(d) => d.format("%Y-%m-%d").to_string(),
        EventTime::DateTime(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
    }
}

fn render_update(patch: &EventPatch, existing: Option<&DestinationEvent>) -> String {
    let summary = patch
        .summary
        .as_deref()
        .or(existing.map(|e| e.summary.as_str()))
        .unwrap_or(&patch.id);

    format!(
        "{} {} {}",
        "~".yellow(),
        summary.yellow(),
        format!("({})", patch.changed_fields().join(", ")).dimmed()
    )
}

fn render_delete(id: &str, existing: Option<&DestinationEvent>) -> String {
    let summary = existing.map(|e| e.summary.as_str()).unwrap_or(id);
    let time = existing
        .and_then(|e| e.start.parse(&e.id).ok())
        .map(|t| render_time(&t))
        .unwrap_or_default();

    format!("{} {} {}", "-".red(), summary.red(), time.dimmed())
}

/// Above this many changes, non-verbose output shows counts only
const COMPACT_THRESHOLD: usize = 5;

pub trait PlanRender {
    fn render(&self, verbose: bool) -> String;
}

impl PlanRender for FeedPlan {
    fn render(&self, verbose: bool) -> String {
        if self.plan.is_empty() {
            return "   No changes".dimmed().to_string();
        }

        let (creates, updates, deletes) = self.plan.counts();
        let mut lines = Vec::new();

        if verbose || creates + updates + deletes <= COMPACT_THRESHOLD {
            let find = |id: &str| self.existing.iter().find(|e| e.id == id);

            for event in &self.plan.creates {
                lines.push(format!("   {}", event.render()));
            }
            for patch in &self.plan.updates {
                lines.push(format!("   {}", render_update(patch, find(&patch.id))));
            }
            for id in &self.plan.deletes {
                lines.push(format!("   {}", render_delete(id, find(id))));
            }
        } else {
            if creates > 0 {
                let label = format!("({} new {})", creates, pluralize("event", creates));
                lines.push(format!("   {} {}", "+".green(), label.green()));
            }
            if updates > 0 {
                let label = format!("({} changed {})", updates, pluralize("event", updates));
                lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
            }
            if deletes > 0 {
                let label = format!("({} deleted {})", deletes, pluralize("event", deletes));
                lines.push(format!("   {} {}", "-".red(), label.red()));
            }
        }

        lines.join("\n")
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
