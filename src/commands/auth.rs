use anyhow::Result;
use owo_colors::OwoColorize;
use webcal_sync_google::auth;

pub async fn run() -> Result<()> {
    auth::authenticate().await?;

    println!(
        "\nRun {} to mirror your feeds.",
        "webcal-sync sync".bold()
    );

    Ok(())
}
