//! Migrate command handler.

use crate::config::settings::Settings;
use crate::db;

/// Applies pending migrations, or lists them with `dry_run`.
pub async fn execute(settings: Settings, dry_run: bool) -> anyhow::Result<()> {
    settings.database.validate()?;

    if dry_run {
        println!("Checking for pending migrations...");
        let pending = db::pending_migrations(&settings.database.url).await?;
        if pending.is_empty() {
            println!("No pending migrations found - database is up to date");
        } else {
            println!("Found {} pending migration(s):", pending.len());
            for name in pending {
                println!("  {}", name);
            }
            println!("\nRun without --dry-run to apply these migrations");
        }
        return Ok(());
    }

    println!("Running database migrations...");
    let applied = db::run_pending_migrations(&settings.database.url).await?;
    if applied.is_empty() {
        println!("No pending migrations - database is up to date");
    } else {
        for name in &applied {
            println!("  applied {}", name);
        }
        println!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}
