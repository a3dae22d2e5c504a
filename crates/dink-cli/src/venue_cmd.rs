//! Venue subcommands.

use anyhow::bail;
use clap::Subcommand;
use serde_json::json;

use dink_sync::SyncContext;
use dink_sync::remote::HttpRemoteStore;

#[derive(Subcommand, Debug)]
pub enum VenueCmd {
    /// Add a venue to the local cache
    Add {
        #[arg(long)]
        name: String,
    },
    /// List cached venues
    List,
    /// Case-insensitive substring search over venue names
    Search { query: String },
    /// Remove a venue from the local cache
    Remove { venue_id: String },
}

pub async fn run(ctx: &SyncContext<HttpRemoteStore>, cmd: VenueCmd) -> anyhow::Result<()> {
    match cmd {
        VenueCmd::Add { name } => {
            let venue = ctx
                .venues
                .upsert(json!({"name": name}))
                .await
                .map_err(|e| anyhow::anyhow!("add failed: {e}"))?;
            println!("added {} ({})", venue.name, venue.id);
        }
        VenueCmd::List => {
            for venue in ctx
                .venues
                .list()
                .await
                .map_err(|e| anyhow::anyhow!("list failed: {e}"))?
            {
                println!("{}  {}", venue.id, venue.name);
            }
        }
        VenueCmd::Search { query } => {
            let hits = ctx
                .venues
                .search(&query)
                .await
                .map_err(|e| anyhow::anyhow!("search failed: {e}"))?;
            if hits.is_empty() {
                println!("no venues match {query:?}");
            }
            for venue in hits {
                println!("{}  {}", venue.id, venue.name);
            }
        }
        VenueCmd::Remove { venue_id } => {
            if ctx
                .venues
                .get(&venue_id)
                .await
                .map_err(|e| anyhow::anyhow!("lookup failed: {e}"))?
                .is_none()
            {
                bail!("unknown venue: {venue_id}");
            }
            ctx.venues
                .delete(&venue_id)
                .await
                .map_err(|e| anyhow::anyhow!("remove failed: {e}"))?;
            println!("removed {venue_id}");
        }
    }
    Ok(())
}
