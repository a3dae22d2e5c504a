//! The `sync` subcommand: fire one foreground trigger.

use anyhow::Context as _;

use dink_sync::SyncContext;
use dink_sync::model::AuthSession;
use dink_sync::remote::HttpRemoteStore;
use dink_sync::sync::SyncOutcome;

pub async fn run(
    ctx: &SyncContext<HttpRemoteStore>,
    session: Option<&AuthSession>,
) -> anyhow::Result<()> {
    let session = session.context("sign-in required; pass --user-id")?;

    match ctx
        .trigger
        .fire(Some(session))
        .await
        .context("trigger produced no sync pass")?
    {
        SyncOutcome::Completed { failures: 0 } => println!("sync complete"),
        SyncOutcome::Completed { failures } => {
            println!("sync finished with {failures} failed entity type(s); will retry next pass");
        }
        SyncOutcome::InFlight => println!("sync already in flight, skipped"),
        SyncOutcome::Throttled => println!("sync throttled, try again shortly"),
    }
    Ok(())
}
