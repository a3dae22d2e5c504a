//! Profile subcommands: creation, device linking, claim codes.

use anyhow::{Context as _, bail};
use clap::Subcommand;
use serde_json::json;

use dink_sync::SyncContext;
use dink_sync::claim;
use dink_sync::identity;
use dink_sync::model::{AuthSession, Profile};
use dink_sync::remote::HttpRemoteStore;

#[derive(Subcommand, Debug)]
pub enum ProfileCmd {
    /// First-use setup: create a placeholder profile and link this device to it
    Init {
        #[arg(long)]
        name: String,
    },
    /// Create a guest (placeholder) profile, e.g. for an opponent
    Create {
        #[arg(long)]
        name: String,
    },
    /// List cached profiles
    List,
    /// Switch the device's active profile
    Use { profile_id: String },
    /// Print a claim code for the device's active profile
    Code,
    /// Apply a scanned claim code to a placeholder profile
    Claim {
        /// Raw claim payload (the scanned string)
        payload: String,
        /// Placeholder to claim; defaults to the device's active profile
        #[arg(long)]
        profile_id: Option<String>,
    },
    /// Link the signed-in account to its profile (discover or promote)
    Link,
}

pub async fn run(
    ctx: &SyncContext<HttpRemoteStore>,
    cmd: ProfileCmd,
    session: Option<&AuthSession>,
) -> anyhow::Result<()> {
    match cmd {
        ProfileCmd::Init { name } => {
            let (profile, link) = identity::bootstrap_device(&ctx.profiles, &ctx.links, &name)
                .await
                .map_err(|e| anyhow::anyhow!("bootstrap failed: {e}"))?;
            println!("created {} ({})", profile.display_name, profile.id);
            println!("device now acts as {}", link.profile_id);
        }
        ProfileCmd::Create { name } => {
            let profile = ctx
                .profiles
                .upsert(json!({"display_name": name, "is_placeholder": true}))
                .await
                .map_err(|e| anyhow::anyhow!("create failed: {e}"))?;
            println!("created {} ({})", profile.display_name, profile.id);
        }
        ProfileCmd::List => {
            let link = ctx.links.load_link().await.ok().flatten();
            for profile in ctx
                .profiles
                .list()
                .await
                .map_err(|e| anyhow::anyhow!("list failed: {e}"))?
            {
                println!("{}", describe(&profile, link.as_ref().map(|l| l.profile_id.as_str())));
            }
        }
        ProfileCmd::Use { profile_id } => {
            if ctx
                .profiles
                .get(&profile_id)
                .await
                .map_err(|e| anyhow::anyhow!("lookup failed: {e}"))?
                .is_none()
            {
                bail!("unknown profile: {profile_id}");
            }
            let link = ctx
                .links
                .set_profile_for_device(&profile_id)
                .await
                .map_err(|e| anyhow::anyhow!("link update failed: {e}"))?;
            println!("device now acts as {}", link.profile_id);
        }
        ProfileCmd::Code => {
            let link = ctx
                .links
                .load_link()
                .await
                .map_err(|e| anyhow::anyhow!("link lookup failed: {e}"))?
                .context("no profile linked to this device; run `dink profile init`")?;
            let profile = ctx
                .profiles
                .get(&link.profile_id)
                .await
                .map_err(|e| anyhow::anyhow!("lookup failed: {e}"))?
                .context("linked profile missing from cache")?;
            println!("{}", claim::encode_now(&profile));
        }
        ProfileCmd::Claim { payload, profile_id } => {
            let token = claim::parse_now(&payload, false)
                .map_err(|e| anyhow::anyhow!("claim code rejected: {e}"))?;
            let target = match profile_id {
                Some(id) => id,
                None => ctx
                    .links
                    .load_link()
                    .await
                    .map_err(|e| anyhow::anyhow!("link lookup failed: {e}"))?
                    .context("no profile linked to this device")?
                    .profile_id,
            };
            let claimed =
                identity::apply_claim(&ctx.profiles, &ctx.matches, &ctx.links, &token, &target)
                    .await
                    .map_err(|e| anyhow::anyhow!("claim failed: {e}"))?;
            println!("claimed: {} is now {}", target, claimed.id);
        }
        ProfileCmd::Link => {
            let session = session.context("sign-in required; pass --user-id")?;
            let profile = identity::link_remote_profile(
                &ctx.profiles,
                &ctx.matches,
                &ctx.links,
                ctx.trigger.orchestrator().remote(),
                session,
            )
            .await
            .map_err(|e| anyhow::anyhow!("account link failed: {e}"))?;
            println!("device now acts as {} ({})", profile.display_name, profile.id);
        }
    }
    Ok(())
}

fn describe(profile: &Profile, active_id: Option<&str>) -> String {
    let marker = if active_id == Some(profile.id.as_str()) {
        "*"
    } else {
        " "
    };
    let kind = if profile.is_placeholder { "guest" } else { "real" };
    let synced = if profile.synced { "synced" } else { "pending" };
    format!(
        "{marker} {}  {} [{kind}, {synced}]",
        profile.id, profile.display_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_marks_active_profile() {
        let p = Profile {
            id: "p-1".to_string(),
            display_name: "Ada".to_string(),
            is_placeholder: false,
            dupr_id: None,
            synced: true,
        };
        assert!(describe(&p, Some("p-1")).starts_with('*'));
        assert!(describe(&p, Some("p-2")).starts_with(' '));
        assert!(describe(&p, None).contains("[real, synced]"));
    }
}
