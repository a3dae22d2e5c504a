//! Profile identity flows: first-use bootstrap, claim application,
//! and linking a signed-in account to its profile.
//!
//! A placeholder's id is replaced, never mutated: these flows create
//! the successor profile under the new id, re-point every reference
//! (device link, match participant slots, recorder and verifier
//! fields), then delete the placeholder row.

use tracing::info;

use crate::claim::ClaimToken;
use crate::error::IdentityError;
use crate::model::{AuthSession, DeviceLink, Entity, Match, Profile};
use crate::remote::ProfileDirectory;
use crate::storage::{DeviceLinkStore, EntityCache};

/// First-use path: create a placeholder profile and link the device to it.
pub async fn bootstrap_device(
    profiles: &EntityCache<Profile>,
    links: &DeviceLinkStore,
    display_name: &str,
) -> Result<(Profile, DeviceLink), IdentityError> {
    let profile = Profile::placeholder(display_name);
    profiles.put(&profile).await?;
    let link = links.ensure_link_for_device(&profile.id).await?;

    info!(profile_id = %profile.id, "Bootstrapped device with placeholder profile");
    Ok((profile, link))
}

/// Apply a scanned claim token to a local placeholder profile.
///
/// Authorization rule: only a token asserting a real profile may claim
/// a placeholder; a placeholder cannot claim another placeholder. The
/// placeholder id is replaced by the token's profile id everywhere.
pub async fn apply_claim(
    profiles: &EntityCache<Profile>,
    matches: &EntityCache<Match>,
    links: &DeviceLinkStore,
    token: &ClaimToken,
    placeholder_id: &str,
) -> Result<Profile, IdentityError> {
    if !token.is_real_profile() {
        return Err(IdentityError::PlaceholderClaim);
    }

    let placeholder = profiles
        .get(placeholder_id)
        .await?
        .ok_or_else(|| IdentityError::ProfileNotFound(placeholder_id.to_string()))?;
    if !placeholder.is_placeholder {
        return Err(IdentityError::NotAPlaceholder(placeholder_id.to_string()));
    }

    let claimed = Profile {
        id: token.profile_id.clone(),
        display_name: token.display_name.clone(),
        is_placeholder: false,
        dupr_id: placeholder.dupr_id,
        synced: false,
    };
    profiles.put(&claimed).await?;

    relink_references(matches, placeholder_id, &claimed.id).await?;

    if let Some(link) = links.load_link().await? {
        if link.profile_id == placeholder_id {
            links.set_profile_for_device(&claimed.id).await?;
        }
    }

    profiles.delete(placeholder_id).await?;

    info!(old = placeholder_id, new = %claimed.id, "Placeholder claimed");
    Ok(claimed)
}

/// Link a signed-in user to their profile.
///
/// When the remote already knows a profile owned by `session.user_id`,
/// it is merged into the cache and becomes the device's profile.
/// Otherwise the currently linked placeholder is promoted in place:
/// re-identified under the account id with `is_placeholder` cleared,
/// pending push on the next sync. A device with no link at all gets a
/// fresh profile under the account id.
pub async fn link_remote_profile<D: ProfileDirectory>(
    profiles: &EntityCache<Profile>,
    matches: &EntityCache<Match>,
    links: &DeviceLinkStore,
    directory: &D,
    session: &AuthSession,
) -> Result<Profile, IdentityError> {
    if let Some(mut remote) = directory.fetch_by_owner(&session.user_id).await? {
        remote.set_synced(true);
        profiles.put(&remote).await?;
        links.ensure_link_for_device(&remote.id).await?;

        info!(profile_id = %remote.id, "Linked existing remote profile");
        return Ok(remote);
    }

    let Some(link) = links.load_link().await? else {
        let profile = Profile {
            id: session.user_id.clone(),
            display_name: String::new(),
            is_placeholder: false,
            dupr_id: None,
            synced: false,
        };
        profiles.put(&profile).await?;
        links.ensure_link_for_device(&profile.id).await?;
        return Ok(profile);
    };

    let current = profiles
        .get(&link.profile_id)
        .await?
        .ok_or_else(|| IdentityError::ProfileNotFound(link.profile_id.clone()))?;

    if !current.is_placeholder {
        // Already a real profile (e.g. repeat sign-in); keep the link.
        links.ensure_link_for_device(&current.id).await?;
        return Ok(current);
    }

    let promoted = Profile {
        id: session.user_id.clone(),
        display_name: current.display_name,
        is_placeholder: false,
        dupr_id: current.dupr_id,
        synced: false,
    };
    profiles.put(&promoted).await?;
    relink_references(matches, &link.profile_id, &promoted.id).await?;
    links.set_profile_for_device(&promoted.id).await?;
    profiles.delete(&link.profile_id).await?;

    info!(old = %link.profile_id, new = %promoted.id, "Promoted placeholder to account profile");
    Ok(promoted)
}

/// Replace every reference to `old_id` across cached matches.
async fn relink_references(
    matches: &EntityCache<Match>,
    old_id: &str,
    new_id: &str,
) -> Result<(), IdentityError> {
    for mut m in matches.list().await? {
        let mut touched = false;
        for slot in [
            &mut m.team1_player1,
            &mut m.team1_player2,
            &mut m.team2_player1,
            &mut m.team2_player2,
            &mut m.created_by,
        ] {
            if slot.as_deref() == Some(old_id) {
                *slot = Some(new_id.to_string());
                touched = true;
            }
        }
        for verification in [&mut m.team1_verification, &mut m.team2_verification] {
            if let Some(v) = verification {
                if v.verified_by == old_id {
                    v.verified_by = new_id.to_string();
                    touched = true;
                }
            }
        }
        if touched {
            m.set_synced(false);
            matches.put(&m).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::claim;
    use crate::matches::{RecordMatch, record_match};
    use crate::remote::InMemoryRemote;
    use crate::storage::Database;

    use super::*;

    struct Fix {
        profiles: EntityCache<Profile>,
        matches: EntityCache<Match>,
        links: DeviceLinkStore,
    }

    async fn fix() -> Fix {
        let db = Database::open_in_memory().await.unwrap();
        Fix {
            profiles: EntityCache::new(db.clone()),
            matches: EntityCache::new(db.clone()),
            links: DeviceLinkStore::new(db),
        }
    }

    fn real_token(id: &str, name: &str) -> ClaimToken {
        let profile = Profile {
            id: id.to_string(),
            display_name: name.to_string(),
            is_placeholder: false,
            dupr_id: None,
            synced: true,
        };
        claim::build(&profile, 0)
    }

    #[tokio::test]
    async fn bootstrap_creates_placeholder_and_link() {
        let f = fix().await;
        let (profile, link) = bootstrap_device(&f.profiles, &f.links, "Guest").await.unwrap();

        assert!(profile.is_placeholder);
        assert!(!profile.synced);
        assert_eq!(link.profile_id, profile.id);
        assert_eq!(f.profiles.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn apply_claim_replaces_placeholder_everywhere() {
        let f = fix().await;
        let (guest, _) = bootstrap_device(&f.profiles, &f.links, "Guest").await.unwrap();
        f.profiles
            .upsert(json!({"id": "opp", "display_name": "Opp"}))
            .await
            .unwrap();

        let m = record_match(
            &f.matches,
            &f.profiles,
            RecordMatch {
                team1_player1: Some(guest.id.clone()),
                team2_player1: Some("opp".to_string()),
                score_team1: 11,
                score_team2: 3,
                created_by: Some(guest.id.clone()),
                ..RecordMatch::default()
            },
        )
        .await
        .unwrap();

        let token = real_token("acct-9", "Ada");
        let claimed = apply_claim(&f.profiles, &f.matches, &f.links, &token, &guest.id)
            .await
            .unwrap();

        assert_eq!(claimed.id, "acct-9");
        assert!(!claimed.is_placeholder);
        // Placeholder row gone, references re-pointed.
        assert!(f.profiles.get(&guest.id).await.unwrap().is_none());
        let m = f.matches.get(&m.id).await.unwrap().unwrap();
        assert_eq!(m.team1_player1.as_deref(), Some("acct-9"));
        assert_eq!(m.created_by.as_deref(), Some("acct-9"));
        // Device now acts as the claimed profile.
        let link = f.links.load_link().await.unwrap().unwrap();
        assert_eq!(link.profile_id, "acct-9");
    }

    #[tokio::test]
    async fn placeholder_token_cannot_claim() {
        let f = fix().await;
        let (guest, _) = bootstrap_device(&f.profiles, &f.links, "Guest").await.unwrap();

        let token = claim::build(&Profile::placeholder("Other Guest"), 0);
        let err = apply_claim(&f.profiles, &f.matches, &f.links, &token, &guest.id)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::PlaceholderClaim));
    }

    #[tokio::test]
    async fn claiming_a_real_profile_is_rejected() {
        let f = fix().await;
        f.profiles
            .upsert(json!({"id": "real-1", "display_name": "Real", "is_placeholder": false}))
            .await
            .unwrap();

        let token = real_token("acct-9", "Ada");
        let err = apply_claim(&f.profiles, &f.matches, &f.links, &token, "real-1")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::NotAPlaceholder(_)));
    }

    #[tokio::test]
    async fn sign_in_links_discovered_remote_profile() {
        let f = fix().await;
        bootstrap_device(&f.profiles, &f.links, "Guest").await.unwrap();

        let remote = InMemoryRemote::new();
        remote.seed_profile(Profile {
            id: "user-1".to_string(),
            display_name: "Ada".to_string(),
            is_placeholder: false,
            dupr_id: Some("D-7".to_string()),
            synced: true,
        });

        let session = AuthSession::new("user-1");
        let linked = link_remote_profile(&f.profiles, &f.matches, &f.links, &remote, &session)
            .await
            .unwrap();

        assert_eq!(linked.id, "user-1");
        assert!(linked.synced);
        let link = f.links.load_link().await.unwrap().unwrap();
        assert_eq!(link.profile_id, "user-1");
    }

    #[tokio::test]
    async fn sign_in_promotes_placeholder_when_remote_is_empty() {
        let f = fix().await;
        let (guest, _) = bootstrap_device(&f.profiles, &f.links, "Guest").await.unwrap();

        let remote = InMemoryRemote::new();
        let session = AuthSession::new("user-1");
        let promoted = link_remote_profile(&f.profiles, &f.matches, &f.links, &remote, &session)
            .await
            .unwrap();

        assert_eq!(promoted.id, "user-1");
        assert_eq!(promoted.display_name, "Guest");
        assert!(!promoted.is_placeholder);
        assert!(!promoted.synced);
        assert!(f.profiles.get(&guest.id).await.unwrap().is_none());
    }
}
