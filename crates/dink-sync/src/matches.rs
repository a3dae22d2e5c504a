//! Guarded match mutations.
//!
//! The entity cache stores whatever it is given; the rules live here.
//! Participant slots must reference cached profiles, only participants
//! may edit or verify, and a fully verified match is locked.

use dink_core::db::unix_timestamp_ms;

use crate::error::MatchError;
use crate::model::{Entity, Match, Profile, Team, TeamVerification};
use crate::storage::EntityCache;
use crate::verify::{MatchStatus, match_status};

/// Parameters for recording a new match.
#[derive(Debug, Clone, Default)]
pub struct RecordMatch {
    pub team1_player1: Option<String>,
    pub team1_player2: Option<String>,
    pub team2_player1: Option<String>,
    pub team2_player2: Option<String>,
    pub score_team1: i64,
    pub score_team2: i64,
    /// Profile id of the recording device's linked profile.
    pub created_by: Option<String>,
    pub venue_id: Option<String>,
}

/// Record a match with a provisional score.
///
/// Every filled participant slot must reference a cached profile
/// (local placeholder or real).
pub async fn record_match(
    matches: &EntityCache<Match>,
    profiles: &EntityCache<Profile>,
    params: RecordMatch,
) -> Result<Match, MatchError> {
    let m = Match {
        id: uuid::Uuid::new_v4().to_string(),
        team1_player1: params.team1_player1,
        team1_player2: params.team1_player2,
        team2_player1: params.team2_player1,
        team2_player2: params.team2_player2,
        score_team1: params.score_team1,
        score_team2: params.score_team2,
        created_at: unix_timestamp_ms(),
        created_by: params.created_by,
        venue_id: params.venue_id,
        team1_verification: None,
        team2_verification: None,
        synced: false,
    };

    for participant in m.participants() {
        if profiles.get(participant).await?.is_none() {
            return Err(MatchError::UnknownParticipant(participant.to_string()));
        }
    }

    matches.put(&m).await?;
    Ok(m)
}

/// Edit the provisional score.
///
/// Only a participant may edit. A fully verified match is locked; an
/// edit to an unlocked match clears both sides' verifications so any
/// standing agreement is always about the current score.
pub async fn update_score(
    matches: &EntityCache<Match>,
    match_id: &str,
    editor_profile_id: &str,
    score_team1: i64,
    score_team2: i64,
) -> Result<Match, MatchError> {
    let mut m = load(matches, match_id).await?;

    if match_status(&m, Some(editor_profile_id)) == MatchStatus::Verified {
        return Err(MatchError::Locked);
    }
    if !m.is_participant(editor_profile_id) {
        return Err(MatchError::NotAParticipant(editor_profile_id.to_string()));
    }

    m.score_team1 = score_team1;
    m.score_team2 = score_team2;
    m.team1_verification = None;
    m.team2_verification = None;
    m.set_synced(false);

    matches.put(&m).await?;
    Ok(m)
}

/// Record the viewer's team's verification, asserting a score pair.
///
/// Overwrites any earlier verification by the same team. Rejected once
/// the match is fully verified.
pub async fn record_verification(
    matches: &EntityCache<Match>,
    match_id: &str,
    viewer_profile_id: &str,
    score_team1: i64,
    score_team2: i64,
) -> Result<Match, MatchError> {
    let mut m = load(matches, match_id).await?;

    if match_status(&m, Some(viewer_profile_id)) == MatchStatus::Verified {
        return Err(MatchError::Locked);
    }
    let team = m
        .team_of(viewer_profile_id)
        .ok_or_else(|| MatchError::NotAParticipant(viewer_profile_id.to_string()))?;

    let verification = TeamVerification {
        verified_by: viewer_profile_id.to_string(),
        verified_at: unix_timestamp_ms(),
        score_team1,
        score_team2,
    };
    match team {
        Team::One => m.team1_verification = Some(verification),
        Team::Two => m.team2_verification = Some(verification),
    }
    m.set_synced(false);

    matches.put(&m).await?;
    Ok(m)
}

async fn load(matches: &EntityCache<Match>, match_id: &str) -> Result<Match, MatchError> {
    matches
        .get(match_id)
        .await?
        .ok_or_else(|| MatchError::NotFound(match_id.to_string()))
}
