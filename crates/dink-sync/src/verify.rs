//! Match verification state machine.
//!
//! A pure, total derivation from a match record plus the viewing
//! profile's relationship to it. Nothing here is stored; labels and
//! colors are computed on demand for presentation.

use crate::model::{Match, Team};

/// Verification status of a match from a given viewer's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    /// No side has verified yet.
    Pending,
    /// The viewer's side owes a verification.
    AwaitingMyVerification,
    /// The viewer's side verified; waiting on the other side.
    AwaitingOpponentVerification,
    /// One side verified; the viewer is absent or not a participant,
    /// so the perspective-dependent states collapse to this.
    PartiallyVerified,
    /// Both sides verified and their asserted scores agree.
    Verified,
    /// Both sides verified with conflicting scores.
    Disputed,
}

impl MatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::AwaitingMyVerification => "Needs your verification",
            Self::AwaitingOpponentVerification => "Awaiting opponent",
            Self::PartiallyVerified => "Partially verified",
            Self::Verified => "Verified",
            Self::Disputed => "Disputed",
        }
    }

    pub const fn color(self) -> &'static str {
        match self {
            Self::Pending => "#9CA3AF",
            Self::AwaitingMyVerification => "#F59E0B",
            Self::AwaitingOpponentVerification => "#3B82F6",
            Self::PartiallyVerified => "#6366F1",
            Self::Verified => "#10B981",
            Self::Disputed => "#EF4444",
        }
    }
}

/// Derive a match's status for a viewer (or a neutral reader).
pub fn match_status(m: &Match, viewer_profile_id: Option<&str>) -> MatchStatus {
    let viewer_team = viewer_profile_id.and_then(|id| m.team_of(id));

    match (&m.team1_verification, &m.team2_verification) {
        (Some(v1), Some(v2)) => {
            if v1.asserted_score() == v2.asserted_score() {
                MatchStatus::Verified
            } else {
                MatchStatus::Disputed
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            let verified_team = if m.team1_verification.is_some() {
                Team::One
            } else {
                Team::Two
            };
            match viewer_team {
                Some(team) if team == verified_team => MatchStatus::AwaitingOpponentVerification,
                Some(_) => MatchStatus::AwaitingMyVerification,
                None => MatchStatus::PartiallyVerified,
            }
        }
        (None, None) => {
            // A match recorded by the opposing side is already a score
            // assertion the viewer should confirm or dispute.
            let recorder_team = m.created_by.as_deref().and_then(|id| m.team_of(id));
            match (viewer_team, recorder_team) {
                (Some(mine), Some(theirs)) if mine != theirs => {
                    MatchStatus::AwaitingMyVerification
                }
                _ => MatchStatus::Pending,
            }
        }
    }
}
