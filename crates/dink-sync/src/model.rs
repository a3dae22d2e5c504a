//! Data model for Dink entities.
//!
//! Profiles, venues and matches are stored as JSON documents in the
//! local cache and exchanged as-is with the remote store, so every
//! model type derives serde both ways. Partial upserts merge into an
//! existing document, which is why fields carry serde defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A cacheable entity type.
///
/// Implemented by [`Profile`], [`Venue`] and [`Match`]; the generic
/// entity cache and remote store are instantiated once per implementor.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Storage discriminator (the `kind` column).
    const KIND: &'static str;
    /// Remote collection path segment (e.g. `"profiles"`).
    const COLLECTION: &'static str;

    fn id(&self) -> &str;
    fn synced(&self) -> bool;
    fn set_synced(&mut self, synced: bool);
}

/// A player identity.
///
/// Either a locally created placeholder (guest, random id, no backend
/// account) or a real profile whose id equals its backend account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub is_placeholder: bool,
    pub dupr_id: Option<String>,
    pub synced: bool,
}

impl Profile {
    /// Create a fresh placeholder profile with a random local id.
    pub fn placeholder(display_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            is_placeholder: true,
            dupr_id: None,
            synced: false,
        }
    }
}

impl Entity for Profile {
    const KIND: &'static str = "profile";
    const COLLECTION: &'static str = "profiles";

    fn id(&self) -> &str {
        &self.id
    }

    fn synced(&self) -> bool {
        self.synced
    }

    fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }
}

/// A place where matches are played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub synced: bool,
}

impl Entity for Venue {
    const KIND: &'static str = "venue";
    const COLLECTION: &'static str = "venues";

    fn id(&self) -> &str {
        &self.id
    }

    fn synced(&self) -> bool {
        self.synced
    }

    fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }
}

/// One team's verification of a match result.
///
/// The team asserts the full score pair; two teams asserting different
/// pairs is what makes a match disputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamVerification {
    /// Profile id of the participant who verified for this team.
    pub verified_by: String,
    /// Unix milliseconds.
    pub verified_at: i64,
    pub score_team1: i64,
    pub score_team2: i64,
}

impl TeamVerification {
    pub fn asserted_score(&self) -> (i64, i64) {
        (self.score_team1, self.score_team2)
    }
}

/// Which side of the net a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    One,
    Two,
}

impl Team {
    pub const fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

/// A recorded match.
///
/// Participant slots hold profile ids (possibly placeholders) and may
/// be empty for singles. `created_by` is the profile that recorded the
/// match; recording does not count as that side's verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Match {
    pub id: String,
    pub team1_player1: Option<String>,
    pub team1_player2: Option<String>,
    pub team2_player1: Option<String>,
    pub team2_player2: Option<String>,
    pub score_team1: i64,
    pub score_team2: i64,
    /// Unix milliseconds.
    pub created_at: i64,
    pub created_by: Option<String>,
    pub venue_id: Option<String>,
    pub team1_verification: Option<TeamVerification>,
    pub team2_verification: Option<TeamVerification>,
    pub synced: bool,
}

impl Match {
    /// Which team a profile plays on, if any.
    pub fn team_of(&self, profile_id: &str) -> Option<Team> {
        let on = |slot: &Option<String>| slot.as_deref() == Some(profile_id);
        if on(&self.team1_player1) || on(&self.team1_player2) {
            Some(Team::One)
        } else if on(&self.team2_player1) || on(&self.team2_player2) {
            Some(Team::Two)
        } else {
            None
        }
    }

    pub fn is_participant(&self, profile_id: &str) -> bool {
        self.team_of(profile_id).is_some()
    }

    /// All non-empty participant slots.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        [
            &self.team1_player1,
            &self.team1_player2,
            &self.team2_player1,
            &self.team2_player2,
        ]
        .into_iter()
        .filter_map(|s| s.as_deref())
    }

    pub fn verification_of(&self, team: Team) -> Option<&TeamVerification> {
        match team {
            Team::One => self.team1_verification.as_ref(),
            Team::Two => self.team2_verification.as_ref(),
        }
    }
}

impl Entity for Match {
    const KIND: &'static str = "match";
    const COLLECTION: &'static str = "matches";

    fn id(&self) -> &str {
        &self.id
    }

    fn synced(&self) -> bool {
        self.synced
    }

    fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }
}

/// The device -> profile binding row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeviceLink {
    pub device_key: String,
    pub profile_id: String,
    pub updated_at: i64,
}

/// An authenticated session, supplied by the external auth provider.
///
/// Read-only input: the sync layer never mutates or refreshes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// Backend account id (`user.id` from the auth provider).
    pub user_id: String,
    /// Bearer token for remote store calls, when available.
    pub access_token: Option<String>,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }
}
