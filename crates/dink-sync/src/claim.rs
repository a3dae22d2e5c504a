//! Claim token protocol.
//!
//! An expiring, versioned JSON payload asserting a profile's identity,
//! transferred out-of-band (scanned code, deep link, clipboard) so one
//! device can reference or take over another device's profile. The
//! 60-second window bounds reuse of a displayed code; the version field
//! lets required fields be introduced without breaking older emitters
//! mid-rollout. Tokens are not cryptographically signed.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use dink_core::db::unix_timestamp_ms;

use crate::model::Profile;

/// Discriminator for the `type` field.
pub const TOKEN_TYPE: &str = "dink/profile-claim";

/// Current payload version. Version 2 made `is_placeholder` required.
pub const TOKEN_VERSION: i64 = 2;

/// Tokens expire this long after issuance.
pub const TOKEN_TTL_MS: i64 = 60_000;

/// Claim token parse failures.
///
/// Surfaced verbatim to the scanning user so they can tell whether to
/// re-generate (expired) or re-scan (malformed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimError {
    #[error("claim payload is not decodable")]
    MalformedPayload,

    #[error("payload is not a profile claim")]
    WrongType,

    #[error("claim payload missing required field: {0}")]
    MissingField(&'static str),

    #[error("claim code has expired")]
    Expired,
}

/// The decoded claim payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimToken {
    #[serde(rename = "type")]
    pub token_type: String,
    pub version: i64,
    #[serde(rename = "profileId")]
    pub profile_id: String,
    pub display_name: String,
    pub is_placeholder: bool,
    /// Absolute expiry, Unix milliseconds.
    pub exp: i64,
}

impl ClaimToken {
    /// Structural identity check against a profile id.
    pub fn matches_profile(&self, profile_id: &str) -> bool {
        self.profile_id == profile_id
    }

    /// True iff the token asserts a real (non-placeholder) profile.
    ///
    /// The claim flow only lets a real profile claim a placeholder; a
    /// placeholder can never claim another placeholder.
    pub const fn is_real_profile(&self) -> bool {
        !self.is_placeholder
    }
}

/// Build a token for `profile`, expiring [`TOKEN_TTL_MS`] after `now_ms`.
pub fn build(profile: &Profile, now_ms: i64) -> ClaimToken {
    ClaimToken {
        token_type: TOKEN_TYPE.to_string(),
        version: TOKEN_VERSION,
        profile_id: profile.id.clone(),
        display_name: profile.display_name.clone(),
        is_placeholder: profile.is_placeholder,
        exp: now_ms + TOKEN_TTL_MS,
    }
}

/// Serialize a freshly built token to its transport string.
pub fn encode(profile: &Profile, now_ms: i64) -> String {
    let token = build(profile, now_ms);
    json!({
        "type": token.token_type,
        "version": token.version,
        "profileId": token.profile_id,
        "display_name": token.display_name,
        "is_placeholder": token.is_placeholder,
        "exp": token.exp,
    })
    .to_string()
}

/// Encode with the system clock.
pub fn encode_now(profile: &Profile) -> String {
    encode(profile, unix_timestamp_ms())
}

/// Parse and validate a raw claim payload.
///
/// A token is valid strictly before its `exp`. `skip_expiration` skips
/// only the expiry check; structural validation always runs.
/// Version gating: payloads with `version < 2` default a missing
/// `is_placeholder` to `false`; from version 2 on the field is
/// required.
pub fn parse(raw: &str, now_ms: i64, skip_expiration: bool) -> Result<ClaimToken, ClaimError> {
    let value: Value = serde_json::from_str(raw).map_err(|_| ClaimError::MalformedPayload)?;
    let obj = value.as_object().ok_or(ClaimError::MalformedPayload)?;

    if obj.get("type").and_then(Value::as_str) != Some(TOKEN_TYPE) {
        return Err(ClaimError::WrongType);
    }

    let version = obj
        .get("version")
        .and_then(Value::as_i64)
        .ok_or(ClaimError::MissingField("version"))?;
    let profile_id = obj
        .get("profileId")
        .and_then(Value::as_str)
        .ok_or(ClaimError::MissingField("profileId"))?;
    let display_name = obj
        .get("display_name")
        .and_then(Value::as_str)
        .ok_or(ClaimError::MissingField("display_name"))?;
    let is_placeholder = match obj.get("is_placeholder").and_then(Value::as_bool) {
        Some(flag) => flag,
        None if version < 2 => false,
        None => return Err(ClaimError::MissingField("is_placeholder")),
    };
    let exp = obj
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(ClaimError::MissingField("exp"))?;

    if !skip_expiration && now_ms >= exp {
        return Err(ClaimError::Expired);
    }

    Ok(ClaimToken {
        token_type: TOKEN_TYPE.to_string(),
        version,
        profile_id: profile_id.to_string(),
        display_name: display_name.to_string(),
        is_placeholder,
        exp,
    })
}

/// Parse with the system clock.
pub fn parse_now(raw: &str, skip_expiration: bool) -> Result<ClaimToken, ClaimError> {
    parse(raw, unix_timestamp_ms(), skip_expiration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest() -> Profile {
        Profile {
            id: "local-abc".to_string(),
            display_name: "Guest".to_string(),
            is_placeholder: true,
            dupr_id: None,
            synced: false,
        }
    }

    #[test]
    fn roundtrip_before_expiry() {
        let p = guest();
        let raw = encode(&p, 0);

        let token = parse(&raw, 59_000, false).unwrap();
        assert_eq!(token, build(&p, 0));
        assert!(token.matches_profile("local-abc"));
        assert!(!token.matches_profile("someone-else"));
    }

    #[test]
    fn expired_at_61_seconds() {
        let raw = encode(&guest(), 0);
        assert_eq!(parse(&raw, 61_000, false).unwrap_err(), ClaimError::Expired);
    }

    #[test]
    fn valid_strictly_before_exp() {
        let raw = encode(&guest(), 0);
        assert!(parse(&raw, 59_999, false).is_ok());
        assert_eq!(parse(&raw, 60_000, false).unwrap_err(), ClaimError::Expired);
    }

    #[test]
    fn skip_expiration_returns_same_fields() {
        let p = guest();
        let raw = encode(&p, 0);

        let token = parse(&raw, 61_000, true).unwrap();
        assert_eq!(token, build(&p, 0));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(
            parse("not json at all", 0, false).unwrap_err(),
            ClaimError::MalformedPayload
        );
        assert_eq!(
            parse("[1,2,3]", 0, false).unwrap_err(),
            ClaimError::MalformedPayload
        );
    }

    #[test]
    fn wrong_discriminator_is_wrong_type() {
        let raw = json!({"type": "dink/something-else", "version": 2, "profileId": "p",
            "display_name": "x", "is_placeholder": false, "exp": 99_999})
        .to_string();
        assert_eq!(parse(&raw, 0, false).unwrap_err(), ClaimError::WrongType);

        let missing = json!({"version": 2, "profileId": "p"}).to_string();
        assert_eq!(parse(&missing, 0, false).unwrap_err(), ClaimError::WrongType);
    }

    #[test]
    fn missing_required_fields_are_named() {
        let no_profile =
            json!({"type": TOKEN_TYPE, "version": 2, "display_name": "x", "exp": 1}).to_string();
        assert_eq!(
            parse(&no_profile, 0, false).unwrap_err(),
            ClaimError::MissingField("profileId")
        );

        let no_name =
            json!({"type": TOKEN_TYPE, "version": 2, "profileId": "p", "exp": 1}).to_string();
        assert_eq!(
            parse(&no_name, 0, false).unwrap_err(),
            ClaimError::MissingField("display_name")
        );

        let no_version =
            json!({"type": TOKEN_TYPE, "profileId": "p", "display_name": "x", "exp": 1})
                .to_string();
        assert_eq!(
            parse(&no_version, 0, false).unwrap_err(),
            ClaimError::MissingField("version")
        );
    }

    #[test]
    fn v2_requires_is_placeholder() {
        let raw = json!({"type": TOKEN_TYPE, "version": 2, "profileId": "p",
            "display_name": "x", "exp": 99_999})
        .to_string();
        assert_eq!(
            parse(&raw, 0, false).unwrap_err(),
            ClaimError::MissingField("is_placeholder")
        );
    }

    #[test]
    fn v1_defaults_is_placeholder_to_false() {
        let raw = json!({"type": TOKEN_TYPE, "version": 1, "profileId": "p",
            "display_name": "x", "exp": 99_999})
        .to_string();
        let token = parse(&raw, 0, false).unwrap();
        assert!(!token.is_placeholder);
        assert!(token.is_real_profile());
    }

    #[test]
    fn mistyped_field_counts_as_missing() {
        let raw = json!({"type": TOKEN_TYPE, "version": 2, "profileId": 42,
            "display_name": "x", "is_placeholder": false, "exp": 99_999})
        .to_string();
        assert_eq!(
            parse(&raw, 0, false).unwrap_err(),
            ClaimError::MissingField("profileId")
        );
    }

    #[test]
    fn real_profile_gate() {
        let mut p = guest();
        assert!(!parse(&encode(&p, 0), 1, false).unwrap().is_real_profile());

        p.is_placeholder = false;
        assert!(parse(&encode(&p, 0), 1, false).unwrap().is_real_profile());
    }
}
