//! REST payload types for the admin endpoints.
//!
//! The backend speaks camelCase JSON; every struct here carries
//! `#[serde(rename_all = "camelCase")]` so Rust field names stay
//! idiomatic. These are plain data — no behavior beyond (de)serialization
//! and display.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Credential;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a platform user.
///
/// Newtype over the backend's opaque string id so a user id can't be
/// confused with a username or a bet id in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

/// Body of `POST /api/admin/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response of `POST /api/admin/login`: the freshly issued credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: Credential,
}

// ---------------------------------------------------------------------------
// Dashboard KPIs
// ---------------------------------------------------------------------------

/// Platform-wide counters shown on the dashboard, `GET /api/admin/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    /// Registered users, all time.
    pub total_users: u64,

    /// Settled bets, all time.
    pub total_bets: u64,

    /// Total wagered volume in platform points (XP).
    pub total_volume: f64,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// One row of the moderation user list, `GET /api/admin/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: UserId,
    pub username: String,
    pub email: String,

    /// Whether moderation has banned this account.
    pub banned: bool,

    /// ISO-8601 registration timestamp.
    pub joined_at: String,

    /// ISO-8601 last-activity timestamp; `None` for never-active
    /// accounts.
    #[serde(default)]
    pub last_active: Option<String>,
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// Outcome of a settled bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Win,
    Loss,
}

/// One settled bet, `GET /api/admin/bets` and the `bet_placed` push
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetRecord {
    pub username: String,

    /// Which game produced this bet (`wave_flip`, `wave_challenge_flip`,
    /// `wave_prize_pool`).
    pub game_type: String,

    /// Wagered amount in XP.
    pub amount: f64,

    pub result: BetResult,

    /// Amount paid out on a win; absent on losses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<f64>,

    /// ISO-8601 settlement timestamp.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// One point of the analytics series, `GET /api/admin/analytics`.
///
/// A point per `(date, game)` pair: the wager-over-time chart groups by
/// `date`, the game-popularity chart groups by `game`. One shape serves
/// both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPoint {
    /// Calendar day, `YYYY-MM-DD`.
    pub date: String,

    /// Game identifier.
    pub game: String,

    /// Bets settled for this game on this day.
    pub total_bets: u64,

    /// Distinct players for this game on this day.
    pub count: u64,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! JSON-shape tests against the backend's camelCase contract.

    use super::*;

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId("u-77".into())).unwrap();
        assert_eq!(json, "\"u-77\"");
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId("7".into()).to_string(), "U-7");
    }

    #[test]
    fn test_admin_stats_uses_camel_case_fields() {
        let stats: AdminStats = serde_json::from_str(
            r#"{"totalUsers":12,"totalBets":340,"totalVolume":9001.5}"#,
        )
        .unwrap();

        assert_eq!(stats.total_users, 12);
        assert_eq!(stats.total_bets, 340);
        assert_eq!(stats.total_volume, 9001.5);
    }

    #[test]
    fn test_admin_user_decodes_full_row() {
        let user: AdminUser = serde_json::from_str(
            r#"{
                "id": "u-1",
                "username": "alice",
                "email": "alice@example.com",
                "banned": false,
                "joinedAt": "2026-01-05T09:00:00Z",
                "lastActive": "2026-08-20T17:30:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(user.id, UserId("u-1".into()));
        assert!(!user.banned);
        assert_eq!(user.last_active.as_deref(), Some("2026-08-20T17:30:00Z"));
    }

    #[test]
    fn test_admin_user_missing_last_active_defaults_to_none() {
        // Never-active accounts simply omit the field.
        let user: AdminUser = serde_json::from_str(
            r#"{
                "id": "u-2",
                "username": "bob",
                "email": "bob@example.com",
                "banned": true,
                "joinedAt": "2026-02-01T00:00:00Z"
            }"#,
        )
        .unwrap();

        assert_eq!(user.last_active, None);
        assert!(user.banned);
    }

    #[test]
    fn test_bet_result_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BetResult::Win).unwrap(),
            "\"win\""
        );
        assert_eq!(
            serde_json::to_string(&BetResult::Loss).unwrap(),
            "\"loss\""
        );
    }

    #[test]
    fn test_bet_record_loss_omits_payout() {
        let bet = BetRecord {
            username: "bob".into(),
            game_type: "wave_prize_pool".into(),
            amount: 10.0,
            result: BetResult::Loss,
            payout: None,
            timestamp: "2026-08-01T12:00:00Z".into(),
        };
        let json = serde_json::to_value(&bet).unwrap();

        assert_eq!(json["gameType"], "wave_prize_pool");
        assert_eq!(json["result"], "loss");
        assert!(json.get("payout").is_none());
    }

    #[test]
    fn test_login_response_carries_raw_token() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"token":"h.p.s"}"#).unwrap();
        assert_eq!(resp.token.as_str(), "h.p.s");
    }

    #[test]
    fn test_analytics_point_decodes_camel_case() {
        let point: AnalyticsPoint = serde_json::from_str(
            r#"{"date":"2026-08-01","game":"wave_flip","totalBets":42,"count":17}"#,
        )
        .unwrap();

        assert_eq!(point.date, "2026-08-01");
        assert_eq!(point.total_bets, 42);
        assert_eq!(point.count, 17);
    }
}
