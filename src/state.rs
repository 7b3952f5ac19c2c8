use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::error::AppError;
use crate::lcu::types::{CurrentSummonerDto, RankedQueueDto};

// ============================================================================
// Login
// ============================================================================

/// Username and password for one login flow. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, AppError> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            return Err(AppError::EmptyCredentials);
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
pub struct LoginAttempt<'a> {
    pub credentials: &'a Credentials,
    /// 1 or 2.
    pub attempt_number: u8,
    pub started_at: Instant,
}

impl<'a> LoginAttempt<'a> {
    pub fn new(credentials: &'a Credentials, attempt_number: u8) -> Self {
        Self {
            credentials,
            attempt_number,
            started_at: Instant::now(),
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Ranked queues mirrored in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    SoloDuo,
    Flex,
}

impl Queue {
    pub fn queue_type(&self) -> &'static str {
        match self {
            Self::SoloDuo => "RANKED_SOLO_5x5",
            Self::Flex => "RANKED_FLEX_SR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    pub tier: String,
    pub division: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
    pub previous_season_end_tier: Option<String>,
    pub previous_season_end_division: Option<String>,
}

impl From<&RankedQueueDto> for RankEntry {
    fn from(dto: &RankedQueueDto) -> Self {
        Self {
            tier: dto.tier.clone(),
            division: dto.division.clone(),
            league_points: dto.league_points,
            wins: dto.wins,
            losses: dto.losses,
            previous_season_end_tier: non_empty(&dto.previous_season_end_tier),
            previous_season_end_division: non_empty(&dto.previous_season_end_division),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// Identity fields of the logged in summoner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummonerInfo {
    pub puuid: String,
    pub summoner_id: u64,
    pub account_id: u64,
    pub game_name: String,
    pub tag_line: String,
    pub summoner_level: u32,
    pub profile_icon_id: i32,
}

impl SummonerInfo {
    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.game_name, self.tag_line)
    }
}

impl From<&CurrentSummonerDto> for SummonerInfo {
    fn from(dto: &CurrentSummonerDto) -> Self {
        Self {
            puuid: dto.puuid.clone(),
            summoner_id: dto.summoner_id,
            account_id: dto.account_id,
            game_name: dto.game_name.clone(),
            tag_line: dto.tag_line.clone(),
            summoner_level: dto.summoner_level,
            profile_icon_id: dto.profile_icon_id,
        }
    }
}

/// Complete account state from one successful gather. Replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub username: String,
    pub summoner_name: String,
    pub summoner_info: SummonerInfo,
    pub solo_queue_rank: Option<RankEntry>,
    pub flex_queue_rank: Option<RankEntry>,
    pub is_phone_verified: bool,
    pub owned_champions: Vec<String>,
    pub captured_at: DateTime<Utc>,
    pub connected: bool,
}

/// Messages published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Update {
    SnapshotUpdated {
        username: String,
        snapshot: AccountSnapshot,
    },
    ConnectionTimeout {
        username: String,
        attempts: u32,
    },
}
