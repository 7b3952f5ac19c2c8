use serde::Deserialize;

use crate::state::Queue;

// ============================================================================
// Summoner
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSummonerDto {
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub summoner_id: u64,
    pub puuid: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub tag_line: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub summoner_level: u32,
    #[serde(default)]
    pub profile_icon_id: i32,
}

impl CurrentSummonerDto {
    /// Riot ID game name, falling back to the legacy display name.
    pub fn name(&self) -> &str {
        if self.game_name.is_empty() {
            &self.display_name
        } else {
            &self.game_name
        }
    }
}

// ============================================================================
// Ranked
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStatsDto {
    #[serde(default)]
    pub queues: Vec<RankedQueueDto>,
}

impl RankedStatsDto {
    pub fn queue(&self, queue: Queue) -> Option<&RankedQueueDto> {
        self.queues
            .iter()
            .find(|entry| entry.queue_type == queue.queue_type())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankedQueueDto {
    pub queue_type: String,
    pub tier: String,
    pub division: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
    pub previous_season_end_tier: Option<String>,
    pub previous_season_end_division: Option<String>,
}

// ============================================================================
// Account verification
// ============================================================================

/// Either a bare flag or the status object some client builds return.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PhoneVerificationDto {
    Flag(bool),
    Status { success: bool },
}

impl PhoneVerificationDto {
    pub fn is_verified(&self) -> bool {
        match self {
            Self::Flag(verified) => *verified,
            Self::Status { success } => *success,
        }
    }
}

// ============================================================================
// Champions
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedChampionDto {
    #[serde(default)]
    pub id: i32,
    pub name: String,
}

// ============================================================================
// Gameflow
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GameflowPhase {
    None,
    Lobby,
    Matchmaking,
    CheckedIntoTournament,
    ReadyCheck,
    ChampSelect,
    GameStart,
    FailedToLaunch,
    InProgress,
    Reconnect,
    WaitingForStats,
    PreEndOfGame,
    EndOfGame,
    TerminatedInError,
    #[serde(other)]
    Unknown,
}

impl GameflowPhase {
    /// Phases during which profile, rank and inventory can be read consistently.
    pub fn is_stable(&self) -> bool {
        matches!(self, Self::None | Self::Lobby | Self::EndOfGame)
    }
}
