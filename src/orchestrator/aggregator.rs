use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::lcu::types::{CurrentSummonerDto, OwnedChampionDto, PhoneVerificationDto, RankedStatsDto};
use crate::lcu::{ConnectOptions, LocalClient};
use crate::state::{AccountSnapshot, Queue, RankEntry, SummonerInfo};

pub const SUMMONER_PATH: &str = "/lol-summoner/v1/current-summoner";
pub const RANKED_STATS_PATH: &str = "/lol-ranked/v1/current-ranked-stats";
pub const PHONE_VERIFIED_PATH: &str = "/lol-account-verification/v1/is-verified";
pub const OWNED_CHAMPIONS_PATH: &str = "/lol-champions/v1/owned-champions-minimal";

/// Runs the four account queries concurrently and assembles a snapshot.
///
/// The first failing query fails the whole gather; nothing partial escapes.
#[instrument(skip(client, options), fields(username = %username))]
pub async fn gather(
    client: &dyn LocalClient,
    options: &ConnectOptions,
    username: &str,
) -> Result<AccountSnapshot, AppError> {
    let (summoner, ranked, phone, champions) = tokio::try_join!(
        fetch::<CurrentSummonerDto>(client, options, SUMMONER_PATH),
        fetch::<RankedStatsDto>(client, options, RANKED_STATS_PATH),
        fetch::<PhoneVerificationDto>(client, options, PHONE_VERIFIED_PATH),
        fetch::<Vec<OwnedChampionDto>>(client, options, OWNED_CHAMPIONS_PATH),
    )?;

    debug!(
        champions = champions.len(),
        queues = ranked.queues.len(),
        "📥 Gather complete"
    );

    Ok(AccountSnapshot {
        username: username.to_string(),
        summoner_name: summoner.name().to_string(),
        summoner_info: SummonerInfo::from(&summoner),
        solo_queue_rank: ranked.queue(Queue::SoloDuo).map(RankEntry::from),
        flex_queue_rank: ranked.queue(Queue::Flex).map(RankEntry::from),
        is_phone_verified: phone.is_verified(),
        owned_champions: champions.into_iter().map(|c| c.name).collect(),
        captured_at: Utc::now(),
        connected: true,
    })
}

/// One query, reconnecting first if the session dropped.
async fn fetch<T: DeserializeOwned>(
    client: &dyn LocalClient,
    options: &ConnectOptions,
    path: &'static str,
) -> Result<T, AppError> {
    let query = async {
        if !client.is_connected() {
            client.connect(options).await?;
        }

        let value = client.request(Method::GET, path).await?;
        Ok::<T, AppError>(serde_json::from_value(value)?)
    };

    query.await.map_err(|e| AppError::gather(path, e))
}
