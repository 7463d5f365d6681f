//! Shoutout Bot - Headless Server
//!
//! Polls the stream API for live channels matching the configured games,
//! tags, and keywords, announces new live streams to a Discord webhook, and
//! tracks per-channel live state in SQLite.

mod config;

use async_trait::async_trait;
use clap::Parser;
use config::{AppConfig, ConfigError, FilterSettings};
use futures_util::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shoutout_alerts::{DbError, DiscordNotifier, StreamDb};
use shoutout_api::client::TWITCH_API_BASE;
use shoutout_api::{ApiClient, ApiError, Game, HelixClient, StreamQuery, StreamTag, TokenManager, User};
use shoutout_core::FilterCriteria;
use shoutout_engine::{ChangeSubscriber, Outcome, Reconciler, SubscribeError};

/// Shoutout Bot CLI
#[derive(Parser, Debug)]
#[command(name = "shoutout-bot")]
#[command(about = "Stream live-status tracker and shoutout bot", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long)]
    log_level: Option<String>,

    /// Seconds between polling cycles
    #[arg(short, long)]
    poll_interval: Option<u64>,

    /// Run a single polling cycle and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[derive(Error, Debug)]
enum BotError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Db(#[from] DbError),
}

fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Adapts the webhook hub endpoint to the engine's subscriber trait. A hub
/// rejection is surfaced as an error so the reconciler logs it; it never
/// blocks the cycle. Auth exhaustion inside a subscribe also raises
/// `auth_failed`, which the polling loop checks after every cycle so the
/// process terminates without waiting for the next API call to hit it.
struct HelixSubscriber {
    helix: Arc<HelixClient>,
    auth_failed: Arc<AtomicBool>,
}

#[async_trait]
impl ChangeSubscriber for HelixSubscriber {
    async fn subscribe(&self, channel_id: &str) -> Result<(), SubscribeError> {
        match self.helix.subscribe_stream_changes(channel_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(SubscribeError::Request(
                "hub rejected the subscription".to_string(),
            )),
            Err(error) => {
                if error.is_fatal() {
                    self.auth_failed.store(true, Ordering::SeqCst);
                }
                Err(SubscribeError::Request(error.to_string()))
            }
        }
    }
}

fn resolve_game_ids(names: &[String], games: &[Game]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        match games.iter().find(|game| game.name.eq_ignore_ascii_case(name)) {
            Some(game) => {
                info!(game = %game.name, id = %game.id, "resolved game");
                ids.push(game.id.to_string());
            }
            None => warn!(name, "game not found, skipping"),
        }
    }
    ids
}

fn resolve_tag_ids(names: &[String], catalog: &[StreamTag]) -> Vec<String> {
    let mut ids = Vec::new();
    for name in names {
        match catalog.iter().find(|tag| tag.is_named(name)) {
            Some(tag) => {
                info!(tag = %name, id = %tag.tag_id, "resolved tag");
                ids.push(tag.tag_id.clone());
            }
            None => warn!(name, "tag not found in catalog, skipping"),
        }
    }
    ids
}

fn resolve_user_ids(logins: &[String], users: &[User]) -> Vec<String> {
    let mut ids = Vec::new();
    for login in logins {
        match users.iter().find(|user| user.login.eq_ignore_ascii_case(login)) {
            Some(user) => ids.push(user.id.to_string()),
            None => warn!(login, "user not found, skipping"),
        }
    }
    ids
}

/// Turn the config-file filters into runtime criteria, resolving game, tag,
/// and channel names through the API.
async fn resolve_criteria(
    helix: &HelixClient,
    filters: &FilterSettings,
) -> Result<FilterCriteria, BotError> {
    let mut criteria = filters.to_criteria();

    if !filters.game_names.is_empty() {
        let games = helix.games_by_name(&filters.game_names).await?;
        criteria
            .game_ids
            .extend(resolve_game_ids(&filters.game_names, &games));
    }

    if !filters.tag_names.is_empty() {
        let catalog = helix.stream_tags().await?;
        info!(tags = catalog.len(), "loaded tag catalog");
        criteria
            .tag_ids
            .extend(resolve_tag_ids(&filters.tag_names, &catalog));
    }

    if !filters.whitelist_logins.is_empty() {
        let users = helix.users_by_login(&filters.whitelist_logins).await?;
        criteria
            .whitelist
            .user_ids
            .extend(resolve_user_ids(&filters.whitelist_logins, &users));
    }

    if criteria.game_ids.is_empty() {
        return Err(BotError::InvalidConfig(
            "no games configured; set filters.game_names or filters.game_ids".to_string(),
        ));
    }
    if !criteria_can_match(&criteria) {
        warn!("no tags or keywords configured; no stream can match the filters");
    }

    Ok(criteria)
}

/// A stream matches only through a tag or a title keyword, so criteria with
/// neither select nothing no matter how many games are configured.
fn criteria_can_match(criteria: &FilterCriteria) -> bool {
    !criteria.tag_ids.is_empty() || !criteria.keywords.is_empty()
}

/// One polling cycle: discover live streams, reconcile each, then sweep
/// channels that dropped out of the observation set. Transient API errors
/// skip the cycle; auth exhaustion propagates and ends the process.
async fn poll_once(
    helix: &HelixClient,
    reconciler: &Reconciler,
    criteria: &FilterCriteria,
) -> Result<(), BotError> {
    let query = StreamQuery::new(helix.api());
    let streams = match query.by_metadata(&criteria.game_ids, criteria).await {
        Ok(streams) => streams,
        Err(error) if error.is_fatal() => return Err(error.into()),
        Err(error) => {
            warn!(%error, "polling cycle failed, will retry next interval");
            return Ok(());
        }
    };
    debug!(count = streams.len(), "observed candidate streams");

    let outcomes = join_all(streams.iter().map(|stream| reconciler.reconcile(stream))).await;

    let mut alerted = 0usize;
    for (stream, outcome) in streams.iter().zip(outcomes) {
        match outcome {
            Ok(Outcome::NewChannel { alerted: true })
            | Ok(Outcome::Live { alerted: true, .. }) => alerted += 1,
            Ok(_) => {}
            Err(error) => {
                error!(channel = %stream.channel_id, %error, "reconciliation failed")
            }
        }
    }

    let observed: HashSet<String> = streams
        .iter()
        .map(|stream| stream.channel_id.to_string())
        .collect();
    let swept = match reconciler.sweep_offline(&observed).await {
        Ok(swept) => swept.len(),
        Err(error) => {
            error!(%error, "offline sweep failed");
            0
        }
    };

    info!(
        observed = streams.len(),
        alerted, swept, "polling cycle complete"
    );
    Ok(())
}

async fn run(args: Args, config: AppConfig) -> Result<(), BotError> {
    if config.auth.client_id.is_empty() || config.auth.client_secret.is_empty() {
        return Err(BotError::InvalidConfig(
            "missing API credentials; set auth in the config file or TWITCH_CLIENT_ID / TWITCH_CLIENT_SECRET".to_string(),
        ));
    }
    if config.discord_webhook_url.is_empty() {
        warn!("no Discord webhook configured; shoutout deliveries will fail");
    }

    let db = StreamDb::connect(&config.database_url).await?;
    info!(database = %config.database_url, "database ready");

    let http = reqwest::Client::new();
    let tokens = Arc::new(TokenManager::new(
        http.clone(),
        config.auth.client_id.clone(),
        config.auth.client_secret.clone(),
    ));
    let api = ApiClient::new(http, TWITCH_API_BASE, config.auth.client_id.clone(), tokens);
    let helix = Arc::new(HelixClient::new(api, config.callback_base_url.clone()));

    let criteria = resolve_criteria(&helix, &config.filters).await?;
    info!(
        games = criteria.game_ids.len(),
        tags = criteria.tag_ids.len(),
        keywords = criteria.keywords.len(),
        "filters resolved"
    );

    match helix.active_subscriptions().await {
        Ok(subs) => info!(count = subs.len(), "active webhook subscriptions"),
        Err(error) if error.is_fatal() => return Err(error.into()),
        Err(error) => warn!(%error, "could not list webhook subscriptions"),
    }

    let auth_failed = Arc::new(AtomicBool::new(false));
    let reconciler = Reconciler::new(
        Arc::new(db),
        Arc::new(DiscordNotifier::new(config.discord_webhook_url.clone())),
        Arc::new(HelixSubscriber {
            helix: helix.clone(),
            auth_failed: auth_failed.clone(),
        }),
        criteria.clone(),
        config.thresholds,
    );

    let interval = args.poll_interval.unwrap_or(config.poll_interval_secs);
    info!(interval_secs = interval, "starting polling loop");

    loop {
        poll_once(&helix, &reconciler, &criteria).await?;
        // Auth exhaustion inside a resubscribe is only reported through the
        // reconciler's logging, so the subscriber flags it for us here.
        if auth_failed.load(Ordering::SeqCst) {
            return Err(BotError::Api(ApiError::AuthExhausted));
        }
        if args.once {
            break;
        }
        tokio::time::sleep(Duration::from_secs(interval)).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::Io(_)) => AppConfig::default(),
        Err(error) => {
            eprintln!("failed to parse {}: {error}", args.config);
            std::process::exit(1);
        }
    };
    config.apply_env_overrides();

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.log_level.clone());
    init_logging(&level);

    info!("Shoutout Bot starting");

    if let Err(error) = run(args, config).await {
        error!(%error, "fatal error, shutting down");
        std::process::exit(1);
    }
}
