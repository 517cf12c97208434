use crate::services::{
    activity::ActivityService, admission::AdmissionService, channel::ChannelService,
    membership::MembershipService, message::MessageService,
};
use crate::ws::connections::ConnectionManager;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub bind_address: String,
    pub database_url: String,
    #[serde(default)]
    pub jwt_secret: String,
    pub max_connections: u32,
    /// Pause before the single retry of a join that hit a transient store error
    pub join_retry_backoff_ms: u64,
    /// `pretty` or `json`
    pub log_format: String,
}

impl Config {
    /// Defaults, then an optional `huddle.toml`, then `HUDDLE_*` environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let mut config: Config = config::Config::builder()
            .set_default("bind_address", "0.0.0.0:8080")?
            .set_default("database_url", "sqlite:huddle.db")?
            .set_default("max_connections", 8_i64)?
            .set_default("join_retry_backoff_ms", 50_i64)?
            .set_default("log_format", "pretty")?
            .add_source(config::File::with_name("huddle").required(false))
            .add_source(config::Environment::with_prefix("HUDDLE"))
            .build()?
            .try_deserialize()?;

        if config.jwt_secret.is_empty() {
            config.jwt_secret = DEV_JWT_SECRET.to_string();
        }

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn join_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.join_retry_backoff_ms)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: SqlitePool,
    pub connections: Arc<ConnectionManager>,
    pub admission: AdmissionService,
    pub membership: MembershipService,
    pub activity_service: ActivityService,
    pub channel_service: ChannelService,
    pub message_service: MessageService,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        let connections = Arc::new(ConnectionManager::new());
        let membership = MembershipService::new(db.clone());
        let admission = AdmissionService::new(db.clone(), config.join_retry_backoff());
        let activity_service = ActivityService::new(db.clone(), membership.clone());
        let message_service = MessageService::new(db.clone(), membership.clone());
        let channel_service =
            ChannelService::new(db.clone(), membership.clone(), message_service.clone());

        Self {
            config,
            db,
            connections,
            admission,
            membership,
            activity_service,
            channel_service,
            message_service,
        }
    }
}
