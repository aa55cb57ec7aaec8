pub mod backend;
pub mod capture;
pub mod completion;
pub mod config;
pub mod db;
pub mod profiles;
pub mod registration;
pub mod reminders;
pub mod stuck;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use serde::Serialize;

use backend::BackendClient;
use capture::CaptureService;
use completion::CompletionOutcome;
use config::AppConfig;
use db::Database;
use profiles::ProfileStore;
use registration::{DeviceRegistrar, RegistrationOutcome, RegistrationStore, SystemEnvironment};
use reminders::{handle_reminder_action, ActionEffect, NotificationTarget, ReminderAction};
use stuck::StuckSuggestion;

const ENABLE_LOGS: bool = true;

/// What a notification action did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ActionResponse {
    Reminder { effect: ActionEffect },
    FocusWrappedUp { already_logged: bool },
}

pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    pub profiles: Arc<ProfileStore>,
    pub capture: CaptureService,
    pub registrar: DeviceRegistrar,
    pub environment: Arc<SystemEnvironment>,
}

impl AppState {
    pub fn open(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("failed to create data directory {}", config.data_dir.display())
        })?;

        let db = Database::new(config.database_path())?;
        let profiles = Arc::new(ProfileStore::new(config.profiles_path())?);
        let capture = CaptureService::new(db.clone(), profiles.clone());

        let client = BackendClient::new(
            config.api_base_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )?;
        let environment = Arc::new(SystemEnvironment::new(config.push_enabled));
        let registrar = DeviceRegistrar::new(
            RegistrationStore::new(db.clone()),
            Arc::new(client),
            environment.clone(),
        );

        Ok(Self {
            db,
            config,
            profiles,
            capture,
            registrar,
            environment,
        })
    }

    /// A freshly issued push token: cache it, then register it.
    pub async fn handle_device_token(&self, token: &str) -> Result<RegistrationOutcome> {
        self.registrar.store_token(token).await?;
        Ok(self.registrar.register_if_needed(token, false).await)
    }

    pub async fn handle_notification_action(
        &self,
        action_identifier: &str,
        target: &NotificationTarget,
    ) -> Result<ActionResponse> {
        let action: ReminderAction = action_identifier.parse()?;
        match (action, target) {
            (ReminderAction::FocusWrapUp, NotificationTarget::FocusSession { session_id }) => {
                let outcome =
                    completion::complete_from_session(&self.db, session_id, Utc::now()).await?;
                Ok(ActionResponse::FocusWrappedUp {
                    already_logged: outcome == CompletionOutcome::AlreadyLogged,
                })
            }
            (_, NotificationTarget::Reminder { reminder_id }) => {
                let profile = self.profiles.active_profile();
                let effect = handle_reminder_action(
                    &self.db,
                    profile.as_ref(),
                    reminder_id,
                    action,
                    Local::now(),
                )
                .await?;
                Ok(ActionResponse::Reminder { effect })
            }
            (action, target) => Err(anyhow::anyhow!(
                "{} does not apply to {:?}",
                action.identifier(),
                target
            )),
        }
    }

    pub async fn stuck_suggestions(&self) -> Result<Vec<StuckSuggestion>> {
        let now = Utc::now();
        let (from, to) = stuck::soon_window(now);
        let sessions = self.db.list_focus_sessions().await?;
        let reminders = self.db.list_open_reminders_between(from, to).await?;
        let inbox = self.db.list_inbox_items().await?;
        Ok(stuck::suggestions(&sessions, &reminders, &inbox, now))
    }
}

/// Starts the core: logging, configuration, storage, the default profile and
/// a re-registration of the cached push token.
pub async fn run() -> Result<AppState> {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();

    log_info!("WithYou starting up...");

    let config = AppConfig::from_env()?;
    let state = AppState::open(config)?;

    let profile = state.profiles.ensure_default_profile()?;
    log_info!("Active profile: {}", profile.name);

    if let Some(outcome) = state.registrar.register_cached(false).await {
        log_info!("Cached push token registration: {outcome:?}");
    }

    Ok(state)
}
