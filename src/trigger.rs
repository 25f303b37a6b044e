// src/trigger.rs
//! Entry points that start refreshes: first install, service startup, the
//! periodic timer and on-demand message requests.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::cache::{load_settings, save_settings};
use crate::model::BookItem;
use crate::refresh::{Orchestrator, RefreshReport};
use crate::settings::{RefreshInterval, Settings};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    #[serde(alias = "fetchKyoboTop10")]
    FetchPrimaryTop10,
    #[serde(alias = "fetchAllBestsellers")]
    FetchAllSources,
    UpdateSettings { settings: Settings },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Items(Vec<BookItem>),
    Ack { success: bool },
}

impl Response {
    fn ok() -> Self {
        Response::Ack { success: true }
    }
}

#[derive(Clone)]
pub struct TriggerSurface {
    orchestrator: Orchestrator,
    timer: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TriggerSurface {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            timer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// First run: store default settings unless present, arm the timer and
    /// fetch the primary top-10.
    pub async fn on_install(&self) -> Result<Vec<BookItem>> {
        let store = self.orchestrator.store().as_ref();
        let settings = match load_settings(store).await? {
            Some(s) => s,
            None => {
                let s = Settings::default();
                save_settings(store, &s).await?;
                tracing::info!(interval_h = s.refresh_interval.hours(), "default settings stored");
                s
            }
        };
        self.arm_timer(settings.refresh_interval);
        Ok(self.orchestrator.refresh_tier10().await)
    }

    /// Service boot. Without stored settings this is an install; otherwise
    /// the timer is re-armed and anything stale is refreshed.
    pub async fn on_startup(&self) -> Result<RefreshReport> {
        match load_settings(self.orchestrator.store().as_ref()).await? {
            None => {
                self.on_install().await?;
                Ok(RefreshReport::default())
            }
            Some(s) => {
                self.arm_timer(s.refresh_interval);
                Ok(self.orchestrator.refresh_stale(s.refresh_interval).await)
            }
        }
    }

    pub async fn on_timer(&self, tick: u64) -> RefreshReport {
        tracing::debug!(tick, "timer fired");
        self.orchestrator.refresh_all().await
    }

    pub async fn on_demand(&self, req: Request) -> Result<Response> {
        tracing::info!(?req, "message request");
        match req {
            Request::FetchPrimaryTop10 => Ok(Response::Items(self.orchestrator.refresh_tier10().await)),
            Request::FetchAllSources => {
                self.orchestrator.refresh_all().await;
                Ok(Response::ok())
            }
            Request::UpdateSettings { settings } => {
                save_settings(self.orchestrator.store().as_ref(), &settings).await?;
                self.arm_timer(settings.refresh_interval);
                Ok(Response::ok())
            }
        }
    }

    /// Replace the periodic task. The first tick is one full period from now.
    pub fn arm_timer(&self, interval: RefreshInterval) {
        let surface = TriggerSurface {
            orchestrator: self.orchestrator.clone(),
            timer: Arc::new(Mutex::new(None)),
        };
        let period = interval.period();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick = 0u64;
            loop {
                ticker.tick().await;
                tick += 1;
                surface.on_timer(tick).await;
            }
        });

        let mut slot = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
        tracing::info!(interval_h = interval.hours(), "refresh timer armed");
    }

    pub fn timer_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}
