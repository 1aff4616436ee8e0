//! Session manager: owns one tracking session per live vehicle connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domain::models::{AlertEvent, LocationFix, NearestSignalsSnapshot};
use domain::services::{
    proximity, DirectoryError, Evaluation, SessionState, SignalDirectory, TrackedSession,
    TrackingConfig, TrackingError,
};
use geo::Point;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::alert_dispatch::AlertDispatcher;
use crate::middleware::metrics::{record_alert, record_location_fix, set_active_sessions};

type SessionHandle = Arc<Mutex<TrackedSession>>;

/// Result of handling one fix.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// The session's city has no signals (yet); the load is retried next fix.
    NoSignals { city: String },
    /// The fix was classified against the loaded signal set.
    Tracked {
        snapshot: NearestSignalsSnapshot,
        alert: Option<AlertEvent>,
        state: SessionState,
    },
}

/// Drives the fix pipeline for every open session.
///
/// Each session sits behind its own mutex, so fixes for one vehicle are
/// applied one at a time while different vehicles proceed independently.
pub struct SessionManager {
    directory: Arc<dyn SignalDirectory>,
    dispatcher: AlertDispatcher,
    config: TrackingConfig,
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        directory: Arc<dyn SignalDirectory>,
        dispatcher: AlertDispatcher,
        config: TrackingConfig,
    ) -> Self {
        Self {
            directory,
            dispatcher,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a session. Opening an existing session keeps its state.
    pub async fn open(&self, session_id: Uuid) {
        self.session(session_id).await;
        debug!(session_id = %session_id, "Session opened");
    }

    /// Returns the session handle, creating the session if needed.
    async fn session(&self, session_id: Uuid) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(&session_id) {
            return handle.clone();
        }
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(TrackedSession::new(session_id))))
            .clone();
        set_active_sessions(sessions.len());
        handle
    }

    /// Processes one fix for `session_id`.
    ///
    /// A fix for an unknown session creates it. Invalid fixes are rejected
    /// without touching the session.
    pub async fn handle_fix(
        &self,
        session_id: Uuid,
        fix: &LocationFix,
    ) -> Result<FixOutcome, TrackingError> {
        fix.validate()?;

        let latency_ms = fix.latency_ms(Utc::now());
        record_location_fix(latency_ms);

        let handle = self.session(session_id).await;
        let mut session = handle.lock().await;

        if !session.is_loaded() {
            self.load_city(&mut session, fix.city()).await;
        } else if let Some(loaded) = session.city() {
            if !loaded.eq_ignore_ascii_case(fix.city()) {
                debug!(
                    session_id = %session_id,
                    loaded_city = %loaded,
                    fix_city = %fix.city(),
                    "Ignoring city change for loaded session"
                );
            }
        }

        let evaluation = session.observe(fix, &self.config)?;
        debug!(
            session_id = %session_id,
            latency_ms = ?latency_ms,
            accuracy_m = fix.accuracy,
            "Location fix processed"
        );

        match evaluation {
            Evaluation::NoSignals => Ok(FixOutcome::NoSignals {
                city: fix.city().to_string(),
            }),
            Evaluation::Tracked(observation) => {
                if let Some(alert) = &observation.alert {
                    info!(
                        session_id = %session_id,
                        signal_topic = %alert.signal_topic,
                        state = %alert.state,
                        dist_km = alert.dist_km,
                        direction = %alert.direction,
                        emitted_at = %alert.emitted_at,
                        "Preemption alert raised"
                    );
                    record_alert(alert.state);
                    self.dispatcher.dispatch(alert);
                }
                Ok(FixOutcome::Tracked {
                    snapshot: observation.snapshot,
                    alert: observation.alert,
                    state: session.state(),
                })
            }
        }
    }

    /// Loads the city's signals into an unloaded session.
    ///
    /// Store errors count as an empty directory for this fix.
    async fn load_city(&self, session: &mut TrackedSession, city: &str) {
        let signals = match self.directory.lookup_by_city(city).await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(session_id = %session.id(), city = %city, error = %e, "Signal lookup failed");
                return;
            }
        };

        let count = signals.len();
        if session.load_signals(city, signals) {
            info!(session_id = %session.id(), city = %city, signals = count, "Signals loaded");
        } else {
            debug!(session_id = %session.id(), city = %city, "No signals for city");
        }
    }

    /// Clears a session's memory. Returns `false` for an unknown session.
    pub async fn reset(&self, session_id: Uuid) -> bool {
        let handle = self.sessions.read().await.get(&session_id).cloned();
        match handle {
            Some(handle) => {
                handle.lock().await.reset();
                info!(session_id = %session_id, "Session reset");
                true
            }
            None => {
                debug!(session_id = %session_id, "Reset for unknown session ignored");
                false
            }
        }
    }

    /// Tears a session down. Returns `false` for an unknown session.
    pub async fn close(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(&session_id).is_some();
        set_active_sessions(sessions.len());
        if removed {
            debug!(session_id = %session_id, "Session closed");
        } else {
            debug!(session_id = %session_id, "Close for unknown session ignored");
        }
        removed
    }

    /// Current state of a session, if it exists.
    pub async fn state(&self, session_id: Uuid) -> Option<SessionState> {
        let handle = self.sessions.read().await.get(&session_id).cloned()?;
        let state = handle.lock().await.state();
        Some(state)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Stateless nearest-signals query for a position in `city`.
    pub async fn nearest_signals(
        &self,
        city: &str,
        position: Point<f64>,
        limit: usize,
    ) -> Result<NearestSignalsSnapshot, DirectoryError> {
        let signals = self.directory.lookup_by_city(city).await?;
        let ranked = proximity::top_n(position, &signals, limit);
        Ok(NearestSignalsSnapshot::from_ranked(&ranked))
    }

    /// All signals of `city`, in directory order.
    pub async fn signals_in(
        &self,
        city: &str,
    ) -> Result<Vec<domain::models::Signal>, DirectoryError> {
        self.directory.lookup_by_city(city).await
    }
}
