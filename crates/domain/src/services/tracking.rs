//! Per-vehicle tracking state machine.
//!
//! A [`TrackedSession`] consumes one validated fix at a time and decides
//! whether the vehicle has started approaching a signal or is moving away
//! from the one it was approaching. It performs no I/O: loading signals and
//! publishing alerts belong to the caller.

use geo::Point;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::geodesy::bearing_deg;
use super::proximity;
use crate::models::{
    AlertEvent, AlertState, Compass, LocationFix, NearestSignal, NearestSignalsSnapshot, Signal,
    NEAREST_SIGNALS_LIMIT,
};

/// Default radius under which an approach is alerted.
pub const APPROACH_RADIUS_KM: f64 = 0.5;

/// Default radius beyond which a receding vehicle releases the signal.
pub const LEAVE_RADIUS_KM: f64 = 0.1;

/// Errors raised while evaluating a fix.
#[derive(Debug, Error, PartialEq)]
pub enum TrackingError {
    #[error("Invalid location fix: {0}")]
    InvalidFix(String),
}

impl From<validator::ValidationErrors> for TrackingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.as_ref().map(|m| m.to_string()).unwrap_or_default()
                    )
                })
            })
            .collect();
        messages.sort();
        TrackingError::InvalidFix(messages.join(", "))
    }
}

/// Tunable thresholds for the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    pub approach_radius_km: f64,
    pub leave_radius_km: f64,
    pub nearest_limit: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            approach_radius_km: APPROACH_RADIUS_KM,
            leave_radius_km: LEAVE_RADIUS_KM,
            nearest_limit: NEAREST_SIGNALS_LIMIT,
        }
    }
}

/// Tracking state of a session.
///
/// `Leaving` is transient: a session passes through it while the leaving
/// alert is built and is back in `Idle` before the evaluation returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Approaching,
    Leaving,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Approaching => "approaching",
            SessionState::Leaving => "leaving",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of travel relative to the nearest signal, from two distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Approaching,
    Leaving,
    Stable,
    /// No previous distance; suppresses every transition.
    Unknown,
}

impl Trend {
    pub fn between(previous_km: Option<f64>, current_km: f64) -> Self {
        match previous_km {
            None => Trend::Unknown,
            Some(prev) if current_km < prev => Trend::Approaching,
            Some(prev) if current_km > prev => Trend::Leaving,
            Some(_) => Trend::Stable,
        }
    }
}

/// Result of evaluating one fix against a loaded signal set.
#[derive(Debug, Clone)]
pub struct Observation {
    pub nearest: NearestSignal,
    pub trend: Trend,
    /// Bearing of the vehicle as seen from the nearest signal.
    pub bearing_deg: f64,
    pub alert: Option<AlertEvent>,
    pub snapshot: NearestSignalsSnapshot,
    pub first_fix: bool,
}

/// Outcome of [`TrackedSession::observe`].
#[derive(Debug, Clone)]
pub enum Evaluation {
    /// The session has no signal set; the position was still recorded.
    NoSignals,
    Tracked(Observation),
}

/// Mutable tracking memory for one vehicle connection.
#[derive(Debug, Clone)]
pub struct TrackedSession {
    id: Uuid,
    city: Option<String>,
    signals: Vec<Signal>,
    last_position: Option<Point<f64>>,
    last_distance_km: Option<f64>,
    state: SessionState,
    alerted_signal: Option<i64>,
    seen_first_fix: bool,
}

impl TrackedSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            city: None,
            signals: Vec::new(),
            last_position: None,
            last_distance_km: None,
            state: SessionState::Idle,
            alerted_signal: None,
            seen_first_fix: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn is_loaded(&self) -> bool {
        !self.signals.is_empty()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn alerted_signal(&self) -> Option<i64> {
        self.alerted_signal
    }

    pub fn last_position(&self) -> Option<Point<f64>> {
        self.last_position
    }

    pub fn last_distance_km(&self) -> Option<f64> {
        self.last_distance_km
    }

    /// Installs the signal snapshot for `city`.
    ///
    /// An empty set leaves the session unloaded and returns `false`, so the
    /// next fix retries the load. A session that already holds signals keeps
    /// them.
    pub fn load_signals(&mut self, city: &str, signals: Vec<Signal>) -> bool {
        if self.is_loaded() {
            return true;
        }
        if signals.is_empty() {
            return false;
        }
        self.city = Some(city.to_string());
        self.signals = signals;
        true
    }

    /// Discards all memory and returns to the pre-first-fix condition.
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Evaluates one fix.
    ///
    /// Invalid fixes are rejected before anything is touched. Every accepted
    /// fix records its position; with a loaded signal set it also updates the
    /// distance history and may produce one alert.
    pub fn observe(
        &mut self,
        fix: &LocationFix,
        config: &TrackingConfig,
    ) -> Result<Evaluation, TrackingError> {
        fix.validate()?;

        let position = fix.point();
        let first_fix = !self.seen_first_fix;
        self.seen_first_fix = true;
        self.last_position = Some(position);

        let Some(nearest) = proximity::nearest(position, &self.signals) else {
            return Ok(Evaluation::NoSignals);
        };
        let ranked = proximity::top_n(position, &self.signals, config.nearest_limit.max(1));

        let bearing = bearing_deg(nearest.signal.point(), position);
        let trend = Trend::between(self.last_distance_km, nearest.distance_km);
        let alert = self.transition(trend, &nearest, position, bearing, config);
        self.last_distance_km = Some(nearest.distance_km);

        debug_assert_ne!(self.state, SessionState::Leaving);
        debug_assert_eq!(
            self.state == SessionState::Approaching,
            self.alerted_signal.is_some()
        );

        Ok(Evaluation::Tracked(Observation {
            snapshot: NearestSignalsSnapshot::from_ranked(&ranked),
            nearest,
            trend,
            bearing_deg: bearing,
            alert,
            first_fix,
        }))
    }

    fn transition(
        &mut self,
        trend: Trend,
        nearest: &NearestSignal,
        position: Point<f64>,
        bearing: f64,
        config: &TrackingConfig,
    ) -> Option<AlertEvent> {
        match (self.state, trend) {
            (SessionState::Idle, Trend::Approaching)
                if nearest.distance_km <= config.approach_radius_km =>
            {
                self.state = SessionState::Approaching;
                self.alerted_signal = Some(nearest.signal.id);
                Some(AlertEvent::new(
                    AlertState::Approaching,
                    nearest.signal.topic.clone(),
                    nearest.distance_km,
                    Compass::from_bearing(bearing),
                ))
            }
            (SessionState::Approaching, Trend::Leaving)
                if nearest.distance_km > config.leave_radius_km =>
            {
                self.state = SessionState::Leaving;
                let alert = self.leaving_alert(nearest, position);
                self.alerted_signal = None;
                self.state = SessionState::Idle;
                Some(alert)
            }
            _ => None,
        }
    }

    /// Builds the leaving alert for the signal under alert, measured from the
    /// current position.
    fn leaving_alert(&self, nearest: &NearestSignal, position: Point<f64>) -> AlertEvent {
        let alerted = self
            .alerted_signal
            .and_then(|id| self.signals.iter().find(|s| s.id == id))
            .unwrap_or(&nearest.signal);
        let distance = super::geodesy::distance_km(alerted.point(), position);
        let bearing = bearing_deg(alerted.point(), position);
        AlertEvent::new(
            AlertState::Leaving,
            alerted.topic.clone(),
            distance,
            Compass::from_bearing(bearing),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNAL_LAT: f64 = 18.5204;
    const SIGNAL_LON: f64 = 73.8567;
    /// Kilometers per degree of latitude on a 6371 km sphere.
    const KM_PER_DEG: f64 = 111.194_926_644_558_73;

    fn signal(id: i64, lat: f64, lon: f64) -> Signal {
        Signal {
            id,
            name: format!("Signal {id}"),
            latitude: lat,
            longitude: lon,
            topic: format!("signal/{id}"),
            city: "Pune".to_string(),
        }
    }

    fn fix(lat: f64, lon: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: lon,
            city: "Pune".to_string(),
            sent_time: 1_700_000_000.0,
            accuracy: 5.0,
            direction: None,
        }
    }

    /// Fix due south of the signal at `km` kilometers.
    fn fix_south_at(km: f64) -> LocationFix {
        fix(SIGNAL_LAT - km / KM_PER_DEG, SIGNAL_LON)
    }

    fn loaded_session() -> TrackedSession {
        let mut session = TrackedSession::new(Uuid::new_v4());
        assert!(session.load_signals("Pune", vec![signal(1, SIGNAL_LAT, SIGNAL_LON)]));
        session
    }

    fn observe(session: &mut TrackedSession, fix: LocationFix) -> Observation {
        match session.observe(&fix, &TrackingConfig::default()).unwrap() {
            Evaluation::Tracked(observation) => observation,
            Evaluation::NoSignals => panic!("expected a tracked observation"),
        }
    }

    #[test]
    fn test_trend_between() {
        assert_eq!(Trend::between(None, 1.0), Trend::Unknown);
        assert_eq!(Trend::between(Some(1.0), 0.4), Trend::Approaching);
        assert_eq!(Trend::between(Some(0.4), 0.6), Trend::Leaving);
        assert_eq!(Trend::between(Some(0.4), 0.4), Trend::Stable);
    }

    #[test]
    fn test_first_fix_never_alerts() {
        let mut session = loaded_session();
        let observation = observe(&mut session, fix_south_at(0.05));

        assert!(observation.first_fix);
        assert_eq!(observation.trend, Trend::Unknown);
        assert!(observation.alert.is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.last_distance_km().is_some());
        assert_eq!(observation.snapshot.len(), 1);
    }

    #[test]
    fn test_approach_within_radius_alerts_once() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        let observation = observe(&mut session, fix_south_at(0.4));

        let alert = observation.alert.expect("approaching alert");
        assert_eq!(alert.state, AlertState::Approaching);
        assert_eq!(alert.signal_topic, "signal/1");
        assert_eq!(alert.dist_km, 0.4);
        assert_eq!(alert.direction, Compass::South);
        assert_eq!(session.state(), SessionState::Approaching);
        assert_eq!(session.alerted_signal(), Some(1));

        // Still closing in: no second approaching alert.
        let observation = observe(&mut session, fix_south_at(0.2));
        assert!(observation.alert.is_none());
        assert_eq!(session.state(), SessionState::Approaching);
    }

    #[test]
    fn test_equidistant_signals_alert_first_listed() {
        // Mirror images across the meridian, approached along it from the north.
        let mut session = TrackedSession::new(Uuid::new_v4());
        assert!(session.load_signals(
            "Pune",
            vec![signal(10, 0.0, 0.003), signal(11, 0.0, -0.003)]
        ));

        observe(&mut session, fix(0.01, 0.0));
        let observation = observe(&mut session, fix(0.002, 0.0));

        assert_eq!(observation.nearest.signal.id, 10);
        assert_eq!(observation.snapshot.top10[0].signal_name, "Signal 10");
        let alert = observation.alert.expect("approaching alert");
        assert_eq!(alert.signal_topic, "signal/10");
        assert_eq!(session.alerted_signal(), Some(10));
    }

    #[test]
    fn test_approach_outside_radius_does_not_alert() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(2.0));
        let observation = observe(&mut session, fix_south_at(0.8));

        assert_eq!(observation.trend, Trend::Approaching);
        assert!(observation.alert.is_none());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_approach_exactly_at_radius_alerts() {
        let mut session = loaded_session();
        let config = TrackingConfig::default();
        let near = fix_south_at(0.6);
        session.observe(&near, &config).unwrap();

        // Pick the fix whose computed distance is exactly on the threshold.
        let mut custom = config;
        let probe = fix_south_at(0.5);
        let Evaluation::Tracked(obs) = loaded_session().observe(&probe, &config).unwrap() else {
            panic!("expected tracked");
        };
        custom.approach_radius_km = obs.nearest.distance_km;

        let Evaluation::Tracked(observation) = session.observe(&probe, &custom).unwrap() else {
            panic!("expected tracked");
        };
        assert!(observation.alert.is_some());
    }

    #[test]
    fn test_leaving_alert_returns_to_idle() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.4));
        let observation = observe(&mut session, fix_south_at(0.6));

        let alert = observation.alert.expect("leaving alert");
        assert_eq!(alert.state, AlertState::Leaving);
        assert_eq!(alert.signal_topic, "signal/1");
        assert_eq!(alert.dist_km, 0.6);
        assert_eq!(alert.direction, Compass::South);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.alerted_signal().is_none());
    }

    #[test]
    fn test_receding_inside_leave_radius_keeps_alert() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.02));
        let observation = observe(&mut session, fix_south_at(0.05));

        assert_eq!(observation.trend, Trend::Leaving);
        assert!(observation.alert.is_none());
        assert_eq!(session.state(), SessionState::Approaching);
    }

    #[test]
    fn test_stable_distance_changes_nothing() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.4));
        let observation = observe(&mut session, fix_south_at(0.4));

        assert_eq!(observation.trend, Trend::Stable);
        assert!(observation.alert.is_none());
        assert_eq!(session.state(), SessionState::Approaching);
    }

    #[test]
    fn test_full_cycle_allows_second_approach() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.4));
        observe(&mut session, fix_south_at(0.6));

        observe(&mut session, fix_south_at(0.9));
        let observation = observe(&mut session, fix_south_at(0.3));

        let alert = observation.alert.expect("second approaching alert");
        assert_eq!(alert.state, AlertState::Approaching);
        assert_eq!(session.alerted_signal(), Some(1));
    }

    #[test]
    fn test_direction_is_relative_to_signal() {
        let mut session = loaded_session();
        let east = |km: f64| {
            let lon_per_km = 1.0 / (KM_PER_DEG * SIGNAL_LAT.to_radians().cos());
            fix(SIGNAL_LAT, SIGNAL_LON + km * lon_per_km)
        };
        observe(&mut session, east(1.0));
        let observation = observe(&mut session, east(0.3));
        assert_eq!(observation.alert.unwrap().direction, Compass::East);
    }

    #[test]
    fn test_leaving_reports_alerted_signal_when_nearest_changes() {
        let mut session = TrackedSession::new(Uuid::new_v4());
        let north_lat = SIGNAL_LAT + 2.0 / KM_PER_DEG;
        session.load_signals(
            "Pune",
            vec![signal(1, SIGNAL_LAT, SIGNAL_LON), signal(2, north_lat, SIGNAL_LON)],
        );

        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.4));
        assert_eq!(session.alerted_signal(), Some(1));

        // Past signal 1 heading north: signal 2 is now nearest at 0.8 km,
        // which reads as receding against the previous 0.4 km.
        let observation = observe(&mut session, fix(SIGNAL_LAT + 1.2 / KM_PER_DEG, SIGNAL_LON));
        assert_eq!(observation.nearest.signal.id, 2);

        let alert = observation.alert.expect("leaving alert");
        assert_eq!(alert.state, AlertState::Leaving);
        assert_eq!(alert.signal_topic, "signal/1");
        assert_eq!(alert.direction, Compass::North);
        assert_eq!(alert.dist_km, 1.2);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_invalid_fix_changes_nothing() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        let before = session.clone();

        let result = session.observe(&fix(f64::NAN, SIGNAL_LON), &TrackingConfig::default());
        assert!(matches!(result, Err(TrackingError::InvalidFix(_))));

        let result = session.observe(&fix(SIGNAL_LAT, 200.0), &TrackingConfig::default());
        assert!(matches!(result, Err(TrackingError::InvalidFix(ref m)) if m.contains("longitude")));

        assert_eq!(session.last_distance_km(), before.last_distance_km());
        assert_eq!(session.last_position(), before.last_position());
        assert_eq!(session.state(), before.state());
    }

    #[test]
    fn test_unloaded_session_records_position_only() {
        let mut session = TrackedSession::new(Uuid::new_v4());
        let result = session
            .observe(&fix_south_at(0.3), &TrackingConfig::default())
            .unwrap();

        assert!(matches!(result, Evaluation::NoSignals));
        assert!(session.last_position().is_some());
        assert!(session.last_distance_km().is_none());
    }

    #[test]
    fn test_load_signals_rejects_empty_set() {
        let mut session = TrackedSession::new(Uuid::new_v4());
        assert!(!session.load_signals("Atlantis", Vec::new()));
        assert!(!session.is_loaded());
        assert!(session.city().is_none());
    }

    #[test]
    fn test_load_signals_is_sticky() {
        let mut session = loaded_session();
        assert!(session.load_signals("Mumbai", vec![signal(9, 19.07, 72.87)]));
        assert_eq!(session.city(), Some("Pune"));
        assert_eq!(session.signals().len(), 1);
        assert_eq!(session.signals()[0].id, 1);
    }

    #[test]
    fn test_reset_behaves_like_new_session() {
        let mut session = loaded_session();
        observe(&mut session, fix_south_at(1.0));
        observe(&mut session, fix_south_at(0.4));
        let id = session.id();

        session.reset();

        assert_eq!(session.id(), id);
        assert!(!session.is_loaded());
        assert!(session.city().is_none());
        assert!(session.last_position().is_none());
        assert!(session.last_distance_km().is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.alerted_signal().is_none());

        session.load_signals("Pune", vec![signal(1, SIGNAL_LAT, SIGNAL_LON)]);
        let observation = observe(&mut session, fix_south_at(0.2));
        assert!(observation.first_fix);
        assert!(observation.alert.is_none());
    }

    #[test]
    fn test_tracking_error_from_validation_errors() {
        let err = TrackingError::from(fix(95.0, 500.0).validate().unwrap_err());
        let TrackingError::InvalidFix(message) = err;
        assert!(message.contains("latitude"));
        assert!(message.contains("longitude"));
    }
}
