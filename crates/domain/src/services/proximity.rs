//! Nearest-signal classification.
//!
//! Distances are recomputed from scratch on every call; a city holds tens to
//! low hundreds of signals so a linear scan is enough.

use geo::Point;

use super::geodesy::distance_km;
use crate::models::{NearestSignal, Signal};

/// Returns the signal closest to `position`, or `None` for an empty set.
///
/// Ties keep the first signal in input order.
pub fn nearest(position: Point<f64>, signals: &[Signal]) -> Option<NearestSignal> {
    let mut best: Option<(&Signal, f64)> = None;
    for signal in signals {
        let d = distance_km(position, signal.point());
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((signal, d)),
        }
    }
    best.map(|(signal, distance_km)| NearestSignal {
        signal: signal.clone(),
        distance_km,
    })
}

/// Ranks signals ascending by distance from `position`, keeping at most `limit`.
///
/// The sort is stable, so equal distances keep input order.
pub fn top_n(position: Point<f64>, signals: &[Signal], limit: usize) -> Vec<NearestSignal> {
    let mut ranked: Vec<NearestSignal> = signals
        .iter()
        .map(|signal| NearestSignal {
            distance_km: distance_km(position, signal.point()),
            signal: signal.clone(),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limit);
    ranked
}
