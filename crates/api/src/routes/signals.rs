//! Read-only signal endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::{
    ListSignalsQuery, ListSignalsResponse, NearestSignalsQuery, NearestSignalsSnapshot,
    NEAREST_SIGNALS_LIMIT,
};
use geo::Point;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;

/// Lists the signals of a city.
///
/// GET /api/v1/signals?city=
pub async fn list_signals(
    State(state): State<AppState>,
    Query(query): Query<ListSignalsQuery>,
) -> Result<Json<ListSignalsResponse>, ApiError> {
    query.validate()?;

    let city = query.city.trim();
    let signals = state.sessions.signals_in(city).await?;
    tracing::debug!(city = %city, count = signals.len(), "Signals listed");

    Ok(Json(ListSignalsResponse::new(city, signals)))
}

/// Ranks the signals of a city by distance from a position.
///
/// GET /api/v1/signals/nearest?city=&latitude=&longitude=&limit=
pub async fn nearest_signals(
    State(state): State<AppState>,
    Query(query): Query<NearestSignalsQuery>,
) -> Result<Json<NearestSignalsSnapshot>, ApiError> {
    query.validate()?;

    let limit = query
        .limit
        .unwrap_or(state.config.tracking.nearest_limit)
        .clamp(1, NEAREST_SIGNALS_LIMIT);
    let snapshot = state
        .sessions
        .nearest_signals(
            query.city.trim(),
            Point::new(query.longitude, query.latitude),
            limit,
        )
        .await?;

    Ok(Json(snapshot))
}
