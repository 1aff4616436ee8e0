//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a city label.
pub const MAX_CITY_LENGTH: usize = 50;

fn range_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Validates that a latitude value is finite and within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(range_error(
            "latitude_range",
            "Latitude must be between -90 and 90",
        ))
    }
}

/// Validates that a longitude value is finite and within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(range_error(
            "longitude_range",
            "Longitude must be between -180 and 180",
        ))
    }
}

/// Validates that accuracy is finite and non-negative.
pub fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy.is_finite() && accuracy >= 0.0 {
        Ok(())
    } else {
        Err(range_error("accuracy_range", "Accuracy must be non-negative"))
    }
}

/// Validates a client send time expressed as epoch seconds.
///
/// Only used for latency reporting, so the check is limited to rejecting
/// values that cannot be a timestamp at all.
pub fn validate_sent_time(sent_time: f64) -> Result<(), ValidationError> {
    if sent_time.is_finite() && sent_time >= 0.0 {
        Ok(())
    } else {
        Err(range_error(
            "sent_time_invalid",
            "Send time must be a non-negative epoch timestamp",
        ))
    }
}

/// Validates a city label: non-blank and at most [`MAX_CITY_LENGTH`] characters.
pub fn validate_city(city: &str) -> Result<(), ValidationError> {
    let trimmed = city.trim();
    if trimmed.is_empty() {
        return Err(range_error("city_empty", "City must not be empty"));
    }
    if trimmed.chars().count() > MAX_CITY_LENGTH {
        return Err(range_error(
            "city_length",
            "City must be at most 50 characters",
        ));
    }
    Ok(())
}
