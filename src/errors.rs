use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not find coordinates for '{0}'")]
    LocationNotFound(String),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{service} is not available: {reason}")]
    ServiceUnavailable {
        service: &'static str,
        reason: String,
    },
    #[error("malformed {0} response: {1}")]
    Malformed(&'static str, String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
}

impl AppError {
    /// Stable tag the frontend can branch on without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::LocationNotFound(_) => "location_not_found",
            AppError::Input(input) => input.kind(),
            AppError::ServiceUnavailable { .. } => "service_unavailable",
            AppError::Malformed(..) | AppError::Http(_) | AppError::Json(_) => "transient",
            AppError::Config(_) => "config",
        }
    }
}

/// Input validation failures, one variant per distinguishable notification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("please enter a location to search")]
    MissingLocation,
    #[error("please search for a location first")]
    NoSearchPerformed,
    #[error("please select a gas station first")]
    NoStationSelected,
    #[error("please enter your vehicle's fuel efficiency")]
    MissingEfficiency,
    #[error("fuel efficiency must be a number greater than zero")]
    InvalidEfficiency,
}

impl InputError {
    pub fn kind(&self) -> &'static str {
        match self {
            InputError::MissingLocation => "missing_location",
            InputError::NoSearchPerformed => "no_search_performed",
            InputError::NoStationSelected => "no_station_selected",
            InputError::MissingEfficiency => "missing_efficiency",
            InputError::InvalidEfficiency => "invalid_efficiency",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn input_error_kinds_are_distinct() {
        let kinds = [
            InputError::MissingLocation.kind(),
            InputError::NoSearchPerformed.kind(),
            InputError::NoStationSelected.kind(),
            InputError::MissingEfficiency.kind(),
            InputError::InvalidEfficiency.kind(),
        ];
        let unique: HashSet<_> = kinds.iter().collect();
        assert_eq!(unique.len(), kinds.len());
    }

    #[test]
    fn transient_failures_share_one_kind() {
        let err = AppError::Malformed("place details", "missing location".into());
        assert_eq!(err.kind(), "transient");
        assert_eq!(
            AppError::LocationNotFound("Hartford".into()).to_string(),
            "could not find coordinates for 'Hartford'"
        );
    }
}
