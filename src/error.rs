// SPDX-FileCopyrightText: 2022 Hewlett-Packard Development Company, L.P.
//
// SPDX-License-Identifier: GPL-3.0-only

use std::{fmt, io};

/// Non-success response from a Graph or token endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiError {
    pub endpoint: String,
    pub code: u16,
    pub canonical_reason: Option<String>,
    pub message: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let error = if let Some(reason) = &self.canonical_reason {
            format!("{} {}", self.code, reason)
        } else {
            format!("{}", self.code)
        };
        if let Some(message) = &self.message {
            write!(
                f,
                "'{}' from API endpoint '{}': {}",
                error, self.endpoint, message
            )
        } else {
            write!(f, "'{}' from API endpoint '{}'", error, self.endpoint)
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug)]
pub enum Error {
    /// Token exchange failed. Fatal to the whole batch.
    Auth(String),
    /// Input rejected before any device was touched.
    Validation(String),
    Api(ApiError),
    Reqwest(reqwest::Error),
    SerdeJson(serde_json::Error),
    Csv(csv::Error),
    Toml(toml::de::Error),
    Io(io::Error),
}

impl Error {
    /// Message recorded on a `Failure` or `Error` record. Prefers the
    /// server's own description over the status line.
    pub fn record_message(&self) -> String {
        match self {
            Self::Api(ApiError {
                message: Some(message),
                ..
            }) => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Auth(message) => write!(f, "Failed to get access token: {}", message),
            Self::Validation(message) => write!(f, "{}", message),
            Self::Api(err) => write!(f, "{}", err),
            Self::Reqwest(err) => write!(f, "{}", err),
            Self::SerdeJson(err) => write!(f, "{}", err),
            Self::Csv(err) => write!(f, "{}", err),
            Self::Toml(err) => write!(f, "{}", err),
            Self::Io(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeJson(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Toml(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_message_prefers_server_description() {
        let err = Error::Api(ApiError {
            endpoint: "managedDevices".to_string(),
            code: 403,
            canonical_reason: Some("Forbidden".to_string()),
            message: Some("Insufficient privileges".to_string()),
        });
        assert_eq!(err.record_message(), "Insufficient privileges");

        let err = Error::Api(ApiError {
            endpoint: "managedDevices".to_string(),
            code: 404,
            canonical_reason: Some("Not Found".to_string()),
            message: None,
        });
        assert_eq!(
            err.record_message(),
            "'404 Not Found' from API endpoint 'managedDevices'"
        );
    }
}
