use crate::leaderboard::ScoreRow;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of one backend call. `Display` is what the leaderboard error
/// line shows, so keep the wording human.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Identity returned by `GET /api/auth/status` for a valid session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserIdentity {
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
struct SubmitBody {
    wpm: i64,
    accuracy: i64,
}

/// The backend as seen by this client. The HTTP implementation lives below;
/// tests drive the app with stubs.
pub trait ScoreboardApi: Send + Sync {
    fn auth_status(&self) -> Result<UserIdentity, ApiError>;
    fn leaderboard(&self) -> Result<Vec<ScoreRow>, ApiError>;
    fn submit(&self, wpm: i64, accuracy: i64) -> Result<(), ApiError>;
}

/// Blocking HTTP client against the typeboard backend. The session cookie
/// set by the login flow rides in the cookie store; its contents are opaque.
pub struct HttpApi {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Browser URL for the external login redirect flow; never fetched.
    pub fn login_url(&self) -> String {
        self.url("/api/login")
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::Status(response.status().as_u16()))
        }
    }
}

impl ScoreboardApi for HttpApi {
    fn auth_status(&self) -> Result<UserIdentity, ApiError> {
        let response = self
            .client
            .get(self.url("/api/auth/status"))
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::check_status(response)?
            .json::<UserIdentity>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn leaderboard(&self) -> Result<Vec<ScoreRow>, ApiError> {
        let response = self
            .client
            .get(self.url("/api/leaderboard"))
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Self::check_status(response)?
            .json::<Vec<ScoreRow>>()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn submit(&self, wpm: i64, accuracy: i64) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/api/submit"))
            .json(&SubmitBody { wpm, accuracy })
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        // Response body is not consumed.
        Self::check_status(response).map(|_| ())
    }
}
