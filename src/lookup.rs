//! Metadata lookup: resolving numeric ids to account records.
//!
//! The gateway itself only speaks names; numeric ids come from the
//! service's HTTP metadata API. The client depends on the [`UserLookup`]
//! trait so tests (and embedders with their own API plumbing) can supply a
//! fake; [`HttpLookup`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::config::ApiConfig;

/// Errors from the metadata lookup collaborator.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Http(String),

    #[error("user {0} not found")]
    NotFound(u32),

    #[error("malformed lookup response: {0}")]
    Malformed(String),
}

/// A resolved account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: u32,
    pub username: String,
}

/// Request/response interface for numeric-id resolution.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup_user_by_id(&self, id: u32) -> Result<UserInfo, LookupError>;
}

/// The API spells numbers as strings; this is the raw payload shape.
#[derive(Debug, Deserialize)]
struct RawUser {
    user_id: String,
    username: String,
}

impl RawUser {
    fn into_info(self) -> Result<UserInfo, LookupError> {
        let id = self
            .user_id
            .parse()
            .map_err(|_| LookupError::Malformed(format!("user_id {:?}", self.user_id)))?;
        Ok(UserInfo {
            id,
            username: self.username,
        })
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation against the service's metadata API.
pub struct HttpLookup {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLookup {
    pub fn new(config: &ApiConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl UserLookup for HttpLookup {
    async fn lookup_user_by_id(&self, id: u32) -> Result<UserInfo, LookupError> {
        let url = format!("{}/get_user", self.base_url);
        let id_param = id.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("k", self.api_key.as_str()),
                ("u", id_param.as_str()),
                ("type", "id"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| LookupError::Http(e.to_string()))?;

        let records: Vec<RawUser> = response
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        match records.into_iter().next() {
            Some(raw) => raw.into_info(),
            None => Err(LookupError::NotFound(id)),
        }
    }
}
