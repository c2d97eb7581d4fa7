// src/services/fetcher.rs

//! Board fetcher.
//!
//! One GET per call and no retries; the polling cadence is the retry policy.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::FetcherConfig;
use crate::utils::http::create_async_client;

/// Source of raw board markup.
#[async_trait]
pub trait BoardFetcher: Send + Sync {
    /// Fetch the markup published at `board_url`.
    ///
    /// Network failures, timeouts and non-2xx statuses are all
    /// reported as [`AppError::Fetch`].
    async fn fetch(&self, board_url: &str) -> Result<String>;
}

/// Fetches boards over HTTP.
#[derive(Clone)]
pub struct HttpBoardFetcher {
    client: Client,
}

impl HttpBoardFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BoardFetcher for HttpBoardFetcher {
    async fn fetch(&self, board_url: &str) -> Result<String> {
        if board_url.trim().is_empty() {
            return Err(AppError::fetch(board_url, "empty board URL"));
        }

        let response = self
            .client
            .get(board_url)
            .send()
            .await
            .map_err(|e| AppError::fetch(board_url, describe(&e)))?
            .error_for_status()
            .map_err(|e| AppError::fetch(board_url, describe(&e)))?;

        response
            .text()
            .await
            .map_err(|e| AppError::fetch(board_url, describe(&e)))
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if let Some(status) = error.status() {
        format!("HTTP status {status}")
    } else {
        error.to_string()
    }
}
