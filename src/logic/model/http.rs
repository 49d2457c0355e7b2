//! HTTP scoring oracle
//!
//! `POST <url>` with the feature vector as JSON, expects
//! `{"probability": 0.87, "layout_hash": 1234}` (layout_hash optional).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ModelError;

use super::layout::{validate_layout, FeatureVector};
use super::oracle::ModelOracle;

#[derive(Debug, Deserialize)]
struct PredictResponse {
    probability: f64,
    #[serde(default)]
    layout_hash: Option<u32>,
}

pub struct HttpModelOracle {
    url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl HttpModelOracle {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ModelError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: url.to_string(),
            timeout,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ModelOracle for HttpModelOracle {
    fn name(&self) -> &str {
        "http"
    }

    async fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(features)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout)
                } else {
                    ModelError::from(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(ModelError::Transport(format!("HTTP {}", response.status().as_u16())));
        }

        let body: PredictResponse = response.json().await?;
        if let Some(hash) = body.layout_hash {
            validate_layout(hash)?;
        }
        Ok(body.probability)
    }
}
