//! Transaction intake record
//!
//! Shape owned by the intake layer; this core only reads it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::velocity::Observation;

/// Inbound transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub user_id: String,
    pub vertical: String,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_transaction_type")]
    pub transaction_type: String,
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub ip_country: Option<String>,
    #[serde(default)]
    pub account_created_at: Option<DateTime<Utc>>,

    /// Vertical-specific scalar inputs
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_transaction_type() -> String {
    "payment".to_string()
}

impl Transaction {
    pub fn new(
        transaction_id: impl Into<String>,
        user_id: impl Into<String>,
        vertical: impl Into<String>,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            vertical: vertical.into(),
            amount,
            currency: default_currency(),
            transaction_type: default_transaction_type(),
            timestamp,
            device_id: None,
            ip_address: None,
            email: None,
            phone: None,
            country: None,
            ip_country: None,
            account_created_at: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_device(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip_address = Some(ip.to_string());
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_countries(mut self, country: &str, ip_country: &str) -> Self {
        self.country = Some(country.to_string());
        self.ip_country = Some(ip_country.to_string());
        self
    }

    pub fn with_type(mut self, transaction_type: &str) -> Self {
        self.transaction_type = transaction_type.to_string();
        self
    }

    pub fn with_account_created(mut self, created_at: DateTime<Utc>) -> Self {
        self.account_created_at = Some(created_at);
        self
    }

    pub fn with_attribute(mut self, key: &str, value: serde_json::Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// Velocity observation recorded once this transaction has been scored
    pub fn observation(&self) -> Observation {
        Observation {
            transaction_id: self.transaction_id.clone(),
            amount: if self.amount.is_finite() { self.amount.max(0.0) } else { 0.0 },
            timestamp: self.timestamp,
            user_id: self.user_id.clone(),
            device_id: self.device_id.clone(),
            ip_address: self.ip_address.clone(),
        }
    }
}
