//! Codec configuration.
//!
//! The composing application builds or deserializes a [`CodecConfig`]
//! once at start-up and hands it to the [`Codec`](crate::Codec).

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{EppError, Result};
use crate::status::StatusPolicy;
use crate::transfer::AutoResponsePolicy;

/// Configuration for encoding and decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Language tag stamped on outbound human-readable text (default: "en")
    pub language: String,
    /// Whether root elements declare `xsi:schemaLocation` (default: true)
    pub emit_schema_location: bool,
    /// How object status values are validated (default: open)
    pub status_policy: StatusPolicy,
    /// Transfer state machine settings
    pub transfer: TransferConfig,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            language: "en".into(),
            emit_schema_location: true,
            status_policy: StatusPolicy::Open,
            transfer: TransferConfig::default(),
        }
    }
}

impl CodecConfig {
    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_schema_location(mut self, emit: bool) -> Self {
        self.emit_schema_location = emit;
        self
    }

    pub fn with_transfer(mut self, transfer: TransferConfig) -> Self {
        self.transfer = transfer;
        self
    }
}

/// Settings for pending transfers that receive no reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Outcome applied when the acting sponsor never answers (default: approve)
    pub auto_response: AutoResponsePolicy,
    /// Days a transfer may stay pending before the automatic response (default: 5, at least 1)
    pub auto_response_days: i64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            auto_response: AutoResponsePolicy::Approve,
            auto_response_days: 5,
        }
    }
}

impl TransferConfig {
    /// The reply window, refusing days below 1 or beyond what a `Duration` can hold.
    pub fn auto_response_period(&self) -> Result<Duration> {
        let days = self.auto_response_days;
        if days < 1 {
            return Err(EppError::state(
                "auto-response-days",
                format!("{days} is not a positive number of days"),
            ));
        }
        Duration::try_days(days).ok_or_else(|| {
            EppError::state("auto-response-days", format!("{days} days is out of range"))
        })
    }
}
