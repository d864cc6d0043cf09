//! Engine configuration: the single timezone policy and DST handling.
//!
//! Every calendar-day computation (occurrence dates, occurrence keys, the
//! recurrence end date comparison) happens in [`EngineConfig::timezone`].
//! Rooms in one deployment share a timezone; callers serving rooms in
//! several zones keep one config per zone.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// IANA timezone the rooms operate in (e.g., "America/Sao_Paulo").
    pub timezone: Tz,
    pub dst_policy: DstPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            dst_policy: DstPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            ..Self::default()
        }
    }

    /// Build a config from an IANA timezone name.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidTimezone` if the name is not a known zone.
    pub fn with_timezone_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }

    pub fn with_dst_policy(mut self, policy: DstPolicy) -> Self {
        self.dst_policy = policy;
        self
    }

    /// Parse a JSON config document. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidConfig` if the document is not valid JSON
    /// or names an unknown timezone / DST policy.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::InvalidConfig(e.to_string()))
    }
}
