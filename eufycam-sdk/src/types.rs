use crate::error::{EufyError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Vendor code for a successful call
pub const CODE_SUCCESS: i64 = 0;
/// Vendor code for a rejected email/password pair
pub const CODE_INVALID_CREDENTIALS: i64 = 26006;
/// Vendor code asking for a one-time verification code
pub const CODE_NEED_VERIFY_CODE: i64 = 26052;

/// Response envelope shared by every endpoint: `{code, msg, data}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }

    /// Server message, or a generic one naming the code
    pub fn message(&self) -> String {
        match self.msg.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => format!("request failed with code {}", self.code),
        }
    }

    /// Fail with `EufyError::Api` unless the code is success
    pub fn check(&self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(EufyError::Api {
                code: self.code,
                message: self.message(),
            })
        }
    }

    /// Decode `data`, turning a non-zero code into `EufyError::Api`.
    /// A missing `data` decodes as JSON null.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        self.check()?;
        let data = self.data.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

/// Payload of a successful `passport/login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub token_expires_at: Option<i64>,
}

/// A camera registered to the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub device_name: String,
    pub station_sn: String,
    pub device_sn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<i64>,
}

/// Identifiers the stream and history endpoints take
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentifiers {
    pub station_sn: String,
    pub device_sn: String,
}

impl From<&Device> for DeviceIdentifiers {
    fn from(device: &Device) -> Self {
        Self {
            station_sn: device.station_sn.clone(),
            device_sn: device.device_sn.clone(),
        }
    }
}

/// A live stream started for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    pub url: String,
    pub device: DeviceIdentifiers,
}

/// One recorded event from the device's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub device_sn: String,
    pub station_sn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

/// Time window and page size for an event-history query
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
}

const DEFAULT_HISTORY_LIMIT: u32 = 100;

impl HistoryQuery {
    /// Window from `start` to `end`; `start` must come first
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>, limit: u32) -> Result<Self> {
        if start >= end {
            return Err(EufyError::Config(format!(
                "history window starts ({}) at or after it ends ({})",
                start, end
            )));
        }
        Ok(Self { start, end, limit })
    }

    /// The last `hours` hours up to now
    pub fn last_hours(hours: u32) -> Result<Self> {
        let end = Utc::now();
        let start = chrono::Duration::try_hours(i64::from(hours))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| {
                EufyError::Config(format!("history window of {} hours is out of range", hours))
            })?;
        Self::between(start, end, DEFAULT_HISTORY_LIMIT)
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        let end = Utc::now();
        Self {
            start: end - chrono::Duration::hours(24),
            end,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
