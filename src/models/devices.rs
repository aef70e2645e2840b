use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{DeviceError, DeviceResult};

/// Canonical device state labels
pub mod state_label {
    pub const AVAILABLE: &str = "available";
    pub const IN_USE: &str = "in-use";
    pub const INACTIVE: &str = "inactive";
}

/// Lifecycle state of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    #[default]
    Available,
    InUse,
    Inactive,
}

impl DeviceState {
    pub const ALL: [DeviceState; 3] = [Self::Available, Self::InUse, Self::Inactive];

    pub fn label(self) -> &'static str {
        match self {
            Self::Available => state_label::AVAILABLE,
            Self::InUse => state_label::IN_USE,
            Self::Inactive => state_label::INACTIVE,
        }
    }
}

/// Parse a state label, ignoring case. Unknown labels never fall back to a default.
pub fn parse_state(text: &str) -> DeviceResult<DeviceState> {
    DeviceState::ALL
        .into_iter()
        .find(|s| s.label().eq_ignore_ascii_case(text))
        .ok_or_else(|| DeviceError::InvalidState(text.to_string()))
}

impl FromStr for DeviceState {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_state(s)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DeviceState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for DeviceState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_state(&text).map_err(serde::de::Error::custom)
    }
}

/// Device represents an inventory record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    /// Assigned by storage; `None` until first saved
    pub id: Option<i64>,
    pub name: String,
    pub brand: String,
    pub state: DeviceState,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    /// A new, unsaved device. State is always `Available`.
    pub fn new(name: impl Into<String>, brand: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            brand: brand.into(),
            state: DeviceState::Available,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.state == DeviceState::InUse
    }

    /// Overwrite only the fields present in the request
    pub fn apply(&mut self, req: UpdateDeviceRequest) {
        if let Some(name) = req.name {
            self.name = name;
        }
        if let Some(brand) = req.brand {
            self.brand = brand;
        }
        if let Some(state) = req.state {
            self.state = state;
        }
    }
}

/// CreateDeviceRequest for creating new devices.
/// Unknown fields (including `state`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeviceRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand: String,
}

/// UpdateDeviceRequest for full (PUT) and partial (PATCH) updates
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateDeviceRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub state: Option<DeviceState>,
}

/// Raw list query parameters, before the state label is parsed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDevicesQuery {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Validated filter for listing devices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceFilter {
    pub brand: Option<String>,
    pub state: Option<DeviceState>,
}

impl TryFrom<ListDevicesQuery> for DeviceFilter {
    type Error = DeviceError;

    fn try_from(query: ListDevicesQuery) -> Result<Self, Self::Error> {
        let state = query.state.as_deref().map(parse_state).transpose()?;
        Ok(Self {
            brand: query.brand,
            state,
        })
    }
}
