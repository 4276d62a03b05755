use serde::{Deserialize, Serialize};

/// UI fields a dashboard page renders. Serialized names match the page's element ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldId {
    #[serde(rename = "currentSummary")]
    CurrentSummary,
    #[serde(rename = "currentIcon")]
    CurrentIcon,
    #[serde(rename = "currentTemp")]
    CurrentTemp,
    #[serde(rename = "dailySummary")]
    DailySummary,
    #[serde(rename = "dailyIcon")]
    DailyIcon,
    #[serde(rename = "tempHigh")]
    TempHigh,
    #[serde(rename = "tempLow")]
    TempLow,
    #[serde(rename = "desiredTemp")]
    DesiredTemp,
}

impl FieldId {
    pub const ALL: [FieldId; 8] = [
        Self::CurrentSummary,
        Self::CurrentIcon,
        Self::CurrentTemp,
        Self::DailySummary,
        Self::DailyIcon,
        Self::TempHigh,
        Self::TempLow,
        Self::DesiredTemp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CurrentSummary => "currentSummary",
            Self::CurrentIcon => "currentIcon",
            Self::CurrentTemp => "currentTemp",
            Self::DailySummary => "dailySummary",
            Self::DailyIcon => "dailyIcon",
            Self::TempHigh => "tempHigh",
            Self::TempLow => "tempLow",
            Self::DesiredTemp => "desiredTemp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Resource(String),
}

impl FieldValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Resource(path) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Qos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

/// Broker requests produced by the dispatcher. The host executes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerCommand {
    Subscribe {
        filter: String,
        qos: Qos,
    },
    Publish {
        topic: String,
        payload: String,
        qos: Qos,
        retain: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustDirection {
    Increase,
    Decrease,
}

impl AdjustDirection {
    pub fn step(self) -> i64 {
        match self {
            Self::Increase => 1,
            Self::Decrease => -1,
        }
    }
}

/// Dashboard pages. Each keeps its own broker connection and subscription set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardView {
    Weather,
    Climate,
    Thermostat,
}

impl DashboardView {
    pub fn client_id(self) -> &'static str {
        match self {
            Self::Weather => "WEATHER",
            Self::Climate => "CLIMATE",
            Self::Thermostat => "THERMOSTAT",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Climate => "climate",
            Self::Thermostat => "thermostat",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "weather" => Some(Self::Weather),
            "climate" => Some(Self::Climate),
            "thermostat" => Some(Self::Thermostat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Subscribed => "SUBSCRIBED",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSnapshot {
    pub state: &'static str,
    #[serde(rename = "clientId")]
    pub client_id: &'static str,
    #[serde(rename = "connectCount")]
    pub connect_count: u64,
    #[serde(rename = "lossCount")]
    pub loss_count: u64,
    #[serde(rename = "pendingSubscriptions")]
    pub pending_subscriptions: usize,
    #[serde(rename = "rejectedSubscriptions")]
    pub rejected_subscriptions: usize,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
}
