pub const DEFAULT_NAMESPACE: &str = "ziggy";

pub const TOPIC_WEATHER_CURRENT_SUMMARY: &str = "weather/current/summary";
pub const TOPIC_WEATHER_CURRENT_ICON: &str = "weather/current/icon";
pub const TOPIC_WEATHER_CURRENT_TEMP: &str = "weather/current/temp";
pub const TOPIC_WEATHER_DAILY_SUMMARY: &str = "weather/daily/summary";
pub const TOPIC_WEATHER_DAILY_ICON: &str = "weather/daily/icon";
pub const TOPIC_WEATHER_DAILY_TEMP_HIGH: &str = "weather/daily/tempHigh";
pub const TOPIC_WEATHER_DAILY_TEMP_LOW: &str = "weather/daily/tempLow";
// Published upstream, intentionally left unbound.
pub const TOPIC_WEATHER_WEEKLY_SUMMARY: &str = "weather/weekly/summary";

pub const TOPIC_CLIMATE_SETPOINT: &str = "house/climate/temp/house";

pub const FILTER_WEATHER: &str = "weather/#";
pub const FILTER_CLIMATE_TEMP: &str = "house/climate/temp/#";

/// Joins a namespace and a topic suffix: `("ziggy", "weather/#")` -> `ziggy/weather/#`.
pub fn namespaced(namespace: &str, suffix: &str) -> String {
    let namespace = namespace.trim_end_matches('/');
    if namespace.is_empty() {
        suffix.to_string()
    } else {
        format!("{namespace}/{suffix}")
    }
}

/// Strips `namespace/` from an inbound topic. Returns `None` when the topic
/// lives outside the namespace.
pub fn strip_namespace<'a>(namespace: &str, topic: &'a str) -> Option<&'a str> {
    let namespace = namespace.trim_end_matches('/');
    if namespace.is_empty() {
        return Some(topic);
    }
    topic.strip_prefix(namespace)?.strip_prefix('/')
}
