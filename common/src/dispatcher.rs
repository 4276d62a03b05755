use std::collections::{BTreeMap, VecDeque};

use crate::{
    config::{DashboardConfig, IconConfig, SetpointConfig},
    topics::{
        namespaced, strip_namespace, TOPIC_CLIMATE_SETPOINT, TOPIC_WEATHER_CURRENT_ICON,
        TOPIC_WEATHER_CURRENT_SUMMARY, TOPIC_WEATHER_CURRENT_TEMP, TOPIC_WEATHER_DAILY_ICON,
        TOPIC_WEATHER_DAILY_SUMMARY, TOPIC_WEATHER_DAILY_TEMP_HIGH, TOPIC_WEATHER_DAILY_TEMP_LOW,
    },
    transform::{icon_resource, Transform, Transformed},
    types::{AdjustDirection, BrokerCommand, FieldId, FieldValue, Qos},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub suffix: &'static str,
    pub field: FieldId,
    pub transform: Transform,
}

/// Topic suffix to field table shared by every dashboard view.
pub static BINDINGS: [FieldBinding; 8] = [
    FieldBinding {
        suffix: TOPIC_WEATHER_CURRENT_SUMMARY,
        field: FieldId::CurrentSummary,
        transform: Transform::PassThrough,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_CURRENT_ICON,
        field: FieldId::CurrentIcon,
        transform: Transform::IconPath,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_CURRENT_TEMP,
        field: FieldId::CurrentTemp,
        transform: Transform::RoundedTemp,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_DAILY_SUMMARY,
        field: FieldId::DailySummary,
        transform: Transform::PassThrough,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_DAILY_ICON,
        field: FieldId::DailyIcon,
        transform: Transform::IconPath,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_DAILY_TEMP_HIGH,
        field: FieldId::TempHigh,
        transform: Transform::RoundedTemp,
    },
    FieldBinding {
        suffix: TOPIC_WEATHER_DAILY_TEMP_LOW,
        field: FieldId::TempLow,
        transform: Transform::RoundedTemp,
    },
    FieldBinding {
        suffix: TOPIC_CLIMATE_SETPOINT,
        field: FieldId::DesiredTemp,
        transform: Transform::PassThrough,
    },
];

pub fn binding_for(suffix: &str) -> Option<&'static FieldBinding> {
    BINDINGS.iter().find(|binding| binding.suffix == suffix)
}

/// Displayed values, keyed by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl FieldState {
    /// Placeholder contents a freshly loaded page shows.
    pub fn initial(icons: &IconConfig) -> Self {
        let na_icon = FieldValue::Resource(icon_resource(icons, &icons.fallback));
        let mut fields = BTreeMap::new();
        for field in FieldId::ALL {
            let value = match field {
                FieldId::CurrentIcon | FieldId::DailyIcon => na_icon.clone(),
                FieldId::CurrentTemp => FieldValue::Text("Current Temp".to_string()),
                _ => FieldValue::Text(String::new()),
            };
            fields.insert(field, value);
        }
        Self { fields }
    }

    pub fn text(&self, field: FieldId) -> &str {
        self.fields.get(&field).map(FieldValue::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: FieldId, value: FieldValue) {
        self.fields.insert(field, value);
    }

    pub fn fields(&self) -> &BTreeMap<FieldId, FieldValue> {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub field: FieldId,
    pub result: Transformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Applied(FieldUpdate),
    /// Setpoint echo older than the latest local publish.
    StaleEcho { field: FieldId, payload: String },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetpointChange {
    pub previous: String,
    pub value: i64,
    pub reset_to_default: bool,
    pub command: BrokerCommand,
}

/// Locally published setpoint values still waiting for their broker echo.
#[derive(Debug, Clone, Default)]
struct EchoGuard {
    pending: VecDeque<String>,
}

const MAX_PENDING_ECHOES: usize = 32;

impl EchoGuard {
    fn record(&mut self, payload: &str) {
        if self.pending.len() == MAX_PENDING_ECHOES {
            self.pending.pop_front();
        }
        self.pending.push_back(payload.to_string());
    }

    /// True when the echo should be applied.
    fn accept(&mut self, payload: &str) -> bool {
        let Some(position) = self.pending.iter().position(|value| value == payload) else {
            // Not ours: someone else changed the setpoint.
            self.pending.clear();
            return true;
        };

        let latest = position + 1 == self.pending.len();
        self.pending.drain(..=position);
        latest
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    namespace: String,
    icons: IconConfig,
    setpoint: SetpointConfig,
    echo_guard: Option<EchoGuard>,
}

impl Dispatcher {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            icons: config.icons.clone(),
            setpoint: config.setpoint.clone(),
            echo_guard: config.setpoint.echo_guard.then(EchoGuard::default),
        }
    }

    pub fn setpoint_topic(&self) -> String {
        namespaced(&self.namespace, TOPIC_CLIMATE_SETPOINT)
    }

    pub fn handle_message(
        &mut self,
        state: &mut FieldState,
        topic: &str,
        payload: &str,
    ) -> Dispatch {
        let Some(binding) = strip_namespace(&self.namespace, topic).and_then(binding_for) else {
            return Dispatch::Ignored;
        };

        if binding.field == FieldId::DesiredTemp {
            if let Some(guard) = self.echo_guard.as_mut() {
                if !guard.accept(payload) {
                    return Dispatch::StaleEcho {
                        field: binding.field,
                        payload: payload.to_string(),
                    };
                }
            }
        }

        let result = binding.transform.apply(payload, &self.icons);
        state.set(binding.field, result.value().clone());
        Dispatch::Applied(FieldUpdate {
            field: binding.field,
            result,
        })
    }

    /// Steps the displayed setpoint and updates it locally before the broker confirms.
    pub fn adjust_setpoint(
        &mut self,
        state: &mut FieldState,
        direction: AdjustDirection,
    ) -> SetpointChange {
        let previous = state.text(FieldId::DesiredTemp).to_string();
        let (value, reset_to_default) = match previous.trim().parse::<i64>() {
            Ok(current) => (current.saturating_add(direction.step()), false),
            Err(_) => (self.setpoint.default, true),
        };

        let payload = value.to_string();
        if let Some(guard) = self.echo_guard.as_mut() {
            guard.record(&payload);
        }
        state.set(FieldId::DesiredTemp, FieldValue::Text(payload.clone()));

        SetpointChange {
            previous,
            value,
            reset_to_default,
            command: BrokerCommand::Publish {
                topic: self.setpoint_topic(),
                payload,
                qos: Qos::AtLeastOnce,
                retain: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn setup() -> (Dispatcher, FieldState) {
        let config = DashboardConfig::default();
        let state = FieldState::initial(&config.icons);
        (Dispatcher::new(&config), state)
    }

    fn guarded() -> (Dispatcher, FieldState) {
        let mut config = DashboardConfig::default();
        config.setpoint.echo_guard = true;
        let state = FieldState::initial(&config.icons);
        (Dispatcher::new(&config), state)
    }

    #[test]
    fn every_binding_suffix_is_unique() {
        for binding in &BINDINGS {
            assert_eq!(binding_for(binding.suffix), Some(binding));
        }
    }

    #[test]
    fn current_temp_is_rounded() {
        let (mut dispatcher, mut state) = setup();
        dispatcher.handle_message(&mut state, "ziggy/weather/current/temp", "71.6");
        assert_eq!(state.text(FieldId::CurrentTemp), "72°F");
    }

    #[test]
    fn icons_resolve_or_fall_back() {
        let (mut dispatcher, mut state) = setup();

        dispatcher.handle_message(&mut state, "ziggy/weather/current/icon", "clear-day");
        assert!(state.text(FieldId::CurrentIcon).ends_with("clear-day.gif"));

        dispatcher.handle_message(&mut state, "ziggy/weather/current/icon", "");
        assert!(state.text(FieldId::CurrentIcon).ends_with("na.gif"));
    }

    #[test]
    fn binds_all_weather_fields() {
        let (mut dispatcher, mut state) = setup();
        let messages = [
            ("ziggy/weather/current/summary", "Drizzle"),
            ("ziggy/weather/daily/summary", "Rain until evening."),
            ("ziggy/weather/daily/icon", "rain"),
            ("ziggy/weather/daily/tempHigh", "55.2"),
            ("ziggy/weather/daily/tempLow", "38.9"),
        ];
        for (topic, payload) in messages {
            assert!(matches!(
                dispatcher.handle_message(&mut state, topic, payload),
                Dispatch::Applied(_)
            ));
        }

        assert_eq!(state.text(FieldId::CurrentSummary), "Drizzle");
        assert_eq!(state.text(FieldId::DailySummary), "Rain until evening.");
        assert!(state.text(FieldId::DailyIcon).ends_with("/rain.gif"));
        assert_eq!(state.text(FieldId::TempHigh), "55°F");
        assert_eq!(state.text(FieldId::TempLow), "39°F");
    }

    #[test]
    fn unknown_topics_leave_state_untouched() {
        let (mut dispatcher, mut state) = setup();
        let before = state.clone();

        for topic in [
            "ziggy/weather/weekly/summary",
            "ziggy/weather/current",
            "ziggy/weather/current/temp/extra",
            "other/weather/current/temp",
            "weather/current/temp",
            "ziggy/house/climate/temp/kitchen",
        ] {
            assert_eq!(
                dispatcher.handle_message(&mut state, topic, "71"),
                Dispatch::Ignored
            );
        }

        assert_eq!(state, before);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let (mut dispatcher, mut state) = setup();
        dispatcher.handle_message(&mut state, "ziggy/weather/daily/tempHigh", "80.4");
        let once = state.clone();
        dispatcher.handle_message(&mut state, "ziggy/weather/daily/tempHigh", "80.4");
        assert_eq!(state, once);
    }

    #[test]
    fn malformed_temperature_shows_fallback() {
        let (mut dispatcher, mut state) = setup();
        let dispatch = dispatcher.handle_message(&mut state, "ziggy/weather/current/temp", "n/a");

        let Dispatch::Applied(update) = dispatch else {
            panic!("expected applied update, got {dispatch:?}");
        };
        assert!(update.result.is_fallback());
        assert_eq!(state.text(FieldId::CurrentTemp), "--°F");
    }

    #[test]
    fn increase_publishes_retained_setpoint() {
        let (mut dispatcher, mut state) = setup();
        state.set(FieldId::DesiredTemp, FieldValue::Text("69".to_string()));

        let change = dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

        assert_eq!(change.value, 70);
        assert!(!change.reset_to_default);
        assert_eq!(
            change.command,
            BrokerCommand::Publish {
                topic: "ziggy/house/climate/temp/house".to_string(),
                payload: "70".to_string(),
                qos: Qos::AtLeastOnce,
                retain: true,
            }
        );
        assert_eq!(state.text(FieldId::DesiredTemp), "70");
    }

    #[test]
    fn decrease_steps_down() {
        let (mut dispatcher, mut state) = setup();
        state.set(FieldId::DesiredTemp, FieldValue::Text("72".to_string()));

        let change = dispatcher.adjust_setpoint(&mut state, AdjustDirection::Decrease);

        assert_eq!(change.value, 71);
        assert_eq!(state.text(FieldId::DesiredTemp), "71");
    }

    #[test]
    fn non_integer_setpoint_resets_to_default() {
        for displayed in ["", "Desired", "70.5", "down"] {
            let (mut dispatcher, mut state) = setup();
            state.set(FieldId::DesiredTemp, FieldValue::Text(displayed.to_string()));

            let change = dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

            assert_eq!(change.value, 69, "displayed {displayed:?}");
            assert!(change.reset_to_default);
            assert_eq!(state.text(FieldId::DesiredTemp), "69");
        }
    }

    #[test]
    fn rapid_presses_read_local_value() {
        let (mut dispatcher, mut state) = setup();
        state.set(FieldId::DesiredTemp, FieldValue::Text("68".to_string()));

        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);
        let change = dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

        assert_eq!(change.value, 71);
    }

    #[test]
    fn echo_overwrites_without_guard() {
        let (mut dispatcher, mut state) = setup();
        state.set(FieldId::DesiredTemp, FieldValue::Text("68".to_string()));
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

        dispatcher.handle_message(&mut state, "ziggy/house/climate/temp/house", "69");

        assert_eq!(state.text(FieldId::DesiredTemp), "69");
    }

    #[test]
    fn guard_ignores_stale_echoes() {
        let (mut dispatcher, mut state) = guarded();
        state.set(FieldId::DesiredTemp, FieldValue::Text("68".to_string()));
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

        let stale = dispatcher.handle_message(&mut state, "ziggy/house/climate/temp/house", "69");
        assert!(matches!(stale, Dispatch::StaleEcho { .. }));
        assert_eq!(state.text(FieldId::DesiredTemp), "70");

        let latest = dispatcher.handle_message(&mut state, "ziggy/house/climate/temp/house", "70");
        assert!(matches!(latest, Dispatch::Applied(_)));
        assert_eq!(state.text(FieldId::DesiredTemp), "70");
    }

    #[test]
    fn guard_accepts_external_changes() {
        let (mut dispatcher, mut state) = guarded();
        state.set(FieldId::DesiredTemp, FieldValue::Text("68".to_string()));
        dispatcher.adjust_setpoint(&mut state, AdjustDirection::Increase);

        dispatcher.handle_message(&mut state, "ziggy/house/climate/temp/house", "74");
        assert_eq!(state.text(FieldId::DesiredTemp), "74");

        // Pending queue was cleared, so a late echo of 69 is now treated as external.
        dispatcher.handle_message(&mut state, "ziggy/house/climate/temp/house", "69");
        assert_eq!(state.text(FieldId::DesiredTemp), "69");
    }

    #[test]
    fn custom_namespace_changes_topics() {
        let mut config = DashboardConfig::default();
        config.namespace = "home".to_string();
        let mut dispatcher = Dispatcher::new(&config);
        let mut state = FieldState::initial(&config.icons);

        assert_eq!(
            dispatcher.handle_message(&mut state, "ziggy/weather/current/temp", "50"),
            Dispatch::Ignored
        );
        dispatcher.handle_message(&mut state, "home/weather/current/temp", "50");
        assert_eq!(state.text(FieldId::CurrentTemp), "50°F");
        assert_eq!(dispatcher.setpoint_topic(), "home/house/climate/temp/house");
    }
}
