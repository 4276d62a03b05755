use thiserror::Error;

use crate::{config::IconConfig, types::FieldValue};

pub const TEMP_UNIT: &str = "°F";
pub const TEMP_FALLBACK: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    PassThrough,
    RoundedTemp,
    IconPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("payload is empty")]
    Empty,
    #[error("payload '{0}' is not a finite number")]
    NotNumeric(String),
    #[error("payload '{0}' is out of the displayable range")]
    OutOfRange(String),
    #[error("payload '{0}' is not a valid icon name")]
    InvalidIconName(String),
    #[error("icon '{0}' is not in the icon catalog")]
    UnknownIcon(String),
}

/// Result of applying a transform. A fallback still carries a displayable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    Ok(FieldValue),
    Fallback {
        value: FieldValue,
        reason: PayloadError,
    },
}

impl Transformed {
    pub fn value(&self) -> &FieldValue {
        match self {
            Self::Ok(value) | Self::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl Transform {
    pub fn apply(self, payload: &str, icons: &IconConfig) -> Transformed {
        match self {
            Self::PassThrough => Transformed::Ok(FieldValue::Text(payload.to_string())),
            Self::RoundedTemp => rounded_temp(payload),
            Self::IconPath => icon_path(payload, icons),
        }
    }
}

pub fn rounded_temp(payload: &str) -> Transformed {
    match parse_temp(payload).and_then(|value| round_half_up(payload, value)) {
        Ok(rounded) => Transformed::Ok(FieldValue::Text(format!("{rounded}{TEMP_UNIT}"))),
        Err(reason) => Transformed::Fallback {
            value: FieldValue::Text(format!("{TEMP_FALLBACK}{TEMP_UNIT}")),
            reason,
        },
    }
}

pub fn icon_path(payload: &str, icons: &IconConfig) -> Transformed {
    match validate_icon_name(payload, icons) {
        Ok(name) => Transformed::Ok(FieldValue::Resource(icon_resource(icons, name))),
        Err(reason) => Transformed::Fallback {
            value: FieldValue::Resource(icon_resource(icons, &icons.fallback)),
            reason,
        },
    }
}

pub fn icon_resource(icons: &IconConfig, name: &str) -> String {
    format!("{}{}{}", icons.base_dir, name, icons.extension)
}

fn parse_temp(payload: &str) -> Result<f64, PayloadError> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::Empty);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PayloadError::NotNumeric(trimmed.to_string())),
    }
}

// Halves round toward positive infinity: 71.5 -> 72, -2.5 -> -2.
fn round_half_up(payload: &str, value: f64) -> Result<i64, PayloadError> {
    let rounded = (value + 0.5).floor();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
        return Err(PayloadError::OutOfRange(payload.trim().to_string()));
    }
    Ok(rounded as i64)
}

fn validate_icon_name<'a>(payload: &'a str, icons: &IconConfig) -> Result<&'a str, PayloadError> {
    let name = payload.trim();
    if name.is_empty() {
        return Err(PayloadError::Empty);
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(PayloadError::InvalidIconName(name.to_string()));
    }
    if !icons.catalog.is_empty() && !icons.catalog.iter().any(|known| known == name) {
        return Err(PayloadError::UnknownIcon(name.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text(value: &str) -> FieldValue {
        FieldValue::Text(value.to_string())
    }

    #[test]
    fn rounds_numeric_payloads_with_unit() {
        assert_eq!(rounded_temp("71.6"), Transformed::Ok(text("72°F")));
        assert_eq!(rounded_temp("71.4"), Transformed::Ok(text("71°F")));
        assert_eq!(rounded_temp("71.5"), Transformed::Ok(text("72°F")));
        assert_eq!(rounded_temp(" 68 "), Transformed::Ok(text("68°F")));
        assert_eq!(rounded_temp("-2.5"), Transformed::Ok(text("-2°F")));
        assert_eq!(rounded_temp("-2.6"), Transformed::Ok(text("-3°F")));
    }

    #[test]
    fn non_numeric_payloads_fall_back() {
        for payload in ["", "   ", "warm", "NaN", "inf", "70F"] {
            let result = rounded_temp(payload);
            assert!(result.is_fallback(), "{payload:?} should fall back");
            assert_eq!(result.value(), &text("--°F"));
        }
        assert_eq!(
            rounded_temp("warm"),
            Transformed::Fallback {
                value: text("--°F"),
                reason: PayloadError::NotNumeric("warm".to_string()),
            }
        );
    }

    #[test]
    fn huge_values_fall_back_instead_of_saturating() {
        for payload in ["1e300", "-1e300", "9223372036854775807"] {
            assert_eq!(
                rounded_temp(payload),
                Transformed::Fallback {
                    value: text("--°F"),
                    reason: PayloadError::OutOfRange(payload.to_string()),
                },
                "{payload}"
            );
        }
        assert_eq!(rounded_temp("1e3"), Transformed::Ok(text("1000°F")));
    }

    #[test]
    fn builds_icon_paths() {
        let icons = IconConfig::default();
        assert_eq!(
            icon_path("clear-day", &icons).value().as_str(),
            "../assets/images/weather/icon-set/GIF/50x50/clear-day.gif"
        );
        assert_eq!(
            icon_path("", &icons),
            Transformed::Fallback {
                value: FieldValue::Resource(
                    "../assets/images/weather/icon-set/GIF/50x50/na.gif".to_string()
                ),
                reason: PayloadError::Empty,
            }
        );
    }

    #[test]
    fn rejects_path_like_icon_names() {
        let icons = IconConfig::default();
        let result = icon_path("../../secret", &icons);
        assert!(result.is_fallback());
        assert!(result.value().as_str().ends_with("na.gif"));
    }

    #[test]
    fn catalog_limits_icon_names() {
        let icons = IconConfig {
            catalog: vec!["rain".to_string(), "snow".to_string()],
            ..IconConfig::default()
        };
        assert!(!icon_path("rain", &icons).is_fallback());

        let result = icon_path("tornado", &icons);
        assert!(result.value().as_str().ends_with("/na.gif"));
        assert_eq!(
            result,
            Transformed::Fallback {
                value: FieldValue::Resource(icon_resource(&icons, "na")),
                reason: PayloadError::UnknownIcon("tornado".to_string()),
            }
        );
    }

    #[test]
    fn pass_through_is_verbatim() {
        let icons = IconConfig::default();
        assert_eq!(
            Transform::PassThrough.apply("  Partly cloudy ", &icons),
            Transformed::Ok(text("  Partly cloudy "))
        );
    }
}
