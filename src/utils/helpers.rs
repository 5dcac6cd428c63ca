use crate::errors::Error;
use std::time::Duration;

/// Parses an optional humantime duration string ("30m", "5s"), falling back
/// to the given default when the field is absent.
///
/// # Arguments
///
/// * `field` - Name of the configuration field, used in the error message
/// * `value` - The raw string from the configuration file, if any
/// * `default` - Duration string applied when `value` is `None`
///
/// # Errors
///
/// Returns `Error::InvalidDuration` if the present value does not parse.
pub fn parse_duration_field(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<Duration, Error> {
    let raw = value.unwrap_or(default);
    humantime::parse_duration(raw).map_err(|_| Error::InvalidDuration {
        field,
        value: raw.to_string(),
    })
}

/// Joins task ids into the comma-separated form used in error messages.
pub fn join_task_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .map(|id| id.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_present_value_over_default() {
        let d = parse_duration_field("stage_timeout", Some("90s"), "30m").unwrap();
        assert_eq!(d, Duration::from_secs(90));
    }

    #[test]
    fn falls_back_to_default() {
        let d = parse_duration_field("poll_interval", None, "5s").unwrap();
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_duration_field("stage_timeout", Some("soon"), "30m").unwrap_err();
        assert!(err.to_string().contains("stage_timeout"));
    }
}
