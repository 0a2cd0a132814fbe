use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Input formats accepted for activity start times, in studio-local time.
const INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%d.%m.%Y %H:%M"];

/// Parses a studio-local date and time such as `2030-03-04 18:30` or `04.03.2030 18:30`.
pub fn parse_local_datetime(input: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let naive = INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| anyhow!("Expected a date like 2030-03-04 18:30"))?;

    // A time skipped by a DST jump has no local reading.
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("{} does not exist in {}", input, tz))
}

pub fn format_datetime(dt: &DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format("%a, %d %b %Y at %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_formats_in_studio_time() {
        let tz: Tz = "Europe/Moscow".parse().unwrap();
        let expected = Utc.with_ymd_and_hms(2030, 3, 4, 15, 30, 0).unwrap();
        assert_eq!(parse_local_datetime("2030-03-04 18:30", tz).unwrap(), expected);
        assert_eq!(parse_local_datetime(" 04.03.2030 18:30 ", tz).unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_local_datetime("tomorrow", chrono_tz::UTC).is_err());
        assert!(parse_local_datetime("2030-13-01 10:00", chrono_tz::UTC).is_err());
        assert!(parse_local_datetime("2030-03-04", chrono_tz::UTC).is_err());
    }

    #[test]
    fn test_format_uses_local_time() {
        let tz: Tz = "Europe/Moscow".parse().unwrap();
        let dt = Utc.with_ymd_and_hms(2030, 3, 4, 15, 30, 0).unwrap();
        assert_eq!(format_datetime(&dt, tz), "Mon, 04 Mar 2030 at 18:30");
    }
}
