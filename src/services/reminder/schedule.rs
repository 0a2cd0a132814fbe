//! Run-time arithmetic for reminders. Pure functions, no I/O.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Local hour at which outbound reminders may start.
pub const OPENING_HOUR: u32 = 9;
/// Local hour from which outbound reminders are deferred to the next morning.
pub const CLOSING_HOUR: u32 = 20;
/// Spacing between payment reminders, multiplied by the attempt number.
pub const PAYMENT_INTERVAL_HOURS: i64 = 4;

/// Moves `at` into the [09:00, 20:00) window of the studio's time zone.
///
/// Evening times go to 09:00 the next day, early-morning times to 09:00 the same day.
pub fn adjust_to_business_hours(at: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let local = at.with_timezone(&tz);
    let hour = local.hour();
    if (OPENING_HOUR..CLOSING_HOUR).contains(&hour) {
        return at;
    }

    let day = if hour >= CLOSING_HOUR {
        match local.date_naive().succ_opt() {
            Some(next) => next,
            None => return at,
        }
    } else {
        local.date_naive()
    };

    day.and_hms_opt(OPENING_HOUR, 0, 0)
        .and_then(|opening| tz.from_local_datetime(&opening).earliest())
        .map(|opening| opening.with_timezone(&Utc))
        .unwrap_or(at)
}

/// Next payment reminder: `last_reminded + (count + 1) * 4h`, kept inside business hours.
pub fn payment_run_time(last_reminded: DateTime<Utc>, count: u32, tz: Tz) -> DateTime<Utc> {
    let delay = Duration::hours(PAYMENT_INTERVAL_HOURS * (i64::from(count) + 1));
    adjust_to_business_hours(last_reminded + delay, tz)
}

/// Next sign-up reminder for an activity starting at `starts_at`.
///
/// Count 0 fires a day ahead, count 1 two hours ahead. A missed day-ahead slot advances the
/// count and shifts the run time by 22 hours. Returns `None` once no slot is left in the future.
pub fn signup_run_time(
    starts_at: DateTime<Utc>,
    count: u32,
    now: DateTime<Utc>,
) -> Option<(u32, DateTime<Utc>)> {
    let (mut count, mut run_at) = match count {
        0 => (0, starts_at - Duration::hours(24)),
        1 => (1, starts_at - Duration::hours(2)),
        _ => return None,
    };

    if run_at <= now && count == 0 {
        count = 1;
        run_at += Duration::hours(22);
    }

    if run_at <= now {
        None
    } else {
        Some((count, run_at))
    }
}
