#![forbid(unsafe_code)]

//! Display formatting for scores, counts and times.

use chrono::{DateTime, Local};

/// Format a mark for display: whole numbers without a fractional part,
/// anything else rounded to two decimals with trailing zeros trimmed.
///
/// ```
/// use examview_runtime::view_state::nice_number;
///
/// assert_eq!(nice_number(7.0), "7");
/// assert_eq!(nice_number(2.5), "2.5");
/// assert_eq!(nice_number(1.0 / 3.0), "0.33");
/// ```
#[must_use]
pub fn nice_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_owned(),
        other => other.to_owned(),
    }
}

/// `singular` when `count` is exactly one, `plural` otherwise.
#[must_use]
pub fn pluralise<'a>(count: f64, singular: &'a str, plural: &'a str) -> &'a str {
    if (count - 1.0).abs() < f64::EPSILON {
        singular
    } else {
        plural
    }
}

/// `"3 marks"`, `"1 mark"`, `"0.5 marks"`.
#[must_use]
pub fn marks_string(marks: f64) -> String {
    format!("{} {}", nice_number(marks), pluralise(marks, "mark", "marks"))
}

/// Score as shown in the exam header: `"score/total"` when the total may be
/// shown, otherwise just `"score"`.
#[must_use]
pub fn score_display(score: f64, marks: f64, show_total_mark: bool) -> String {
    if show_total_mark {
        format!("{}/{}", nice_number(score), nice_number(marks))
    } else {
        nice_number(score)
    }
}

/// A fraction in `0.0..=1.0` as a percentage string, e.g. `0.5 -> "50%"`.
#[must_use]
pub fn percent_display(fraction: f64) -> String {
    format!("{}%", nice_number(fraction * 100.0))
}

/// Seconds as a clock reading: `H:MM:SS` from one hour up, `MM:SS` below.
/// Fractions of a second are dropped; negative durations get a leading `-`.
#[must_use]
pub fn secs_to_display_time(secs: f64) -> String {
    if !secs.is_finite() {
        return String::new();
    }
    if secs < 0.0 {
        return format!("-{}", secs_to_display_time(-secs));
    }
    let total = secs.floor() as u64;
    let (hours, minutes, seconds) = (total / 3600, (total / 60) % 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Wall-clock time of day for the result page.
#[must_use]
pub fn format_time(time: &DateTime<Local>) -> String {
    time.format("%H:%M:%S").to_string()
}
