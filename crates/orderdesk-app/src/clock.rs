// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::debug;

use crate::{HostPage, Severity};

pub const CLOCK_MARK: &str = "🕒";
pub const INVALID_ZONE_MESSAGE: &str = "⚠ invalid zone";

/// Zones the site settings page offers, with their UTC offset in hours.
/// None of them observe daylight saving time.
pub const KNOWN_ZONES: &[(&str, i8)] = &[
    ("UTC", 0),
    ("Europe/Kaliningrad", 2),
    ("Europe/Moscow", 3),
    ("Europe/Samara", 4),
    ("Asia/Yekaterinburg", 5),
    ("Asia/Omsk", 6),
    ("Asia/Novosibirsk", 7),
    ("Asia/Krasnoyarsk", 7),
    ("Asia/Irkutsk", 8),
    ("Asia/Yakutsk", 9),
    ("Asia/Vladivostok", 10),
    ("Asia/Magadan", 11),
    ("Asia/Kamchatka", 12),
];

/// Live preview of the current time in the zone picked on the settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockPreview {
    pub zone: String,
    pub text: String,
    pub valid: bool,
}

impl ClockPreview {
    /// Valid previews are drawn bold in the success color; an invalid zone
    /// keeps the default text color.
    pub fn color(&self) -> Option<&'static str> {
        self.valid.then(|| Severity::Success.surface_color())
    }
}

/// Resolves a zone from the table above, or a literal offset such as
/// `UTC+03:00`, `GMT-5` or `+05:30`.
pub fn zone_offset(zone: &str) -> Option<UtcOffset> {
    let zone = zone.trim();
    if let Some((_, hours)) = KNOWN_ZONES.iter().find(|(name, _)| *name == zone) {
        return UtcOffset::from_hms(*hours, 0, 0).ok();
    }
    let rest = zone
        .strip_prefix("UTC")
        .or_else(|| zone.strip_prefix("GMT"))
        .unwrap_or(zone);
    let (sign, digits) = if let Some(digits) = rest.strip_prefix('+') {
        (1, digits)
    } else if let Some(digits) = rest.strip_prefix('-') {
        (-1, digits)
    } else {
        return None;
    };
    let (hours, minutes) = digits.split_once(':').unwrap_or((digits, "00"));
    let hours = offset_part(hours, 14)?;
    let minutes = offset_part(minutes, 59)?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}

fn offset_part(raw: &str, max: i8) -> Option<i8> {
    if raw.is_empty() || raw.len() > 2 || !raw.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i8>().ok().filter(|value| *value <= max)
}

/// Formats `now` in `zone`, e.g. `🕒 Fri 16 October, 14:05:09`.
pub fn preview(zone: &str, now: OffsetDateTime) -> ClockPreview {
    let format = format_description!(
        "[weekday repr:short] [day padding:none] [month repr:long], [hour]:[minute]:[second]"
    );
    let text = zone_offset(zone)
        .and_then(|offset| now.to_offset(offset).format(format).ok());
    match text {
        Some(text) => ClockPreview {
            zone: zone.to_owned(),
            text: format!("{CLOCK_MARK} {text}"),
            valid: true,
        },
        None => {
            debug!(zone, "clock preview has no usable zone");
            ClockPreview {
                zone: zone.to_owned(),
                text: INVALID_ZONE_MESSAGE.to_owned(),
                valid: false,
            }
        }
    }
}

/// Re-renders the preview when the page shows a zone selector with a value.
pub fn refresh_clock<P: HostPage + ?Sized>(
    page: &mut P,
    now: OffsetDateTime,
) -> Option<ClockPreview> {
    let zone = page.time_zone().filter(|zone| !zone.trim().is_empty())?;
    let preview = preview(&zone, now);
    page.render_clock(&preview);
    Some(preview)
}

#[cfg(test)]
mod tests {
    use super::{INVALID_ZONE_MESSAGE, preview, zone_offset};
    use time::UtcOffset;
    use time::macros::datetime;

    #[test]
    fn known_zones_and_literal_offsets_resolve() {
        let moscow = UtcOffset::from_hms(3, 0, 0).ok();
        assert_eq!(zone_offset("Europe/Moscow"), moscow);
        assert_eq!(zone_offset(" UTC+03:00 "), moscow);
        assert_eq!(zone_offset("+3"), moscow);

        let india = UtcOffset::from_hms(5, 30, 0).ok();
        assert_eq!(zone_offset("GMT+05:30"), india);
        assert_eq!(zone_offset("UTC-5"), UtcOffset::from_hms(-5, 0, 0).ok());
    }

    #[test]
    fn garbage_zones_do_not_resolve() {
        assert_eq!(zone_offset("Mars/Olympus"), None);
        assert_eq!(zone_offset("UTC+15"), None);
        assert_eq!(zone_offset("UTC+3:75"), None);
        assert_eq!(zone_offset("UTC++3"), None);
        assert_eq!(zone_offset("Москва"), None);
    }

    #[test]
    fn preview_shows_local_time_in_the_zone() {
        let now = datetime!(2026-10-16 11:05:09 UTC);
        let clock = preview("Europe/Moscow", now);
        assert!(clock.valid);
        assert_eq!(clock.text, "🕒 Fri 16 October, 14:05:09");
        assert_eq!(clock.color(), Some("#28a745"));

        let east = preview("Asia/Kamchatka", now);
        assert_eq!(east.text, "🕒 Fri 16 October, 23:05:09");
    }

    #[test]
    fn preview_crosses_midnight_into_the_next_day() {
        let now = datetime!(2026-10-16 22:30:00 UTC);
        let clock = preview("Asia/Vladivostok", now);
        assert_eq!(clock.text, "🕒 Sat 17 October, 08:30:00");
    }

    #[test]
    fn unknown_zone_shows_the_warning() {
        let now = datetime!(2026-10-16 11:05:09 UTC);
        let clock = preview("Mars/Olympus", now);
        assert!(!clock.valid);
        assert_eq!(clock.text, INVALID_ZONE_MESSAGE);
        assert_eq!(clock.color(), None);
    }
}
