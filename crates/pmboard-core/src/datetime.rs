use chrono::{
  DateTime,
  Days,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::BoardError;

pub const DEFAULT_DISPLAY_TIMEZONE: &str =
  "UTC";

const INPUT_DATE_FORMAT: &str =
  "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str =
  "%b %-d, %Y";
const DISPLAY_TIMESTAMP_FORMAT: &str =
  "%b %-d, %Y, %I:%M %p";

pub fn parse_timezone(
  raw: &str
) -> Result<Tz, BoardError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(
      BoardError::Validation {
        field: "display.timezone"
      }
    );
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        timezone = %trimmed,
        "configured display timezone"
      );
      Ok(tz)
    }
    | Err(err) => {
      tracing::error!(
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      Err(BoardError::InvalidValue {
        field: "display.timezone",
        value: trimmed.to_string()
      })
    }
  }
}

/// Turns a form date (`2026-01-13`) into the task table's display form
/// (`Jan 13, 2026`).
pub fn format_display_date(
  raw: &str
) -> Result<String, BoardError> {
  let date = parse_input_date(raw)?;
  Ok(
    date
      .format(DISPLAY_DATE_FORMAT)
      .to_string()
  )
}

pub fn parse_input_date(
  raw: &str
) -> Result<NaiveDate, BoardError> {
  NaiveDate::parse_from_str(
    raw.trim(),
    INPUT_DATE_FORMAT
  )
  .map_err(|_| {
    BoardError::InvalidValue {
      field: "date",
      value: raw.to_string()
    }
  })
}

pub fn parse_timestamp(
  raw: &str
) -> Result<DateTime<Utc>, BoardError>
{
  DateTime::parse_from_rfc3339(
    raw.trim()
  )
  .map(|dt| dt.with_timezone(&Utc))
  .map_err(|_| {
    BoardError::InvalidValue {
      field: "timestamp",
      value: raw.to_string()
    }
  })
}

#[must_use]
pub fn local_date(
  dt: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  dt.with_timezone(&tz).date_naive()
}

#[must_use]
pub fn format_timestamp(
  dt: DateTime<Utc>,
  tz: Tz
) -> String {
  dt.with_timezone(&tz)
    .format(DISPLAY_TIMESTAMP_FORMAT)
    .to_string()
}

/// Parses the log date filter. Accepts `YYYY-MM-DD`, `today`,
/// `yesterday`, and day offsets such as `-3d`.
pub fn parse_filter_date(
  input: &str,
  today: NaiveDate
) -> Result<NaiveDate, BoardError> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();

  match lower.as_str() {
    | "today" => return Ok(today),
    | "yesterday" => {
      return shift_days(
        today, -1, token
      );
    }
    | "tomorrow" => {
      return shift_days(
        today, 1, token
      );
    }
    | _ => {}
  }

  let rel_re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)d$"
  )
  .map_err(|_| {
    BoardError::InvalidValue {
      field: "date filter",
      value: token.to_string()
    }
  })?;

  if let Some(caps) =
    rel_re.captures(&lower)
  {
    let num: i64 = caps
      .name("num")
      .and_then(|m| {
        m.as_str().parse().ok()
      })
      .ok_or_else(|| {
        BoardError::InvalidValue {
          field: "date filter",
          value: token.to_string()
        }
      })?;
    let signed = match caps
      .name("sign")
      .map(|m| m.as_str())
    {
      | Some("-") => -num,
      | _ => num
    };
    return shift_days(
      today, signed, token
    );
  }

  parse_input_date(token)
}

fn shift_days(
  date: NaiveDate,
  days: i64,
  token: &str
) -> Result<NaiveDate, BoardError> {
  let magnitude =
    Days::new(days.unsigned_abs());
  let shifted = if days < 0 {
    date.checked_sub_days(magnitude)
  } else {
    date.checked_add_days(magnitude)
  };
  shifted.ok_or_else(|| {
    BoardError::InvalidValue {
      field: "date filter",
      value: token.to_string()
    }
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::*;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn formats_form_dates_for_display() {
    assert_eq!(
      format_display_date("2026-01-13")
        .expect("valid date"),
      "Jan 13, 2026"
    );
    assert!(
      format_display_date("13/01/2026")
        .is_err()
    );
  }

  #[test]
  fn local_date_follows_display_timezone()
   {
    let ts = Utc
      .with_ymd_and_hms(
        2026, 1, 13, 3, 0, 0
      )
      .single()
      .expect("valid ts");
    let utc = parse_timezone("UTC")
      .expect("utc");
    let mexico = parse_timezone(
      "America/Mexico_City"
    )
    .expect("mexico city");

    assert_eq!(
      local_date(ts, utc),
      ymd(2026, 1, 13)
    );
    assert_eq!(
      local_date(ts, mexico),
      ymd(2026, 1, 12)
    );
  }

  #[test]
  fn filter_dates_accept_relative_forms()
  {
    let today = ymd(2026, 1, 13);
    assert_eq!(
      parse_filter_date("today", today)
        .expect("today"),
      today
    );
    assert_eq!(
      parse_filter_date(
        "Yesterday",
        today
      )
      .expect("yesterday"),
      ymd(2026, 1, 12)
    );
    assert_eq!(
      parse_filter_date("-2d", today)
        .expect("relative"),
      ymd(2026, 1, 11)
    );
    assert_eq!(
      parse_filter_date(
        "2026-01-11",
        today
      )
      .expect("absolute"),
      ymd(2026, 1, 11)
    );
    assert!(
      parse_filter_date("soon", today)
        .is_err()
    );
  }

  #[test]
  fn formats_timestamps_in_twelve_hour_clock()
   {
    let ts = parse_timestamp(
      "2026-01-12T14:15:00Z"
    )
    .expect("rfc3339");
    let utc = parse_timezone("UTC")
      .expect("utc");
    assert_eq!(
      format_timestamp(ts, utc),
      "Jan 12, 2026, 02:15 PM"
    );
  }

  #[test]
  fn rejects_unknown_timezones() {
    assert!(matches!(
      parse_timezone("Mars/Olympus"),
      Err(BoardError::InvalidValue {
        ..
      })
    ));
  }
}
