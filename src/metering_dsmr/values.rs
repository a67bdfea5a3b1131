use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use log::debug;
use crate::obis_utils::split_unit;
use super::structs::{CosemObjectType, CosemValue, PowerFailure};

/// How the raw parenthesised values of an object are turned into a value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRule {
    Integer,
    Decimal,
    Text,
    /// Octet strings are sent as hex, e.g. equipment identifiers
    HexText,
    Timestamp,
    State(&'static [(u32, &'static str)]),
    /// DSMR 4/5 M-Bus reading: (capture time)(value*unit)
    TimestampedDecimal,
    /// (count)(log obis)(end time)(duration*s)...
    EventLog,
    /// DSMR 2.2/3.0 M-Bus profile: (time)(status)(period)(count)(obis)(unit)(value)
    ProfileGeneric,
}

pub const SWITCH_STATES: &[(u32, &str)] = &[
    (0, "disconnected"),
    (1, "connected"),
    (2, "ready_for_reconnection"),
];

const CET_OFFSET_SECS: i32 = 3600;
const CEST_OFFSET_SECS: i32 = 7200;

pub fn decode_value(object_type: &CosemObjectType, raw: &[String]) -> Result<CosemValue, String> {
    let expected_unit = object_type.unit;
    let value = match object_type.rule {
        ValueRule::Integer => decode_integer(single(raw)?, expected_unit)?,
        ValueRule::Decimal => decode_decimal(single(raw)?, expected_unit)?,
        ValueRule::Text => CosemValue::Text(single(raw)?.to_string()),
        ValueRule::HexText => CosemValue::Text(decode_hex_text(single(raw)?)?),
        ValueRule::Timestamp => CosemValue::Timestamp(parse_timestamp(single(raw)?)?),
        ValueRule::State(states) => decode_state(single(raw)?, states)?,
        ValueRule::TimestampedDecimal => {
            if raw.len() != 2 {
                return Err(format!("expected 2 values, got {}", raw.len()));
            }
            CosemValue::Timestamped {
                at: parse_timestamp(&raw[0])?,
                value: Box::new(decode_decimal(&raw[1], expected_unit)?),
            }
        }
        ValueRule::EventLog => decode_event_log(raw)?,
        ValueRule::ProfileGeneric => decode_profile_generic(raw, expected_unit)?,
    };
    debug!("Decoded {} as {:?}", object_type.name, value);
    Ok(value)
}

fn single(raw: &[String]) -> Result<&str, String> {
    match raw {
        [value] => Ok(value.as_str()),
        _ => Err(format!("expected 1 value, got {}", raw.len())),
    }
}

fn check_unit(expected: Option<&str>, received: Option<&str>) -> Result<Option<String>, String> {
    match (expected, received) {
        (Some(e), Some(r)) if !e.eq_ignore_ascii_case(r) => Err(format!("unit {r} does not match expected {e}")),
        (Some(e), _) => Ok(Some(e.to_string())),
        (None, r) => Ok(r.map(|u| u.to_string())),
    }
}

fn decode_integer(raw: &str, expected_unit: Option<&str>) -> Result<CosemValue, String> {
    let (number, unit) = split_unit(raw);
    check_unit(expected_unit, unit)?;
    number.trim().parse::<i64>()
        .map(CosemValue::Integer)
        .map_err(|_| format!("'{number}' is not an integer"))
}

fn decode_decimal(raw: &str, expected_unit: Option<&str>) -> Result<CosemValue, String> {
    let (number, unit) = split_unit(raw);
    let unit = check_unit(expected_unit, unit)?;
    let value = number.trim().parse::<f64>().map_err(|_| format!("'{number}' is not a number"))?;
    Ok(CosemValue::Decimal { value, unit })
}

/// Octet strings that are not printable text (some serials) stay hex encoded
fn decode_hex_text(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    let bytes = hex::decode(raw).map_err(|e| format!("invalid hex string: {e}"))?;
    match String::from_utf8(bytes) {
        Ok(text) if !text.chars().any(|c| c.is_control()) => Ok(text),
        _ => Ok(raw.to_string()),
    }
}

fn decode_state(raw: &str, states: &'static [(u32, &'static str)]) -> Result<CosemValue, String> {
    let code = raw.trim().parse::<u32>().map_err(|_| format!("'{raw}' is not a state code"))?;
    states.iter()
        .find(|(c, _)| *c == code)
        .map(|(code, label)| CosemValue::State { code: *code, label: *label })
        .ok_or_else(|| format!("unknown state {code}"))
}

/// Parses `YYMMDDhhmmssX`, X is S for summer time, W for winter time.
/// Without the suffix the meter sends local winter time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, String> {
    let raw = raw.trim();
    if !raw.is_ascii() {
        return Err(format!("'{raw}' is not a timestamp"));
    }
    let (digits, offset_secs) = match raw.len() {
        12 => (raw, CET_OFFSET_SECS),
        13 => match &raw[12..] {
            "S" | "s" => (&raw[..12], CEST_OFFSET_SECS),
            "W" | "w" => (&raw[..12], CET_OFFSET_SECS),
            other => return Err(format!("unknown time zone flag {other}")),
        },
        _ => return Err(format!("'{raw}' is not a timestamp")),
    };

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{raw}' is not a timestamp"));
    }

    let field = |from: usize| -> u32 { digits[from..from + 2].parse::<u32>().unwrap_or(u32::MAX) };
    let naive = NaiveDate::from_ymd_opt(2000 + field(0) as i32, field(2), field(4))
        .and_then(|d| d.and_hms_opt(field(6), field(8), field(10)))
        .ok_or_else(|| format!("'{raw}' is not a valid date"))?;

    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| "invalid offset".to_string())?;
    offset.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| format!("'{raw}' is ambiguous"))
}

fn decode_event_log(raw: &[String]) -> Result<CosemValue, String> {
    let count = raw.first()
        .ok_or_else(|| "empty event log".to_string())?
        .trim()
        .parse::<usize>()
        .map_err(|_| "event count is not a number".to_string())?;

    if count == 0 {
        return Ok(CosemValue::EventLog(Vec::new()));
    }

    if raw.len() != 2 + 2 * count {
        return Err(format!("event log announces {count} entries but has {} values", raw.len()));
    }

    let mut events = Vec::with_capacity(count);
    for pair in raw[2..].chunks(2) {
        let end = parse_timestamp(&pair[0])?;
        let duration = match decode_integer(&pair[1], Some("s"))? {
            CosemValue::Integer(secs) if secs >= 0 => secs as u64,
            _ => return Err(format!("invalid duration {}", pair[1])),
        };
        events.push(PowerFailure { end, duration_secs: duration });
    }
    Ok(CosemValue::EventLog(events))
}

fn decode_profile_generic(raw: &[String], expected_unit: Option<&str>) -> Result<CosemValue, String> {
    if raw.len() < 7 {
        return Err(format!("profile needs at least 7 values, got {}", raw.len()));
    }

    let at = parse_timestamp(&raw[0])?;
    let unit = raw[5].trim();
    let unit = check_unit(expected_unit, if unit.is_empty() { None } else { Some(unit) })?;
    let last = &raw[raw.len() - 1];
    let value = match decode_decimal(last, None)? {
        CosemValue::Decimal { value, unit: inline_unit } => CosemValue::Decimal { value, unit: unit.or(inline_unit) },
        other => other,
    };
    Ok(CosemValue::Timestamped { at, value: Box::new(value) })
}
