use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObisCodeError {
    #[error("Empty OBIS code")]
    Empty,
    #[error("OBIS code {0} has more than six groups")]
    TooManyGroups(String),
    #[error("OBIS code {code} has an invalid group '{group}'")]
    InvalidGroup { code: String, group: String },
}

/// An OBIS code exactly as it was transmitted.
///
/// OBIS code format: A-B:C.D.E*F
/// A: Medium (0=abstract, 1=electricity, 6=heat, 7=gas, 8=water)
/// B: Channel (0 = main meter, 1..4 = M-Bus slots)
/// C: Physical value
/// D: Processing method
/// E: Tariff/Time
/// F: Storage (rarely sent on P1)
///
/// Every group is optional; codes with fewer than six groups leave the
/// trailing ones unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObisCode {
    pub a: Option<u8>,
    pub b: Option<u8>,
    pub c: Option<u8>,
    pub d: Option<u8>,
    pub e: Option<u8>,
    pub f: Option<u8>,
}

impl ObisCode {
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8) -> Self {
        ObisCode { a: Some(a), b: Some(b), c: Some(c), d: Some(d), e: Some(e), f: None }
    }

    /// Group B, the physical channel of the value.
    pub fn channel(&self) -> Option<u8> {
        self.b
    }

    /// Same code without the storage group.
    pub fn canonical(&self) -> Self {
        ObisCode { f: None, ..*self }
    }

    /// Channel agnostic form used to match against templates.
    pub fn reduced(&self) -> Self {
        ObisCode { b: None, f: None, ..*self }
    }

    pub fn with_channel(&self, channel: u8) -> Self {
        ObisCode { b: Some(channel), ..*self }
    }
}

impl FromStr for ObisCode {
    type Err = ObisCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = normalize_obis_code(s);
        if code.is_empty() {
            return Err(ObisCodeError::Empty);
        }

        let mut groups: [Option<u8>; 6] = [None; 6];
        for (idx, part) in code.split(|c| matches!(c, '-' | ':' | '.' | '*' | '&')).enumerate() {
            if idx >= groups.len() {
                return Err(ObisCodeError::TooManyGroups(code));
            }
            let value = part.parse::<u8>().map_err(|_| ObisCodeError::InvalidGroup {
                code: code.clone(),
                group: part.to_string(),
            })?;
            groups[idx] = Some(value);
        }

        Ok(ObisCode {
            a: groups[0],
            b: groups[1],
            c: groups[2],
            d: groups[3],
            e: groups[4],
            f: groups[5],
        })
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.a, self.c, self.d, self.e) {
            (Some(a), Some(c), Some(d), Some(e)) => {
                match self.b {
                    Some(b) => write!(f, "{a}-{b}:{c}.{d}.{e}")?,
                    None => write!(f, "{a}-n:{c}.{d}.{e}")?,
                }
                if let Some(storage) = self.f {
                    write!(f, "*{storage}")?;
                }
                Ok(())
            }
            _ => {
                /* Short codes are printed group by group */
                let parts: Vec<String> = [self.a, self.b, self.c, self.d, self.e, self.f]
                    .iter()
                    .map_while(|g| g.map(|v| v.to_string()))
                    .collect();
                write!(f, "{}", parts.join("."))
            }
        }
    }
}

impl Serialize for ObisCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Identifier used by the catalog and the meter definitions.
///
/// A `Template` leaves the channel (group B) open and must be instantiated
/// with a channel before it can be compared with received data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObisIdentifier {
    Template(ObisCode),
    Resolved(ObisCode),
}

impl ObisIdentifier {
    pub const fn resolved(a: u8, b: u8, c: u8, d: u8, e: u8) -> Self {
        ObisIdentifier::Resolved(ObisCode::new(a, b, c, d, e))
    }

    pub const fn template(a: u8, c: u8, d: u8, e: u8) -> Self {
        ObisIdentifier::Template(ObisCode { a: Some(a), b: None, c: Some(c), d: Some(d), e: Some(e), f: None })
    }

    pub fn is_template(&self) -> bool {
        matches!(self, ObisIdentifier::Template(_))
    }

    pub fn pattern(&self) -> &ObisCode {
        match self {
            ObisIdentifier::Template(code) | ObisIdentifier::Resolved(code) => code,
        }
    }

    /// Exact code this identifier stands for on `channel`.
    /// Resolved identifiers already carry their channel and are returned as is.
    pub fn instantiate(&self, channel: u8) -> ObisCode {
        match self {
            ObisIdentifier::Template(code) => code.with_channel(channel),
            ObisIdentifier::Resolved(code) => *code,
        }
    }

    pub fn matches(&self, code: &ObisCode) -> bool {
        match self {
            ObisIdentifier::Template(pattern) => pattern.reduced() == code.reduced(),
            ObisIdentifier::Resolved(exact) => exact.canonical() == code.canonical(),
        }
    }
}

impl fmt::Display for ObisIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObisIdentifier::Template(code) => write!(f, "{}", code.reduced()),
            ObisIdentifier::Resolved(code) => write!(f, "{code}"),
        }
    }
}

pub fn normalize_obis_code(code: &str) -> String {
    // Meters sometimes pad the code, remove any whitespace
    code.trim().replace(' ', "")
}

/// Splits `000441.226*kWh` into the value and its unit.
pub fn split_unit(value_content: &str) -> (&str, Option<&str>) {
    match value_content.rfind('*') {
        Some(star_pos) => {
            let unit = &value_content[star_pos + 1..];
            let value = &value_content[..star_pos];
            if unit.is_empty() { (value, None) } else { (value, Some(unit)) }
        }
        None => (value_content, None),
    }
}
