//! Extension types: colors, coordinates, country and language codes, payment
//! and routing numbers, identifiers and URLs
//!
//! Each extension type resolves to a plain host type through a fixed table
//! and is checked by the validator with a format rule of its own.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::host::{HostType, NumericRange};
use super::hint::Numeric;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtraType {
    Color,
    Coordinate,
    Latitude,
    Longitude,
    CountryAlpha2,
    CountryAlpha3,
    CountryNumericCode,
    CountryShortName,
    MacAddress,
    PaymentCardNumber,
    PhoneNumber,
    AbaRoutingNumber,
    Ulid,
    Isbn,
    LanguageAlpha2,
    LanguageName,
    SemanticVersion,
    S3Path,
    Url,
}

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());
static RGB_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(?:,\s*(?:0|1|0?\.\d+)\s*)?\)$")
        .unwrap()
});
static MAC_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$|^(?:[0-9A-Fa-f]{4}\.){2}[0-9A-Fa-f]{4}$")
        .unwrap()
});
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-.]{5,18}[0-9]$").unwrap());
static ULID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-7][0-9A-HJKMNP-TV-Za-hjkmnp-tv-z]{25}$").unwrap());
static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z\-]+(?:\.[0-9A-Za-z\-]+)*)?(?:\+[0-9A-Za-z\-]+(?:\.[0-9A-Za-z\-]+)*)?$",
    )
    .unwrap()
});
static S3_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^s3://[a-z0-9][a-z0-9.\-]{1,61}[a-z0-9]/.+$").unwrap());
static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+[^\s]*$").unwrap());

const NAMED_COLORS: &[&str] = &[
    "black", "white", "red", "green", "blue", "yellow", "cyan", "magenta", "orange", "purple",
    "pink", "brown", "gray", "grey", "silver", "gold", "navy", "teal", "olive", "maroon", "lime",
    "aqua", "fuchsia", "indigo", "violet", "transparent",
];

impl ExtraType {
    pub const ALL: [ExtraType; 19] = [
        ExtraType::Color,
        ExtraType::Coordinate,
        ExtraType::Latitude,
        ExtraType::Longitude,
        ExtraType::CountryAlpha2,
        ExtraType::CountryAlpha3,
        ExtraType::CountryNumericCode,
        ExtraType::CountryShortName,
        ExtraType::MacAddress,
        ExtraType::PaymentCardNumber,
        ExtraType::PhoneNumber,
        ExtraType::AbaRoutingNumber,
        ExtraType::Ulid,
        ExtraType::Isbn,
        ExtraType::LanguageAlpha2,
        ExtraType::LanguageName,
        ExtraType::SemanticVersion,
        ExtraType::S3Path,
        ExtraType::Url,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtraType::Color => "Color",
            ExtraType::Coordinate => "Coordinate",
            ExtraType::Latitude => "Latitude",
            ExtraType::Longitude => "Longitude",
            ExtraType::CountryAlpha2 => "CountryAlpha2",
            ExtraType::CountryAlpha3 => "CountryAlpha3",
            ExtraType::CountryNumericCode => "CountryNumericCode",
            ExtraType::CountryShortName => "CountryShortName",
            ExtraType::MacAddress => "MacAddress",
            ExtraType::PaymentCardNumber => "PaymentCardNumber",
            ExtraType::PhoneNumber => "PhoneNumber",
            ExtraType::AbaRoutingNumber => "ABARoutingNumber",
            ExtraType::Ulid => "ULID",
            ExtraType::Isbn => "ISBN",
            ExtraType::LanguageAlpha2 => "LanguageAlpha2",
            ExtraType::LanguageName => "LanguageName",
            ExtraType::SemanticVersion => "SemanticVersion",
            ExtraType::S3Path => "S3Path",
            ExtraType::Url => "Url",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|extra| extra.name() == name)
    }

    /// The host type used to parse tokens of this type
    pub fn host_type(&self) -> HostType {
        match self {
            ExtraType::Coordinate => HostType::Tuple(vec![Some(HostType::Float), Some(HostType::Float)]),
            ExtraType::Latitude | ExtraType::Longitude => HostType::Float,
            _ => HostType::String,
        }
    }

    /// Check a value and return its normalized form
    pub fn validate(&self, value: &Value) -> Result<Value, String> {
        match self {
            ExtraType::Coordinate => validate_coordinate(value),
            ExtraType::Latitude => validate_degrees(value, 90.0, "latitude"),
            ExtraType::Longitude => validate_degrees(value, 180.0, "longitude"),
            _ => {
                let text = value
                    .as_str()
                    .ok_or_else(|| "Input should be a valid string".to_string())?;
                self.validate_str(text.trim()).map(Value::String)
            }
        }
    }

    fn validate_str(&self, text: &str) -> Result<String, String> {
        let ok = match self {
            ExtraType::Color => {
                HEX_COLOR.is_match(text)
                    || RGB_COLOR.is_match(text)
                    || NAMED_COLORS.contains(&text.to_lowercase().as_str())
            }
            ExtraType::CountryAlpha2 => text.len() == 2 && text.chars().all(|c| c.is_ascii_uppercase()),
            ExtraType::CountryAlpha3 => text.len() == 3 && text.chars().all(|c| c.is_ascii_uppercase()),
            ExtraType::CountryNumericCode => text.len() == 3 && text.chars().all(|c| c.is_ascii_digit()),
            ExtraType::CountryShortName | ExtraType::LanguageName => !text.is_empty(),
            ExtraType::LanguageAlpha2 => text.len() == 2 && text.chars().all(|c| c.is_ascii_lowercase()),
            ExtraType::MacAddress => MAC_ADDRESS.is_match(text),
            ExtraType::PaymentCardNumber => {
                let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                (12..=19).contains(&digits.len())
                    && digits.chars().all(|c| c.is_ascii_digit())
                    && luhn(&digits)
            }
            ExtraType::PhoneNumber => PHONE.is_match(text),
            ExtraType::AbaRoutingNumber => aba_checksum(text),
            ExtraType::Ulid => ULID.is_match(text),
            ExtraType::Isbn => isbn_checksum(text),
            ExtraType::SemanticVersion => SEMVER.is_match(text),
            ExtraType::S3Path => S3_PATH.is_match(text),
            ExtraType::Url => URL.is_match(text),
            ExtraType::Coordinate | ExtraType::Latitude | ExtraType::Longitude => false,
        };
        if ok {
            Ok(text.to_string())
        } else {
            Err(format!("value is not a valid {}", self.name()))
        }
    }
}

fn validate_degrees(value: &Value, limit: f64, what: &str) -> Result<Value, String> {
    let degrees = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| "Input should be a valid number".to_string())?;
    let range = NumericRange {
        min: Some(Numeric::Float(-limit)),
        max: Some(Numeric::Float(limit)),
        min_open: false,
        max_open: false,
    };
    if range.contains(degrees) {
        Ok(Value::from(degrees))
    } else {
        Err(format!("{what} must be between {} and {}", -limit, limit))
    }
}

fn validate_coordinate(value: &Value) -> Result<Value, String> {
    let parts: Vec<Value> = match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s.split(',').map(|p| Value::String(p.trim().to_string())).collect(),
        _ => Vec::new(),
    };
    let [latitude, longitude] = parts.as_slice() else {
        return Err("value is not a valid coordinate".to_string());
    };
    Ok(Value::Array(vec![
        validate_degrees(latitude, 90.0, "latitude")?,
        validate_degrees(longitude, 180.0, "longitude")?,
    ]))
}

fn luhn(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn aba_checksum(text: &str) -> bool {
    let digits: Vec<u32> = text.chars().filter_map(|c| c.to_digit(10)).collect();
    if text.len() != 9 || digits.len() != 9 {
        return false;
    }
    let sum = 3 * (digits[0] + digits[3] + digits[6])
        + 7 * (digits[1] + digits[4] + digits[7])
        + (digits[2] + digits[5] + digits[8]);
    sum % 10 == 0
}

fn isbn_checksum(text: &str) -> bool {
    let compact: Vec<char> = text.chars().filter(|c| *c != '-' && *c != ' ').collect();
    match compact.len() {
        10 => {
            let mut sum = 0;
            for (i, c) in compact.iter().enumerate() {
                let value = match c {
                    'X' | 'x' if i == 9 => 10,
                    c => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += value * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let digits: Vec<u32> = compact.iter().filter_map(|c| c.to_digit(10)).collect();
            if digits.len() != 13 {
                return false;
            }
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
                .sum();
            sum % 10 == 0
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_host_type_table() {
        assert_eq!(ExtraType::Color.host_type(), HostType::String);
        assert_eq!(ExtraType::Latitude.host_type(), HostType::Float);
        assert_eq!(
            ExtraType::Coordinate.host_type(),
            HostType::Tuple(vec![Some(HostType::Float), Some(HostType::Float)])
        );
    }

    #[test]
    fn test_from_name_round_trip() {
        for extra in ExtraType::ALL {
            assert_eq!(ExtraType::from_name(extra.name()), Some(extra));
        }
        assert_eq!(ExtraType::from_name("Nope"), None);
    }

    #[test]
    fn test_checksums() {
        assert!(ExtraType::PaymentCardNumber.validate(&json!("4000 0000 0000 0002")).is_ok());
        assert!(ExtraType::PaymentCardNumber.validate(&json!("4000000000000001")).is_err());
        assert!(ExtraType::AbaRoutingNumber.validate(&json!("122105155")).is_ok());
        assert!(ExtraType::AbaRoutingNumber.validate(&json!("122105156")).is_err());
        assert!(ExtraType::Isbn.validate(&json!("978-0-306-40615-7")).is_ok());
        assert!(ExtraType::Isbn.validate(&json!("0-306-40615-2")).is_ok());
        assert!(ExtraType::Isbn.validate(&json!("0-306-40615-3")).is_err());
    }

    #[test]
    fn test_coordinate() {
        assert_eq!(
            ExtraType::Coordinate.validate(&json!([41.4, 2.17])).unwrap(),
            json!([41.4, 2.17])
        );
        assert!(ExtraType::Coordinate.validate(&json!([91.0, 0.0])).is_err());
        assert!(ExtraType::Coordinate.validate(&json!("10, 20")).is_ok());
    }

    #[test]
    fn test_string_formats() {
        assert!(ExtraType::Color.validate(&json!("#ff0000")).is_ok());
        assert!(ExtraType::Color.validate(&json!("Red")).is_ok());
        assert!(ExtraType::Color.validate(&json!("notacolor")).is_err());
        assert!(ExtraType::MacAddress.validate(&json!("00:1B:44:11:3A:B7")).is_ok());
        assert!(ExtraType::SemanticVersion.validate(&json!("1.2.3-rc.1")).is_ok());
        assert!(ExtraType::SemanticVersion.validate(&json!("1.2")).is_err());
        assert!(ExtraType::CountryAlpha2.validate(&json!("GB")).is_ok());
        assert!(ExtraType::CountryAlpha2.validate(&json!("gb")).is_err());
        assert!(ExtraType::S3Path.validate(&json!("s3://my-bucket/key.txt")).is_ok());
        assert!(ExtraType::Url.validate(&json!("https://example.com/x")).is_ok());
        assert!(ExtraType::Ulid.validate(&json!("01ARZ3NDEKTSV4RRFFQ69G5FAV")).is_ok());
    }
}
