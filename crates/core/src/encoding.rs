//! Reversible encoding of property and association names into backend-legal
//! identifiers.
//!
//! Letters (upper, lower, other) and decimal digits pass through; every other
//! UTF-16 code unit becomes `<escape><4 uppercase hex digits>`. The escape
//! character of the input is itself escaped, so the mapping is injective.
//! Surrogate pairs are escaped unit by unit.
//!
//! Two encoders exist: [`AZURE_NAME_ENCODER`] makes a name a legal table
//! property name (escape `_`), [`XML_NAME_ENCODER`] additionally makes it a legal
//! markup element name (escape `.`, leading digits escaped, a leading escape
//! guarded by `_`). Storage names compose them: Azure first, then XML.

use unicode_general_category::{GeneralCategory, get_general_category};

use crate::error::{DataAccessError, DataAccessResult};

/// A single escaping scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameEncoder {
    escape: char,
    escape_leading_digit: bool,
    leading_guard: Option<char>,
}

pub const AZURE_NAME_ENCODER: NameEncoder = NameEncoder {
    escape: '_',
    escape_leading_digit: false,
    leading_guard: None,
};

pub const XML_NAME_ENCODER: NameEncoder = NameEncoder {
    escape: '.',
    escape_leading_digit: true,
    leading_guard: Some('_'),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitClass {
    Letter,
    Digit,
    Other,
}

fn classify(unit: u16) -> UnitClass {
    // Lone surrogate units have no scalar value.
    let Some(c) = char::from_u32(u32::from(unit)) else {
        return UnitClass::Other;
    };
    match get_general_category(c) {
        GeneralCategory::UppercaseLetter
        | GeneralCategory::LowercaseLetter
        | GeneralCategory::OtherLetter => UnitClass::Letter,
        GeneralCategory::DecimalNumber => UnitClass::Digit,
        _ => UnitClass::Other,
    }
}

impl NameEncoder {
    pub fn escape_char(&self) -> char {
        self.escape
    }

    pub fn encode(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for (idx, unit) in name.encode_utf16().enumerate() {
            let pass = match classify(unit) {
                UnitClass::Letter => true,
                UnitClass::Digit => !(idx == 0 && self.escape_leading_digit),
                UnitClass::Other => false,
            };
            // Escape characters are never letters or digits, so they always
            // take the escaped branch.
            if pass {
                push_unit(&mut out, unit);
            } else {
                out.push(self.escape);
                out.push_str(&format!("{unit:04X}"));
            }
        }
        if let Some(guard) = self.leading_guard {
            if out.starts_with(self.escape) {
                out.insert(0, guard);
            }
        }
        out
    }

    pub fn decode(&self, encoded: &str) -> DataAccessResult<String> {
        let mut body = encoded;
        if let Some(guard) = self.leading_guard {
            if let Some(rest) = body.strip_prefix(guard) {
                if !rest.starts_with(self.escape) {
                    return Err(malformed(encoded, "guard not followed by an escape"));
                }
                body = rest;
            }
        }

        let mut units: Vec<u16> = Vec::with_capacity(body.len());
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            if c == self.escape {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                    return Err(malformed(encoded, "truncated escape sequence"));
                }
                let unit = u16::from_str_radix(&hex, 16)
                    .map_err(|_| malformed(encoded, "invalid escape sequence"))?;
                units.push(unit);
                continue;
            }

            let mut buf = [0u16; 2];
            for unit in c.encode_utf16(&mut buf).iter().copied() {
                if classify(unit) == UnitClass::Other {
                    return Err(malformed(encoded, "unescaped character"));
                }
                units.push(unit);
            }
        }

        String::from_utf16(&units).map_err(|_| malformed(encoded, "unpaired surrogate"))
    }
}

fn push_unit(out: &mut String, unit: u16) {
    // Pass-through units are never surrogates (see `classify`).
    if let Some(c) = char::from_u32(u32::from(unit)) {
        out.push(c);
    }
}

fn malformed(encoded: &str, reason: &str) -> DataAccessError {
    DataAccessError::invalid_argument(format!("malformed encoded name '{encoded}': {reason}"))
}

/// Azure-encode then XML-encode.
pub fn encode_storage_name(name: &str) -> String {
    XML_NAME_ENCODER.encode(&AZURE_NAME_ENCODER.encode(name))
}

/// XML-decode then Azure-decode.
pub fn decode_storage_name(encoded: &str) -> DataAccessResult<String> {
    AZURE_NAME_ENCODER.decode(&XML_NAME_ENCODER.decode(encoded)?)
}
