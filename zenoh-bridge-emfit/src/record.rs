//! Parsing of the Emfit QS status page.
//!
//! The device serves a flat list of `KEY=value` lines, sometimes with
//! literal `<br>` tags as line breaks:
//!
//! ```text
//! SER=001234<br>
//! HR=62<br>
//! RR=14<br>
//! PRES=1<br>
//! ACT=3<br>
//! ```

use std::collections::BTreeMap;

use crate::error::ParseError;

/// HTML line break the device inserts between fields.
const LINE_BREAK_TAG: &str = "<br>";

/// Parsed snapshot of the status page, keyed by normalized field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    fields: BTreeMap<String, String>,
}

impl StatusRecord {
    /// Parse a status page body.
    ///
    /// Every non-empty line must contain `=`. The line is split on the
    /// first `=` only, so the value keeps any further `=` characters.
    /// A single malformed line fails the whole body.
    pub fn parse(body: &str) -> Result<Self, ParseError> {
        let body = body.replace(LINE_BREAK_TAG, "");
        let mut fields = BTreeMap::new();

        for (index, line) in body.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let (raw_key, value) = line
                .split_once('=')
                .ok_or_else(|| ParseError::MissingDelimiter {
                    line: index + 1,
                    content: line.to_string(),
                })?;

            let key = normalize_key(raw_key);
            if key.is_empty() {
                return Err(ParseError::EmptyKey { line: index + 1 });
            }

            fields.insert(key, value.to_string());
        }

        Ok(Self { fields })
    }

    /// Look up a field by its normalized name.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalize a raw field name: lowercase, drop `:` and `,`, spaces become `_`.
///
/// Surrounding whitespace is trimmed first, so `" HR"` maps to `hr` rather
/// than `_hr`. The device firmware does not pad names; padded names from a
/// proxy or a hand-written page still resolve to the known fields.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ':' | ','))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect::<String>()
        .to_lowercase()
}
