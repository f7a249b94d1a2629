use std::collections::HashMap;
use std::collections::hash_map;

use serde::Deserialize;

use crate::http::parser::ParseError;

const CRLF: &[u8] = b"\r\n";

/// What to do when a header field name shows up a second time while parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Join the values with `", "`, the way repeated fields combine on the wire.
    #[default]
    Fold,
    /// Fail with [`ParseError::DuplicateFieldName`].
    Reject,
}

/// Case-insensitive header fields.
///
/// Names are stored lowercased. Iteration order is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: HashMap<String, String>,
    policy: DuplicatePolicy,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty map whose [`parse_one`](Self::parse_one) applies `policy`.
    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            fields: HashMap::new(),
            policy,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_lowercase())
    }

    /// Inserts `value`, replacing anything already stored under `name`.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.fields
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn delete(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&name.to_ascii_lowercase())
    }

    /// Adds `value` to `name`, folding into an existing value with `", "`.
    ///
    /// Used for list-valued fields such as `Trailer`.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        let value = value.as_ref();
        match self.fields.entry(name.as_ref().to_ascii_lowercase()) {
            hash_map::Entry::Occupied(mut existing) => {
                let folded = existing.get_mut();
                folded.push_str(", ");
                folded.push_str(value);
            }
            hash_map::Entry::Vacant(slot) => {
                slot.insert(value.to_string());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parses one CRLF-terminated field line from the front of `data`.
    ///
    /// Returns `(consumed, done)`. `(0, false)` means no full line is
    /// buffered yet; `(2, true)` means the blank line ending the header
    /// section was found.
    pub fn parse_one(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(end) = find_crlf(data) else {
            return Ok((0, false));
        };

        if end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = std::str::from_utf8(&data[..end]).map_err(|_| ParseError::MalformedHeader)?;
        let (raw_name, raw_value) = line.split_once(':').ok_or(ParseError::MalformedHeader)?;

        // "Host : x" is not allowed
        if raw_name.ends_with(|c: char| c.is_ascii_whitespace()) {
            return Err(ParseError::InvalidFieldName);
        }

        let name = raw_name.trim();
        if name.is_empty() || !name.bytes().all(is_token_char) {
            return Err(ParseError::InvalidFieldName);
        }

        let value = raw_value.trim();
        if self.policy == DuplicatePolicy::Reject && self.contains(name) {
            return Err(ParseError::DuplicateFieldName);
        }
        self.append(name, value);

        Ok((end + CRLF.len(), false))
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

/// RFC 7230 `tchar`.
pub fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
