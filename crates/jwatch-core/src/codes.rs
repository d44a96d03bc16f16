//! Identifier-code generators for brute-force feed discovery.
//!
//! Publisher platforms often expose per-journal feeds behind a short code in
//! an otherwise fixed URL. These generators enumerate the code space; the
//! [`UrlTemplate`] turns each code into a [`Candidate`].

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::{Candidate, ConfigError};

/// Placeholder substituted with each generated code.
pub const CODE_PLACEHOLDER: &str = "{code}";

/// Every lowercase ASCII string of a fixed length, in odometer order
/// (`aaa`, `aab`, ... `zzz`).
#[derive(Debug, Clone)]
pub struct AlphaCodes {
    next: Option<Vec<u8>>,
}

impl AlphaCodes {
    #[must_use]
    pub fn new(length: usize) -> Self {
        let next = (length > 0).then(|| vec![b'a'; length]);
        Self { next }
    }

    /// Size of the code space, saturating at `u64::MAX`.
    #[must_use]
    pub fn total(length: usize) -> u64 {
        let exp = u32::try_from(length).unwrap_or(u32::MAX);
        26u64.saturating_pow(exp)
    }
}

impl Iterator for AlphaCodes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let current = self.next.take()?;
        let code = String::from_utf8_lossy(&current).into_owned();

        let mut successor = current;
        for pos in (0..successor.len()).rev() {
            if successor[pos] == b'z' {
                successor[pos] = b'a';
            } else {
                successor[pos] += 1;
                self.next = Some(successor);
                break;
            }
        }
        Some(code)
    }
}

/// Zero-padded decimal codes over `[start, end)`, optionally restricted to
/// codes whose first digit is in `leading`.
#[derive(Debug, Clone)]
pub struct NumericCodes {
    width: usize,
    next: u64,
    end: u64,
    leading: Vec<char>,
}

impl NumericCodes {
    #[must_use]
    pub fn new(width: usize, start: u64, end: u64) -> Self {
        Self {
            width,
            next: start,
            end,
            leading: Vec::new(),
        }
    }

    /// Keep only codes whose rendered first digit is one of `digits`.
    #[must_use]
    pub fn with_leading_digits(mut self, digits: &str) -> Self {
        self.leading = digits.chars().filter(char::is_ascii_digit).collect();
        self
    }
}

impl Iterator for NumericCodes {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.next < self.end {
            let code = format!("{:0width$}", self.next, width = self.width);
            self.next += 1;
            let admitted = self.leading.is_empty()
                || code
                    .chars()
                    .next()
                    .is_some_and(|first| self.leading.contains(&first));
            if admitted {
                return Some(code);
            }
        }
        None
    }
}

/// A feed URL with a `{code}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    template: String,
}

impl UrlTemplate {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTemplate`] if the template has no
    /// `{code}` placeholder or is not an http(s) URL.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };
        if !template.contains(CODE_PLACEHOLDER) {
            return Err(invalid("missing {code} placeholder"));
        }
        if !(template.starts_with("http://") || template.starts_with("https://")) {
            return Err(invalid("must start with http:// or https://"));
        }
        Ok(Self {
            template: template.to_string(),
        })
    }

    /// Substitute `code` (percent-encoded) into every placeholder.
    #[must_use]
    pub fn render(&self, code: &str) -> String {
        let encoded = utf8_percent_encode(code, NON_ALPHANUMERIC).to_string();
        self.template.replace(CODE_PLACEHOLDER, &encoded)
    }

    /// Build the candidate for `code`; the code doubles as its label.
    #[must_use]
    pub fn candidate(&self, code: String) -> Candidate {
        let url = self.render(&code);
        Candidate { label: code, url }
    }
}
