//! Port types with validation and expansion.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` turn user-supplied specifications such as
//! `"22,80,8000-8010"` into an ordered, deduplicated list of ports.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// A validated network port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None if invalid.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Validate a number parsed from user input, which may exceed `u16`.
    fn from_token(value: u32, token: &str) -> Result<Self, PortError> {
        u16::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| PortError::InvalidPort(format!("{} (out of range 1-65535)", token)))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("port range too large: {token} spans {count} ports (max: {max})", max = PortRange::MAX_SPAN)]
    RangeTooLarge { token: String, count: u64 },
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Largest number of ports a single range token may expand to.
    pub const MAX_SPAN: u64 = 65536;

    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidPort(format!(
                "{}-{} (start is greater than end)",
                start, end
            )))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }

    /// Parse a `start-end` token.
    fn parse_token(token: &str) -> Result<Self, PortError> {
        let bounds: Vec<&str> = token.split('-').collect();
        if bounds.len() != 2 {
            return Err(PortError::InvalidPort(format!("{} (malformed range)", token)));
        }

        let start = parse_number(bounds[0])?;
        let end = parse_number(bounds[1])?;
        if start > end {
            return Err(PortError::InvalidPort(format!(
                "{} (start is greater than end)",
                token
            )));
        }

        let count = u64::from(end - start) + 1;
        if count > Self::MAX_SPAN {
            return Err(PortError::RangeTooLarge {
                token: token.to_string(),
                count,
            });
        }

        Self::new(
            Port::from_token(start, bounds[0].trim())?,
            Port::from_token(end, bounds[1].trim())?,
        )
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_number(raw: &str) -> Result<u32, PortError> {
    let raw = raw.trim();
    raw.parse()
        .map_err(|_| PortError::InvalidPort(raw.to_string()))
}

/// A complete port specification that can contain multiple ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
///
/// Ranges are kept in the order they were written so that expansion is
/// reproducible for identical input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Add a port range to the specification.
    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    /// Get all ports in first-seen order, without duplicates.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut seen = HashSet::new();
        self.ranges
            .iter()
            .flat_map(PortRange::iter)
            .filter(|port| seen.insert(*port))
            .collect()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let range = if part.contains('-') {
                PortRange::parse_token(part)?
            } else {
                PortRange::single(Port::from_token(parse_number(part)?, part)?)
            };
            spec.add_range(range);
        }

        if spec.is_empty() {
            return Err(PortError::Empty);
        }

        Ok(spec)
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Expand a port specification into an ordered, deduplicated port list.
///
/// Fails fast on the first invalid token.
pub fn expand_ports(spec: &str) -> Result<Vec<Port>, PortError> {
    Ok(spec.parse::<PortSpec>()?.to_ports())
}
