//! Corruption detector
//!
//! After every successful frame the validator resolves a fixed list of
//! scratch-memory paths and rejects the run if any of them holds NaN or an
//! infinity. Absent paths and non-numeric values are skipped: an artifact
//! that never tracks `player.vx` is not corrupt for lacking it.

use crate::error::{CorruptionError, PathParseError};
use crate::executor::ScratchMemory;
use rhai::{Array, Dynamic, Map};
use std::fmt;
use std::str::FromStr;

/// Paths watched unless configured otherwise
#[must_use]
pub fn default_watched_paths() -> Vec<String> {
    let mut paths: Vec<String> = ["score", "player.x", "player.y", "player.vx", "player.vy", "player.health"]
        .iter()
        .map(|p| (*p).to_string())
        .collect();
    for index in 0..3 {
        paths.push(format!("enemies[{index}].x"));
        paths.push(format!("enemies[{index}].y"));
    }
    paths
}

/// One step of a watched path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Map field
    Field(String),
    /// Array element
    Index(usize),
}

/// A dotted path into scratch memory, e.g. `enemies[0].x`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchedPath {
    segments: Vec<PathSegment>,
}

impl WatchedPath {
    /// Build from segments. The first segment must be a field.
    ///
    /// # Errors
    /// Returns `PathParseError::Empty` on an empty list and
    /// `PathParseError::InvalidSegment` when the path starts with an index.
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathParseError> {
        match segments.first() {
            None => Err(PathParseError::Empty),
            Some(PathSegment::Index(index)) => Err(PathParseError::InvalidSegment {
                path: format!("[{index}]"),
                segment: format!("[{index}]"),
            }),
            Some(PathSegment::Field(_)) => Ok(Self { segments }),
        }
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Resolve against scratch memory, returning the value if every step exists.
    ///
    /// Intermediate maps and arrays are borrowed; only the leaf is cloned.
    #[must_use]
    pub fn resolve(&self, scratch: &ScratchMemory) -> Option<Dynamic> {
        let (first, rest) = self.segments.split_first()?;
        let PathSegment::Field(name) = first else {
            return None;
        };
        lookup(scratch.fields().get(name.as_str())?, rest)
    }
}

fn lookup(value: &Dynamic, segments: &[PathSegment]) -> Option<Dynamic> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone().flatten());
    };
    if value.is_shared() {
        // Captured by a closure; no plain reference to borrow through.
        return lookup(&value.clone().flatten(), segments);
    }
    match segment {
        PathSegment::Field(name) => lookup(value.read_lock::<Map>()?.get(name.as_str())?, rest),
        PathSegment::Index(index) => lookup(value.read_lock::<Array>()?.get(*index)?, rest),
    }
}

impl FromStr for WatchedPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim();
        let path = path.strip_prefix("scratch.").unwrap_or(path);
        if path.is_empty() {
            return Err(PathParseError::Empty);
        }

        let invalid = |segment: &str| PathParseError::InvalidSegment {
            path: s.to_string(),
            segment: segment.to_string(),
        };

        let mut segments = Vec::new();
        for part in path.split('.') {
            let (name, mut indices) = match part.find('[') {
                Some(open) => (&part[..open], &part[open..]),
                None => (part, ""),
            };
            if !is_identifier(name) {
                return Err(invalid(part));
            }
            segments.push(PathSegment::Field(name.to_string()));

            while !indices.is_empty() {
                let close = indices.find(']').ok_or_else(|| invalid(part))?;
                let index = indices[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid(part))?;
                segments.push(PathSegment::Index(index));
                indices = &indices[close + 1..];
                if !indices.is_empty() && !indices.starts_with('[') {
                    return Err(invalid(part));
                }
            }
        }
        Self::from_segments(segments)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for WatchedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scratch")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Checks watched scratch fields for invalid numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorruptionDetector {
    paths: Vec<WatchedPath>,
}

impl CorruptionDetector {
    /// Create a detector over explicit paths
    #[inline]
    #[must_use]
    pub fn new(paths: Vec<WatchedPath>) -> Self {
        Self { paths }
    }

    /// Parse paths from their textual form
    ///
    /// # Errors
    /// Returns the first path that fails to parse
    pub fn from_strings<I, S>(paths: I) -> Result<Self, PathParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(paths))
    }

    /// Watched paths
    #[inline]
    #[must_use]
    pub fn paths(&self) -> &[WatchedPath] {
        &self.paths
    }

    /// Check scratch memory, reporting the first invalid watched field
    ///
    /// # Errors
    /// Returns `CorruptionError` naming the path and its value
    pub fn check(&self, scratch: &ScratchMemory) -> Result<(), CorruptionError> {
        for path in &self.paths {
            let Some(value) = path.resolve(scratch) else {
                continue;
            };
            let Ok(number) = value.as_float() else {
                continue;
            };
            if !number.is_finite() {
                return Err(CorruptionError {
                    path: path.to_string(),
                    value: describe(number),
                });
            }
        }
        Ok(())
    }
}

impl Default for CorruptionDetector {
    fn default() -> Self {
        Self::from_strings(default_watched_paths()).unwrap_or_else(|_| Self::new(Vec::new()))
    }
}

fn describe(number: f64) -> String {
    if number.is_nan() {
        "NaN".to_string()
    } else if number.is_sign_positive() {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}
