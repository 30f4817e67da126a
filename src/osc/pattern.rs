//! Track address patterns (`/track/<id>/<suffix>`)

use regex::Regex;
use thiserror::Error;

/// Address could not yield a track id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Could not extract track id from {address}")]
    InvalidTrackId { address: String },
}

/// Compiled `/track/<id>/<suffix>` matcher
///
/// The id slot accepts any single path segment so that a malformed id is
/// still routed to its handler and rejected there; numeric validation lives
/// in [`AddressPattern::extract_track_id`].
#[derive(Debug, Clone)]
pub struct AddressPattern {
    regex: Regex,
}

impl AddressPattern {
    /// Compile a pattern for the given terminal segment (e.g. `"vu"`)
    pub fn track(suffix: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!(r"^/track/([^/]+)/{}$", regex::escape(suffix)))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }

    /// Extract the base-10 track id
    pub fn extract_track_id(&self, address: &str) -> Result<u32, PatternError> {
        let invalid = || PatternError::InvalidTrackId {
            address: address.to_string(),
        };

        let segment = self
            .regex
            .captures(address)
            .and_then(|caps| caps.get(1))
            .ok_or_else(invalid)?
            .as_str();

        // u32::from_str accepts a leading '+', REAPER never sends one
        if !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        segment.parse::<u32>().map_err(|_| invalid())
    }
}
