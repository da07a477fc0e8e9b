//! Identifier normalization.
//!
//! Server URL, application name and stream name usually come straight from
//! a settings dialog, so they are trimmed before they reach the wire.

/// Characters stripped from both ends of user supplied identifiers
const TRIM_CHARS: [char; 4] = [' ', '\n', '\r', '\t'];

/// Trim leading and trailing spaces, newlines, carriage returns and tabs.
///
/// Only those four characters are removed; other Unicode whitespace is
/// kept, which is narrower than [`str::trim`].
pub fn sanitize(s: &str) -> String {
    s.trim_matches(&TRIM_CHARS[..]).to_string()
}
