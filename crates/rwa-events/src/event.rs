//! Parsed feed events and their markdown rendering.
//!
//! A feed line is split on whitespace. Token 0 is the acting nation wrapped
//! in markers (`@@name@@`); the rest of the line is a sentence whose verb
//! phrase identifies the [`EventKind`]. Parameters sit at fixed token
//! positions per kind and are marker-wrapped too (`@@nation@@` or
//! `%%region%%`). The live feed ends every sentence with a period, so
//! trailing punctuation is split off before markers are stripped.

use std::str::FromStr;

use rwa_types::names::{canonicalize, nation_link, region_link};

use crate::error::EventParseError;
use crate::kind::{Bucket, EventKind};

/// Punctuation that may trail a name token at the end of a clause.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?'];

/// Markers wrapping a nation name in feed text.
const NATION_MARKER: &str = "@@";

/// Markers wrapping a region name in feed text.
const REGION_MARKER: &str = "%%";

/// One parsed feed event. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    actor: String,
    kind: EventKind,
    params: Vec<String>,
    raw: String,
}

impl Event {
    /// Parse one line of feed text.
    ///
    /// # Errors
    ///
    /// Returns [`EventParseError::UnknownEventKind`] if no verb phrase
    /// matches, [`EventParseError::MissingParameter`] if a declared
    /// parameter position is past the end of the line, and
    /// [`EventParseError::MalformedToken`] if a name token cannot be
    /// stripped of its markers.
    pub fn parse(line: &str) -> Result<Self, EventParseError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (actor_token, rest) = tokens.split_first().ok_or(EventParseError::Empty)?;

        let sentence = rest.join(" ");
        let kind = EventKind::from_sentence(&sentence).ok_or_else(|| {
            EventParseError::UnknownEventKind {
                line: line.to_owned(),
            }
        })?;

        let actor = strip_markers(actor_token)?;
        let params = kind
            .parameter_positions()
            .iter()
            .map(|&position| {
                tokens
                    .get(position)
                    .ok_or_else(|| EventParseError::MissingParameter {
                        kind,
                        position,
                        line: line.to_owned(),
                    })
                    .and_then(|token| strip_markers(token))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            actor,
            kind,
            params,
            raw: line.to_owned(),
        })
    }

    /// Canonical name of the acting nation.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// The event kind.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// The kind's coarse bucket.
    pub const fn bucket(&self) -> Bucket {
        self.kind.bucket()
    }

    /// All parameters, in the kind's declared order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// The parameter at `index`, if the kind declares one there.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The feed line as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Render the raw line as markdown.
    ///
    /// Every `@@nation@@` token becomes a link to the nation's profile and
    /// every `%%region%%` token a link to the region's page. All other
    /// words, and punctuation trailing a name, are kept as-is.
    pub fn render_markdown(&self) -> String {
        self.raw
            .split_whitespace()
            .map(render_token)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for Event {
    type Err = EventParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.actor)?;
        if !self.params.is_empty() {
            write!(f, " [{}]", self.params.join(", "))?;
        }
        Ok(())
    }
}

/// Split trailing clause punctuation off a token.
fn split_punctuation(token: &str) -> (&str, &str) {
    let core = token.trim_end_matches(TRAILING_PUNCTUATION);
    token.split_at(core.len())
}

/// Strip two marker characters from each end of a name token and
/// canonicalise what remains.
fn strip_markers(token: &str) -> Result<String, EventParseError> {
    let (core, _) = split_punctuation(token);
    let inner = core
        .char_indices()
        .nth(2)
        .map(|(start, _)| start)
        .and_then(|start| {
            let end = core.char_indices().rev().nth(1).map(|(i, _)| i)?;
            core.get(start..end)
        })
        .filter(|inner| !inner.is_empty())
        .ok_or_else(|| EventParseError::MalformedToken {
            token: token.to_owned(),
        })?;
    Ok(canonicalize(inner))
}

/// Replace a marker-wrapped token with its markdown link.
fn render_token(token: &str) -> String {
    let (core, punctuation) = split_punctuation(token);
    let link = marked_name(core, NATION_MARKER)
        .map(nation_link)
        .or_else(|| marked_name(core, REGION_MARKER).map(region_link));
    link.map_or_else(|| token.to_owned(), |link| format!("{link}{punctuation}"))
}

/// The name inside `marker`...`marker`, if `core` is wrapped that way.
fn marked_name<'a>(core: &'a str, marker: &str) -> Option<&'a str> {
    core.strip_prefix(marker)
        .and_then(|rest| rest.strip_suffix(marker))
        .filter(|name| !name.is_empty())
}
