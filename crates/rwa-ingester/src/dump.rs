//! Parser for the gzipped nations dump.
//!
//! The dump is `<NATIONS><NATION>...</NATION>...</NATIONS>`. Only a few
//! direct children of each `NATION` are read; everything else, including
//! nested elements such as `FREEDOM` or `DEATHS`, is skipped.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::Event;
use rwa_types::{SnapshotRow, canonicalize};

use crate::error::IngestError;

/// Depth of a `NATION` element.
const NATION_DEPTH: usize = 2;

/// Depth of a `NATION`'s direct children.
const FIELD_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    FullName,
    UnStatus,
    Region,
    Flag,
    Endorsements,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"NAME" => Some(Self::Name),
            b"FULLNAME" => Some(Self::FullName),
            b"UNSTATUS" => Some(Self::UnStatus),
            b"REGION" => Some(Self::Region),
            b"FLAG" => Some(Self::Flag),
            b"ENDORSEMENTS" => Some(Self::Endorsements),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct NationBuilder {
    name: String,
    fullname: String,
    unstatus: String,
    region: String,
    flag: String,
    endorsements: String,
}

impl NationBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::FullName => &mut self.fullname,
            Field::UnStatus => &mut self.unstatus,
            Field::Region => &mut self.region,
            Field::Flag => &mut self.flag,
            Field::Endorsements => &mut self.endorsements,
        };
        slot.push_str(text);
    }

    fn finish(self) -> Option<SnapshotRow> {
        let name = canonicalize(self.name.trim());
        if name.is_empty() {
            return None;
        }
        let (wa_member, wa_delegate) = match self.unstatus.trim() {
            "WA Delegate" => (true, true),
            "WA Member" => (true, false),
            _ => (false, false),
        };
        let endorsements: BTreeSet<String> = self
            .endorsements
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(canonicalize)
            .collect();
        Some(SnapshotRow {
            name,
            fullname: self.fullname,
            region: canonicalize(self.region.trim()),
            wa_member,
            wa_delegate,
            endorsements,
            flag: self.flag,
        })
    }
}

/// Parse an uncompressed dump.
pub fn parse_dump<R: BufRead>(input: R) -> Result<Vec<SnapshotRow>, IngestError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rows = Vec::new();
    let mut skipped: usize = 0;
    let mut depth: usize = 0;
    let mut builder = NationBuilder::default();
    let mut field: Option<Field> = None;

    loop {
        let position = reader.buffer_position();
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| IngestError::Xml(format!("after byte {position}: {e}")))?
        {
            Event::Start(start) => {
                depth = depth.saturating_add(1);
                if depth == NATION_DEPTH {
                    builder = NationBuilder::default();
                } else if depth == FIELD_DEPTH {
                    field = Field::from_tag(start.name().as_ref());
                }
            }
            Event::Text(text) => {
                if let (FIELD_DEPTH, Some(field)) = (depth, field) {
                    let text = text
                        .unescape()
                        .map_err(|e| IngestError::Xml(e.to_string()))?;
                    builder.push(field, &text);
                }
            }
            Event::End(_) => {
                if depth == FIELD_DEPTH {
                    field = None;
                } else if depth == NATION_DEPTH {
                    match std::mem::take(&mut builder).finish() {
                        Some(row) => rows.push(row),
                        None => skipped = skipped.saturating_add(1),
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped nations without a name");
    }
    Ok(rows)
}

/// Parse a gzipped dump file.
pub fn parse_dump_file(path: &Path) -> Result<Vec<SnapshotRow>, IngestError> {
    let file = File::open(path)?;
    parse_dump(BufReader::new(GzDecoder::new(file)))
}
