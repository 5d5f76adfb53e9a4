use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};

/// One `{name, role}` entry as it arrives from the page.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MemberRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// A team member with display-ready strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub role: String,
}

impl Member {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self { name: name.into(), role: role.into() }
    }

    /// Accessible label, e.g. `Ada — Lead`.
    pub fn label(&self) -> String {
        format!("{} \u{2014} {}", self.name, self.role)
    }
}

impl From<MemberRecord> for Member {
    fn from(record: MemberRecord) -> Self {
        Self {
            name: decode_entities(&record.name),
            role: decode_entities(&record.role),
        }
    }
}

/// Parses the serialized member list. An empty list is an error because the
/// network has nothing to draw.
pub fn parse_members(json: &str) -> FxResult<Vec<Member>> {
    let records: Vec<MemberRecord> = serde_json::from_str(json)?;
    members_from_records(records)
}

pub fn members_from_records(records: Vec<MemberRecord>) -> FxResult<Vec<Member>> {
    if records.is_empty() {
        return Err(FxError::NoMembers);
    }
    Ok(records.into_iter().map(Member::from).collect())
}

/// Like [`parse_members`] but degrades to an empty list, logging the reason.
pub fn parse_members_or_empty(json: &str) -> Vec<Member> {
    match parse_members(json) {
        Ok(members) => members,
        Err(e) => {
            log::warn!("Team network disabled: {}", e);
            Vec::new()
        }
    }
}

/// Decodes the HTML character references that show up in `data-` attributes.
/// Unknown references are kept verbatim. Numeric references follow the HTML
/// parser: NUL becomes U+FFFD and 0x80..=0x9F map through windows-1252.
pub fn decode_entities(input: &str) -> String {
    html_escape::decode_html_entities(input)
        .chars()
        .map(html_numeric_override)
        .collect()
}

fn html_numeric_override(ch: char) -> char {
    match ch as u32 {
        0x00 => '\u{FFFD}',
        code @ 0x80..=0x9F => WINDOWS_1252_C1[(code - 0x80) as usize],
        _ => ch,
    }
}

/// Replacement characters for references in the C1 control range.
const WINDOWS_1252_C1: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];
