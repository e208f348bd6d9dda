use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Value produced by evaluating one document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecognizedValue {
    Text(String),
    Number(i64),
    Date(NaiveDate),
    Flag(bool),
}

impl RecognizedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecognizedValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for RecognizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognizedValue::Text(s) => write!(f, "{s:?}"),
            RecognizedValue::Number(n) => write!(f, "{n}"),
            RecognizedValue::Date(d) => write!(f, "{d}"),
            RecognizedValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// The kinds of paper an entrant can hand over.
///
/// Layout variants (e.g. one passport per nation) are named
/// `<kind>-<variant>` and all map onto the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Passport,
    EntryTicket,
    EntryPermit,
    WorkPass,
    IdSupplement,
    GrantOfAsylum,
    VaxCert,
    AccessPermit,
    ArstotzkanId,
    DiplomaticAuth,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 10] = [
        DocumentKind::Passport,
        DocumentKind::EntryTicket,
        DocumentKind::EntryPermit,
        DocumentKind::WorkPass,
        DocumentKind::IdSupplement,
        DocumentKind::GrantOfAsylum,
        DocumentKind::VaxCert,
        DocumentKind::AccessPermit,
        DocumentKind::ArstotzkanId,
        DocumentKind::DiplomaticAuth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Passport => "passport",
            DocumentKind::EntryTicket => "entry-ticket",
            DocumentKind::EntryPermit => "entry-permit",
            DocumentKind::WorkPass => "work-pass",
            DocumentKind::IdSupplement => "id-supplement",
            DocumentKind::GrantOfAsylum => "grant-of-asylum",
            DocumentKind::VaxCert => "vax-cert",
            DocumentKind::AccessPermit => "access-permit",
            DocumentKind::ArstotzkanId => "arstotzkan-id",
            DocumentKind::DiplomaticAuth => "diplomatic-auth",
        }
    }

    /// Resolve a layout variant name such as `passport-obristan`.
    pub fn from_variant(variant: &str) -> Option<Self> {
        // Longest name first so "entry-permit" never resolves as a prefix of something shorter.
        let mut all = Self::ALL;
        all.sort_by_key(|k| std::cmp::Reverse(k.as_str().len()));
        all.into_iter().find(|kind| {
            let name = kind.as_str();
            variant == name
                || variant
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
    }

    /// Documents whose authenticity is decided by a stamped seal.
    pub fn is_sealed(&self) -> bool {
        matches!(
            self,
            DocumentKind::EntryPermit
                | DocumentKind::WorkPass
                | DocumentKind::GrantOfAsylum
                | DocumentKind::AccessPermit
                | DocumentKind::DiplomaticAuth
        )
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_variant(s).ok_or_else(|| format!("unknown document kind: {s}"))
    }
}

/// Outcome of one field read; failures are kept as text so a report is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    Ok(RecognizedValue),
    Err(String),
}

/// Everything read off one scanned document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub variant: String,
    pub kind: Option<DocumentKind>,
    pub fields: BTreeMap<String, FieldOutcome>,
    /// `Some(true)` when none of the authorized seals is present.
    pub forged: Option<bool>,
    pub seal_position: Option<(u32, u32)>,
}

impl ScanReport {
    pub fn new(variant: impl Into<String>) -> Self {
        let variant = variant.into();
        Self {
            kind: DocumentKind::from_variant(&variant),
            variant,
            fields: BTreeMap::new(),
            forged: None,
            seal_position: None,
        }
    }

    pub fn value(&self, field: &str) -> Option<&RecognizedValue> {
        match self.fields.get(field)? {
            FieldOutcome::Ok(v) => Some(v),
            FieldOutcome::Err(_) => None,
        }
    }
}
