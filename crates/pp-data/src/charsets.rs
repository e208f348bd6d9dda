//! Built-in candidate character sets.
//!
//! These are precedence lists, not alphabets: the recognizer tries them in
//! order and takes the first glyph that matches. Space comes first because
//! fields are padded with it, lowercase precedes uppercase because it
//! dominates names and cities, and rare punctuation goes last.

use std::borrow::Cow;

macro_rules! lowercase {
    () => {
        "abcdefghijklmnopqrstuvwxyz"
    };
}

macro_rules! uppercase {
    () => {
        "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
    };
}

macro_rules! digits {
    () => {
        "0123456789"
    };
}

pub const DIGITS: &str = digits!();

/// Commas show up once in passport names, dashes and apostrophes rarely.
pub const PASSPORT_NAME: &str = concat!(" ", lowercase!(), uppercase!(), ",-'");
pub const PASSPORT_CITY: &str = concat!(" ", lowercase!(), uppercase!(), ".");
pub const PASSPORT_NUMBER: &str = concat!(" ", uppercase!(), digits!(), "-");
pub const DATE: &str = concat!(digits!(), ".");

/// Permits and passes are printed in capitals only.
pub const PERMIT: &str = concat!(" ", uppercase!());
pub const WORK_PASS_FIELD: &str = concat!(" ", uppercase!(), "-");
pub const PERMIT_NAME: &str = concat!(" ", uppercase!(), "-'");
pub const DISEASE: &str = concat!(" ", uppercase!(), "-.");
pub const PERMIT_NUMBER: &str = concat!(" ", uppercase!(), digits!());
pub const ID_LAST_NAME: &str = concat!(" ", uppercase!(), ",-'");
pub const DIPLOMATIC_ACCESS: &str = concat!(" ", uppercase!(), ",");

pub const HEIGHT: &str = concat!(digits!(), "cm");
pub const WEIGHT: &str = concat!(digits!(), "kg");

pub const TRANSCRIPTION: &str = concat!(" ", lowercase!(), uppercase!(), ".", digits!(), "'?!");

/// Prefix selecting an ad-hoc character set written inline.
pub const LITERAL_PREFIX: &str = "chars:";

const NAMED: &[(&str, &str)] = &[
    ("digits", DIGITS),
    ("passport-name", PASSPORT_NAME),
    ("passport-city", PASSPORT_CITY),
    ("passport-number", PASSPORT_NUMBER),
    ("date", DATE),
    ("permit", PERMIT),
    ("work-pass-field", WORK_PASS_FIELD),
    ("permit-name", PERMIT_NAME),
    ("disease", DISEASE),
    ("permit-number", PERMIT_NUMBER),
    ("id-last-name", ID_LAST_NAME),
    ("diplomatic-access", DIPLOMATIC_ACCESS),
    ("height", HEIGHT),
    ("weight", WEIGHT),
    ("transcription", TRANSCRIPTION),
];

/// Resolve a charset name, or a `chars:` literal, to its candidate list.
pub fn resolve(spec: &str) -> Option<Cow<'static, str>> {
    if let Some(literal) = spec.strip_prefix(LITERAL_PREFIX) {
        return (!literal.is_empty()).then(|| Cow::Owned(literal.to_string()));
    }
    NAMED
        .iter()
        .find(|(name, _)| *name == spec)
        .map(|(_, chars)| Cow::Borrowed(*chars))
}
