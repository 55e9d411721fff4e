//! Response body classification against the known error catalogs.
//!
//! Grounded in `original_source/scanners/error_scanner.go`'s
//! `hasNOSQLError`/`searchError`. Per spec §4.5/§4.7, the error-based
//! scanner itself only matches the Mongo/Mongoose backend-error catalogs
//! -- a bare JS `SyntaxError` is evidence of *something* breaking, but not
//! the NoSQL-backend error this channel specifically reports. The
//! blind-boolean predicate (§4.7) needs the wider net, since a probe that
//! merely broke the JS parser (rather than diverging true/false) should
//! never be mistaken for a boolean differential.

use crate::catalog::{JS_SYNTAX_ERROR_STRINGS, MONGOOSE_ERROR_STRINGS, MONGO_ERROR_STRINGS};

/// True if `body` matches a known NoSQL backend error signature (Mongo or
/// Mongoose). Used by the error-based scanner to decide a probe is
/// injectable.
pub fn has_nosql_error(body: &str) -> bool {
    MONGO_ERROR_STRINGS.iter().any(|re| re.is_match(body))
        || MONGOOSE_ERROR_STRINGS.iter().any(|re| re.is_match(body))
}

/// True if `body` looks like a NoSQL backend error or a bare JS syntax
/// error. Used by the blind-boolean predicate to discard a true/false pair
/// where one side merely broke rather than genuinely diverging.
pub fn has_nosql_or_js_error(body: &str) -> bool {
    has_nosql_error(body) || JS_SYNTAX_ERROR_STRINGS.iter().any(|re| re.is_match(body))
}
