// Query string encoding for columns and values
//
// Mirrors PHP-style rawurlencode: everything except ASCII alphanumerics and
// `-_.~` is percent-encoded, so structural characters (`( ) & | ! > < =`)
// and whitespace can never leak into the wire form of a column or value.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;

const RAWURL: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a column or value for the wire
pub fn encode(text: &str) -> Cow<'_, str> {
    utf8_percent_encode(text, RAWURL).into()
}

/// Decode a raw run read from the wire. Invalid UTF-8 sequences are replaced
/// rather than rejected so partially typed input never fails to decode.
pub fn decode(raw: &str) -> Cow<'_, str> {
    percent_decode_str(raw).decode_utf8_lossy()
}
