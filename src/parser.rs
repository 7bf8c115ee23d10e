//! Recognizers for the handful of line shapes the repair pass dispatches on.

use std::str::{self, FromStr};

use nom::bytes::complete::tag;
use nom::character::complete::digit1;
use nom::combinator::{all_consuming, map_res, recognize};
use nom::sequence::{preceded, terminated};
use nom::{IResult, Parser};

type NomResult<'a, O> = IResult<&'a [u8], O>;

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

fn object_number(input: &[u8]) -> NomResult<u32> {
    map_res(digit1, |digits: &[u8]| {
        u32::from_str(str::from_utf8(digits).unwrap())
    })
    .parse(input)
}

/// Matches an entire `N 0 obj` line and yields the object number.
pub(crate) fn object_header(line: &[u8]) -> Option<u32> {
    strip_nom(all_consuming(terminated(object_number, tag(&b" 0 obj\n"[..]))).parse(line))
}

/// Matches a `%% Object stream: object N` marker by prefix.
pub(crate) fn ostream_marker(line: &[u8]) -> Option<u32> {
    strip_nom(preceded(tag(&b"%% Object stream: object "[..]), object_number).parse(line))
}

fn integer_only(line: &[u8]) -> NomResult<&[u8]> {
    all_consuming(terminated(digit1, tag(&b"\n"[..]))).parse(line)
}

/// A line holding nothing but an unsigned integer.
pub(crate) fn integer_line(line: &[u8]) -> bool {
    integer_only(line).is_ok()
}

fn size_only(line: &[u8]) -> NomResult<&[u8]> {
    all_consuming(preceded(
        tag(&b"  /Size "[..]),
        terminated(digit1, tag(&b"\n"[..])),
    ))
    .parse(line)
}

/// A trailer `  /Size N` line, eligible for replacement.
pub(crate) fn size_line(line: &[u8]) -> bool {
    size_only(line).is_ok()
}

/// Finds `/Extends N 0 R` anywhere in a dictionary line and returns the
/// reference text.
pub(crate) fn extends_target(line: &[u8]) -> Option<&[u8]> {
    let at = find(line, b"/Extends ")?;
    let rest = &line[at + b"/Extends ".len()..];
    strip_nom(recognize(terminated(digit1, tag(&b" 0 R"[..]))).parse(rest))
}

/// Byte-substring search, used to dispatch on dictionary lines.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub(crate) fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}
