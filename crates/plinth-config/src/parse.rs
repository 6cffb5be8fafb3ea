//! The config lexer and parser.
//!
//! Physical lines ending in a lone `\` are joined into logical lines; the
//! raw text (continuations included) is preserved on every [`ConfigLine`]
//! so the renderer can reproduce untouched lines exactly.

use bstr::{BString, ByteSlice};

use crate::error::ConfigError;
use crate::line::{ConfigEntry, ConfigLine, ConfigValue};

/// Parse a whole file into lines.
///
/// Returns the line list and whether the input ended with a newline.
///
/// # Errors
///
/// [`ConfigError::Parse`] with a 1-based line number.
pub fn parse_lines(bytes: &[u8]) -> Result<(Vec<ConfigLine>, bool), ConfigError> {
    let trailing_newline = bytes.last() == Some(&b'\n');
    let mut physical: Vec<&[u8]> = bytes.split(|&b| b == b'\n').collect();
    if trailing_newline || bytes.is_empty() {
        physical.pop();
    }

    let mut lines = Vec::new();
    let mut context: Option<(String, Option<BString>)> = None;
    let mut i = 0;
    while i < physical.len() {
        let line_no = i + 1;
        let mut text: Vec<u8> = physical[i].to_vec();
        let mut effective: Vec<u8> = physical[i].to_vec();
        while ends_with_continuation(&effective) && i + 1 < physical.len() {
            effective.pop();
            i += 1;
            text.push(b'\n');
            text.extend_from_slice(physical[i]);
            effective.extend_from_slice(physical[i]);
        }
        i += 1;

        let parsed = parse_logical(&effective, line_no, &mut context)?;
        lines.push(ConfigLine { text: text.into(), entry: parsed, context: context.clone() });
    }
    Ok((lines, trailing_newline))
}

/// A trailing run of backslashes continues the line when its length is
/// odd (`\\` is an escaped backslash, not a continuation).
fn ends_with_continuation(line: &[u8]) -> bool {
    line.iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

/// Parse one logical line, updating the section context for headers.
/// Returns the entry when the line is an assignment.
fn parse_logical(
    effective: &[u8],
    line_no: usize,
    context: &mut Option<(String, Option<BString>)>,
) -> Result<Option<ConfigEntry>, ConfigError> {
    let body = effective.trim_start();
    if body.is_empty() || body[0] == b'#' || body[0] == b';' {
        return Ok(None);
    }
    if body[0] == b'[' {
        *context = Some(parse_header(&body[1..], line_no)?);
        return Ok(None);
    }

    let Some((section, subsection)) = context.clone() else {
        return Err(ConfigError::Parse {
            line: line_no,
            reason: "assignment outside any section".to_owned(),
        });
    };
    let (name, value) = parse_assignment(body, line_no)?;
    Ok(Some(ConfigEntry::new(&section, subsection, &name, value)))
}

fn parse_header(
    after_bracket: &[u8],
    line_no: usize,
) -> Result<(String, Option<BString>), ConfigError> {
    let fail = |reason: &str| ConfigError::Parse { line: line_no, reason: reason.to_owned() };

    let section_len = after_bracket
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
        .count();
    if section_len == 0 {
        return Err(fail("missing section name"));
    }
    let section = after_bracket[..section_len].to_ascii_lowercase();
    let section = String::from_utf8(section).map_err(|_| fail("non-ASCII section name"))?;

    let mut rest = after_bracket[section_len..].trim_start();
    let subsection = if rest.first() == Some(&b'"') {
        let (sub, remaining) = parse_quoted_subsection(&rest[1..], line_no)?;
        rest = remaining.trim_start();
        Some(sub)
    } else {
        None
    };

    let Some(after_close) = rest.strip_prefix(b"]") else {
        return Err(fail("unterminated section header"));
    };
    let tail = after_close.trim_start();
    if !(tail.is_empty() || tail[0] == b'#' || tail[0] == b';') {
        return Err(fail("trailing characters after section header"));
    }
    Ok((section, subsection))
}

/// Bytes between double quotes, honoring `\"` and `\\` only.
fn parse_quoted_subsection(
    bytes: &[u8],
    line_no: usize,
) -> Result<(BString, &[u8]), ConfigError> {
    let fail = |reason: &str| ConfigError::Parse { line: line_no, reason: reason.to_owned() };
    let mut out = Vec::new();
    let mut iter = bytes.iter().enumerate();
    while let Some((pos, &b)) = iter.next() {
        match b {
            b'"' => return Ok((out.into(), &bytes[pos + 1..])),
            b'\\' => match iter.next() {
                Some((_, b'"')) => out.push(b'"'),
                Some((_, b'\\')) => out.push(b'\\'),
                Some(_) => return Err(fail("unsupported escape in subsection name")),
                None => return Err(fail("unterminated subsection name")),
            },
            other => out.push(other),
        }
    }
    Err(fail("unterminated subsection name"))
}

fn parse_assignment(body: &[u8], line_no: usize) -> Result<(String, ConfigValue), ConfigError> {
    let fail = |reason: &str| ConfigError::Parse { line: line_no, reason: reason.to_owned() };

    if !body[0].is_ascii_alphabetic() {
        return Err(fail("variable name must start with a letter"));
    }
    let name_len = body
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b == b'-')
        .count();
    let name = String::from_utf8(body[..name_len].to_ascii_lowercase())
        .unwrap_or_default();

    let rest = body[name_len..].trim_start();
    match rest.first() {
        None => Ok((name, ConfigValue::Missing)),
        Some(b'#' | b';') => Ok((name, ConfigValue::Missing)),
        Some(b'=') => {
            let value = parse_value(&rest[1..], line_no)?;
            Ok((name, ConfigValue::Value(value)))
        }
        Some(_) => Err(fail("unexpected characters after variable name")),
    }
}

/// Parse a value: leading whitespace skipped, trailing unquoted whitespace
/// dropped, `#`/`;` starting a comment outside quotes, quotes toggling
/// mid-value, and the `\" \\ \n \t \b` escapes.
fn parse_value(bytes: &[u8], line_no: usize) -> Result<BString, ConfigError> {
    let fail = |reason: &str| ConfigError::Parse { line: line_no, reason: reason.to_owned() };

    let bytes = bytes.trim_start();
    let mut out: Vec<u8> = Vec::new();
    let mut keep_len = 0;
    let mut in_quotes = false;
    let mut iter = bytes.iter();
    while let Some(&b) = iter.next() {
        match b {
            b'\\' => {
                let escaped = match iter.next() {
                    Some(b'"') => b'"',
                    Some(b'\\') => b'\\',
                    Some(b'n') => b'\n',
                    Some(b't') => b'\t',
                    Some(b'b') => 0x08,
                    Some(_) => return Err(fail("unsupported escape in value")),
                    None => return Err(fail("dangling backslash in value")),
                };
                out.push(escaped);
                keep_len = out.len();
            }
            b'"' => {
                in_quotes = !in_quotes;
                keep_len = out.len();
            }
            b'#' | b';' if !in_quotes => break,
            other => {
                out.push(other);
                if in_quotes || !other.is_ascii_whitespace() {
                    keep_len = out.len();
                }
            }
        }
    }
    if in_quotes {
        return Err(fail("unterminated quote in value"));
    }
    out.truncate(keep_len);
    Ok(out.into())
}
