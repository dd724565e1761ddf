//! Codec for encoding and decoding STOMP frames.
//!
//! Frames are plain text. Header names and values are escaped; the body is
//! written verbatim and the frame ends with a single NUL byte.

use thiserror::Error;

use crate::frames::{Command, Frame};
use crate::version::{LINE_FEED, NULL_BYTE};

/// Protocol errors that can occur during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The input contained no data at all.
    #[error("Frame string cannot be empty")]
    EmptyFrame,

    /// The command line did not name a known command.
    #[error("Unknown STOMP command: {0}")]
    UnknownCommand(String),
}

/// Escape a header name or value.
///
/// Backslash, line feed, colon and carriage return each become a two
/// character escape sequence.
#[must_use]
pub fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// Reverse [`escape_header`].
///
/// The input is scanned once, left to right, so an escaped backslash
/// followed by a letter is never re-read as another escape. Unknown escape
/// sequences are kept as written.
#[must_use]
pub fn unescape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some('n') => out.push('\n'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Encode a frame to its wire text.
///
/// The encoded format is:
/// - the command token and a line feed
/// - one `name:value` line per header
/// - an empty line
/// - the raw body followed by a NUL byte
#[must_use]
pub fn encode(frame: &Frame) -> String {
    let mut buf = String::with_capacity(64 + frame.body().len());
    encode_into(frame, &mut buf);
    buf
}

/// Encode a frame, appending to an existing buffer.
pub fn encode_into(frame: &Frame, buf: &mut String) {
    buf.push_str(frame.command().as_str());
    buf.push(LINE_FEED);

    for (name, value) in frame.headers() {
        buf.push_str(&escape_header(name));
        buf.push(':');
        buf.push_str(&escape_header(value));
        buf.push(LINE_FEED);
    }

    buf.push(LINE_FEED);
    buf.push_str(frame.body());
    buf.push(NULL_BYTE);
}

/// Decode a frame from its wire text.
///
/// A missing trailing NUL is tolerated. Header lines without a colon are
/// skipped. When no empty line separates headers from the body, the body
/// is empty.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyFrame`] for empty input and
/// [`ProtocolError::UnknownCommand`] when the command token is not
/// recognised.
pub fn decode(text: &str) -> Result<Frame, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyFrame);
    }

    let text = text.strip_suffix(NULL_BYTE).unwrap_or(text);
    let lines: Vec<&str> = text.split(LINE_FEED).collect();

    let command: Command = lines[0].trim().parse()?;
    let mut frame = Frame::new(command);

    let mut body_start = None;
    for (i, line) in lines.iter().enumerate().skip(1) {
        if line.is_empty() {
            body_start = Some(i + 1);
            break;
        }

        match line.find(':') {
            Some(colon) if colon > 0 => {
                let name = unescape_header(&line[..colon]);
                let value = unescape_header(&line[colon + 1..]);
                frame.add_header(name, value);
            }
            _ => {}
        }
    }

    if let Some(start) = body_start {
        if start < lines.len() {
            let mut body = String::new();
            for (i, line) in lines[start..].iter().enumerate() {
                if i > 0 {
                    body.push(LINE_FEED);
                }
                body.push_str(line);
            }
            frame.set_body(body);
        }
    }

    Ok(frame)
}
