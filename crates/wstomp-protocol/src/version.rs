//! Protocol versioning and framing constants.

/// Protocol version advertised in the `accept-version` header of CONNECT.
pub const PROTOCOL_VERSION: &str = "1.2";

/// Line terminator separating the command, header lines and body.
pub const LINE_FEED: char = '\n';

/// Frame terminator appended after the body.
pub const NULL_BYTE: char = '\0';

/// Returns `true` if the broker-reported `version` header is one this
/// client speaks.
///
/// Brokers answer CONNECTED with the negotiated version; anything in the
/// 1.x line is accepted.
#[must_use]
pub fn is_supported_version(version: &str) -> bool {
    version
        .split('.')
        .next()
        .map(|major| major.trim() == "1")
        .unwrap_or(false)
}
