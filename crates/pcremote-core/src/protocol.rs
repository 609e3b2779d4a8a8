//! Wire protocol constants and the response digest.
//!
//! The exchange is newline-delimited plaintext over one stream connection:
//!
//! ```text
//! Client -> Server: <greeting>\n
//! Server -> Client: <challenge>\n
//! Client -> Server: <hex-sha256(challenge + secret + command_id)>\n
//! Server -> Client: OK
//! ```

use sha2::{Digest, Sha256};

/// Line terminator used by every client-sent message.
pub const LINE_TERMINATOR: &str = "\n";

/// Upper bound for the single read that carries the challenge.
pub const CHALLENGE_READ_LEN: usize = 1024;

/// Upper bound for the single read that carries the status reply.
pub const STATUS_READ_LEN: usize = 128;

/// Status text the server sends after accepting a response.
pub const STATUS_OK: &str = "OK";

/// Network timeout applied when the caller does not pick one.
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// Compute the handshake response for `challenge`.
///
/// SHA-256 over `challenge ‖ secret ‖ command_id` with no separator,
/// lowercase hex encoded. The server recomputes the same value for every
/// known key and command, so the byte layout must not change.
pub fn digest(challenge: &str, secret: &str, command_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.update(command_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the challenge token from the raw text of the first read.
///
/// Everything after the first `\n` is dropped.
pub fn challenge_token(text: &str) -> &str {
    text.split('\n').next().unwrap_or_default()
}

/// Build a client line (`text` followed by the terminator).
pub fn line(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
    bytes.extend_from_slice(text.as_bytes());
    bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_known_vector() {
        // sha256("abc") from FIPS 180-2, split across the three inputs.
        assert_eq!(
            digest("a", "b", "c"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_shape() {
        let d = digest("abc123", "secretkey", "cmd1");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(d, digest("abc123", "secretkey", "cmd1"));
    }

    #[test]
    fn test_digest_binds_every_input() {
        let base = digest("abc123", "secretkey", "cmd1");
        assert_ne!(base, digest("abc124", "secretkey", "cmd1"));
        assert_ne!(base, digest("abc123", "secretkez", "cmd1"));
        assert_ne!(base, digest("abc123", "secretkey", "cmd2"));
    }

    #[test]
    fn test_digest_has_no_separator() {
        // Only the concatenation matters, not where the boundaries fall.
        assert_eq!(digest("ab", "c", "d"), digest("a", "bc", "d"));
    }

    #[test]
    fn test_digest_empty_inputs() {
        assert_eq!(
            digest("", "", ""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_challenge_token() {
        assert_eq!(challenge_token("abc123\n"), "abc123");
        assert_eq!(challenge_token("abc123\nextra\n"), "abc123");
        assert_eq!(challenge_token("abc123"), "abc123");
        assert_eq!(challenge_token("\nabc"), "");
    }

    #[test]
    fn test_line() {
        assert_eq!(line("hello"), b"hello\n");
        assert_eq!(line(""), b"\n");
    }
}
