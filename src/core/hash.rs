//! Hashing and Canonical Serialization
//!
//! Provides the digest and canonical-text primitives shared by seed
//! derivation, commitments and verification:
//! - SHA-256 with lowercase hex output
//! - Canonical JSON (sorted keys, `", "` / `": "` separators, ASCII-only
//!   output with `\uXXXX` escapes)

use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type Digest256 = [u8; 32];

/// Compute a SHA-256 hash of arbitrary data.
pub fn sha256(data: &[u8]) -> Digest256 {
    Sha256::digest(data).into()
}

/// Compute a SHA-256 hash and encode it as lowercase hex (64 chars).
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// JSON formatter that writes `", "` between elements and `": "` after keys,
/// and escapes everything outside printable ASCII as `\uXXXX` (UTF-16 code
/// units, lowercase hex).
///
/// Matches the default output of the reference verifier scripts, so the
/// canonical text is byte-identical across implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    #[inline]
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    #[inline]
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let bytes = fragment.as_bytes();
        let mut start = 0;

        for (i, ch) in fragment.char_indices() {
            if ch.is_ascii() && ch != '\x7f' {
                continue;
            }
            writer.write_all(&bytes[start..i])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + ch.len_utf8();
        }

        writer.write_all(&bytes[start..])
    }
}

/// Serialize a value to canonical JSON text.
///
/// The value is first lowered to a `serde_json::Value`, whose object maps
/// are ordered, so keys come out lexicographically sorted regardless of
/// struct field order.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    value.serialize(&mut serializer)?;

    // Output is ASCII
    Ok(String::from_utf8_lossy(&out).into_owned())
}

// =============================================================================
// TESTS
// =============================================================================
