//! Strict DER codec for the on-wire key and signature bodies
//!
//! Only the four universal types the wire formats need are implemented:
//! `SEQUENCE`, `INTEGER`, `OCTET STRING`, and `UTF8String`, all with
//! definite lengths. Encoding is canonical (minimal length octets,
//! minimal two's-complement integers); decoding is strict and rejects
//! indefinite lengths, non-minimal length encodings, truncation, and
//! unexpected tags with a precise [`DerError`].
//!
//! Composite structures (signing keys embedding PKCS#8 blobs, signatures
//! embedding `SEQUENCE OF` witness records) are built by concatenating
//! encoded elements into a [`encode_sequence`] body and walked back with a
//! cursor [`Reader`]; [`Reader::read_raw`] yields a whole nested TLV
//! verbatim for the embedded PKCS#8/SPKI documents.

#![forbid(unsafe_code)]

use num_bigint::{BigInt, BigUint, Sign};

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_UTF8_STRING: u8 = 0x0c;
const TAG_SEQUENCE: u8 = 0x30;

/// Decoding failures. Encoding is infallible.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DerError {
    /// Input ended inside a tag, length, or content run.
    #[error("truncated DER input at offset {0}")]
    Truncated(usize),

    /// The element at the cursor carried a different tag than requested.
    #[error("expected DER tag {expected:#04x}, found {found:#04x}")]
    TagMismatch {
        /// Tag the caller asked for.
        expected: u8,
        /// Tag actually present.
        found: u8,
    },

    /// Indefinite or non-minimal length encoding.
    #[error("invalid DER length encoding at offset {0}")]
    BadLength(usize),

    /// Zero-length INTEGER content or other malformed scalar body.
    #[error("malformed DER integer")]
    BadInteger,

    /// INTEGER was negative where an unsigned value is required.
    #[error("negative DER integer where unsigned required")]
    NegativeInteger,

    /// UTF8String content was not valid UTF-8.
    #[error("DER UTF8String is not valid UTF-8")]
    BadUtf8,

    /// Bytes remained after the caller finished reading a structure.
    #[error("{0} trailing bytes after DER structure")]
    TrailingBytes(usize),
}

// ----------------------------- Encoding -------------------------------------

fn encode_header(tag: u8, len: usize, out: &mut Vec<u8>) {
    out.push(tag);
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let sig = &bytes[skip..];
        out.push(0x80 | sig.len() as u8);
        out.extend_from_slice(sig);
    }
}

fn encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    encode_header(tag, content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

/// Encode a `SEQUENCE` whose body is the concatenation of already-encoded
/// elements.
pub fn encode_sequence(body: &[u8]) -> Vec<u8> {
    encode_tlv(TAG_SEQUENCE, body)
}

/// Encode an `INTEGER` in minimal two's-complement big-endian form.
pub fn encode_integer(value: &BigInt) -> Vec<u8> {
    let mut content = value.to_signed_bytes_be();
    if content.is_empty() {
        content.push(0);
    }
    encode_tlv(TAG_INTEGER, &content)
}

/// Encode a non-negative `INTEGER`.
pub fn encode_uint(value: &BigUint) -> Vec<u8> {
    encode_integer(&BigInt::from_biguint(Sign::Plus, value.clone()))
}

/// Encode an `OCTET STRING`.
pub fn encode_octet_string(bytes: &[u8]) -> Vec<u8> {
    encode_tlv(TAG_OCTET_STRING, bytes)
}

/// Encode a `UTF8String`.
pub fn encode_utf8_string(s: &str) -> Vec<u8> {
    encode_tlv(TAG_UTF8_STRING, s.as_bytes())
}

// ----------------------------- Decoding -------------------------------------

/// Cursor over a DER byte string.
///
/// Each `read_*` call consumes exactly one element. [`Reader::finish`]
/// asserts that nothing trails the structure; looping on
/// [`Reader::is_empty`] walks a `SEQUENCE OF`.
#[derive(Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// True when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Error unless the reader is exhausted.
    pub fn finish(&self) -> Result<(), DerError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DerError::TrailingBytes(self.buf.len() - self.pos))
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DerError> {
        if self.buf.len() - self.pos < n {
            return Err(DerError::Truncated(self.pos));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_header(&mut self) -> Result<(u8, usize), DerError> {
        let at = self.pos;
        let tag = self.take(1)?[0];
        let first = self.take(1)?[0];
        let len = if first < 0x80 {
            first as usize
        } else if first == 0x80 {
            // Indefinite lengths are BER, not DER.
            return Err(DerError::BadLength(at));
        } else {
            let n = (first & 0x7f) as usize;
            if n > std::mem::size_of::<usize>() {
                return Err(DerError::BadLength(at));
            }
            let bytes = self.take(n)?;
            if bytes[0] == 0 {
                return Err(DerError::BadLength(at));
            }
            let mut len = 0usize;
            for &b in bytes {
                len = (len << 8) | b as usize;
            }
            if len < 0x80 {
                // Should have used the short form.
                return Err(DerError::BadLength(at));
            }
            len
        };
        Ok((tag, len))
    }

    fn read_expect(&mut self, expected: u8) -> Result<&'a [u8], DerError> {
        let (tag, len) = self.read_header()?;
        if tag != expected {
            return Err(DerError::TagMismatch {
                expected,
                found: tag,
            });
        }
        self.take(len)
    }

    /// Read a `SEQUENCE` and return a sub-reader over its body.
    pub fn read_sequence(&mut self) -> Result<Reader<'a>, DerError> {
        Ok(Reader::new(self.read_expect(TAG_SEQUENCE)?))
    }

    /// Read an `INTEGER` as a signed big integer.
    pub fn read_integer(&mut self) -> Result<BigInt, DerError> {
        let content = self.read_expect(TAG_INTEGER)?;
        if content.is_empty() {
            return Err(DerError::BadInteger);
        }
        Ok(BigInt::from_signed_bytes_be(content))
    }

    /// Read an `INTEGER`, rejecting negative values.
    pub fn read_uint(&mut self) -> Result<BigUint, DerError> {
        let value = self.read_integer()?;
        value.to_biguint().ok_or(DerError::NegativeInteger)
    }

    /// Read an `OCTET STRING` body.
    pub fn read_octet_string(&mut self) -> Result<&'a [u8], DerError> {
        self.read_expect(TAG_OCTET_STRING)
    }

    /// Read a `UTF8String` body.
    pub fn read_utf8_string(&mut self) -> Result<String, DerError> {
        let content = self.read_expect(TAG_UTF8_STRING)?;
        String::from_utf8(content.to_vec()).map_err(|_| DerError::BadUtf8)
    }

    /// Read one whole element (tag, length, and content) verbatim.
    ///
    /// Used to lift embedded PKCS#8 / SubjectPublicKeyInfo documents out of
    /// a composite key without re-encoding them.
    pub fn read_raw(&mut self) -> Result<&'a [u8], DerError> {
        let start = self.pos;
        let (_, len) = self.read_header()?;
        self.take(len)?;
        Ok(&self.buf[start..self.pos])
    }
}

// ============================================================================
// Tests
// ============================================================================
