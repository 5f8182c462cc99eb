//! DNS wire types and encoding.
//!
//! This module holds the pieces of the RFC 1035 message format the stub
//! resolver needs: the 12-byte header with its bit-packed flags, the question
//! tail, the fixed part of a resource record, and the label encoding for domain
//! names. Decoding goes through [`Reader`], a bounds-checked cursor over the
//! received bytes.
//!
//! All multi-byte fields use network byte order (big-endian).
//!
//! # Examples
//!
//! ```rust
//! use dns_dig::dns::{build_query, encode_name};
//!
//! assert_eq!(encode_name("a.b.com").unwrap(), b"\x01a\x01b\x03com\x00");
//!
//! let query = build_query(0x1234, "example.com").unwrap();
//! assert_eq!(&query[..4], &[0x12, 0x34, 0x01, 0x00]);
//! ```

use std::fmt;

use thiserror::Error;

/// Size of the DNS message header in bytes.
pub const HEADER_LEN: usize = 12;

/// Size of the question tail (QTYPE + QCLASS) following the encoded name.
pub const QUESTION_LEN: usize = 4;

/// Size of the fixed part of a resource record when its owner name is a
/// two-byte compression pointer: NAME, TYPE, CLASS, TTL, RDLENGTH.
pub const RECORD_HEADER_LEN: usize = 12;

/// Record type of an IPv4 address record.
pub const TYPE_A: u16 = 1;

/// The Internet class.
pub const CLASS_IN: u16 = 1;

/// Longest label a single length byte can describe.
pub const MAX_LABEL_LEN: usize = u8::MAX as usize;

const QR_BIT: u16 = 1 << 15;
const OPCODE_SHIFT: u16 = 11;
const OPCODE_MASK: u16 = 0x7800;
const AA_BIT: u16 = 1 << 10;
const TC_BIT: u16 = 1 << 9;
const RD_BIT: u16 = 1 << 8;
const RA_BIT: u16 = 1 << 7;
const RCODE_MASK: u16 = 0x000F;

/// The flags word of a DNS header.
///
/// Bit layout, most significant first:
///
/// ```text
///   0  1  2  3  4  5  6  7  8  9 10 11 12 13 14 15
/// +--+-----------+--+--+--+--+--------+-----------+
/// |QR|  Opcode   |AA|TC|RD|RA|   Z    |   Rcode   |
/// +--+-----------+--+--+--+--+--------+-----------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(u16);

impl Flags {
    /// Wraps a raw flags word as read from the wire.
    pub const fn from_bits(bits: u16) -> Self {
        Flags(bits)
    }

    /// Returns the raw flags word.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Packs the individual header fields into a flags word.
    ///
    /// `opcode` and `rcode` are truncated to their four-bit fields; the three
    /// reserved Z bits are always zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dns_dig::dns::Flags;
    ///
    /// let flags = Flags::new(false, 0, false, false, true, false, 0);
    /// assert_eq!(flags.bits(), 0x0100);
    /// assert!(flags.recursion_desired());
    /// ```
    pub const fn new(
        response: bool,
        opcode: u8,
        authoritative: bool,
        truncated: bool,
        recursion_desired: bool,
        recursion_available: bool,
        rcode: u8,
    ) -> Self {
        let mut bits = ((opcode as u16) << OPCODE_SHIFT) & OPCODE_MASK;
        bits |= (rcode as u16) & RCODE_MASK;
        if response {
            bits |= QR_BIT;
        }
        if authoritative {
            bits |= AA_BIT;
        }
        if truncated {
            bits |= TC_BIT;
        }
        if recursion_desired {
            bits |= RD_BIT;
        }
        if recursion_available {
            bits |= RA_BIT;
        }
        Flags(bits)
    }

    /// Flags of a standard recursive query: everything clear except RD.
    pub const fn query() -> Self {
        Self::new(false, 0, false, false, true, false, 0)
    }

    pub const fn is_response(self) -> bool {
        self.0 & QR_BIT != 0
    }

    pub const fn opcode(self) -> u8 {
        ((self.0 & OPCODE_MASK) >> OPCODE_SHIFT) as u8
    }

    pub const fn is_authoritative(self) -> bool {
        self.0 & AA_BIT != 0
    }

    pub const fn is_truncated(self) -> bool {
        self.0 & TC_BIT != 0
    }

    pub const fn recursion_desired(self) -> bool {
        self.0 & RD_BIT != 0
    }

    pub const fn recursion_available(self) -> bool {
        self.0 & RA_BIT != 0
    }

    /// The raw four-bit response code.
    pub const fn rcode(self) -> u8 {
        (self.0 & RCODE_MASK) as u8
    }
}

/// The 4-bit response code (RCODE) carried in the header flags.
///
/// Codes without a named variant are kept as [`ResponseCode::Other`] so the
/// numeric value survives into error reports.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseCode {
    /// RCODE 0, the query succeeded.
    NoError,
    /// RCODE 1, the server could not interpret the query.
    FormatError,
    /// RCODE 2, the server failed internally. Usually temporary.
    ServerFailure,
    /// RCODE 3, the queried name does not exist (NXDOMAIN).
    NameError,
    /// RCODE 4, the server does not support the kind of query.
    NotImplemented,
    /// RCODE 5, the server refused the query for policy reasons.
    Refused,
    /// Any other code.
    Other(u8),
}

impl ResponseCode {
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormatError,
            2 => ResponseCode::ServerFailure,
            3 => ResponseCode::NameError,
            4 => ResponseCode::NotImplemented,
            5 => ResponseCode::Refused,
            other => ResponseCode::Other(other),
        }
    }

    /// The numeric value of the code.
    pub const fn code(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormatError => 1,
            ResponseCode::ServerFailure => 2,
            ResponseCode::NameError => 3,
            ResponseCode::NotImplemented => 4,
            ResponseCode::Refused => 5,
            ResponseCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormatError => "FORMERR",
            ResponseCode::ServerFailure => "SERVFAIL",
            ResponseCode::NameError => "NXDOMAIN",
            ResponseCode::NotImplemented => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::Other(_) => "RCODE",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Represents the 12-byte header of a DNS message.
///
/// # Layout
///
/// - ID (16 bits): identifier matching replies to queries
/// - Flags (16 bits): see [`Flags`]
/// - QDCOUNT, ANCOUNT, NSCOUNT, ARCOUNT (16 bits each): section sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsHeader {
    /// Transaction identifier chosen by the client.
    pub id: u16,
    pub flags: Flags,
    /// Number of entries in the question section.
    pub question_count: u16,
    /// Number of resource records in the answer section.
    pub answer_count: u16,
    /// Number of name server records in the authority section.
    pub authority_count: u16,
    /// Number of records in the additional section.
    pub additional_count: u16,
}

impl DnsHeader {
    /// Header of a recursive query carrying exactly one question.
    pub const fn query(id: u16) -> Self {
        DnsHeader {
            id,
            flags: Flags::query(),
            question_count: 1,
            answer_count: 0,
            authority_count: 0,
            additional_count: 0,
        }
    }

    /// Serializes the header and appends the 12 bytes to `buffer`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dns_dig::dns::DnsHeader;
    ///
    /// let mut buffer = Vec::new();
    /// DnsHeader::query(0x1234).pack(&mut buffer);
    ///
    /// assert_eq!(buffer, [0x12, 0x34, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0]);
    /// ```
    pub fn pack(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.id.to_be_bytes());
        buffer.extend_from_slice(&self.flags.bits().to_be_bytes());
        buffer.extend_from_slice(&self.question_count.to_be_bytes());
        buffer.extend_from_slice(&self.answer_count.to_be_bytes());
        buffer.extend_from_slice(&self.authority_count.to_be_bytes());
        buffer.extend_from_slice(&self.additional_count.to_be_bytes());
    }

    /// Reads a header from the reader, advancing it by exactly 12 bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if fewer than 12 bytes remain.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(DnsHeader {
            id: reader.read_u16()?,
            flags: Flags::from_bits(reader.read_u16()?),
            question_count: reader.read_u16()?,
            answer_count: reader.read_u16()?,
            authority_count: reader.read_u16()?,
            additional_count: reader.read_u16()?,
        })
    }

    pub const fn response_code(&self) -> ResponseCode {
        ResponseCode::from_code(self.flags.rcode())
    }
}

/// The fixed tail of a question entry.
///
/// The owner name precedes it on the wire and is handled separately: queries
/// encode it with [`pack_domain_name`], and the echo in a reply is skipped by
/// length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsQuestion {
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuestion {
    /// An `A`/`IN` question, the only kind this resolver asks.
    pub const fn a_record() -> Self {
        DnsQuestion {
            qtype: TYPE_A,
            qclass: CLASS_IN,
        }
    }

    pub fn pack(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&self.qtype.to_be_bytes());
        buffer.extend_from_slice(&self.qclass.to_be_bytes());
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(DnsQuestion {
            qtype: reader.read_u16()?,
            qclass: reader.read_u16()?,
        })
    }
}

/// The fixed part of a resource record, up to and including RDLENGTH.
///
/// The owner name is taken as a two-byte field. That holds for replies to a
/// single-question query, where servers point back at the question name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Raw owner name field, normally a compression pointer.
    pub name: u16,
    pub rtype: u16,
    pub rclass: u16,
    /// Time-to-live in seconds.
    pub ttl: u32,
    /// Length of the record data that follows.
    pub data_len: u16,
}

impl RecordHeader {
    /// Reads the 12 fixed bytes of a record. The record data is left unread.
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(RecordHeader {
            name: reader.read_u16()?,
            rtype: reader.read_u16()?,
            rclass: reader.read_u16()?,
            ttl: reader.read_u32()?,
            data_len: reader.read_u16()?,
        })
    }
}

/// A read ran past the end of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("needed {needed} bytes at offset {offset} but only {remaining} remain")]
pub struct DecodeError {
    /// Position of the read that failed.
    pub offset: usize,
    /// Bytes the read asked for.
    pub needed: usize,
    /// Bytes that were left.
    pub remaining: usize,
}

/// A bounds-checked cursor over a received message.
///
/// Every read either consumes exactly the bytes it asks for or fails with a
/// [`DecodeError`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, position: 0 }
    }

    /// Offset of the next unread byte.
    pub const fn position(&self) -> usize {
        self.position
    }

    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Consumes `len` bytes and returns them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(DecodeError {
                offset: self.position,
                needed: len,
                remaining: self.remaining(),
            })?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), DecodeError> {
        self.take(len).map(|_| ())
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }
}

/// A domain name that cannot be written in label format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("label {label:?} is {len} bytes long, the limit is 255")]
    LabelTooLong { label: String, len: usize },

    #[error("domain name {name:?} contains an empty label")]
    EmptyLabel { name: String },
}

/// Encodes a domain name into label format and appends it to `buffer`.
///
/// Each dot-separated label is written as a length byte followed by its raw
/// bytes, and the name ends with a zero byte: `www.google.com` becomes
/// `\x03www\x06google\x03com\x00`. A single trailing dot is accepted, and the
/// empty name or `"."` encodes as the root (`\x00`).
///
/// # Errors
///
/// Fails on a label longer than 255 bytes or on an empty label inside the name
/// (`"a..b"`, `".com"`). On error `buffer` is left as it was.
///
/// # Examples
///
/// ```rust
/// use dns_dig::dns::pack_domain_name;
///
/// let mut buffer = Vec::new();
/// pack_domain_name(&mut buffer, "www.example.com").unwrap();
///
/// assert_eq!(buffer[0], 3);
/// assert_eq!(&buffer[1..4], b"www");
/// assert_eq!(buffer[4], 7);
/// assert_eq!(*buffer.last().unwrap(), 0);
/// ```
pub fn pack_domain_name(buffer: &mut Vec<u8>, domain: &str) -> Result<(), EncodeError> {
    let start = buffer.len();
    let result = pack_labels(buffer, domain);
    if result.is_err() {
        buffer.truncate(start);
    }
    result
}

fn pack_labels(buffer: &mut Vec<u8>, domain: &str) -> Result<(), EncodeError> {
    let name = domain.strip_suffix('.').unwrap_or(domain);
    if !name.is_empty() {
        for label in name.split('.') {
            if label.is_empty() {
                return Err(EncodeError::EmptyLabel {
                    name: domain.to_string(),
                });
            }
            let len = u8::try_from(label.len()).map_err(|_| EncodeError::LabelTooLong {
                label: label.to_string(),
                len: label.len(),
            })?;
            buffer.push(len);
            buffer.extend_from_slice(label.as_bytes());
        }
    }
    buffer.push(0);
    Ok(())
}

/// Encodes a domain name into a fresh buffer. See [`pack_domain_name`].
pub fn encode_name(domain: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(domain.len() + 2);
    pack_domain_name(&mut buffer, domain)?;
    Ok(buffer)
}

/// Counts the labels of an uncompressed encoded name.
///
/// Reading stops at the zero terminator; bytes after it are ignored.
pub fn label_count(encoded: &[u8]) -> Result<usize, DecodeError> {
    let mut reader = Reader::new(encoded);
    let mut count = 0;
    loop {
        let len = reader.read_u8()?;
        if len == 0 {
            return Ok(count);
        }
        reader.skip(usize::from(len))?;
        count += 1;
    }
}

/// Builds the wire form of an `A`/`IN` recursive query for `domain`.
///
/// The message is the header (`qdcount = 1`, flags `0x0100`), the encoded
/// name, then QTYPE and QCLASS. The encoded name therefore spans
/// `query.len() - HEADER_LEN - QUESTION_LEN` bytes starting at `HEADER_LEN`.
pub fn build_query(id: u16, domain: &str) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(HEADER_LEN + domain.len() + 2 + QUESTION_LEN);
    DnsHeader::query(id).pack(&mut buffer);
    pack_domain_name(&mut buffer, domain)?;
    DnsQuestion::a_record().pack(&mut buffer);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_pack_domain_name() {
        let mut buffer = Vec::new();
        pack_domain_name(&mut buffer, "www.google.com").unwrap();
        assert_eq!(
            buffer,
            vec![
                3, b'w', b'w', b'w', 6, b'g', b'o', b'o', b'g', b'l', b'e', 3, b'c', b'o', b'm', 0
            ]
        );
    }

    #[test]
    fn test_encode_short_labels() {
        assert_eq!(encode_name("a.b.com").unwrap(), b"\x01a\x01b\x03com\x00");
    }

    #[rstest]
    #[case("com")]
    #[case("a.b.com")]
    #[case("www.example.co.uk")]
    #[case("xn--bcher-kva.example")]
    fn test_label_count_matches_split(#[case] name: &str) {
        let encoded = encode_name(name).unwrap();
        assert_eq!(label_count(&encoded).unwrap(), name.split('.').count());
    }

    #[test]
    fn test_label_of_255_bytes_is_accepted() {
        let label = "x".repeat(MAX_LABEL_LEN);
        let name = format!("{label}.example.com");
        let encoded = encode_name(&name).unwrap();
        assert_eq!(encoded[0], 255);
        assert_eq!(label_count(&encoded).unwrap(), 3);
    }

    #[test]
    fn test_label_over_255_bytes_is_rejected() {
        let label = "x".repeat(MAX_LABEL_LEN + 1);
        let err = encode_name(&format!("{label}.com")).unwrap_err();
        assert!(matches!(err, EncodeError::LabelTooLong { len: 256, .. }));
    }

    #[rstest]
    #[case("a..b")]
    #[case(".com")]
    #[case("..")]
    fn test_empty_label_is_rejected(#[case] name: &str) {
        assert!(matches!(
            encode_name(name),
            Err(EncodeError::EmptyLabel { .. })
        ));
    }

    #[test]
    fn test_failed_pack_leaves_buffer_untouched() {
        let mut buffer = vec![0xAA];
        assert!(pack_domain_name(&mut buffer, "ok.a..b").is_err());
        assert_eq!(buffer, vec![0xAA]);
    }

    #[rstest]
    #[case("example.com.", b"\x07example\x03com\x00".as_slice())]
    #[case("", b"\x00".as_slice())]
    #[case(".", b"\x00".as_slice())]
    fn test_trailing_dot_and_root(#[case] name: &str, #[case] expected: &[u8]) {
        assert_eq!(encode_name(name).unwrap(), expected);
    }

    #[test]
    fn test_label_count_on_truncated_name() {
        let err = label_count(b"\x03co").unwrap_err();
        assert_eq!(
            err,
            DecodeError {
                offset: 1,
                needed: 3,
                remaining: 2,
            }
        );
    }

    #[test]
    fn test_build_query_layout() {
        let query = build_query(0xBEEF, "a.b.com").unwrap();
        let expected: Vec<u8> = [
            &[0xBE, 0xEF, 0x01, 0x00, 0, 1, 0, 0, 0, 0, 0, 0][..],
            &b"\x01a\x01b\x03com\x00"[..],
            &[0, 1, 0, 1][..],
        ]
        .concat();
        assert_eq!(query, expected);
        assert_eq!(query.len() - HEADER_LEN - QUESTION_LEN, 9);
    }

    #[test]
    fn test_query_flags() {
        let flags = Flags::query();
        assert_eq!(flags.bits(), 0x0100);
        assert!(!flags.is_response());
        assert_eq!(flags.opcode(), 0);
        assert!(!flags.is_authoritative());
        assert!(!flags.is_truncated());
        assert!(flags.recursion_desired());
        assert!(!flags.recursion_available());
        assert_eq!(flags.rcode(), 0);
    }

    #[test]
    fn test_flags_field_positions() {
        let flags = Flags::new(true, 2, true, true, false, true, 3);
        assert_eq!(flags.bits(), 0x8000 | (2 << 11) | 0x0400 | 0x0200 | 0x0080 | 3);
        assert!(flags.is_response());
        assert_eq!(flags.opcode(), 2);
        assert!(flags.is_authoritative());
        assert!(flags.is_truncated());
        assert!(!flags.recursion_desired());
        assert!(flags.recursion_available());
        assert_eq!(flags.rcode(), 3);
    }

    #[rstest]
    #[case(0x8180, ResponseCode::NoError)]
    #[case(0x8182, ResponseCode::ServerFailure)]
    #[case(0x8183, ResponseCode::NameError)]
    #[case(0x8185, ResponseCode::Refused)]
    #[case(0x8189, ResponseCode::Other(9))]
    fn test_response_code_from_flags(#[case] bits: u16, #[case] expected: ResponseCode) {
        let mut header = DnsHeader::query(1);
        header.flags = Flags::from_bits(bits);
        assert_eq!(header.response_code(), expected);
        assert_eq!(header.response_code().code(), (bits & 0xF) as u8);
    }

    #[test]
    fn test_response_code_display_keeps_number() {
        assert_eq!(ResponseCode::NameError.to_string(), "NXDOMAIN (3)");
        assert_eq!(ResponseCode::Other(11).to_string(), "RCODE (11)");
    }

    #[test]
    fn test_header_decode() {
        let data = [0x12, 0x34, 0x81, 0x80, 0, 1, 0, 2, 0, 0, 0, 1, 0xFF];
        let mut reader = Reader::new(&data);
        let header = DnsHeader::decode(&mut reader).unwrap();

        assert_eq!(header.id, 0x1234);
        assert!(header.flags.is_response());
        assert!(header.flags.recursion_available());
        assert_eq!(header.question_count, 1);
        assert_eq!(header.answer_count, 2);
        assert_eq!(header.authority_count, 0);
        assert_eq!(header.additional_count, 1);
        assert_eq!(reader.position(), HEADER_LEN);
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_record_header_decode() {
        let data = [0xC0, 0x0C, 0, 1, 0, 1, 0, 0, 0x0E, 0x10, 0, 4, 93, 184, 216, 34];
        let mut reader = Reader::new(&data);
        let record = RecordHeader::decode(&mut reader).unwrap();

        assert_eq!(record.name, 0xC00C);
        assert_eq!(record.rtype, TYPE_A);
        assert_eq!(record.rclass, CLASS_IN);
        assert_eq!(record.ttl, 3600);
        assert_eq!(record.data_len, 4);
        assert_eq!(reader.position(), RECORD_HEADER_LEN);
    }

    #[test]
    fn test_failed_read_keeps_position() {
        let data = [1, 2, 3];
        let mut reader = Reader::new(&data);
        reader.skip(2).unwrap();

        let err = reader.read_u16().unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.needed, 2);
        assert_eq!(err.remaining, 1);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_u8().unwrap(), 3);
    }

    #[test]
    fn test_take_with_overflowing_length() {
        let mut reader = Reader::new(&[0u8; 4]);
        reader.skip(1).unwrap();
        assert!(reader.take(usize::MAX).is_err());
        assert_eq!(reader.remaining(), 3);
    }
}
