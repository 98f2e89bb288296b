//! Basic DNS message format, used for both queries and responses.
//!
//! ```text
//!     +---------------------+
//!     |        Header       |
//!     +---------------------+
//!     |       Question      | the question for the name server
//!     +---------------------+
//!     |        Answer       | RRs answering the question
//!     +---------------------+
//!     |      Authority      | RRs pointing toward an authority
//!     +---------------------+
//!     |      Additional     | RRs holding additional information
//!     +---------------------+
//! ```
//!
//! See section 4.1 of RFC 1035. This resolver only ever sends and
//! receives a single question per message, and only understands A/IN
//! records well enough to specialize their RDATA; everything else is
//! carried opaquely.

use std::time::Instant;

/// A DNS message: a header plus the four RR sections.
///
/// `raw_octets` retains the exact bytes a decoded message came from,
/// so that a name's compression pointers (which are offsets into the
/// original datagram) can be followed after the fact.
#[derive(Debug, Clone)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
}

impl std::fmt::Display for Message {
    /// A human-readable one-line summary of a request or response, for
    /// the `debug`-level log dump. Not a wire format.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "id={} {} opcode={:?} rcode={:?} question=[",
            self.header.id,
            if self.header.is_response { "response" } else { "query" },
            self.header.opcode,
            self.header.rcode,
        )?;
        for (i, question) in self.questions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} rtype={} rclass={}",
                question.name.to_text(),
                question.qtype,
                question.qclass
            )?;
        }
        write!(f, "] answers=[")?;
        for (i, answer) in self.answers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} ttl={} {}",
                answer.name.to_text(),
                answer.ttl,
                answer.rdata
            )?;
        }
        write!(f, "]")
    }
}

/// Common header type for all messages.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.1 of RFC 1035.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Header {
    /// A 16 bit identifier assigned by the program that generates any
    /// kind of query. This identifier is copied to the corresponding
    /// reply so the requester can match replies to outstanding queries.
    pub id: u16,

    /// Whether this message is a query (`false`) or a response
    /// (`true`).
    pub is_response: bool,

    /// What sort of query this is. Always `Standard` for messages this
    /// resolver generates, but preserved faithfully on decode.
    pub opcode: Opcode,

    /// Authoritative Answer. Always `false` here: this resolver never
    /// claims to be authoritative for anything.
    pub is_authoritative: bool,

    /// TrunCation. Always `false` here: a 512-byte datagram budget
    /// means truncation isn't handled, only avoided.
    pub is_truncated: bool,

    /// Recursion Desired.
    pub recursion_desired: bool,

    /// Recursion Available.
    pub recursion_available: bool,

    /// The `Z` bit, reserved for future use. Always `false`.
    pub z: bool,

    /// Authentic Data (DNSSEC). Not validated; carried through.
    pub authentic_data: bool,

    /// Checking Disabled (DNSSEC). Not validated; carried through.
    pub checking_disabled: bool,

    /// Response code.
    pub rcode: Rcode,

    /// Number of entries in the question section.
    pub qdcount: u16,

    /// Number of resource records in the answer section.
    pub ancount: u16,

    /// Number of resource records in the authority section.
    pub nscount: u16,

    /// Number of resource records in the additional section.
    pub arcount: u16,
}

/// The question section has a list of questions (in practice, always
/// exactly one for the messages this resolver handles).
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                     QNAME                     /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QTYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     QCLASS                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.2 of RFC 1035.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Question {
    pub name: DomainName,
    pub qtype: u16,
    pub qclass: u16,
}

/// The answer, authority, and additional sections are all the same
/// format: a variable number of resource records.
///
/// ```text
///                                     1  1  1  1  1  1
///       0  1  2  3  4  5  6  7  8  9  0  1  2  3  4  5
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                                               |
///     /                      NAME                     /
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TYPE                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                     CLASS                     |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      TTL                      |
///     |                                               |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                   RDLENGTH                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--|
///     /                     RDATA                     /
///     /                                               /
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// See section 4.1.3 of RFC 1035.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub rtype: u16,
    pub rclass: u16,
    pub ttl: u32,
    pub rdata: RData,

    /// Wall-clock time this record was decoded (or constructed), used
    /// by the cache to compute freshness. Not part of the wire format.
    pub created_at: Instant,
}

impl ResourceRecord {
    /// Whether this record is still usable at time `now`: strictly
    /// before `created_at + ttl` seconds.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.created_at + std::time::Duration::from_secs(self.ttl.into())
    }
}

/// The resource data carried by a record. `A`/`IN` records are
/// specialized to four address octets (and rendered as a dotted
/// quad); every other `(rtype, rclass)` combination is carried as an
/// opaque byte string, since this resolver never needs to interpret
/// it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RData {
    A { octets: [u8; 4] },
    Opaque { octets: Vec<u8> },
}

impl RData {
    pub fn len(&self) -> usize {
        match self {
            RData::A { .. } => 4,
            RData::Opaque { octets } => octets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render an `A` record's address as a dotted quad, e.g.
    /// `"93.184.216.34"`.
    pub fn to_dotted_quad(&self) -> Option<String> {
        match self {
            RData::A { octets: [a, b, c, d] } => Some(format!("{a}.{b}.{c}.{d}")),
            RData::Opaque { .. } => None,
        }
    }
}

impl std::fmt::Display for RData {
    /// Used for the human-readable request/response dump logged at
    /// `debug` level, not the wire format.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_dotted_quad() {
            Some(quad) => write!(f, "{quad}"),
            None if self.is_empty() => write!(f, "<empty>"),
            None => write!(f, "<{} opaque octets>", self.len()),
        }
    }
}

pub const RTYPE_A: u16 = 1;
pub const RCLASS_IN: u16 = 1;
pub const RTYPE_OPT: u16 = 41;
pub const RCLASS_OPT_UDP_PAYLOAD: u16 = 512;

/// What sort of query this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Opcode {
    Standard,
    Inverse,
    Status,
    Reserved(u8),
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Opcode::Standard,
            1 => Opcode::Inverse,
            2 => Opcode::Status,
            other => Opcode::Reserved(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        match value {
            Opcode::Standard => 0,
            Opcode::Inverse => 1,
            Opcode::Status => 2,
            Opcode::Reserved(other) => other,
        }
    }
}

/// What sort of response this is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Rcode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(u8),
}

impl Rcode {
    pub fn is_name_error(self) -> bool {
        self == Rcode::NameError
    }
}

impl From<u8> for Rcode {
    fn from(value: u8) -> Self {
        match value {
            0 => Rcode::NoError,
            1 => Rcode::FormatError,
            2 => Rcode::ServerFailure,
            3 => Rcode::NameError,
            4 => Rcode::NotImplemented,
            5 => Rcode::Refused,
            other => Rcode::Reserved(other),
        }
    }
}

impl From<Rcode> for u8 {
    fn from(value: Rcode) -> Self {
        match value {
            Rcode::NoError => 0,
            Rcode::FormatError => 1,
            Rcode::ServerFailure => 2,
            Rcode::NameError => 3,
            Rcode::NotImplemented => 4,
            Rcode::Refused => 5,
            Rcode::Reserved(other) => other,
        }
    }
}

/// A domain name: an ordered sequence of labels, each 1-63 octets,
/// already lowercased at decode time (this resolver, like the
/// original it's modeled on, does not implement case-insensitive
/// comparison beyond that).
///
/// The root (empty sequence of labels) is a valid `DomainName`; its
/// canonical text form is the sentinel string `"ROOT"`.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct DomainName {
    pub labels: Vec<Vec<u8>>,
}

impl DomainName {
    pub fn root() -> Self {
        DomainName { labels: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// Canonical textual form: `"ROOT"` for the root, otherwise labels
    /// joined with `.`.
    pub fn to_text(&self) -> String {
        if self.is_root() {
            return "ROOT".to_string();
        }
        self.labels
            .iter()
            .map(|label| String::from_utf8_lossy(label).into_owned())
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn from_labels(labels: Vec<Vec<u8>>) -> Option<Self> {
        for label in &labels {
            if label.is_empty() || label.len() > 63 {
                return None;
            }
        }
        Some(DomainName { labels })
    }

    /// Parse a dotted textual name, e.g. `"example.com"` or the root
    /// sentinel `"ROOT"`. Labels are lowercased, matching decode-time
    /// normalization.
    pub fn from_text(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("ROOT") || s.is_empty() {
            return Some(DomainName::root());
        }
        let trimmed = s.strip_suffix('.').unwrap_or(s);
        let mut labels = Vec::new();
        for part in trimmed.split('.') {
            if part.is_empty() || part.len() > 63 || !part.is_ascii() {
                return None;
            }
            labels.push(part.as_bytes().to_ascii_lowercase());
        }
        Some(DomainName { labels })
    }
}
