pub mod deserialise;
pub mod serialise;
pub mod wire_types;

pub use deserialise::{ConsumableBuffer, Cursor, ProtocolError};
pub use serialise::{CompressionTable, WritableBuffer};
pub use wire_types::*;

/// Build the header for a response to `request`, per the fixed
/// envelope this resolver always emits: authoritative answer never
/// set, recursion always reported available, no error unless
/// overridden by the caller.
pub fn build_response_header(request: &Header, ancount: u16) -> Header {
    Header {
        id: request.id,
        is_response: true,
        opcode: Opcode::Standard,
        is_authoritative: false,
        is_truncated: false,
        recursion_desired: true,
        recursion_available: true,
        z: false,
        authentic_data: true,
        checking_disabled: false,
        rcode: Rcode::NoError,
        qdcount: request.qdcount,
        ancount,
        nscount: 0,
        arcount: 1,
    }
}

/// The canonical OPT-like pseudo-record every response's additional
/// section carries: zero-length RDATA, advertising no EDNS options.
pub fn build_standard_additional_record(now: std::time::Instant) -> ResourceRecord {
    ResourceRecord {
        name: DomainName::root(),
        rtype: RTYPE_OPT,
        rclass: RCLASS_OPT_UDP_PAYLOAD,
        ttl: 0,
        rdata: RData::Opaque {
            octets: Vec::new(),
        },
        created_at: now,
    }
}

impl Message {
    /// Build a response to `request` carrying `answers`, per §4.4:
    /// the question section is copied from the request, the answer
    /// section is exactly the given records, authority is always
    /// empty, and additional always holds exactly the standard OPT
    /// pseudo-record.
    pub fn build_response(
        request: &Message,
        answers: Vec<ResourceRecord>,
        now: std::time::Instant,
    ) -> Message {
        let header = build_response_header(&request.header, answers.len() as u16);
        Message {
            header,
            questions: request.questions.clone(),
            answers,
            authority: Vec::new(),
            additional: vec![build_standard_additional_record(now)],
        }
    }
}
