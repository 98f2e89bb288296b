//! Deserialisation of DNS messages from the network. See the
//! `wire_types` module for details of the format.

use std::time::Instant;

use crate::protocol::wire_types::*;

/// Maximum number of compression-pointer hops to follow while
/// decoding one name. RFC 1035 doesn't specify a bound; a malicious or
/// corrupt datagram can otherwise make the decoder chase a pointer
/// cycle forever.
const MAX_POINTER_HOPS: usize = 10;

impl Message {
    pub fn from_octets(octets: &[u8], now: Instant) -> Result<Self, ProtocolError> {
        Self::deserialise(&ConsumableBuffer::new(octets), now)
    }

    pub fn deserialise(buffer: &ConsumableBuffer, now: Instant) -> Result<Self, ProtocolError> {
        let mut cursor = buffer.cursor();
        let header = Header::deserialise(&mut cursor)?;

        let mut questions = Vec::with_capacity(header.qdcount.into());
        let mut answers = Vec::with_capacity(header.ancount.into());
        let mut authority = Vec::with_capacity(header.nscount.into());
        let mut additional = Vec::with_capacity(header.arcount.into());

        for _ in 0..header.qdcount {
            questions.push(Question::deserialise(header.id, buffer, &mut cursor)?);
        }
        for _ in 0..header.ancount {
            answers.push(ResourceRecord::deserialise(header.id, buffer, &mut cursor, now)?);
        }
        for _ in 0..header.nscount {
            authority.push(ResourceRecord::deserialise(header.id, buffer, &mut cursor, now)?);
        }
        for _ in 0..header.arcount {
            additional.push(ResourceRecord::deserialise(header.id, buffer, &mut cursor, now)?);
        }

        Ok(Self {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }
}

impl Header {
    pub fn deserialise(cursor: &mut Cursor) -> Result<Self, ProtocolError> {
        let id = cursor.next_u16().ok_or(ProtocolError::CompletelyBusted)?;
        let flags1 = cursor.next_u8().ok_or(ProtocolError::HeaderTooShort(id))?;
        let flags2 = cursor.next_u8().ok_or(ProtocolError::HeaderTooShort(id))?;
        let qdcount = cursor.next_u16().ok_or(ProtocolError::HeaderTooShort(id))?;
        let ancount = cursor.next_u16().ok_or(ProtocolError::HeaderTooShort(id))?;
        let nscount = cursor.next_u16().ok_or(ProtocolError::HeaderTooShort(id))?;
        let arcount = cursor.next_u16().ok_or(ProtocolError::HeaderTooShort(id))?;

        Ok(Self {
            id,
            is_response: flags1 & 0b1000_0000 != 0,
            opcode: Opcode::from((flags1 & 0b0111_1000) >> 3),
            is_authoritative: flags1 & 0b0000_0100 != 0,
            is_truncated: flags1 & 0b0000_0010 != 0,
            recursion_desired: flags1 & 0b0000_0001 != 0,
            recursion_available: flags2 & 0b1000_0000 != 0,
            z: flags2 & 0b0100_0000 != 0,
            authentic_data: flags2 & 0b0010_0000 != 0,
            checking_disabled: flags2 & 0b0001_0000 != 0,
            rcode: Rcode::from(flags2 & 0b0000_1111),
            qdcount,
            ancount,
            nscount,
            arcount,
        })
    }
}

impl Question {
    pub fn deserialise(
        id: u16,
        buffer: &ConsumableBuffer,
        cursor: &mut Cursor,
    ) -> Result<Self, ProtocolError> {
        let name = DomainName::deserialise(id, buffer, cursor)?;
        let qtype = cursor.next_u16().ok_or(ProtocolError::QuestionTooShort(id))?;
        let qclass = cursor.next_u16().ok_or(ProtocolError::QuestionTooShort(id))?;

        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }
}

impl ResourceRecord {
    pub fn deserialise(
        id: u16,
        buffer: &ConsumableBuffer,
        cursor: &mut Cursor,
        now: Instant,
    ) -> Result<Self, ProtocolError> {
        let name = DomainName::deserialise(id, buffer, cursor)?;
        let rtype = cursor
            .next_u16()
            .ok_or(ProtocolError::ResourceRecordTooShort(id))?;
        let rclass = cursor
            .next_u16()
            .ok_or(ProtocolError::ResourceRecordTooShort(id))?;
        let ttl = cursor
            .next_u32()
            .ok_or(ProtocolError::ResourceRecordTooShort(id))?;
        let rdlength = cursor
            .next_u16()
            .ok_or(ProtocolError::ResourceRecordTooShort(id))?;

        let rdata = if rtype == RTYPE_A && rclass == RCLASS_IN && rdlength == 4 {
            let octets = cursor
                .take(4)
                .ok_or(ProtocolError::ResourceRecordTooShort(id))?;
            RData::A {
                octets: [octets[0], octets[1], octets[2], octets[3]],
            }
        } else {
            let octets = cursor
                .take(rdlength as usize)
                .ok_or(ProtocolError::ResourceRecordTooShort(id))?;
            RData::Opaque {
                octets: octets.to_vec(),
            }
        };

        Ok(Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
            created_at: now,
        })
    }
}

impl DomainName {
    pub fn deserialise(
        id: u16,
        buffer: &ConsumableBuffer,
        cursor: &mut Cursor,
    ) -> Result<Self, ProtocolError> {
        let mut labels = Vec::<Vec<u8>>::with_capacity(5);
        let mut hops = 0usize;
        let mut active = cursor.clone();
        let mut followed_pointer = false;

        loop {
            let size = active.next_u8().ok_or(ProtocolError::DomainTooShort(id))?;

            if size == 0 {
                break;
            } else if size <= 63 {
                let label = active
                    .take(size as usize)
                    .ok_or(ProtocolError::DomainTooShort(id))?;
                labels.push(label.iter().map(|o| o.to_ascii_lowercase()).collect());
            } else if size & 0b1100_0000 == 0b1100_0000 {
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return Err(ProtocolError::DomainPointerLoop(id));
                }

                let lo = active.next_u8().ok_or(ProtocolError::DomainTooShort(id))?;
                let offset = (u16::from_be_bytes([size & 0b0011_1111, lo])) as usize;

                if !followed_pointer {
                    // the outer cursor resumes right after the pointer,
                    // regardless of how many hops the name takes from here
                    cursor.advance_to(active.position());
                    followed_pointer = true;
                }

                active = buffer.at_offset(offset);
            } else {
                return Err(ProtocolError::DomainLabelInvalid(id));
            }

            if labels.iter().map(|l: &Vec<u8>| l.len() + 1).sum::<usize>() > 255 {
                return Err(ProtocolError::DomainTooLong(id));
            }
        }

        if !followed_pointer {
            cursor.advance_to(active.position());
        }

        Ok(DomainName { labels })
    }
}

/// Errors encountered when parsing a datagram. In all the errors which
/// have a `u16` parameter, that is the ID from the header - so that an
/// error response can (in principle) be matched back to the query
/// that caused it, even though this resolver doesn't currently send
/// one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProtocolError {
    /// The datagram is not even 2 octets long, so it doesn't even
    /// contain a valid ID.
    CompletelyBusted,

    /// The header is missing one or more required fields.
    HeaderTooShort(u16),

    /// A question ends with an incomplete field.
    QuestionTooShort(u16),

    /// A resource record ends with an incomplete field.
    ResourceRecordTooShort(u16),

    /// A domain is incomplete.
    DomainTooShort(u16),

    /// A domain is over 255 octets in size.
    DomainTooLong(u16),

    /// A domain label is longer than 63 octets, but not a pointer.
    DomainLabelInvalid(u16),

    /// A domain's compression pointers chased more than
    /// `MAX_POINTER_HOPS` hops without terminating.
    DomainPointerLoop(u16),
}

impl ProtocolError {
    pub fn id(self) -> Option<u16> {
        match self {
            ProtocolError::CompletelyBusted => None,
            ProtocolError::HeaderTooShort(id)
            | ProtocolError::QuestionTooShort(id)
            | ProtocolError::ResourceRecordTooShort(id)
            | ProtocolError::DomainTooShort(id)
            | ProtocolError::DomainTooLong(id)
            | ProtocolError::DomainLabelInvalid(id)
            | ProtocolError::DomainPointerLoop(id) => Some(id),
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for ProtocolError {}

/// An immutable byte slice that can be read from at arbitrary offsets.
/// Name decompression needs this: it re-opens a second, independent
/// read position into the same underlying datagram without disturbing
/// whatever cursor is currently being advanced through the message.
pub struct ConsumableBuffer<'a> {
    octets: &'a [u8],
}

impl<'a> ConsumableBuffer<'a> {
    pub fn new(octets: &'a [u8]) -> Self {
        Self { octets }
    }

    /// A cursor positioned at the start of this buffer.
    pub fn cursor(&self) -> Cursor<'a> {
        Cursor {
            octets: self.octets,
            position: 0,
        }
    }

    /// A cursor positioned at the given byte offset, for following a
    /// compression pointer.
    pub fn at_offset(&self, position: usize) -> Cursor<'a> {
        Cursor {
            octets: self.octets,
            position,
        }
    }
}

/// A read position into a [`ConsumableBuffer`]. Cheap to clone, so
/// that name decompression can fork a second cursor for chasing a
/// pointer while leaving the original in place.
#[derive(Clone)]
pub struct Cursor<'a> {
    octets: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance_to(&mut self, position: usize) {
        self.position = position;
    }

    pub fn next_u8(&mut self) -> Option<u8> {
        let byte = *self.octets.get(self.position)?;
        self.position += 1;
        Some(byte)
    }

    pub fn next_u16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn next_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn take(&mut self, size: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(size)?;
        if end > self.octets.len() {
            return None;
        }
        let slice = &self.octets[self.position..end];
        self.position = end;
        Some(slice)
    }
}
