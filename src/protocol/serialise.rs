//! Serialisation of DNS messages to the wire format. See the
//! `wire_types` module for details of the format.

use std::collections::HashMap;

use crate::protocol::wire_types::*;

/// Two top bits set on a label length byte mark it as a compression
/// pointer rather than a literal label.
const POINTER_TAG: u8 = 0b1100_0000;

/// Largest offset a compression pointer can address (14 bits).
const MAX_POINTER_OFFSET: usize = 0x3FFF;

impl Message {
    pub fn to_octets(&self) -> Vec<u8> {
        let mut buffer = WritableBuffer::default();
        self.serialise(&mut buffer);
        buffer.octets
    }

    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        let header = Header {
            qdcount: self.questions.len() as u16,
            ancount: self.answers.len() as u16,
            nscount: self.authority.len() as u16,
            arcount: self.additional.len() as u16,
            ..self.header
        };
        header.serialise(buffer);

        let mut table = CompressionTable::default();
        for question in &self.questions {
            question.serialise(buffer, &mut table);
        }
        for rr in self
            .answers
            .iter()
            .chain(&self.authority)
            .chain(&self.additional)
        {
            rr.serialise(buffer, &mut table);
        }
    }
}

impl Header {
    pub fn serialise(&self, buffer: &mut WritableBuffer) {
        let flags1 = (if self.is_response { 0b1000_0000 } else { 0 })
            | (0b0111_1000 & (u8::from(self.opcode) << 3))
            | (if self.is_authoritative { 0b0000_0100 } else { 0 })
            | (if self.is_truncated { 0b0000_0010 } else { 0 })
            | (if self.recursion_desired { 0b0000_0001 } else { 0 });
        let flags2 = (if self.recursion_available {
            0b1000_0000
        } else {
            0
        }) | (if self.z { 0b0100_0000 } else { 0 })
            | (if self.authentic_data { 0b0010_0000 } else { 0 })
            | (if self.checking_disabled {
                0b0001_0000
            } else {
                0
            })
            | (0b0000_1111 & u8::from(self.rcode));

        buffer.write_u16(self.id);
        buffer.write_u8(flags1);
        buffer.write_u8(flags2);
        buffer.write_u16(self.qdcount);
        buffer.write_u16(self.ancount);
        buffer.write_u16(self.nscount);
        buffer.write_u16(self.arcount);
    }
}

impl Question {
    pub fn serialise(&self, buffer: &mut WritableBuffer, table: &mut CompressionTable) {
        self.name.serialise(buffer, table);
        buffer.write_u16(self.qtype);
        buffer.write_u16(self.qclass);
    }
}

impl ResourceRecord {
    pub fn serialise(&self, buffer: &mut WritableBuffer, table: &mut CompressionTable) {
        self.name.serialise(buffer, table);
        buffer.write_u16(self.rtype);
        buffer.write_u16(self.rclass);
        buffer.write_u32(self.ttl);

        match &self.rdata {
            RData::A { octets } => {
                buffer.write_u16(4);
                buffer.write_octets(octets);
            }
            RData::Opaque { octets } => {
                buffer.write_u16(octets.len() as u16);
                buffer.write_octets(octets);
            }
        }
    }
}

impl DomainName {
    /// Encode this name, compressing against every suffix of every
    /// name already written earlier in the same message.
    ///
    /// `table` maps a name (meaning: "this exact remaining label
    /// sequence") to the output offset it was first written at. Each
    /// recursive step either finds its full remaining tail already in
    /// the table (and emits a 2-byte pointer to it) or records its own
    /// offset before emitting its first label and recursing on the
    /// rest - so every suffix becomes a future pointer target.
    pub fn serialise(&self, buffer: &mut WritableBuffer, table: &mut CompressionTable) {
        if self.is_root() {
            buffer.write_u8(0);
            return;
        }

        if let Some(&offset) = table.get(self) {
            buffer.write_u16(((POINTER_TAG as u16) << 8) | offset);
            return;
        }

        let offset = buffer.octets.len();
        if offset <= MAX_POINTER_OFFSET {
            table.insert(self.clone(), offset as u16);
        }

        let (first, rest) = self.labels.split_first().expect("non-root name");
        buffer.write_u8(first.len() as u8);
        buffer.write_octets(first);

        let tail = DomainName {
            labels: rest.to_vec(),
        };
        tail.serialise(buffer, table);
    }
}

/// Maps a name's remaining label sequence to the byte offset in the
/// output where it was first written, so later names sharing a suffix
/// can point at it instead of repeating it. Scoped to a single
/// message: must be discarded between messages, never shared
/// globally, or else a pointer could end up referencing a previous
/// datagram's bytes.
pub type CompressionTable = HashMap<DomainName, u16>;

/// A buffer that DNS wire values are appended to.
#[derive(Debug, Default)]
pub struct WritableBuffer {
    pub octets: Vec<u8>,
}

impl WritableBuffer {
    pub fn write_u8(&mut self, value: u8) {
        self.octets.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.octets.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_octets(&mut self, octets: &[u8]) {
        self.octets.extend_from_slice(octets);
    }
}
