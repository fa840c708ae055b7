//! A trimmed DNS message codec: header, question section, and enough of
//! the answer section to decode `NS`/`SOA`/`DNSKEY` records. Grounded on
//! the teacher's `src/dns.rs`/`src/io.rs`/`src/types.rs` conventions
//! (big-endian reads via `byteorder`, qname compression pointers), cut
//! down to what spec.md §4.8 needs: send a question, read back an rcode
//! and the answer section. Authority/additional sections are consumed
//! but not decoded, since the auditor never inspects them.

use crate::resource::Resource;
use crate::types::{Class, Rcode, Type, QR};
use byteorder::{ByteOrder, BE};
use std::io;

const HEADER_LEN: usize = 12;

#[derive(Clone, Debug)]
pub struct Question {
    pub name: String,
    pub qtype: Type,
    pub qclass: Class,
}

#[derive(Clone, Debug)]
pub struct Record {
    pub name: String,
    pub rtype: Type,
    pub rclass: Class,
    pub ttl: u32,
    pub resource: Resource,
}

/// A DNS message, query or response.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: u16,
    pub qr: QR,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub rcode: Rcode,
    pub questions: Vec<Question>,
    pub answers: Vec<Record>,
}

impl Message {
    /// Builds a recursion-desired query for `name`/`qtype`/`IN`, with a
    /// caller-supplied transaction id.
    pub fn query(id: u16, name: &str, qtype: Type) -> Message {
        Message {
            id,
            qr: QR::Query,
            aa: false,
            tc: false,
            rd: true,
            ra: false,
            rcode: Rcode::NoError,
            questions: vec![Question {
                name: name.to_string(),
                qtype,
                qclass: Class::Internet,
            }],
            answers: Vec::new(),
        }
    }

    /// Encodes this message to wire format. Names are never compressed
    /// on the way out: a query has exactly one question, so there is
    /// nothing to gain by compressing it.
    pub fn to_vec(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; HEADER_LEN];
        BE::write_u16(&mut buf[0..2], self.id);

        let mut b = 0u8;
        if self.qr.to_bool() {
            b |= 0b1000_0000;
        }
        if self.aa {
            b |= 0b0000_0100;
        }
        if self.tc {
            b |= 0b0000_0010;
        }
        if self.rd {
            b |= 0b0000_0001;
        }
        buf[2] = b;

        let mut b = 0u8;
        if self.ra {
            b |= 0b1000_0000;
        }
        buf[3] = b;

        BE::write_u16(&mut buf[4..6], self.questions.len() as u16);
        BE::write_u16(&mut buf[6..8], self.answers.len() as u16);
        // NSCOUNT, ARCOUNT left at zero: this auditor never sends records.

        for q in &self.questions {
            write_name(&mut buf, &q.name);
            buf.extend_from_slice(&q.qtype.to_u16().to_be_bytes());
            buf.extend_from_slice(&q.qclass.to_u16().to_be_bytes());
        }

        Ok(buf)
    }

    /// Decodes a response from the wire. Only the answer section is
    /// parsed into [`Resource`]s; authority and additional records are
    /// skipped over (their RDATA lengths are still honoured, so framing
    /// stays correct for whatever follows).
    pub fn from_slice(buf: &[u8]) -> io::Result<Message> {
        let mut r = Reader::new(buf);

        let id = r.read_u16()?;
        let b0 = r.read_u8()?;
        let b1 = r.read_u8()?;

        let qr = QR::from_bool(0b1000_0000 & b0 != 0);
        let aa = (0b0000_0100 & b0) != 0;
        let tc = (0b0000_0010 & b0) != 0;
        let rd = (0b0000_0001 & b0) != 0;
        let ra = (0b1000_0000 & b1) != 0;
        let rcode = Rcode::from_u8(b1);

        let qd_count = r.read_u16()?;
        let an_count = r.read_u16()?;
        let ns_count = r.read_u16()?;
        let ar_count = r.read_u16()?;

        let mut questions = Vec::with_capacity(qd_count as usize);
        for _ in 0..qd_count {
            let name = r.read_name()?;
            let qtype = Type::from_u16(r.read_u16()?);
            let qclass = Class::from_u16(r.read_u16()?);
            questions.push(Question { name, qtype, qclass });
        }

        let answers = read_records(&mut r, an_count)?;
        skip_records(&mut r, ns_count)?;
        skip_records(&mut r, ar_count)?;

        Ok(Message {
            id,
            qr,
            aa,
            tc,
            rd,
            ra,
            rcode,
            questions,
            answers,
        })
    }
}

fn read_records(r: &mut Reader<'_>, count: u16) -> io::Result<Vec<Record>> {
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = r.read_name()?;
        let rtype = Type::from_u16(r.read_u16()?);
        let rclass = Class::from_u16(r.read_u16()?);
        let ttl = r.read_u32()?;
        let rdlength = r.read_u16()?;
        let resource = Resource::parse(r, rtype, rdlength)?;
        out.push(Record {
            name,
            rtype,
            rclass,
            ttl,
            resource,
        });
    }
    Ok(out)
}

fn skip_records(r: &mut Reader<'_>, count: u16) -> io::Result<()> {
    for _ in 0..count {
        r.read_name()?;
        r.read_u16()?; // type
        r.read_u16()?; // class
        r.read_u32()?; // ttl
        let rdlength = r.read_u16()?;
        r.skip(rdlength as usize)?;
    }
    Ok(())
}

/// Appends an uncompressed, length-prefixed-label encoding of `name` to
/// `buf`, terminated by the root label.
fn write_name(buf: &mut Vec<u8>, name: &str) {
    for label in name.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// A cursor over a borrowed response buffer, with qname decompression.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Reader<'a> {
        Reader { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos as u64
    }

    fn require(&self, n: usize) -> io::Result<()> {
        if self.pos + n > self.buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated message"));
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> io::Result<u8> {
        self.require(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn read_u16(&mut self) -> io::Result<u16> {
        self.require(2)?;
        let v = BE::read_u16(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn read_u32(&mut self) -> io::Result<u32> {
        self.require(4)?;
        let v = BE::read_u32(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(v)
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        self.require(n)?;
        let v = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(v)
    }

    pub(crate) fn skip(&mut self, n: usize) -> io::Result<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    /// Reads a length-prefixed-label domain name, following at most one
    /// level of compression pointer (sufficient for the authoritative
    /// answers this auditor reads; a pointer chain longer than that is
    /// treated as malformed).
    pub(crate) fn read_name(&mut self) -> io::Result<String> {
        let mut name = String::new();
        let mut pos = self.pos;
        let mut jumped = false;
        let mut guard = 0;

        loop {
            guard += 1;
            if guard > 128 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "name too long"));
            }

            self.require_at(pos, 1)?;
            let len = self.buf[pos];

            if len == 0 {
                pos += 1;
                break;
            }

            match len & 0xC0 {
                0x00 => {
                    let len = len as usize;
                    self.require_at(pos + 1, len)?;
                    let label = &self.buf[pos + 1..pos + 1 + len];
                    let label = std::str::from_utf8(label)
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-utf8 label"))?;
                    name.push_str(label);
                    name.push('.');
                    pos += 1 + len;
                }
                0xC0 => {
                    self.require_at(pos + 1, 1)?;
                    let ptr = ((len as u16 & 0x3F) << 8 | self.buf[pos + 1] as u16) as usize;
                    if !jumped {
                        self.pos = pos + 2;
                        jumped = true;
                    }
                    pos = ptr;
                }
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "unsupported label compression bits",
                    ));
                }
            }
        }

        if name.is_empty() {
            name.push('.');
        }
        if !jumped {
            self.pos = pos;
        }
        Ok(name)
    }

    fn require_at(&self, pos: usize, n: usize) -> io::Result<()> {
        if pos + n > self.buf.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated message"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_round_trips_header_and_question() {
        let query = Message::query(0x1234, "example.dn42", Type::NS);
        let bytes = query.to_vec().unwrap();

        // id, then QR=0/RD=1 in byte 2, then QDCOUNT=1.
        assert_eq!(BE::read_u16(&bytes[0..2]), 0x1234);
        assert_eq!(bytes[2] & 0b1000_0000, 0);
        assert_eq!(bytes[2] & 0b0000_0001, 1);
        assert_eq!(BE::read_u16(&bytes[4..6]), 1);
    }

    #[test]
    fn decodes_minimal_ns_response() {
        // A hand-built response: one question, one NS answer, name fully
        // compressed back to the question's name.
        let mut buf = vec![0u8; HEADER_LEN];
        BE::write_u16(&mut buf[0..2], 42);
        buf[2] = 0b1000_0001; // QR=1, RD=1
        buf[3] = 0; // RCODE=0
        BE::write_u16(&mut buf[4..6], 1); // QDCOUNT
        BE::write_u16(&mut buf[6..8], 1); // ANCOUNT

        write_name(&mut buf, "example.dn42");
        buf.extend_from_slice(&Type::NS.to_u16().to_be_bytes());
        buf.extend_from_slice(&Class::Internet.to_u16().to_be_bytes());

        // Answer: pointer back to offset 12 (the question's name).
        buf.extend_from_slice(&[0xC0, 0x0C]);
        buf.extend_from_slice(&Type::NS.to_u16().to_be_bytes());
        buf.extend_from_slice(&Class::Internet.to_u16().to_be_bytes());
        buf.extend_from_slice(&300u32.to_be_bytes()); // ttl

        let mut rdata = Vec::new();
        write_name(&mut rdata, "ns1.example.dn42");
        buf.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        buf.extend_from_slice(&rdata);

        let msg = Message::from_slice(&buf).unwrap();
        assert_eq!(msg.rcode, Rcode::NoError);
        assert_eq!(msg.answers.len(), 1);
        match &msg.answers[0].resource {
            Resource::NS { nsdname } => assert_eq!(nsdname, "ns1.example.dn42."),
            other => panic!("expected NS, got {:?}", other),
        }
    }
}
