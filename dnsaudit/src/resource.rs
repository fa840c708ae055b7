//! Decoded RDATA for the record types this auditor cares about. `DNSKEY`
//! has no counterpart in the teacher's `Resource` enum; it is added here
//! in the same style as the teacher's existing `NS`/`SOA` variants.

use crate::wire::Reader;
use crate::types::Type;
use std::io;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    NS {
        nsdname: String,
    },
    SOA {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    DNSKEY {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Vec<u8>,
    },
    /// Anything of a type we don't decode (seen in skipped sections, or
    /// an rtype this auditor doesn't query for).
    Unknown,
}

impl Resource {
    /// Parses `rdlength` bytes of RDATA for `rtype` starting at the
    /// reader's current position, leaving it positioned just past the
    /// record on return.
    pub(crate) fn parse(r: &mut Reader<'_>, rtype: Type, rdlength: u16) -> io::Result<Resource> {
        let start = r.position();
        let resource = match rtype {
            Type::NS => Resource::NS {
                nsdname: r.read_name()?,
            },
            Type::SOA => {
                let mname = r.read_name()?;
                let rname = r.read_name()?;
                Resource::SOA {
                    mname,
                    rname,
                    serial: r.read_u32()?,
                    refresh: r.read_u32()?,
                    retry: r.read_u32()?,
                    expire: r.read_u32()?,
                    minimum: r.read_u32()?,
                }
            }
            Type::DNSKEY => {
                let flags = r.read_u16()?;
                let protocol = r.read_u8()?;
                let algorithm = r.read_u8()?;
                let consumed = r.position() - start;
                let key_len = (rdlength as u64).saturating_sub(consumed) as usize;
                let public_key = r.read_bytes(key_len)?;
                Resource::DNSKEY {
                    flags,
                    protocol,
                    algorithm,
                    public_key,
                }
            }
            Type::Unknown(_) => {
                r.skip(rdlength as usize)?;
                Resource::Unknown
            }
        };

        // RDATA lengths are trusted from the wire; a record whose decoded
        // fields ran short or long of `rdlength` means the rest of the
        // message can't be reliably framed, so resync to the declared end.
        let consumed = r.position() - start;
        if consumed < rdlength as u64 {
            r.skip((rdlength as u64 - consumed) as usize)?;
        }

        Ok(resource)
    }
}
