//! The record types, class and rcode subset this auditor needs, trimmed
//! from the teacher's `types.rs` to exactly what spec.md §4.8 queries
//! (`NS`, `SOA`, `DNSKEY`) plus the header fields needed to read an rcode.

use std::fmt;

/// Query/Response bit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QR {
    Query,
    Response,
}

impl QR {
    pub fn from_bool(b: bool) -> QR {
        if b {
            QR::Response
        } else {
            QR::Query
        }
    }

    pub fn to_bool(self) -> bool {
        matches!(self, QR::Response)
    }
}

/// Response codes. See [rfc1035].
///
/// [rfc1035]: https://datatracker.ietf.org/doc/html/rfc1035
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Rcode {
    NoError,
    FormErr,
    ServFail,
    NXDomain,
    NotImp,
    Refused,
    Other(u8),
}

impl Rcode {
    pub fn from_u8(v: u8) -> Rcode {
        match v & 0x0F {
            0 => Rcode::NoError,
            1 => Rcode::FormErr,
            2 => Rcode::ServFail,
            3 => Rcode::NXDomain,
            4 => Rcode::NotImp,
            5 => Rcode::Refused,
            other => Rcode::Other(other),
        }
    }
}

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rcode::NoError => write!(f, "NOERROR"),
            Rcode::FormErr => write!(f, "FORMERR"),
            Rcode::ServFail => write!(f, "SERVFAIL"),
            Rcode::NXDomain => write!(f, "NXDOMAIN"),
            Rcode::NotImp => write!(f, "NOTIMP"),
            Rcode::Refused => write!(f, "REFUSED"),
            Rcode::Other(v) => write!(f, "RCODE({})", v),
        }
    }
}

/// The record types spec.md §4.8 queries plus `Unknown` for anything
/// seen in a section this auditor skips over (authority/additional).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Type {
    NS,
    SOA,
    DNSKEY,
    Unknown(u16),
}

impl Type {
    pub fn from_u16(v: u16) -> Type {
        match v {
            2 => Type::NS,
            6 => Type::SOA,
            48 => Type::DNSKEY,
            other => Type::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Type::NS => 2,
            Type::SOA => 6,
            Type::DNSKEY => 48,
            Type::Unknown(v) => v,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::NS => write!(f, "NS"),
            Type::SOA => write!(f, "SOA"),
            Type::DNSKEY => write!(f, "DNSKEY"),
            Type::Unknown(v) => write!(f, "TYPE{}", v),
        }
    }
}

/// Only `IN` is meaningful for this registry's zones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Class {
    Internet,
    Unknown(u16),
}

impl Class {
    pub fn from_u16(v: u16) -> Class {
        match v {
            1 => Class::Internet,
            other => Class::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Class::Internet => 1,
            Class::Unknown(v) => v,
        }
    }
}
