//! Computes a DS digest from a `DNSKEY` answer and compares it against a
//! registry `ds-rdata` string, so the auditor can tell a maintainer's
//! declared trust anchor apart from a stale or wrong one. DS computation
//! is [rfc4509]; only digest type 2 (SHA-256) is supported, which is all
//! DN42 registry objects use in practice.
//!
//! [rfc4509]: https://datatracker.ietf.org/doc/html/rfc4509

use crate::resource::Resource;
use sha2::{Digest, Sha256};

/// One parsed `ds-rdata` attribute value: `<keytag> <algorithm> <digest-type> <digest-hex>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsRecord {
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    pub digest: String,
}

impl DsRecord {
    pub fn parse(s: &str) -> Option<DsRecord> {
        let mut fields = s.split_whitespace();
        let key_tag = fields.next()?.parse().ok()?;
        let algorithm = fields.next()?.parse().ok()?;
        let digest_type = fields.next()?.parse().ok()?;
        let digest: String = fields.collect::<Vec<_>>().join("").to_lowercase();
        if digest.is_empty() {
            return None;
        }
        Some(DsRecord {
            key_tag,
            algorithm,
            digest_type,
            digest,
        })
    }
}

/// Computes the key tag for a `DNSKEY` RR, per [rfc4034] appendix B.
///
/// [rfc4034]: https://datatracker.ietf.org/doc/html/rfc4034#appendix-B
pub fn key_tag(flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> u16 {
    let mut rdata = Vec::with_capacity(4 + public_key.len());
    rdata.extend_from_slice(&flags.to_be_bytes());
    rdata.push(protocol);
    rdata.push(algorithm);
    rdata.extend_from_slice(public_key);

    let mut ac: u32 = 0;
    for (i, &b) in rdata.iter().enumerate() {
        if i & 1 == 0 {
            ac += (b as u32) << 8;
        } else {
            ac += b as u32;
        }
    }
    ac += (ac >> 16) & 0xFFFF;
    (ac & 0xFFFF) as u16
}

/// Digests `owner || DNSKEY-RDATA` with SHA-256, returning lowercase hex.
fn digest_sha256(owner: &str, flags: u16, protocol: u8, algorithm: u8, public_key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_name(owner));
    hasher.update(flags.to_be_bytes());
    hasher.update([protocol, algorithm]);
    hasher.update(public_key);

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Lowercases and wire-encodes a name the way digest canonicalization
/// (rfc4034 §6) requires: this auditor only ever hashes the zone apex,
/// so no compression or escaping edge cases apply.
fn canonical_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name.trim_end_matches('.').to_lowercase().split('.') {
        if label.is_empty() {
            continue;
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// Whether any of `answers`' `DNSKEY` records produces a DS digest
/// matching `ds`.
pub fn matches_any(zone: &str, ds: &DsRecord, answers: &[Resource]) -> bool {
    if ds.digest_type != 2 {
        // Only SHA-256 DS digests are verified; anything else is treated
        // as unverifiable rather than a hard failure.
        return true;
    }

    answers.iter().any(|r| match r {
        Resource::DNSKEY {
            flags,
            protocol,
            algorithm,
            public_key,
        } => {
            *algorithm == ds.algorithm
                && key_tag(*flags, *protocol, *algorithm, public_key) == ds.key_tag
                && digest_sha256(zone, *flags, *protocol, *algorithm, public_key) == ds.digest
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ds_rdata_line() {
        let ds = DsRecord::parse("12345 8 2 abcdef0123456789").unwrap();
        assert_eq!(ds.key_tag, 12345);
        assert_eq!(ds.algorithm, 8);
        assert_eq!(ds.digest_type, 2);
        assert_eq!(ds.digest, "abcdef0123456789");
    }

    #[test]
    fn mismatched_digest_does_not_match() {
        let ds = DsRecord::parse("1 8 2 ffffffffffffffff").unwrap();
        let answers = vec![Resource::DNSKEY {
            flags: 257,
            protocol: 3,
            algorithm: 8,
            public_key: vec![1, 2, 3, 4],
        }];
        assert!(!matches_any("example.dn42", &ds, &answers));
    }

    #[test]
    fn unsupported_digest_type_is_not_a_hard_failure() {
        let ds = DsRecord::parse("1 8 1 aaaa").unwrap();
        assert!(matches_any("example.dn42", &ds, &[]));
    }
}
