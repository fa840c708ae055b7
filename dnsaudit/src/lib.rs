//! `dnsaudit` cross-checks a maintainer's declared `nserver` and
//! `ds-rdata` attributes against live authoritative DNS answers
//! (spec.md §4.8), reusing `rpsl`'s indexed registry as its data source.
//!
//! # Components
//!
//! - [`wire`]: the trimmed `NS`/`SOA`/`DNSKEY` message codec.
//! - [`client`]: async UDP-with-TCP-fallback exchange, timeout-wrapped.
//! - [`zone`]: reverse-DNS zone derivation for `inetnum`/`inet6num`.
//! - [`ds`]: DS-digest verification against a live `DNSKEY` answer.
//! - [`audit`]: the bounded worker pool that ties it together.

pub mod audit;
pub mod client;
pub mod ds;
pub mod resource;
pub mod types;
pub mod wire;
pub mod zone;

pub use audit::{audit_maintainer, ZoneCounts, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
