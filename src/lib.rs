//! rpsl is a schema-driven parser, indexer and WHOIS-style lookup
//! toolkit for an RPSL-like distributed Internet-number registry, in
//! the style DN42 uses to coordinate address space and routing policy
//! across independently-maintained object files.
//!
//! # Usage (low-level library)
//!
//! ```rust
//! use rpsl::dom::{Dom, ParseContext};
//!
//! let text = "person:             Xuu\nmnt-by:             XUU-MNT\nsource:             DN42\n";
//! let dom = Dom::parse(text.lines(), ParseContext::default(), None);
//! assert!(dom.valid);
//! assert_eq!(dom.kind(), Some("person"));
//! assert_eq!(dom.format(), text);
//! ```
//!
//! # Usage (cli)
//!
//! ```shell
//! $ rpsl init --namespace dn42
//! $ rpsl index
//! $ rpsl whois XUU-MNT
//! $ rpsl scan --scan-dir pending/
//! ```
//!
//! # Components
//!
//! - [`dom`]: the line-oriented object format with continuation lines.
//! - [`net`]: the unified IPv6 address space used by the network tree.
//! - [`schema`]: schema compilation and per-object validation.
//! - [`nettree`]: the network containment tree and its CSV sidecar.
//! - [`transact`]: transaction bundles (`.BEGIN`/`.DELETE`/`.END`).
//! - [`config`]: the registry-level settings object.
//! - [`indexer`]: walks a registry directory and emits the sidecars.
//! - [`lookup`]: the WHOIS-style query engine over the sidecars.

pub mod config;
pub mod dom;
pub mod errors;
pub mod indexer;
pub mod lookup;
pub mod net;
pub mod nettree;
pub mod schema;
pub mod transact;
pub mod util;

#[doc(inline)]
pub use crate::dom::{Dom, ParseContext, Row, Value};

#[doc(inline)]
pub use crate::errors::{Result, RpslError};

#[doc(inline)]
pub use crate::lookup::Rpsl;

pub use crate::config::Config;
pub use crate::net::{as_net6, Net6, NativeNet};
pub use crate::nettree::{NetRecord, NetTree};
pub use crate::schema::SchemaDom;
pub use crate::transact::TransactDom;
