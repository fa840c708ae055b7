//! Drives the live DNS checks described at spec.md §4.8: for every zone a
//! maintainer is responsible for (explicit `domain` objects, plus the
//! reverse zones derived from their `inetnum`/`inet6num` objects), query
//! every declared `nserver` for `NS`, `SOA` and, when a `ds-rdata` is on
//! file, `DNSKEY`, and tally the results.
//!
//! Concurrency (spec.md §5): a `Semaphore`-bounded pool of tasks, one per
//! zone, each independently timing out per query. Counters live on a
//! per-task result struct and are merged after every task has joined, so
//! no shared mutable state crosses a task boundary.

use crate::client::exchange_with_timeout;
use crate::ds::DsRecord;
use crate::resource::Resource;
use crate::types::{Rcode, Type};
use crate::wire::Message;
use crate::zone::reverse_zones;
use rpsl::Dom;
use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const DNS_PORT: u16 = 53;

/// Per-zone tabular counts (spec.md §4.8).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneCounts {
    pub success: u32,
    pub dnssec_fail: u32,
    pub wrong_ns: u32,
    pub wrong_soa: u32,
    pub nxdomain: u32,
    pub refused: u32,
    pub servfail: u32,
    pub timeout: u32,
}

/// One zone this maintainer is responsible for, with its nameservers and
/// any declared DS trust anchors.
#[derive(Clone, Debug)]
struct AuditTarget {
    zone: String,
    nservers: Vec<(String, Option<IpAddr>)>,
    ds_records: Vec<DsRecord>,
}

/// Extracts the audit targets for `mntner` out of the already-indexed
/// DOM set: `domain` objects audit themselves; `inetnum`/`inet6num`
/// objects audit their derived reverse zone(s) (spec.md §6).
///
/// `glue` resolves an `nserver` name with no inline glue address against
/// any other object in the registry that declares one for that name,
/// mirroring `validate-my-dns.py`'s cross-file nserver lookup.
fn targets_for_maintainer(doms: &[Dom], mntner: &str, glue: &HashMap<String, IpAddr>) -> Vec<AuditTarget> {
    let mut out = Vec::new();

    for dom in doms {
        if !dom.mntner.iter().any(|m| m == mntner) {
            continue;
        }

        let zones = match dom.kind() {
            Some("domain") => vec![dom.name()],
            Some("inetnum") | Some("inet6num") => match dom.get("cidr", 0).and_then(|v| v.as_net().ok()) {
                Some(net) => reverse_zones(&net),
                None => continue,
            },
            _ => continue,
        };

        let nservers: Vec<(String, Option<IpAddr>)> = dom
            .get_all("nserver")
            .map(|v| parse_nserver(v.as_str(), glue))
            .collect();

        if nservers.is_empty() {
            continue;
        }

        let ds_records: Vec<DsRecord> = dom.get_all("ds-rdata").filter_map(|v| DsRecord::parse(v.as_str())).collect();

        for zone in zones {
            out.push(AuditTarget {
                zone,
                nservers: nservers.clone(),
                ds_records: ds_records.clone(),
            });
        }
    }

    out
}

fn parse_nserver(value: &str, glue: &HashMap<String, IpAddr>) -> (String, Option<IpAddr>) {
    let mut fields = value.split_whitespace();
    let name = fields.next().unwrap_or(value).to_string();
    let addr = fields
        .next()
        .and_then(|a| a.parse().ok())
        .or_else(|| glue.get(&name).copied());
    (name, addr)
}

/// Scans every `domain`/`inetnum`/`inet6num` DOM in the registry for
/// `nserver` lines that do carry a glue address, regardless of
/// maintainer, so targets whose own object omits the glue can still
/// resolve it from wherever it's actually declared.
pub fn collect_glue(doms: &[Dom]) -> HashMap<String, IpAddr> {
    let mut glue = HashMap::new();
    for dom in doms {
        if !matches!(dom.kind(), Some("domain") | Some("inetnum") | Some("inet6num")) {
            continue;
        }
        for value in dom.get_all("nserver") {
            let mut fields = value.as_str().split_whitespace();
            let name = match fields.next() {
                Some(n) => n.to_string(),
                None => continue,
            };
            if let Some(addr) = fields.next().and_then(|a| a.parse::<IpAddr>().ok()) {
                glue.insert(name, addr);
            }
        }
    }
    glue
}

/// Audits every zone `mntner` is responsible for, bounding concurrency
/// to `concurrency` simultaneous zone workers.
pub async fn audit_maintainer(
    doms: &[Dom],
    mntner: &str,
    concurrency: usize,
    timeout: Duration,
) -> HashMap<String, ZoneCounts> {
    let glue = collect_glue(doms);
    let targets = targets_for_maintainer(doms, mntner, &glue);

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(targets.len());

    for target in targets {
        let permit = Arc::clone(&semaphore);
        tasks.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore closed");
            let zone = target.zone.clone();
            let counts = audit_zone(&target, timeout).await;
            (zone, counts)
        }));
    }

    let mut report: HashMap<String, ZoneCounts> = HashMap::new();
    for task in tasks {
        if let Ok((zone, counts)) = task.await {
            let entry = report.entry(zone).or_default();
            merge(entry, counts);
        }
    }
    report
}

fn merge(into: &mut ZoneCounts, from: ZoneCounts) {
    into.success += from.success;
    into.dnssec_fail += from.dnssec_fail;
    into.wrong_ns += from.wrong_ns;
    into.wrong_soa += from.wrong_soa;
    into.nxdomain += from.nxdomain;
    into.refused += from.refused;
    into.servfail += from.servfail;
    into.timeout += from.timeout;
}

async fn audit_zone(target: &AuditTarget, timeout: Duration) -> ZoneCounts {
    let mut counts = ZoneCounts::default();

    for (name, addr) in &target.nservers {
        let addr = match addr {
            Some(a) => SocketAddr::new(*a, DNS_PORT),
            None => {
                log::warn!("nserver {} has no resolvable glue address, skipping", name);
                continue;
            }
        };

        check_ns(&mut counts, addr, &target.zone, timeout).await;
        check_soa(&mut counts, addr, &target.zone, timeout).await;

        if !target.ds_records.is_empty() {
            check_dnskey(&mut counts, addr, &target.zone, &target.ds_records, timeout).await;
        }
    }

    counts
}

async fn query(server: SocketAddr, zone: &str, qtype: Type, timeout: Duration) -> io::Result<Message> {
    let id = (server.port() as u32 ^ qtype.to_u16() as u32 ^ zone.len() as u32) as u16;
    let msg = Message::query(id, zone, qtype);
    exchange_with_timeout(server, &msg, timeout).await
}

fn tally_rcode_failure(counts: &mut ZoneCounts, rcode: Rcode) {
    match rcode {
        Rcode::NXDomain => counts.nxdomain += 1,
        Rcode::Refused => counts.refused += 1,
        _ => counts.servfail += 1,
    }
}

async fn check_ns(counts: &mut ZoneCounts, server: SocketAddr, zone: &str, timeout: Duration) {
    match query(server, zone, Type::NS, timeout).await {
        Err(e) if e.kind() == io::ErrorKind::TimedOut => counts.timeout += 1,
        Err(_) => counts.refused += 1,
        Ok(msg) => match msg.rcode {
            Rcode::NoError if msg.answers.iter().all(|r| matches!(r.resource, Resource::NS { .. })) => {
                counts.success += 1;
            }
            Rcode::NoError => counts.wrong_ns += 1,
            other => tally_rcode_failure(counts, other),
        },
    }
}

async fn check_soa(counts: &mut ZoneCounts, server: SocketAddr, zone: &str, timeout: Duration) {
    match query(server, zone, Type::SOA, timeout).await {
        Err(e) if e.kind() == io::ErrorKind::TimedOut => counts.timeout += 1,
        Err(_) => counts.refused += 1,
        Ok(msg) => match msg.rcode {
            Rcode::NoError if msg.answers.iter().all(|r| matches!(r.resource, Resource::SOA { .. })) => {
                counts.success += 1;
            }
            Rcode::NoError => counts.wrong_soa += 1,
            other => tally_rcode_failure(counts, other),
        },
    }
}

async fn check_dnskey(
    counts: &mut ZoneCounts,
    server: SocketAddr,
    zone: &str,
    ds_records: &[DsRecord],
    timeout: Duration,
) {
    match query(server, zone, Type::DNSKEY, timeout).await {
        Err(e) if e.kind() == io::ErrorKind::TimedOut => counts.timeout += 1,
        Err(_) => counts.refused += 1,
        Ok(msg) => match msg.rcode {
            Rcode::NoError => {
                let resources: Vec<Resource> = msg.answers.into_iter().map(|r| r.resource).collect();
                let all_verified = ds_records.iter().all(|ds| crate::ds::matches_any(zone, ds, &resources));
                if all_verified {
                    counts.success += 1;
                } else {
                    counts.dnssec_fail += 1;
                }
            }
            other => tally_rcode_failure(counts, other),
        },
    }
}
