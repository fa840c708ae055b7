// Simple client binary: dnsaudit <mntner> [--concurrency N] [--timeout SECS]
//
// Loads the already-indexed registry the same way `rpsl whois` does,
// then drives the live DNS checks over every zone the given maintainer
// is responsible for.

use dnsaudit::audit::audit_maintainer;
use dnsaudit::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT};
use rpsl::config::Config;
use rpsl::indexer::index_files;
use rpsl::util::find_rpsl;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = run(&args);
    process::exit(code);
}

fn run(args: &[String]) -> i32 {
    let mntner = match args.first() {
        Some(m) => m.clone(),
        None => {
            eprintln!("Usage: dnsaudit <mntner> [--concurrency N] [--timeout SECS]");
            return 1;
        }
    };

    let concurrency = flag_value(args, "--concurrency")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CONCURRENCY);
    let timeout = flag_value(args, "--timeout")
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TIMEOUT);

    let root = match resolve_root() {
        Some(r) => r,
        None => {
            eprintln!("RPSL directory not found. do `rpsl init` or set RPSL_DIR");
            return 1;
        }
    };

    let config = match Config::from_path(&root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load config: {}", e);
            return 1;
        }
    };

    let ctx = config.parse_context();
    let doms = index_files(&config.path, &ctx);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {}", e);
            return 1;
        }
    };

    let report = runtime.block_on(audit_maintainer(&doms, &mntner, concurrency, timeout));

    if report.is_empty() {
        eprintln!("no domain/inetnum/inet6num objects found for {}", mntner);
        return 1;
    }

    let mut zones: Vec<&String> = report.keys().collect();
    zones.sort();

    let mut any_failure = false;
    for zone in zones {
        let c = &report[zone];
        let failures = c.dnssec_fail + c.wrong_ns + c.wrong_soa + c.nxdomain + c.refused + c.servfail + c.timeout;
        any_failure |= failures > 0;
        println!(
            "{:<40} success={:<3} dnssec_fail={:<3} wrong_ns={:<3} wrong_soa={:<3} nxdomain={:<3} refused={:<3} servfail={:<3} timeout={:<3}",
            zone, c.success, c.dnssec_fail, c.wrong_ns, c.wrong_soa, c.nxdomain, c.refused, c.servfail, c.timeout
        );
    }

    if any_failure {
        1
    } else {
        0
    }
}

fn resolve_root() -> Option<PathBuf> {
    if let Ok(dir) = env::var("RPSL_DIR") {
        return Some(PathBuf::from(dir));
    }
    find_rpsl(&env::current_dir().ok()?)
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    args.iter().find_map(|a| a.strip_prefix(&prefix))
}
