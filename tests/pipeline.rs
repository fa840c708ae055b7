//! End-to-end coverage of the indexer -> sidecar -> lookup pipeline: build a
//! small registry on disk, index it, write the sidecars, then reload them
//! through `Rpsl` and confirm both name and network queries see the result.

use rpsl::config::Config;
use rpsl::indexer::{build_index, index_files, write_sidecars};
use rpsl::lookup::Rpsl;
use std::fs;
use std::path::{Path, PathBuf};

fn registry_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rpsl-pipeline-test-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn config_file() -> &'static str {
    "namespace:          dn42\n\
schema:             schema\n\
owner:              mntner\n\
network-owner:      inetnum route\n\
mnt-by:             DN42-MNT\n\
source:             DN42\n"
}

const MNTNER_SCHEMA: &str = "schema:             dn42.mntner\nref:                dn42.mntner\n\
key:                mntner primary schema >\n";

const PERSON_SCHEMA: &str = "schema:             dn42.person\nref:                dn42.person\n\
key:                person primary schema >\nkey:                mnt-by required lookup=dn42.mntner >\n";

const INETNUM_SCHEMA: &str = "schema:             dn42.inetnum\nref:                dn42.inetnum\n\
key:                inetnum primary schema >\nkey:                mnt-by required lookup=dn42.mntner >\n";

#[test]
fn index_then_lookup_resolves_name_and_network() {
    let dir = registry_dir("full");

    write(&dir.join(".rpsl/config"), config_file());
    write(&dir.join("schema/dn42.mntner"), MNTNER_SCHEMA);
    write(&dir.join("schema/dn42.person"), PERSON_SCHEMA);
    write(&dir.join("schema/dn42.inetnum"), INETNUM_SCHEMA);
    write(
        &dir.join("mntner/XUU-MNT"),
        "mntner:             XUU-MNT\nmnt-by:             XUU-MNT\nsource:             DN42\n",
    );
    write(
        &dir.join("person/Xuu"),
        "person:             Xuu\nmnt-by:             XUU-MNT\nsource:             DN42\n",
    );
    write(
        &dir.join("inetnum/172.20.0.0_14"),
        "inetnum:            172.20.0.0 - 172.23.255.255\ncidr:               172.20.0.0/14\n\
mnt-by:             XUU-MNT\nsource:             DN42\n",
    );

    let config = Config::from_path(&dir).expect("config loads");
    let ctx = config.parse_context();

    let doms = index_files(&dir, &ctx);
    assert_eq!(doms.len(), 6, "schema plus object files should all parse");

    let index = build_index(doms, &config);
    assert_eq!(index.nets.len(), 1);
    write_sidecars(&dir, &config, &index).expect("sidecars write");

    let rpsl = Rpsl::load(config).expect("sidecars reload");

    let found = rpsl.find("Xuu", None).expect("name query succeeds");
    let kinds: Vec<&str> = found.iter().filter_map(|d| d.kind()).collect();
    assert!(kinds.contains(&"person"));
    assert!(kinds.contains(&"mntner"), "mnt-by link should resolve the mntner object too");

    let path = rpsl.find_network("172.21.0.0/16").expect("network query succeeds");
    assert_eq!(path.len(), 2, "root plus the single allocation block");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn scan_files_flags_missing_referential_link() {
    let dir = registry_dir("scan");

    write(&dir.join(".rpsl/config"), config_file());
    write(&dir.join("schema/dn42.mntner"), MNTNER_SCHEMA);
    write(&dir.join("schema/dn42.person"), PERSON_SCHEMA);
    write(
        &dir.join("mntner/XUU-MNT"),
        "mntner:             XUU-MNT\nmnt-by:             XUU-MNT\nsource:             DN42\n",
    );
    write(
        &dir.join("person/Xuu"),
        "person:             Xuu\nmnt-by:             XUU-MNT\nsource:             DN42\n",
    );

    let config = Config::from_path(&dir).expect("config loads");
    let ctx = config.parse_context();
    let doms = index_files(&dir, &ctx);
    let index = build_index(doms, &config);
    write_sidecars(&dir, &config, &index).expect("sidecars write");

    let rpsl = Rpsl::load(config).expect("sidecars reload");

    let orphan = rpsl::dom::Dom::parse(
        "person:             Ghost\nmnt-by:             NOBODY-MNT\nsource:             DN42\n".lines(),
        rpsl::dom::ParseContext::default(),
        None,
    );
    let state = rpsl.scan_files(&[orphan]);
    assert!(!state.is_pass(), "mnt-by pointing nowhere should be reported");

    let _ = fs::remove_dir_all(&dir);
}
