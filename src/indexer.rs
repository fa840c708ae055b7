//! Walks a registry directory, classifies every object it finds, and
//! emits the four `.rpsl/` sidecars the lookup engine reads back
//! (spec.md §4.6).

use crate::config::Config;
use crate::dom::{Dom, ParseContext};
use crate::errors::{Result, RpslError};
use crate::nettree::{NetRecord, NetTree};
use crate::schema::SchemaDom;
use crate::transact::TransactDom;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use walkdir::WalkDir;

/// Walks `root`, parsing every regular file that is not under `.rpsl`
/// and not a dotfile into a [`Dom`] (spec.md §4.6 step 1-2).
pub fn index_files(root: &Path, ctx: &ParseContext) -> Vec<Dom> {
    let mut doms = Vec::new();

    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path
            .strip_prefix(root)
            .ok()
            .and_then(|rel| rel.iter().next())
            .map(|first| first == ".rpsl")
            .unwrap_or(false)
        {
            continue;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        match Dom::from_file(path, ctx.clone()) {
            Ok(dom) => {
                if !dom.valid {
                    eprint!("E");
                }
                doms.push(dom);
            }
            Err(e) => {
                log::warn!("{}: {}", path.display(), e);
            }
        }
    }

    doms
}

/// The in-memory result of classifying a set of parsed DOMs (spec.md
/// §4.6 step 3-4).
#[derive(Debug, Default)]
pub struct IndexResult {
    pub lookup: HashSet<(String, String)>,
    pub schemas: HashMap<String, SchemaDom>,
    pub schema_doms: HashMap<String, Dom>,
    pub files: Vec<Dom>,
    pub nets: Vec<NetRecord>,
}

/// Classifies parsed DOMs into the referential lookup set, compiled
/// schemas, network records and the plain file list.
pub fn build_index(doms: Vec<Dom>, config: &Config) -> IndexResult {
    let mut result = IndexResult::default();
    let net_types = config.network_parents();

    for dom in doms {
        if !dom.valid {
            continue;
        }

        let (key, _) = dom.index();
        result.lookup.insert(key);

        let kind = dom.kind().unwrap_or("").to_string();

        if kind == config.schema() {
            let schema = SchemaDom::compile(&dom);
            if let Some(r) = schema.ref_.clone() {
                result.schema_doms.insert(r.clone(), dom.clone());
                result.schemas.insert(r, schema);
            }
        } else if net_types.contains(&kind) {
            if let Some(net6) = dom.get("cidr", 0).and_then(|v| v.as_net6().ok()) {
                result.nets.push(NetRecord {
                    network: net6,
                    mnters: dom.mntner.clone(),
                    policy: dom.get_or("policy", 0, "closed").to_string(),
                    status: dom.get_or("status", 0, "ASSIGNED").to_string(),
                    is_leaf: false,
                });
            }
        }

        result.files.push(dom);
    }

    result
}

/// For every attribute of `dom` that its schema declares a `lookup=` on,
/// yields `(attribute_key, referenced_type, referenced_value)` for each
/// reference that resolves against `lookup`; logs a warning for any
/// declared lookup attribute that resolves to nothing (spec.md §4.6
/// "links").
pub fn generate_links(
    dom: &Dom,
    schema: &SchemaDom,
    lookup: &HashSet<(String, String)>,
) -> Vec<(String, String, String)> {
    let mut out = Vec::new();

    for (key, constraint) in &schema.fields {
        if constraint.lookups().is_empty() {
            continue;
        }
        let value = match dom.get(key, 0) {
            Some(v) => v,
            None => continue,
        };
        let first_field = match value.fields().first() {
            Some(f) => f.to_string(),
            None => continue,
        };

        let mut found = false;
        for refs in constraint.lookups() {
            for r in refs {
                if lookup.contains(&(r.clone(), first_field.clone())) {
                    out.push((key.clone(), r.clone(), first_field.clone()));
                    found = true;
                }
            }
        }
        if !found {
            log::warn!("{} missing link {} {}", dom.name(), key, first_field);
        }
    }

    out
}

/// Writes `index`, `links`, `nettree` and `schema` under `<root>/.rpsl/`
/// (spec.md §4.6 "Outputs").
pub fn write_sidecars(root: &Path, config: &Config, result: &IndexResult) -> Result<()> {
    let sidecar_dir = root.join(".rpsl");
    std::fs::create_dir_all(&sidecar_dir).map_err(|e| RpslError::Io {
        path: sidecar_dir.display().to_string(),
        source: e,
    })?;

    let mut index_out = String::new();
    let mut links_out = String::new();

    for dom in &result.files {
        let schema = match result.schemas.get(&dom.rel()) {
            Some(s) => s,
            None => {
                log::warn!("{} schema not found for {}", dom.src.as_deref().unwrap_or("?"), dom.rel());
                continue;
            }
        };

        let primary = schema
            .primary
            .as_deref()
            .and_then(|k| dom.get(k, 0))
            .map(|v| v.as_str().to_string())
            .unwrap_or_default();
        let relative = dom
            .src
            .as_deref()
            .and_then(|s| Path::new(s).strip_prefix(root).ok())
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| dom.src.as_deref().unwrap_or("").to_string());

        index_out += &format!("{}|{}|{}\n", dom.rel(), primary, relative);

        for (attr, ref_type, ref_value) in generate_links(dom, schema, &result.lookup) {
            links_out += &format!("{}|{}|{}|{}|{}\n", dom.rel(), dom.name(), attr, ref_type, ref_value);
        }
    }

    write_file(&config.index_file(), &index_out)?;
    write_file(&config.links_file(), &links_out)?;

    let tree = NetTree::build(result.nets.clone());
    write_file(&config.nettree_file(), &tree.to_csv_lines().join("\n"))?;

    let mut bundle = TransactDom::default();
    bundle.mntner = Some("DN42-MNT".to_string());
    bundle.files = result.schema_doms.values().cloned().collect();
    write_file(&config.schema_file(), &bundle.format())?;

    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|e| RpslError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_dom(text: &str) -> Dom {
        Dom::parse(text.lines(), ParseContext::default(), None)
    }

    #[test]
    fn classifies_schemas_and_networks() {
        let mut config_dom = Dom::parse(
            "namespace:          dn42\nschema:             schema\nowner:              mntner\n\
network-owner:      inetnum route\nsource:             DN42\n"
                .lines(),
            ParseContext::default(),
            None,
        );
        config_dom.put("mnt-by", "DN42-MNT", 0, false);
        let config = Config {
            path: std::path::PathBuf::from("/tmp/reg"),
            dom: config_dom,
        };

        let schema = schema_dom(
            "schema:             dn42.mntner\nref:                dn42.mntner\n\
key:                mntner primary schema >\n",
        );
        let inetnum = schema_dom(
            "inetnum:            172.20.0.0 - 172.23.255.255\ncidr:               172.20.0.0/14\n\
mnt-by:             DN42-MNT\n",
        );

        let result = build_index(vec![schema, inetnum], &config);
        assert_eq!(result.schemas.len(), 1);
        assert_eq!(result.nets.len(), 1);
        assert_eq!(result.files.len(), 2);
    }

    #[test]
    fn generate_links_reports_resolved_references() {
        let schema = SchemaDom::compile(&schema_dom(
            "schema:             dn42.person\nref:                dn42.person\n\
key:                person primary schema >\nkey:                mnt-by required lookup=dn42.mntner >\n",
        ));
        let dom = schema_dom("person:             Xuu\nmnt-by:             XUU-MNT\n");
        let mut lookup = HashSet::new();
        lookup.insert(("dn42.mntner".to_string(), "XUU-MNT".to_string()));

        let links = generate_links(&dom, &schema, &lookup);
        assert_eq!(links, vec![("mnt-by".to_string(), "dn42.mntner".to_string(), "XUU-MNT".to_string())]);
    }
}
