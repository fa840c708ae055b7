//! The WHOIS-style lookup/query engine: resolves names and networks to
//! object sets, loaded from the four `.rpsl` sidecars (spec.md §4.7).

use crate::config::Config;
use crate::dom::{Dom, Row, Value};
use crate::errors::{Result, RpslError};
use crate::net::as_net6;
use crate::nettree::{NetRecord, NetTree};
use crate::schema::{SchemaDom, State};
use crate::transact::TransactDom;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A loaded, query-ready view of a registry.
pub struct Rpsl {
    config: Config,
    files: HashMap<(String, String), String>,
    lookup: HashMap<String, Vec<(String, String)>>,
    /// Entries added via [`Rpsl::append_index`]: a scoped overlay
    /// consulted only by [`Rpsl::scan_files`], never by [`Rpsl::find`]
    /// and never written back to the persisted index (spec.md §9
    /// "Scanner's `append_index` mode").
    overlay: HashSet<(String, String)>,
    links: HashMap<(String, String), Vec<(String, String, String)>>,
    nettree: NetTree,
    schemas: HashMap<String, SchemaDom>,
}

impl Rpsl {
    /// Reads `index`, `links`, `nettree` and `schema` under
    /// `config.path/.rpsl/` and builds an in-memory query engine.
    pub fn load(config: Config) -> Result<Rpsl> {
        let mut files = HashMap::new();
        let mut lookup: HashMap<String, Vec<(String, String)>> = HashMap::new();

        for line in read_file(&config.index_file())?.lines() {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() != 3 {
                continue;
            }
            let key = (fields[0].to_string(), fields[1].to_string());
            files.insert(key.clone(), fields[2].to_string());
            lookup.entry(fields[1].to_string()).or_default().push(key);
        }

        let mut links: HashMap<(String, String), Vec<(String, String, String)>> = HashMap::new();
        for line in read_file(&config.links_file())?.lines() {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() != 5 {
                continue;
            }
            let key = (fields[0].to_string(), fields[1].to_string());
            links
                .entry(key)
                .or_default()
                .push((fields[2].to_string(), fields[3].to_string(), fields[4].to_string()));
        }

        let nettree_text = read_file(&config.nettree_file())?;
        let nettree = NetTree::from_csv_lines(nettree_text.lines())?;

        let schema_text = read_file(&config.schema_file())?;
        let bundle = TransactDom::parse(schema_text.lines(), config.parse_context());
        let mut schemas = HashMap::new();
        for dom in &bundle.files {
            let schema = SchemaDom::compile(dom);
            if let Some(r) = schema.ref_.clone() {
                schemas.insert(r, schema);
            }
        }

        Ok(Rpsl {
            config,
            files,
            lookup,
            overlay: HashSet::new(),
            links,
            nettree,
            schemas,
        })
    }

    /// Adds `dom`'s `(rel, name)` pair to the scoped overlay consulted by
    /// [`Rpsl::scan_files`]. Does not touch the persisted index.
    pub fn append_index(&mut self, dom: &Dom) {
        let (key, _) = dom.index();
        self.overlay.insert(key);
    }

    /// Name query (spec.md §4.7 "Name query"): resolves `text` (optionally
    /// scoped to `schema`) to its DOM plus every DOM its outbound links
    /// point to.
    pub fn find(&self, text: &str, schema: Option<&str>) -> Result<Vec<Dom>> {
        let keys: Vec<(String, String)> = match schema {
            Some(s) => vec![(s.to_string(), text.to_string())],
            None => self.lookup.get(text).cloned().unwrap_or_default(),
        };

        let mut out = Vec::new();
        let mut related: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<(String, String)> = keys.iter().cloned().collect();

        for key in &keys {
            out.push(self.load_file_for_key(key)?);
            for (_, ref_type, ref_value) in self.links.get(key).into_iter().flatten() {
                let target = (ref_type.clone(), ref_value.clone());
                if seen.insert(target.clone()) {
                    related.push(target);
                }
            }
        }

        for key in related {
            out.push(self.load_file_for_key(&key)?);
        }

        Ok(out)
    }

    fn load_file_for_key(&self, key: &(String, String)) -> Result<Dom> {
        let relpath = self
            .files
            .get(key)
            .ok_or_else(|| RpslError::NotFound(format!("{}/{}", key.0, key.1)))?;
        self.load_file(relpath)
    }

    /// Resolves a relative path under the registry root into a DOM,
    /// with this registry's namespace and primary-key map applied.
    pub fn load_file(&self, relpath: &str) -> Result<Dom> {
        let path = self.config.path.join(relpath);
        Dom::from_file(&path, self.config.parse_context()).map_err(|e| RpslError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Network query (spec.md §4.7 "Network query"): the chain of tree
    /// node indices from the root to the deepest node supernetting
    /// `text`.
    pub fn find_network(&self, text: &str) -> Result<Vec<usize>> {
        let net = as_net6(text)?;
        Ok(self.nettree.containment_path(net))
    }

    /// The leaf routes attached to the deepest allocation block
    /// supernetting `text`, for matching a specific route announcement.
    pub fn routes_at(&self, text: &str) -> Result<&[NetRecord]> {
        let net = as_net6(text)?;
        Ok(self.nettree.routes_at(net))
    }

    /// Validates a batch of DOMs against their compiled schemas,
    /// accumulating one [`State`] across the whole batch (spec.md §4.7,
    /// the `--add-index` scan path).
    pub fn scan_files(&self, files: &[Dom]) -> State {
        let mut lookups: HashSet<(String, String)> = self.files.keys().cloned().collect();
        lookups.extend(self.overlay.iter().cloned());

        let mut state = State::new();
        for dom in files {
            match self.schemas.get(&dom.rel()) {
                Some(schema) => state.merge(schema.check_file(dom, Some(&lookups))),
                None => state.warning(
                    Row {
                        key: String::new(),
                        value: Value(String::new()),
                        lineno: 0,
                        src: dom.src.clone(),
                    },
                    format!("schema not found for {}", dom.rel()),
                ),
            }
        }
        state
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| RpslError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ParseContext;

    fn config_with_dom(path: &Path) -> Config {
        let dom = Dom::parse(
            "namespace:          dn42\nschema:             schema\nowner:              mntner\n\
mnt-by:             DN42-MNT\nsource:             DN42\n"
                .lines(),
            ParseContext::default(),
            None,
        );
        Config { path: path.to_path_buf(), dom }
    }

    fn write(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn find_resolves_name_and_links() {
        let dir = std::env::temp_dir().join(format!("rpsl-lookup-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = config_with_dom(&dir);

        write(
            &config.index_file(),
            "dn42.person|Xuu|person/Xuu\ndn42.mntner|XUU-MNT|mntner/XUU-MNT\n",
        );
        write(
            &config.links_file(),
            "dn42.person|Xuu|mnt-by|dn42.mntner|XUU-MNT\n",
        );
        write(&config.nettree_file(), "");
        write(&config.schema_file(), ".BEGIN DN42-MNT\n.END\n");
        write(&dir.join("person/Xuu"), "person:             Xuu\nmnt-by:             XUU-MNT\n");
        write(&dir.join("mntner/XUU-MNT"), "mntner:             XUU-MNT\nmnt-by:             XUU-MNT\n");

        let rpsl = Rpsl::load(config).unwrap();
        let found = rpsl.find("Xuu", None).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind(), Some("person"));
        assert_eq!(found[1].kind(), Some("mntner"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
