//! Registry-level settings, stored as a `namespace`-typed DOM
//! (spec.md §3 "Config object", §4.6).

use crate::dom::{Dom, ParseContext};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A loaded registry configuration. Properties are derived from the
/// backing DOM on every access, so edits to it (via `put`) are always
/// reflected — there is no separate cached copy to fall out of sync.
#[derive(Clone, Debug)]
pub struct Config {
    pub path: PathBuf,
    pub(crate) dom: Dom,
}

impl Config {
    pub fn namespace(&self) -> &str {
        self.dom.get_or("namespace", 0, "dn42")
    }

    pub fn schema(&self) -> &str {
        self.dom.get_or("schema", 0, "schema")
    }

    pub fn owners(&self) -> &str {
        self.dom.get_or("owner", 0, "mntner")
    }

    pub fn source(&self) -> &str {
        self.dom.get_or("source", 0, "DN42")
    }

    /// `default-owner`, falling back to the config object's own
    /// `mnt-by` when absent.
    pub fn default_owner(&self) -> &str {
        if let Some(v) = self.dom.get("default-owner", 0) {
            return v.as_str();
        }
        self.dom.mntner.first().map(|s| s.as_str()).unwrap_or("")
    }

    /// `network-owner <parent-type> <child-type>` relations, keyed by
    /// child type: `network_owner[child] = parent`.
    pub fn network_owners(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for value in self.dom.get_all("network-owner") {
            let fields = value.fields();
            if fields.len() >= 2 {
                map.insert(fields[1].to_string(), fields[0].to_string());
            }
        }
        map
    }

    /// The set of types that own networks (the values of
    /// [`Config::network_owners`]).
    pub fn network_parents(&self) -> HashSet<String> {
        self.network_owners().into_values().collect()
    }

    /// `primary-key <type> <attr>` relations, keyed by type.
    pub fn primary_keys(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for value in self.dom.get_all("primary-key") {
            let fields = value.fields();
            if fields.len() >= 2 {
                map.insert(fields[0].to_string(), fields[1].to_string());
            }
        }
        map
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.path.join(self.schema())
    }

    pub fn owner_dir(&self) -> PathBuf {
        self.path.join(self.owners())
    }

    pub fn config_file(&self) -> PathBuf {
        self.path.join(".rpsl/config")
    }

    pub fn index_file(&self) -> PathBuf {
        self.path.join(".rpsl/index")
    }

    pub fn links_file(&self) -> PathBuf {
        self.path.join(".rpsl/links")
    }

    pub fn schema_file(&self) -> PathBuf {
        self.path.join(".rpsl/schema")
    }

    pub fn nettree_file(&self) -> PathBuf {
        self.path.join(".rpsl/nettree")
    }

    /// A [`ParseContext`] derived from this config, to thread into every
    /// subsequent DOM parse under this registry.
    pub fn parse_context(&self) -> ParseContext {
        ParseContext {
            namespace: self.namespace().to_string(),
            primary_keys: self.primary_keys(),
        }
    }

    /// Loads `<path>/.rpsl/config`.
    pub fn from_path(path: &Path) -> std::io::Result<Config> {
        let src = path.join(".rpsl/config");
        let dom = Dom::from_file(&src, ParseContext::default())?;
        Ok(Config { path: path.to_path_buf(), dom })
    }

    /// Synthesizes a fresh config object for `rpsl init` (supplements
    /// spec.md, whose CLI surface names `init` without specifying how the
    /// object is built; grounded on `rpsl_init`'s construction sequence).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        path: &Path,
        namespace: &str,
        schema: &str,
        owners: &str,
        default_owner: &str,
        primary_keys: &[(String, String)],
        network_owners: &[(String, String)],
        source: &str,
    ) -> Config {
        let ctx = ParseContext::default();
        let mut dom = Dom::parse(std::iter::empty::<String>(), ctx, None);
        dom.put("namespace", namespace, 0, false);
        dom.put("schema", schema, 0, false);
        dom.put("owner", owners, 0, false);
        dom.put("default-owner", default_owner, 0, false);
        for (parent, child) in primary_keys {
            dom.put("primary-key", &format!("{} {}", parent, child), 0, true);
        }
        for (child, parent) in network_owners {
            dom.put("network-owner", &format!("{} {}", parent, child), 0, true);
        }
        dom.put("mnt-by", default_owner, 0, false);
        dom.put("source", source, 0, false);

        Config { path: path.to_path_buf(), dom }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_owners_map_child_to_parent() {
        let cfg = Config::build(
            Path::new("/tmp/reg"),
            "dn42",
            "schema",
            "mntner",
            "DN42-MNT",
            &[("inetnum".to_string(), "cidr".to_string())],
            &[("route".to_string(), "inetnum".to_string())],
            "DN42",
        );
        let owners = cfg.network_owners();
        assert_eq!(owners.get("route").map(|s| s.as_str()), Some("inetnum"));
        assert!(cfg.network_parents().contains("inetnum"));
    }

    #[test]
    fn default_owner_falls_back_to_mnt_by() {
        let dom = Dom::parse(
            "namespace:          dn42\nmnt-by:             DN42-MNT\n".lines(),
            ParseContext::default(),
            None,
        );
        let cfg = Config { path: PathBuf::from("/tmp/reg"), dom };
        assert_eq!(cfg.default_owner(), "DN42-MNT");
    }
}
