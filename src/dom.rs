//! The object DOM: a line-oriented attribute/value format with
//! continuation lines (spec.md §4.1, §6).

use crate::errors::ValueError;
use crate::net::{as_net6, Net6, NativeNet};
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Namespace and primary-key knowledge threaded explicitly into every
/// [`Dom`] construction (spec.md §9: replaces the original's mutable class
/// attributes on `FileDOM`).
#[derive(Clone, Debug)]
pub struct ParseContext {
    pub namespace: String,
    pub primary_keys: HashMap<String, String>,
}

impl Default for ParseContext {
    fn default() -> Self {
        ParseContext {
            namespace: "dn42".to_string(),
            primary_keys: HashMap::new(),
        }
    }
}

/// A single attribute value. May span several physical lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Value(pub String);

impl Value {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value split into its physical lines.
    pub fn lines(&self) -> Vec<&str> {
        self.0.split('\n').collect()
    }

    /// The value split on whitespace.
    pub fn fields(&self) -> Vec<&str> {
        self.0.split_whitespace().collect()
    }

    /// Parsed as a network in its own address family.
    pub fn as_net(&self) -> Result<NativeNet, ValueError> {
        NativeNet::parse(&self.0)
    }

    /// Parsed and re-expressed in the unified IPv6 address space.
    pub fn as_net6(&self) -> Result<Net6, ValueError> {
        as_net6(&self.0)
    }

    /// Formatted as a filename component: `/` becomes `_`, spaces are
    /// stripped.
    pub fn as_key(&self) -> String {
        self.0.replace('/', "_").replace(' ', "")
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single attribute row as parsed from the source text.
#[derive(Clone, Debug)]
pub struct Row {
    pub key: String,
    pub value: Value,
    pub lineno: usize,
    pub src: Option<Rc<str>>,
}

impl Row {
    /// Formats a diagnostic location, e.g. `path Line 3 Key [mnt-by]:`.
    pub fn loc(&self) -> String {
        let src = self.src.as_deref().unwrap_or("None");
        let mut s = format!("{} Line {} ", src, self.lineno);
        if !self.key.is_empty() {
            s += &format!("Key [{}]:", self.key);
        }
        s
    }
}

/// A parsed registry object: an ordered sequence of attributes plus the
/// indices the rest of the toolkit needs (spec.md §3 "Object (DOM)").
#[derive(Clone, Debug)]
pub struct Dom {
    pub valid: bool,
    pub rows: Vec<Row>,
    pub keys: HashMap<String, Vec<usize>>,
    pub multi: HashSet<String>,
    pub mntner: Vec<String>,
    pub src: Option<Rc<str>>,
    ctx: ParseContext,
}

impl Dom {
    /// Parses an ordered sequence of lines into a DOM. Per spec.md §4.1,
    /// a leading continuation line with no predecessor marks the DOM
    /// invalid; an object with no attribute lines at all is likewise
    /// invalid (it would have no type).
    pub fn parse<I, S>(lines: I, ctx: ParseContext, src: Option<&str>) -> Dom
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let src_rc: Option<Rc<str>> = src.map(Rc::from);
        let mut rows: Vec<Row> = Vec::new();
        let mut keys: HashMap<String, Vec<usize>> = HashMap::new();
        let mut valid = true;

        for (i, raw) in lines.into_iter().enumerate() {
            let line = raw.as_ref();
            let lineno = i; // 0-indexed, matching the original's `lineno - 1`.

            let is_continuation = line.starts_with(' ') || line.starts_with('\t');
            let is_blank_continuation = line.starts_with('+');

            if is_continuation || is_blank_continuation {
                if rows.is_empty() {
                    valid = false;
                    break;
                }
                let last = rows.last_mut().unwrap();
                if is_continuation {
                    last.value.0 += "\n";
                    last.value.0 += line.trim();
                } else {
                    last.value.0 += "\n";
                }
                continue;
            }

            let mut parts = line.splitn(2, ':');
            let key = match parts.next() {
                Some(k) => k.trim().to_string(),
                None => continue,
            };
            let rest = match parts.next() {
                Some(r) => r,
                None => continue, // no colon: silently dropped.
            };

            rows.push(Row {
                key: key.clone(),
                value: Value(rest.trim().to_string()),
                lineno,
                src: src_rc.clone(),
            });
            keys.entry(key).or_default().push(rows.len() - 1);
        }

        if rows.is_empty() {
            valid = false;
        }

        let mut multi = HashSet::new();
        for row in &rows {
            if row.value.0.contains('\n') {
                multi.insert(row.key.clone());
            }
        }

        let mntner = keys
            .get("mnt-by")
            .into_iter()
            .flatten()
            .map(|&i| rows[i].value.0.clone())
            .collect();

        Dom {
            valid,
            rows,
            keys,
            multi,
            mntner,
            src: src_rc,
            ctx,
        }
    }

    pub fn from_file(path: &std::path::Path, ctx: ParseContext) -> std::io::Result<Dom> {
        let text = std::fs::read_to_string(path)?;
        let src = path.to_string_lossy().into_owned();
        Ok(Dom::parse(text.lines(), ctx, Some(&src)))
    }

    /// The object's type: the first attribute's key.
    pub fn kind(&self) -> Option<&str> {
        self.rows.first().map(|r| r.key.as_str())
    }

    /// The object's canonical name: the primary key's value if the type
    /// has a declared primary key, else the first field of the first
    /// attribute.
    pub fn name(&self) -> String {
        if let Some(kind) = self.kind() {
            if let Some(primary) = self.ctx.primary_keys.get(kind) {
                if let Some(v) = self.get(primary, 0) {
                    return v.as_str().to_string();
                }
            }
        }
        match self.rows.first() {
            Some(row) => row
                .value
                .fields()
                .first()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
            None => "none".to_string(),
        }
    }

    /// `<namespace>.<type>`.
    pub fn rel(&self) -> String {
        format!("{}.{}", self.ctx.namespace, self.kind().unwrap_or(""))
    }

    /// `((rel, name), (src, mntner_csv))` (spec.md §4.1).
    pub fn index(&self) -> ((String, String), (String, String)) {
        (
            (self.rel(), self.name()),
            (
                self.src.as_deref().unwrap_or("").to_string(),
                self.mntner.join(","),
            ),
        )
    }

    pub fn get(&self, key: &str, index: usize) -> Option<&Value> {
        let idxs = self.keys.get(key)?;
        idxs.get(index).map(|&i| &self.rows[i].value)
    }

    pub fn get_or<'a>(&'a self, key: &str, index: usize, default: &'a str) -> &'a str {
        self.get(key, index).map(|v| v.as_str()).unwrap_or(default)
    }

    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Value> + 'a {
        self.keys
            .get(key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i].value)
    }

    /// Replaces the `index`-th occurrence of `key`, or appends a new
    /// attribute if `append` is set or none exists yet.
    pub fn put(&mut self, key: &str, value: &str, index: usize, append: bool) {
        let existing = self.keys.get(key).and_then(|v| v.get(index)).copied();

        match existing {
            Some(i) if !append => {
                self.rows[i].value = Value(value.to_string());
            }
            _ => {
                let new_index = self.rows.len();
                self.rows.push(Row {
                    key: key.to_string(),
                    value: Value(value.to_string()),
                    lineno: new_index,
                    src: self.src.clone(),
                });
                self.keys.entry(key.to_string()).or_default().push(new_index);
            }
        }

        if key == "mnt-by" {
            self.mntner = self
                .keys
                .get("mnt-by")
                .into_iter()
                .flatten()
                .map(|&i| self.rows[i].value.0.clone())
                .collect();
        }
    }

    /// Reproduces the canonical textual form (spec.md §4.1, §6).
    pub fn format(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(|r| r.key.len() + 2)
            .max()
            .unwrap_or(0)
            .max(19);

        let mut out = String::new();
        for row in &self.rows {
            let lines = row.value.lines();
            let pad = width.saturating_sub(row.key.len());
            out += &row.key;
            out.push(':');
            out.push_str(&" ".repeat(pad));
            out.push_str(lines[0]);
            out.push('\n');
            for l in &lines[1..] {
                if l.is_empty() {
                    out.push_str("+\n");
                } else {
                    out.push_str(&" ".repeat(width + 1));
                    out.push_str(l);
                    out.push('\n');
                }
            }
        }
        out
    }
}

impl fmt::Display for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S1: &str = "person:             Xuu\n\
contact:            xmpp:xuu@xmpp.dn42\n\
contact:            mail:xuu@dn42.us\n\
mnt-by:             XUU-MNT\n\
source:             DN42\n";

    #[test]
    fn parse_basic_object() {
        let dom = Dom::parse(S1.lines(), ParseContext::default(), None);
        assert!(dom.valid);
        assert_eq!(dom.kind(), Some("person"));
        assert_eq!(dom.get("contact", 0).unwrap().as_str(), "xmpp:xuu@xmpp.dn42");
        assert_eq!(dom.get("contact", 1).unwrap().as_str(), "mail:xuu@dn42.us");
        assert_eq!(dom.get_or("xxx", 0, "d"), "d");
        assert_eq!(dom.mntner, vec!["XUU-MNT".to_string()]);
    }

    #[test]
    fn round_trip_format() {
        let dom = Dom::parse(S1.lines(), ParseContext::default(), None);
        assert_eq!(dom.format(), S1);
    }

    #[test]
    fn continuation_without_predecessor_is_invalid() {
        let dom = Dom::parse(vec!["  leading continuation"], ParseContext::default(), None);
        assert!(!dom.valid);
    }

    #[test]
    fn blank_continuation_round_trips() {
        let text = "remarks:            first\n+\n                    second\n";
        let dom = Dom::parse(text.lines(), ParseContext::default(), None);
        assert!(dom.valid);
        assert_eq!(dom.get("remarks", 0).unwrap().as_str(), "first\n\nsecond");
        assert_eq!(dom.format(), text);
    }

    #[test]
    fn primary_key_resolves_name() {
        let mut ctx = ParseContext::default();
        ctx.primary_keys.insert("mntner".to_string(), "mntner".to_string());
        let text = "mntner:             XUU-MNT\nmnt-by:             XUU-MNT\n";
        let dom = Dom::parse(text.lines(), ctx, None);
        assert_eq!(dom.name(), "XUU-MNT");
    }
}
