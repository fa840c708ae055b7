//! The schema engine (spec.md §4.3): schemas are themselves DOMs, and
//! describe the allowed attributes of every other object type.

use crate::dom::{Dom, Row, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Severity of a single check-file message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// The accumulated result of validating one DOM against its schema
/// (spec.md §4.3's `State`).
#[derive(Debug, Default)]
pub struct State {
    pass: bool,
    pub msgs: Vec<(Level, Row, String)>,
}

fn synthetic_row(key: &str, src: Option<Rc<str>>) -> Row {
    Row {
        key: key.to_string(),
        value: Value(String::new()),
        lineno: 0,
        src,
    }
}

impl State {
    pub fn new() -> Self {
        State {
            pass: true,
            msgs: Vec::new(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.pass
    }

    pub fn info(&mut self, row: Row, msg: impl Into<String>) {
        self.msgs.push((Level::Info, row, msg.into()));
    }

    pub fn warning(&mut self, row: Row, msg: impl Into<String>) {
        self.msgs.push((Level::Warning, row, msg.into()));
    }

    pub fn error(&mut self, row: Row, msg: impl Into<String>) {
        self.pass = false;
        self.msgs.push((Level::Error, row, msg.into()));
    }

    /// Folds another file's validation result into this one (spec.md §4.7
    /// `scan_files`, which accumulates one [`State`] across a whole batch).
    pub fn merge(&mut self, other: State) {
        if !other.pass {
            self.pass = false;
        }
        self.msgs.extend(other.msgs);
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.pass { "PASS" } else { "FAIL" })
    }
}

/// The constraint tuple declared for one attribute key (spec.md §3
/// "Schema object"): cardinality, multiplicity, role flags, and any
/// `lookup=` declarations, plus the derived `oneline`/`multiline` and
/// `single`/`multiple` flags.
#[derive(Clone, Debug, Default)]
pub struct KeyConstraint {
    flags: HashSet<String>,
    lookups: Vec<Vec<String>>,
}

impl KeyConstraint {
    fn has(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_required(&self) -> bool {
        self.has("required")
    }

    pub fn is_recommend(&self) -> bool {
        self.has("recommend")
    }

    pub fn is_deprecate(&self) -> bool {
        self.has("deprecate")
    }

    pub fn is_primary(&self) -> bool {
        self.has("primary")
    }

    pub fn is_schema_marker(&self) -> bool {
        self.has("schema")
    }

    pub fn is_single(&self) -> bool {
        self.has("single")
    }

    pub fn is_oneline(&self) -> bool {
        self.has("oneline")
    }

    pub fn lookups(&self) -> &[Vec<String>] {
        &self.lookups
    }
}

/// A compiled schema: one [`KeyConstraint`] per declared attribute key.
#[derive(Clone, Debug, Default)]
pub struct SchemaDom {
    pub name: Option<String>,
    pub ref_: Option<String>,
    pub primary: Option<String>,
    /// The key carrying the `schema` role flag, if any.
    pub type_key: Option<String>,
    pub fields: HashMap<String, KeyConstraint>,
}

impl SchemaDom {
    /// Compiles a `schema`-typed DOM into a [`SchemaDom`], applying the
    /// derived invariants of spec.md §3:
    /// - a `primary` key becomes implicitly `single`, `oneline`, `required`;
    /// - absence of `oneline` implies `multiline`;
    /// - absence of `single` implies `multiple`.
    pub fn compile(dom: &Dom) -> SchemaDom {
        let mut schema = SchemaDom::default();
        schema.ref_ = dom.get("ref", 0).map(|v| v.as_str().to_string());
        schema.name = dom.get("schema", 0).map(|v| v.as_str().to_string());

        for value in dom.get_all("key") {
            let mut fields = value.fields().into_iter();
            let key = match fields.next() {
                Some(k) => k.to_string(),
                None => continue,
            };

            let mut flags = HashSet::new();
            let mut lookups = Vec::new();
            for tok in fields {
                if tok == ">" {
                    break;
                }
                if let Some(rest) = tok.strip_prefix("lookup=") {
                    lookups.push(rest.split(',').map(|s| s.to_string()).collect());
                } else {
                    flags.insert(tok.to_string());
                }
            }

            if flags.contains("schema") {
                schema.type_key = Some(key.clone());
            }

            if flags.contains("primary") {
                schema.primary = Some(key.clone());
                flags.insert("oneline".to_string());
                flags.remove("multiline");
                flags.insert("single".to_string());
                flags.remove("multiple");
                flags.insert("required".to_string());
                flags.remove("optional");
                flags.remove("recommend");
                flags.remove("deprecate");
            }

            if !flags.contains("oneline") {
                flags.insert("multiline".to_string());
            }
            if !flags.contains("single") {
                flags.insert("multiple".to_string());
            }

            schema.fields.insert(key, KeyConstraint { flags, lookups });
        }

        schema
    }

    /// Validates `target` against this schema (spec.md §4.3).
    ///
    /// `lookups`, when provided, is the set of `(type, primary_value)`
    /// pairs an object's `lookup=` attribute values are checked against.
    pub fn check_file(&self, target: &Dom, lookups: Option<&HashSet<(String, String)>>) -> State {
        let mut state = State::new();

        if !target.valid {
            state.error(synthetic_row("", target.src.clone()), "file does not parse");
        }

        self.check_structure(&mut state, target);
        self.check_values(&mut state, target, lookups);
        inetnum_check(&mut state, target);

        state
    }

    fn check_structure(&self, state: &mut State, target: &Dom) {
        for (key, constraint) in &self.fields {
            let row = synthetic_row(key, target.src.clone());
            let occurrences = target.keys.get(key);

            if constraint.is_required() && occurrences.is_none() {
                state.error(row.clone(), "not found and is required");
            } else if constraint.is_recommend() && occurrences.is_none() {
                state.info(row.clone(), "not found and is recommended");
            }

            if constraint.is_schema_marker() {
                if target.rel() != self.ref_.as_deref().unwrap_or("") {
                    state.error(row.clone(), "not found and is required as the first line");
                }
            }

            if let Some(idxs) = occurrences {
                if constraint.is_single() && idxs.len() > 1 {
                    state.warning(row.clone(), "first defined here and has repeated keys");
                    for _ in &idxs[1..] {
                        state.error(row.clone(), "repeated, can only appear once");
                    }
                }

                if constraint.is_oneline() && target.multi.contains(key) {
                    for _ in idxs {
                        state.error(row.clone(), "can not have multiple lines");
                    }
                }
            }
        }
    }

    fn check_values(
        &self,
        state: &mut State,
        target: &Dom,
        lookups: Option<&HashSet<(String, String)>>,
    ) {
        for row in &target.rows {
            let as_key = row.value.as_key();
            let src = row.src.as_deref().unwrap_or("None");

            if self.primary.as_deref() == Some(row.key.as_str()) && !src.ends_with(&as_key) {
                state.error(
                    row.clone(),
                    format!("primary [{}] does not match filename [{}].", row.value, src),
                );
            }

            if row.key.starts_with("x-") {
                state.info(row.clone(), "is user defined");
                continue;
            }

            let constraint = match self.fields.get(&row.key) {
                Some(c) => c,
                None => {
                    state.error(row.clone(), "not in schema");
                    continue;
                }
            };

            if constraint.is_deprecate() {
                state.info(row.clone(), "was found and is deprecated");
            }

            if let Some(lookups) = lookups {
                self.check_lookups(state, row, constraint, lookups);
            }
        }
    }

    fn check_lookups(
        &self,
        state: &mut State,
        row: &Row,
        constraint: &KeyConstraint,
        lookups: &HashSet<(String, String)>,
    ) {
        for refs in constraint.lookups() {
            let val = match row.value.fields().first() {
                Some(v) => v.to_string(),
                None => continue,
            };
            let found = refs.iter().any(|r| lookups.contains(&(r.clone(), val.clone())));
            if !found {
                state.error(
                    row.clone(),
                    format!("references object {} in {:?} but does not exist.", val, refs),
                );
            }
        }
    }
}

/// Sanity check for `inetnum`/`inet6num` objects (spec.md §4.3 item 3).
fn inetnum_check(state: &mut State, dom: &Dom) {
    let kind = match dom.kind() {
        Some(k) if k == "inetnum" || k == "inet6num" => k.to_string(),
        _ => return,
    };

    let cidr = match dom.get("cidr", 0).and_then(|v| v.as_net().ok()) {
        Some(c) => c,
        None => return,
    };

    let cidr_range = format!("{}-{}", cidr.network_address(), cidr.broadcast_address());
    let file_range: String = dom
        .get_or(&kind, 0, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if cidr_range != file_range {
        state.error(
            synthetic_row("", dom.src.clone()),
            format!(
                "inetnum range [{}] does not match: [{}]",
                file_range, cidr_range
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ParseContext;

    fn compile(text: &str) -> SchemaDom {
        let dom = Dom::parse(text.lines(), ParseContext::default(), None);
        SchemaDom::compile(&dom)
    }

    #[test]
    fn primary_implies_single_oneline_required() {
        let schema = compile(
            "schema:             dn42.mntner\n\
ref:                dn42.mntner\n\
key:                mntner primary schema >\n\
key:                admin-c optional multiple >\n",
        );
        let mntner = schema.fields.get("mntner").unwrap();
        assert!(mntner.is_single());
        assert!(mntner.is_oneline());
        assert!(mntner.is_required());
        assert!(mntner.is_schema_marker());

        let admin = schema.fields.get("admin-c").unwrap();
        assert!(!admin.is_single());
        assert!(!admin.is_oneline());
    }

    #[test]
    fn inetnum_range_mismatch_is_reported() {
        let schema = compile(
            "schema:             dn42.inetnum\nref:                dn42.inetnum\n\
key:                inetnum primary schema >\nkey:                cidr required >\n",
        );
        let ok = Dom::parse(
            "inetnum:            172.20.0.0 - 172.23.255.255\ncidr:               172.20.0.0/14\n"
                .lines(),
            ParseContext::default(),
            Some("inetnum/172.20.0.0_14"),
        );
        let state = schema.check_file(&ok, None);
        assert!(state.is_pass());

        let bad = Dom::parse(
            "inetnum:            172.20.0.0 - 172.23.255.254\ncidr:               172.20.0.0/14\n"
                .lines(),
            ParseContext::default(),
            Some("inetnum/172.20.0.0_14"),
        );
        let state = schema.check_file(&bad, None);
        assert!(!state.is_pass());
        assert!(state
            .msgs
            .iter()
            .any(|(l, _, m)| *l == Level::Error && m.contains("does not match")));
    }

    #[test]
    fn schema_marker_check_uses_the_dom_s_own_namespace_not_a_hardcoded_one() {
        let schema = compile(
            "schema:             exan.mntner\nref:                exan.mntner\n\
key:                mntner primary schema >\n",
        );

        let exan_ctx = ParseContext {
            namespace: "exan".to_string(),
            primary_keys: HashMap::new(),
        };
        let matching = Dom::parse(
            "mntner:             EXAN-MNT\n".lines(),
            exan_ctx,
            Some("mntner/EXAN-MNT"),
        );
        let state = schema.check_file(&matching, None);
        assert!(
            !state.msgs.iter().any(|(_, _, m)| m.contains("required as the first line")),
            "a non-dn42 namespace should still satisfy its own schema's ref"
        );

        let mismatched = Dom::parse(
            "mntner:             DN42-MNT\n".lines(),
            ParseContext::default(),
            Some("mntner/DN42-MNT"),
        );
        let state = schema.check_file(&mismatched, None);
        assert!(state
            .msgs
            .iter()
            .any(|(l, _, m)| *l == Level::Error && m.contains("required as the first line")));
    }
}
