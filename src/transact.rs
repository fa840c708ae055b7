//! Transaction bundles: a single text file carrying a maintainer label,
//! a sequence of objects and optional `.DELETE` directives (spec.md
//! §4.5, §6).

use crate::dom::{Dom, ParseContext};

/// A parsed transaction bundle.
#[derive(Clone, Debug, Default)]
pub struct TransactDom {
    pub valid: bool,
    pub mntner: Option<String>,
    pub files: Vec<Dom>,
    pub delete: Vec<(String, String)>,
}

impl TransactDom {
    /// Parses a transaction bundle (spec.md §4.5 "Grammar").
    pub fn parse<I, S>(lines: I, ctx: ParseContext) -> TransactDom
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bundle = TransactDom::default();
        let mut buffer: Vec<String> = Vec::new();

        for raw in lines {
            let line = raw.as_ref();

            if bundle.mntner.is_none() {
                if !line.starts_with(".BEGIN") {
                    continue;
                }
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 2 {
                    continue;
                }
                bundle.mntner = Some(fields[1].to_string());
                continue;
            }

            if line.starts_with('.') {
                if !buffer.is_empty() {
                    let dom = Dom::parse(buffer.drain(..), ctx.clone(), None);
                    if dom.valid {
                        bundle.files.push(dom);
                    }
                }

                if line.starts_with(".DELETE") {
                    let fields: Vec<&str> = line.split_whitespace().collect();
                    if fields.len() > 2 {
                        bundle.delete.push((fields[1].to_string(), fields[2].to_string()));
                    }
                }

                if line.starts_with(".END") {
                    bundle.valid = true;
                    break;
                }

                continue;
            }

            buffer.push(line.to_string());
        }

        bundle
    }

    /// Reproduces the canonical textual form (spec.md §4.5 "Emission").
    /// Unlike the original, deletions and objects are emitted in a fixed,
    /// deterministic order (insertion order) rather than via an unordered
    /// set, so two runs over the same bundle always produce byte-identical
    /// output.
    pub fn format(&self) -> String {
        let mut out = format!(".BEGIN {}\n", self.mntner.as_deref().unwrap_or(""));

        for (kind, name) in &self.delete {
            out += &format!(".DELETE {} {}\n", kind, name);
        }

        for dom in &self.files {
            out += &dom.format();
            out += "...\n";
        }

        out += ".END\n";
        out
    }
}

impl std::fmt::Display for TransactDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = "\
.BEGIN XUU-MNT
.DELETE person XUU-DN42
person:             Xuu
contact:            xmpp:xuu@xmpp.dn42
mnt-by:             XUU-MNT
source:             DN42
...
person:             Bar
mnt-by:             XUU-MNT
source:             DN42
...
mntner:             XUU-MNT
mnt-by:             XUU-MNT
source:             DN42
...
as-set:             AS-XUU
mnt-by:             XUU-MNT
source:             DN42
...
.END
";

    #[test]
    fn parses_transaction_bundle() {
        // S6
        let bundle = TransactDom::parse(BUNDLE.lines(), ParseContext::default());
        assert!(bundle.valid);
        assert_eq!(bundle.mntner.as_deref(), Some("XUU-MNT"));
        assert_eq!(bundle.files.len(), 4);
        assert_eq!(
            bundle.delete,
            vec![("person".to_string(), "XUU-DN42".to_string())]
        );
    }

    #[test]
    fn emission_is_deterministic() {
        let bundle = TransactDom::parse(BUNDLE.lines(), ParseContext::default());
        let a = bundle.format();
        let b = bundle.format();
        assert_eq!(a, b);
        assert!(a.starts_with(".BEGIN XUU-MNT\n.DELETE person XUU-DN42\n"));
        assert!(a.ends_with(".END\n"));
    }

    #[test]
    fn lines_before_begin_are_discarded() {
        let text = "garbage\n.BEGIN M\nfoo:                bar\n.END\n";
        let bundle = TransactDom::parse(text.lines(), ParseContext::default());
        assert!(bundle.valid);
        assert_eq!(bundle.mntner.as_deref(), Some("M"));
        assert_eq!(bundle.files.len(), 1);
    }
}
