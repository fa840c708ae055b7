//! The network containment tree: an ordered hierarchy of allocation
//! blocks and route announcements over the unified IPv6 address space
//! (spec.md §4.4).

use crate::errors::RpslError;
use crate::net::Net6;
use std::collections::HashMap;
use std::net::Ipv6Addr;

/// One network entry: an allocation block (`is_leaf = false`) or a
/// route announcement (`is_leaf = true`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetRecord {
    pub network: Net6,
    pub mnters: Vec<String>,
    pub policy: String,
    pub status: String,
    pub is_leaf: bool,
}

impl NetRecord {
    pub fn object_type(&self) -> &'static str {
        match (self.is_leaf, self.network.is_v4_mapped()) {
            (true, true) => "route",
            (true, false) => "route6",
            (false, true) => "inetnum",
            (false, false) => "inet6num",
        }
    }

    pub fn object_name(&self) -> String {
        self.network.display_with_prefix().replace('/', "_")
    }
}

#[derive(Clone, Debug)]
struct NetNode {
    index: usize,
    parent: Option<usize>,
    level: i32,
    net: Option<NetRecord>,
    children: Vec<Net6>,
    routes: Vec<NetRecord>,
}

/// The tree itself: every allocation block is a node keyed by its own
/// network; routes hang off the deepest containing node's `routes` list.
#[derive(Clone, Debug)]
pub struct NetTree {
    tree: HashMap<Net6, NetNode>,
    by_index: Vec<Net6>,
}

impl NetTree {
    /// Builds a tree from an unordered list of records (spec.md §4.4
    /// "Build"): non-leaf records are placed first (sorted by ascending
    /// prefix length, then ascending exploded address), then routes are
    /// attached to the deepest enclosing non-leaf.
    pub fn build(records: Vec<NetRecord>) -> NetTree {
        let root = Net6::root();
        let mut tree = HashMap::new();
        let mut by_index = Vec::new();
        tree.insert(
            root,
            NetNode {
                index: 0,
                parent: None,
                level: -1,
                net: None,
                children: Vec::new(),
                routes: Vec::new(),
            },
        );
        by_index.push(root);

        let mut non_leaf: Vec<NetRecord> = records.iter().filter(|r| !r.is_leaf).cloned().collect();
        non_leaf.sort_by_key(|r| r.network.sort_key());

        for rec in non_leaf {
            let mut current = root;
            loop {
                let found = tree[&current]
                    .children
                    .iter()
                    .copied()
                    .find(|c| c.supernet_of(&rec.network));
                match found {
                    Some(child) => current = child,
                    None => {
                        let parent_index = tree[&current].index;
                        let level = tree[&current].level + 1;
                        let index = by_index.len();
                        tree.get_mut(&current).unwrap().children.push(rec.network);
                        tree.insert(
                            rec.network,
                            NetNode {
                                index,
                                parent: Some(parent_index),
                                level,
                                net: Some(rec),
                                children: Vec::new(),
                                routes: Vec::new(),
                            },
                        );
                        by_index.push(rec.network);
                        break;
                    }
                }
            }
        }

        let mut leaves: Vec<NetRecord> = records.into_iter().filter(|r| r.is_leaf).collect();
        leaves.sort_by_key(|r| r.network.sort_key());

        for rec in leaves {
            let mut current = root;
            loop {
                let found = tree[&current]
                    .children
                    .iter()
                    .copied()
                    .find(|c| c.supernet_of(&rec.network));
                match found {
                    Some(child) => current = child,
                    None => {
                        tree.get_mut(&current).unwrap().routes.push(rec);
                        break;
                    }
                }
            }
        }

        NetTree { tree, by_index }
    }

    /// The chain of node indices from the root to the deepest node whose
    /// network supernets `query` (spec.md §4.4 "Containment query").
    pub fn containment_path(&self, query: Net6) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = Net6::root();
        loop {
            let node = &self.tree[&current];
            path.push(node.index);
            match node.children.iter().copied().find(|c| c.supernet_of(&query)) {
                Some(child) => current = child,
                None => break,
            }
        }
        path
    }

    /// The routes attached to the deepest node supernetting `query`; the
    /// caller matches one of them against the query for a leaf lookup.
    pub fn routes_at(&self, query: Net6) -> &[NetRecord] {
        let mut current = Net6::root();
        loop {
            let node = &self.tree[&current];
            match node.children.iter().copied().find(|c| c.supernet_of(&query)) {
                Some(child) => current = child,
                None => return &node.routes,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    /// Serializes the tree to the pipe-separated CSV sidecar form
    /// (spec.md §4.4 "Serialization"). Ordered by ascending level, then
    /// ascending index; the synthetic root itself is never emitted.
    pub fn to_csv_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        let mut nodes: Vec<&NetNode> = self.tree.values().filter(|n| n.net.is_some()).collect();
        nodes.sort_by_key(|n| (n.level, n.index));
        for node in &nodes {
            lines.push(record_line(
                &node.index.to_string(),
                node.parent,
                node.level,
                node.net.as_ref().unwrap(),
            ));
        }

        let mut all_nodes: Vec<&NetNode> = self.tree.values().collect();
        all_nodes.sort_by_key(|n| (n.level, n.index));
        for node in all_nodes {
            for route in &node.routes {
                lines.push(record_line("0000", Some(node.index), node.level + 1, route));
            }
        }

        lines
    }

    /// Reconstructs a tree from [`to_csv_lines`] output (spec.md §4.4
    /// "Deserialization").
    pub fn from_csv_lines<'a, I: IntoIterator<Item = &'a str>>(
        lines: I,
    ) -> Result<NetTree, RpslError> {
        let root = Net6::root();
        let mut tree = HashMap::new();
        let mut by_index = Vec::new();
        tree.insert(
            root,
            NetNode {
                index: 0,
                parent: None,
                level: -1,
                net: None,
                children: Vec::new(),
                routes: Vec::new(),
            },
        );
        by_index.push(root);
        let mut index_to_net: HashMap<usize, Net6> = HashMap::new();
        index_to_net.insert(0, root);

        let mut parsed: Vec<Vec<&str>> = lines
            .into_iter()
            .filter(|l| !l.is_empty())
            .map(|l| l.split('|').collect())
            .collect();
        parsed.sort_by_key(|f| {
            let level: i32 = f.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
            let is_route = f.get(0).map(|s| *s == "0000").unwrap_or(false);
            (level, is_route)
        });

        for fields in parsed {
            if fields.len() != 9 {
                return Err(RpslError::MalformedSidecar(fields.join("|")));
            }
            let (idx_s, parent_s, level_s, addr_s, prefix_s, policy, status, object_type, _name) = (
                fields[0], fields[1], fields[2], fields[3], fields[4], fields[5], fields[6],
                fields[7], fields[8],
            );

            let addr: Ipv6Addr = addr_s
                .parse()
                .map_err(|_| RpslError::MalformedSidecar(addr_s.to_string()))?;
            let prefix: u8 = prefix_s
                .parse()
                .map_err(|_| RpslError::MalformedSidecar(prefix_s.to_string()))?;
            let network = Net6::new(addr, prefix);
            let is_leaf = object_type == "route" || object_type == "route6";

            if is_leaf {
                let parent_index: usize = parent_s
                    .parse()
                    .map_err(|_| RpslError::MalformedSidecar(parent_s.to_string()))?;
                let parent_net = *index_to_net
                    .get(&parent_index)
                    .ok_or_else(|| RpslError::MalformedSidecar(parent_s.to_string()))?;
                tree.get_mut(&parent_net).unwrap().routes.push(NetRecord {
                    network,
                    mnters: Vec::new(),
                    policy: policy.to_string(),
                    status: status.to_string(),
                    is_leaf: true,
                });
            } else {
                let index: usize = idx_s
                    .parse()
                    .map_err(|_| RpslError::MalformedSidecar(idx_s.to_string()))?;
                let level: i32 = level_s
                    .parse()
                    .map_err(|_| RpslError::MalformedSidecar(level_s.to_string()))?;
                let parent = if parent_s == "None" {
                    None
                } else {
                    Some(
                        parent_s
                            .parse::<usize>()
                            .map_err(|_| RpslError::MalformedSidecar(parent_s.to_string()))?,
                    )
                };
                if let Some(parent_index) = parent {
                    let parent_net = *index_to_net
                        .get(&parent_index)
                        .ok_or_else(|| RpslError::MalformedSidecar(parent_s.to_string()))?;
                    tree.get_mut(&parent_net).unwrap().children.push(network);
                }
                tree.insert(
                    network,
                    NetNode {
                        index,
                        parent,
                        level,
                        net: Some(NetRecord {
                            network,
                            mnters: Vec::new(),
                            policy: policy.to_string(),
                            status: status.to_string(),
                            is_leaf: false,
                        }),
                        children: Vec::new(),
                        routes: Vec::new(),
                    },
                );
                index_to_net.insert(index, network);
                if by_index.len() <= index {
                    by_index.resize(index + 1, root);
                }
                by_index[index] = network;
            }
        }

        Ok(NetTree { tree, by_index })
    }
}

fn record_line(index: &str, parent: Option<usize>, level: i32, rec: &NetRecord) -> String {
    let parent_s = parent.map(|p| p.to_string()).unwrap_or_else(|| "None".to_string());
    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}",
        index,
        parent_s,
        level,
        rec.network.exploded(),
        rec.network.prefix_len(),
        rec.policy,
        rec.status,
        rec.object_type(),
        rec.object_name(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::as_net6;

    fn rec(net: &str, leaf: bool) -> NetRecord {
        NetRecord {
            network: as_net6(net).unwrap(),
            mnters: vec!["XUU-MNT".to_string()],
            policy: "open".to_string(),
            status: "ASSIGNED".to_string(),
            is_leaf: leaf,
        }
    }

    fn s4_tree() -> NetTree {
        NetTree::build(vec![
            rec("::ffff:0:0/96", false),
            rec("::ffff:ac15:4000/125", false),
            rec("fdea:a15a:77b9::/48", false),
        ])
    }

    #[test]
    fn containment_depths() {
        // S4
        let tree = s4_tree();
        assert_eq!(
            tree.containment_path(as_net6("fdea:a15a:77b9:ffff::/64").unwrap()).len(),
            2
        );
        assert_eq!(
            tree.containment_path(as_net6("fdea:a15a:77ba::/64").unwrap()).len(),
            1
        );
        assert_eq!(
            tree.containment_path(as_net6("::ffff:ac15:4004/126").unwrap()).len(),
            3
        );
        assert_eq!(
            tree.containment_path(as_net6("::ffff:ac15:4008/126").unwrap()).len(),
            2
        );
    }

    #[test]
    fn routes_attach_to_deepest_allocation() {
        let tree = NetTree::build(vec![
            rec("::ffff:0:0/96", false),
            rec("::ffff:ac15:4000/125", false),
            rec("fdea:a15a:77b9::/48", false),
            rec("::ffff:ac15:4004/126", true),
        ]);
        let routes = tree.routes_at(as_net6("::ffff:ac15:4004/126").unwrap());
        assert_eq!(routes.len(), 1);
        assert!(routes[0].is_leaf);
    }

    #[test]
    fn csv_round_trip() {
        let tree = s4_tree();
        let lines = tree.to_csv_lines();
        let back = NetTree::from_csv_lines(lines.iter().map(|s| s.as_str())).unwrap();
        let mut back_lines = back.to_csv_lines();
        let mut orig_lines = lines;
        back_lines.sort();
        orig_lines.sort();
        assert_eq!(back_lines, orig_lines);
    }
}
