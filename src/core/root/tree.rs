//! Unified listing across mounts.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::{join_alias, RootStore};
use crate::core::context::Context;
use crate::error::Result;

/// Options for [`RootStore::list`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only names at or below this path.
    pub prefix: String,
    /// Return folder paths instead of secrets.
    pub folders: bool,
    /// Collapse entries deeper than this many segments into their folder.
    pub depth: Option<usize>,
}

/// Secret names of every mount as one tree. Mount points are labeled with
/// the path of their store.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    root: Node,
}

#[derive(Debug, Default, Clone)]
struct Node {
    children: BTreeMap<String, Node>,
    leaf: bool,
    mount: Option<String>,
}

impl Node {
    fn is_folder(&self) -> bool {
        !self.children.is_empty() || self.mount.is_some()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret by its full name.
    pub fn insert(&mut self, name: &str) {
        let node = self.node_mut(name);
        node.leaf = true;
    }

    /// Mark `alias` as a mount point with a display label.
    pub fn insert_mount(&mut self, alias: &str, label: &str) {
        let node = self.node_mut(alias);
        node.mount = Some(label.to_string());
    }

    fn node_mut(&mut self, path: &str) -> &mut Node {
        let mut node = &mut self.root;
        for seg in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(seg.to_string()).or_default();
        }
        node
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Secret names in sorted order. With a `depth`, secrets below it are
    /// replaced by their folder at that depth (`a/`).
    pub fn leaves(&self, depth: Option<usize>) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(&self.root, "", 0, depth, &mut out);
        out
    }

    /// Folder paths, each ending with `/`, in sorted order.
    pub fn folders(&self, depth: Option<usize>) -> Vec<String> {
        let mut out = Vec::new();
        collect_folders(&self.root, "", 0, depth, &mut out);
        out
    }

    /// Box-drawing rendering under a `title` line. Folders end with `/`;
    /// mount points carry their label in parentheses.
    pub fn render(&self, title: &str, depth: Option<usize>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", title);
        render_children(&self.root, "", 0, depth, &mut out);
        out
    }
}

fn collect_leaves(node: &Node, path: &str, level: usize, depth: Option<usize>, out: &mut Vec<String>) {
    for (name, child) in &node.children {
        let full = join(path, name);
        if child.leaf {
            out.push(full.clone());
        }
        if child.children.is_empty() {
            continue;
        }
        if depth.is_some_and(|d| level + 1 >= d) {
            out.push(format!("{}/", full));
        } else {
            collect_leaves(child, &full, level + 1, depth, out);
        }
    }
}

fn collect_folders(node: &Node, path: &str, level: usize, depth: Option<usize>, out: &mut Vec<String>) {
    if depth.is_some_and(|d| level >= d) {
        return;
    }
    for (name, child) in &node.children {
        if !child.is_folder() {
            continue;
        }
        let full = join(path, name);
        out.push(format!("{}/", full));
        collect_folders(child, &full, level + 1, depth, out);
    }
}

fn render_children(node: &Node, indent: &str, level: usize, depth: Option<usize>, out: &mut String) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };
        let mut label = name.clone();
        if child.is_folder() {
            label.push('/');
        }
        if let Some(mount) = &child.mount {
            let _ = write!(label, " ({})", mount);
        }
        let _ = writeln!(out, "{}{}{}", indent, branch, label);

        let stop = depth.is_some_and(|d| level + 1 >= d);
        if !stop && !child.children.is_empty() {
            let next = format!("{}{}", indent, if last { "    " } else { "│   " });
            render_children(child, &next, level + 1, depth, out);
        }
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

impl RootStore {
    /// Every secret of every mount below `prefix` as a [`Tree`].
    ///
    /// Entries of a parent mount that fall inside a sub-mount's namespace
    /// are shadowed by the sub-mount.
    pub fn tree(&self, ctx: &Context, prefix: &str) -> Result<Tree> {
        let prefix = prefix.trim_matches('/');
        let inside = |name: &str| {
            prefix.is_empty() || name == prefix || name.starts_with(&format!("{}/", prefix))
        };

        let mut tree = Tree::new();
        for (alias, store) in &self.mounts {
            if !alias.is_empty() && inside(alias) {
                tree.insert_mount(alias, &store.path().display().to_string());
            }
            for rel in store.list(ctx, "", None)? {
                let full = join_alias(alias, &rel);
                if !inside(&full) {
                    continue;
                }
                let owner = self.route(&full).map(|(s, _)| s.alias() == alias.as_str());
                if owner.unwrap_or(false) {
                    tree.insert(&full);
                }
            }
        }
        Ok(tree)
    }

    /// Flat listing across mounts, sorted.
    pub fn list(&self, ctx: &Context, opts: &ListOptions) -> Result<Vec<String>> {
        let tree = self.tree(ctx, &opts.prefix)?;
        Ok(if opts.folders {
            tree.folders(opts.depth)
        } else {
            tree.leaves(opts.depth)
        })
    }
}
