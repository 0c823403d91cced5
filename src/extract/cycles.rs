//! Import-cycle detection over relative module references.
//!
//! Files are interned into an index-addressed node table and traversed with
//! an explicit work stack, so deep or heavily cyclic trees cannot overflow
//! the call stack.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

static RELATIVE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bfrom\s+|\brequire\s*\(\s*|\bimport\s*\(\s*)['"`](\.[^'"`]+)['"`]"#)
        .expect("valid relative import regex")
});

/// Suffixes tried, in order, when resolving a module reference.
const CANDIDATE_SUFFIXES: &[&str] =
    &["", ".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.tsx", "/index.js"];

/// Directed graph of files, edges pointing from importer to imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportGraph {
    nodes: Vec<String>,
    edges: Vec<Vec<usize>>,
}

/// Joins a relative specifier onto the importing file's directory.
///
/// Returns `None` when the reference climbs above the repository root.
#[must_use]
pub fn join_relative(importer: &str, specifier: &str) -> Option<String> {
    let mut parts: Vec<&str> = importer.split('/').collect();
    parts.pop();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

impl ImportGraph {
    /// Builds the graph from `(repo-relative path, contents)` pairs.
    ///
    /// References that resolve to nothing in the file set are dropped.
    #[must_use]
    pub fn build(files: &[(String, String)]) -> Self {
        let mut nodes: Vec<String> = files.iter().map(|(path, _)| path.clone()).collect();
        nodes.sort();
        nodes.dedup();
        let index: HashMap<&str, usize> =
            nodes.iter().enumerate().map(|(i, path)| (path.as_str(), i)).collect();

        let mut edges = vec![Vec::new(); nodes.len()];
        for (path, code) in files {
            let from = index[path.as_str()];
            let mut targets: Vec<usize> = RELATIVE_IMPORT
                .captures_iter(code)
                .filter_map(|caps| join_relative(path, &caps[1]))
                .filter_map(|base| {
                    CANDIDATE_SUFFIXES
                        .iter()
                        .find_map(|suffix| index.get(format!("{base}{suffix}").as_str()).copied())
                })
                .collect();
            targets.sort_unstable();
            targets.dedup();
            edges[from] = targets;
        }
        Self { nodes, edges }
    }

    /// Returns every cycle as a ` -> `-joined chain, sorted.
    ///
    /// Each chain starts at the first node of the cycle found on the
    /// traversal path and repeats it at the end; a self-import yields
    /// `a -> a`.
    #[must_use]
    pub fn cycles(&self) -> Vec<String> {
        let n = self.nodes.len();
        let mut visited = vec![false; n];
        let mut on_path = vec![false; n];
        let mut path: Vec<usize> = Vec::new();
        let mut frames: Vec<(usize, usize)> = Vec::new();
        let mut found = BTreeSet::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            on_path[start] = true;
            path.push(start);
            frames.push((start, 0));

            while let Some(frame) = frames.last_mut() {
                let (node, cursor) = *frame;
                if let Some(&next) = self.edges[node].get(cursor) {
                    frame.1 += 1;
                    if on_path[next] {
                        if let Some(pos) = path.iter().position(|&p| p == next) {
                            let chain: Vec<&str> = path[pos..]
                                .iter()
                                .chain(std::iter::once(&next))
                                .map(|&i| self.nodes[i].as_str())
                                .collect();
                            found.insert(chain.join(" -> "));
                        }
                    } else if !visited[next] {
                        visited[next] = true;
                        on_path[next] = true;
                        path.push(next);
                        frames.push((next, 0));
                    }
                } else {
                    frames.pop();
                    on_path[node] = false;
                    path.pop();
                }
            }
        }
        found.into_iter().collect()
    }
}

/// Detects import cycles among `(repo-relative path, contents)` pairs.
#[must_use]
pub fn detect_cycles(files: &[(String, String)]) -> Vec<String> {
    ImportGraph::build(files).cycles()
}
