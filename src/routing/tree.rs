//! Radix tree path matcher.
//!
//! # Responsibilities
//! - Store path templates (`/users/:id`, `/files/*path`) for one method
//! - Split edges on insertion and reject conflicting templates
//! - Resolve a request path to its value plus captured parameters
//!
//! # Design Decisions
//! - Nodes live in an arena and refer to children by [`NodeId`]; no parent links
//! - Segments are stored as bytes so edge splits never need char boundaries
//! - A wildcard child is exclusive: no static siblings next to it
//! - Static children stay sorted by priority; `indices` mirrors that order
//! - Lookup is a loop, never recursion

use std::borrow::Cow;

use crate::routing::error::RouteError;
use crate::routing::params::Params;

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

/// Index of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

#[derive(Debug)]
pub(crate) struct Node<T> {
    /// Bytes of the request path this node consumes.
    path: Vec<u8>,
    kind: NodeKind,
    /// First byte of every static child's segment, parallel to `children`.
    indices: Vec<u8>,
    /// The single child is a param or catch-all node.
    wild_child: bool,
    priority: u32,
    children: Vec<NodeId>,
    value: Option<T>,
    /// Registered template, kept for diagnostics.
    full_path: String,
}

impl<T> Node<T> {
    fn new(kind: NodeKind, path: Vec<u8>, full_path: &str, priority: u32) -> Self {
        Self {
            path,
            kind,
            indices: Vec::new(),
            wild_child: false,
            priority,
            children: Vec::new(),
            value: None,
            full_path: full_path.to_owned(),
        }
    }

    /// Name of a param or catch-all node, without its marker.
    fn wildcard_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.path[1..])
    }

    fn as_match(&self) -> Option<Match<'_, T>> {
        self.value.as_ref().map(|value| Match {
            value,
            template: &self.full_path,
        })
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct Match<'t, T> {
    /// Value registered for the template.
    pub value: &'t T,
    /// The template that matched.
    pub template: &'t str,
}

/// Compressed prefix tree for one HTTP method.
#[derive(Debug)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    routes: usize,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root, Vec::new(), "", 0)],
            routes: 0,
        }
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes == 0
    }

    /// Register `value` under the template `path`.
    ///
    /// Returns the number of wildcards in the template. Malformed templates are
    /// rejected before the tree is touched.
    pub fn insert(&mut self, path: &str, value: T) -> Result<usize, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath {
                path: path.to_owned(),
            });
        }
        let wildcards = validate_template(path)?;

        self.insert_validated(path, value)?;
        self.routes += 1;
        Ok(wildcards)
    }

    fn insert_validated(&mut self, full_path: &str, value: T) -> Result<(), RouteError> {
        let mut path = full_path.as_bytes();
        let mut n = ROOT;
        self.node_mut(n).priority += 1;

        // Empty tree
        if self.node(n).path.is_empty() && self.node(n).children.is_empty() {
            self.insert_child(n, path, full_path, value)?;
            self.node_mut(n).kind = NodeKind::Root;
            return Ok(());
        }

        loop {
            let i = longest_common_prefix(path, &self.node(n).path);

            if i < self.node(n).path.len() {
                let consumed = full_path.len() - path.len();
                let prefix = String::from_utf8_lossy(&full_path.as_bytes()[..consumed + i]);
                self.split(n, i, prefix.into_owned());
            }

            if i == path.len() {
                let node = self.node_mut(n);
                if node.value.is_some() {
                    return Err(RouteError::DuplicateRoute {
                        path: full_path.to_owned(),
                    });
                }
                node.value = Some(value);
                node.full_path = full_path.to_owned();
                return Ok(());
            }

            path = &path[i..];

            if self.node(n).wild_child {
                n = self.node(n).children[0];
                self.node_mut(n).priority += 1;

                let node = self.node(n);
                let wild = node.path.as_slice();
                let same_wildcard = path.starts_with(wild)
                    && (path.len() == wild.len()
                        || (node.kind != NodeKind::CatchAll && path[wild.len()] == b'/'));
                if same_wildcard {
                    continue;
                }
                return Err(self.wildcard_conflict(n, path, full_path));
            }

            let c = path[0];

            // '/' after a param continues into its only child
            if self.node(n).kind == NodeKind::Param && c == b'/' && self.node(n).children.len() == 1 {
                n = self.node(n).children[0];
                self.node_mut(n).priority += 1;
                continue;
            }

            if let Some(pos) = self.node(n).indices.iter().position(|&b| b == c) {
                let pos = self.bump_child_priority(n, pos);
                n = self.node(n).children[pos];
                continue;
            }

            if c != b':' && c != b'*' {
                let child = self.push(Node::new(NodeKind::Static, Vec::new(), full_path, 0));
                let parent = self.node_mut(n);
                parent.indices.push(c);
                parent.children.push(child);
                let last = parent.children.len() - 1;
                self.bump_child_priority(n, last);
                n = child;
            }
            return self.insert_child(n, path, full_path, value);
        }
    }

    /// Attach the rest of a template below `n`, creating wildcard nodes as needed.
    fn insert_child(
        &mut self,
        mut n: NodeId,
        mut path: &[u8],
        full_path: &str,
        value: T,
    ) -> Result<(), RouteError> {
        while let Some((start, end)) = find_wildcard(path) {
            if let Some(&existing) = self.node(n).children.first() {
                return Err(RouteError::WildcardConflict {
                    segment: String::from_utf8_lossy(&path[start..end]).into_owned(),
                    path: full_path.to_owned(),
                    existing: self.node(existing).full_path.clone(),
                });
            }

            if start > 0 {
                self.node_mut(n).path = path[..start].to_vec();
                path = &path[start..];
            }
            let wild_len = end - start;

            if path[0] == b':' {
                let child = self.push(Node::new(NodeKind::Param, path[..wild_len].to_vec(), full_path, 1));
                let parent = self.node_mut(n);
                parent.wild_child = true;
                parent.children = vec![child];
                n = child;

                // More template after the param: it continues with '/'
                if wild_len < path.len() {
                    path = &path[wild_len..];
                    let next = self.push(Node::new(NodeKind::Static, Vec::new(), full_path, 1));
                    self.node_mut(n).children = vec![next];
                    n = next;
                    continue;
                }

                self.node_mut(n).value = Some(value);
                return Ok(());
            }

            // Catch-all; position and leading '/' were validated up front
            let mut catch_all = Node::new(NodeKind::CatchAll, path.to_vec(), full_path, 1);
            catch_all.value = Some(value);
            let child = self.push(catch_all);
            let parent = self.node_mut(n);
            parent.wild_child = true;
            parent.children = vec![child];
            return Ok(());
        }

        let node = self.node_mut(n);
        node.path = path.to_vec();
        node.value = Some(value);
        node.full_path = full_path.to_owned();
        Ok(())
    }

    /// Truncate `n` to its first `i` bytes, moving the rest into a new child.
    fn split(&mut self, n: NodeId, i: usize, prefix_full_path: String) {
        let node = self.node_mut(n);
        let suffix = node.path.split_off(i);
        let first = suffix[0];
        let child = Node {
            path: suffix,
            kind: NodeKind::Static,
            indices: std::mem::take(&mut node.indices),
            wild_child: node.wild_child,
            priority: node.priority.saturating_sub(1),
            children: std::mem::take(&mut node.children),
            value: node.value.take(),
            full_path: std::mem::replace(&mut node.full_path, prefix_full_path),
        };

        let child = self.push(child);
        let node = self.node_mut(n);
        node.wild_child = false;
        node.indices = vec![first];
        node.children = vec![child];
    }

    /// Increment a static child's priority and move it left past lower-priority
    /// siblings. Returns the child's new position.
    fn bump_child_priority(&mut self, parent: NodeId, pos: usize) -> usize {
        let child = self.node(parent).children[pos];
        self.node_mut(child).priority += 1;
        let priority = self.node(child).priority;

        let mut new_pos = pos;
        while new_pos > 0 {
            let left = self.node(parent).children[new_pos - 1];
            if self.node(left).priority >= priority {
                break;
            }
            self.node_mut(parent).children.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }

        if new_pos != pos {
            self.node_mut(parent).indices[new_pos..=pos].rotate_right(1);
        }
        new_pos
    }

    fn wildcard_conflict(&self, wild: NodeId, path: &[u8], full_path: &str) -> RouteError {
        let node = self.node(wild);
        let segment = if node.kind == NodeKind::CatchAll {
            path
        } else {
            let end = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
            &path[..end]
        };
        RouteError::WildcardConflict {
            segment: String::from_utf8_lossy(segment).into_owned(),
            path: full_path.to_owned(),
            existing: node.full_path.clone(),
        }
    }

    /// Resolve a request path.
    ///
    /// Captures are appended to `params` in path order. On a miss `params` is
    /// left as it was on entry.
    pub fn find<'t>(&'t self, path: &str, params: &mut Params) -> Option<Match<'t, T>> {
        let mark = params.len();
        let found = self.walk(path.as_bytes(), params);
        if found.is_none() {
            params.truncate(mark);
        }
        found
    }

    fn walk<'t>(&'t self, mut path: &[u8], params: &mut Params) -> Option<Match<'t, T>> {
        let mut n = ROOT;

        loop {
            let node = self.node(n);
            let prefix = node.path.as_slice();

            if path.len() > prefix.len() {
                if !path.starts_with(prefix) {
                    return None;
                }
                path = &path[prefix.len()..];

                if !node.wild_child {
                    let c = path[0];
                    let pos = node.indices.iter().position(|&b| b == c)?;
                    n = node.children[pos];
                    continue;
                }

                let child = self.node(node.children[0]);
                match child.kind {
                    NodeKind::Param => {
                        let end = path.iter().position(|&b| b == b'/').unwrap_or(path.len());
                        if end == 0 {
                            return None;
                        }
                        let value = std::str::from_utf8(&path[..end]).ok()?;
                        params.push(child.wildcard_name(), value);

                        if end < path.len() {
                            n = *child.children.first()?;
                            path = &path[end..];
                            continue;
                        }
                        return child.as_match();
                    }
                    NodeKind::CatchAll => {
                        let value = std::str::from_utf8(path).ok()?;
                        params.push(child.wildcard_name(), value);
                        return child.as_match();
                    }
                    NodeKind::Static | NodeKind::Root => return None,
                }
            }

            if path != prefix {
                return None;
            }
            if node.value.is_some() {
                return node.as_match();
            }

            // "/files/" against "/files/*path" captures an empty remainder
            if node.wild_child {
                let child = self.node(node.children[0]);
                if child.kind == NodeKind::CatchAll && child.value.is_some() {
                    params.push(child.wildcard_name(), "");
                    return child.as_match();
                }
            }
            return None;
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, node: Node<T>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }
}

fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Locate the first wildcard in `path`: `(start, end)` byte offsets of the
/// `:name` / `*name` token. The token ends at the next `/` or end of input.
fn find_wildcard(path: &[u8]) -> Option<(usize, usize)> {
    let start = path.iter().position(|&b| b == b':' || b == b'*')?;
    let end = path[start + 1..]
        .iter()
        .position(|&b| b == b'/')
        .map_or(path.len(), |offset| start + 1 + offset);
    Some((start, end))
}

/// Syntax checks that need no tree state. Returns the wildcard count.
fn validate_template(path: &str) -> Result<usize, RouteError> {
    let bytes = path.as_bytes();
    let mut count = 0;
    let mut from = 0;

    while let Some((start, end)) = find_wildcard(&bytes[from..]) {
        let (start, end) = (from + start, from + end);
        let token = &bytes[start..end];

        if token[1..].iter().any(|&b| b == b':' || b == b'*') {
            return Err(RouteError::MultipleWildcards {
                segment: String::from_utf8_lossy(token).into_owned(),
                path: path.to_owned(),
            });
        }
        if token.len() < 2 {
            return Err(RouteError::UnnamedWildcard {
                path: path.to_owned(),
            });
        }
        if token[0] == b'*' {
            if end != bytes.len() {
                return Err(RouteError::CatchAllNotLast {
                    path: path.to_owned(),
                });
            }
            if start == 0 || bytes[start - 1] != b'/' {
                return Err(RouteError::CatchAllMissingSlash {
                    path: path.to_owned(),
                });
            }
        }

        count += 1;
        from = end;
    }
    Ok(count)
}
