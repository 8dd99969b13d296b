//! Per-method route registry.
//!
//! # Responsibilities
//! - Own one radix tree per HTTP method, created on first registration
//! - Validate method and template before handing off to the tree
//! - Answer "does any other method match this path?" for 405 responses
//!
//! # Design Decisions
//! - Methods are case-sensitive strings; `GET` and `get` are distinct trees
//! - A small vector of trees beats a hash map for the handful of methods in use

use crate::routing::error::RouteError;
use crate::routing::params::Params;
use crate::routing::tree::{Match, Tree};

#[derive(Debug)]
struct MethodTree<T> {
    method: String,
    tree: Tree<T>,
}

/// Mapping from HTTP method to its route tree.
#[derive(Debug)]
pub struct RouteTable<T> {
    trees: Vec<MethodTree<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTable<T> {
    pub fn new() -> Self {
        Self { trees: Vec::new() }
    }

    /// Register `value` for `method` + `path`.
    ///
    /// Returns the number of wildcards in the template.
    pub fn insert(&mut self, method: &str, path: &str, value: T) -> Result<usize, RouteError> {
        if method.is_empty() {
            return Err(RouteError::EmptyMethod {
                path: path.to_owned(),
            });
        }
        if !path.starts_with('/') {
            return Err(RouteError::InvalidPath {
                path: path.to_owned(),
            });
        }

        let tree = match self.trees.iter().position(|t| t.method == method) {
            Some(pos) => &mut self.trees[pos].tree,
            None => {
                self.trees.push(MethodTree {
                    method: method.to_owned(),
                    tree: Tree::new(),
                });
                let last = self.trees.len() - 1;
                &mut self.trees[last].tree
            }
        };
        tree.insert(path, value)
    }

    /// Tree for `method`, if any route was registered under it.
    pub fn tree(&self, method: &str) -> Option<&Tree<T>> {
        self.trees
            .iter()
            .find(|t| t.method == method)
            .map(|t| &t.tree)
    }

    /// Resolve `path` under `method`.
    pub fn find<'t>(&'t self, method: &str, path: &str, params: &mut Params) -> Option<Match<'t, T>> {
        self.tree(method)?.find(path, params)
    }

    /// Methods other than `except` with a route matching `path`, in registration order.
    pub fn allowed_methods(&self, path: &str, except: Option<&str>) -> Vec<&str> {
        let mut scratch = Params::new();
        self.trees
            .iter()
            .filter(|t| Some(t.method.as_str()) != except)
            .filter(|t| {
                let found = t.tree.find(path, &mut scratch).is_some();
                scratch.clear();
                found
            })
            .map(|t| t.method.as_str())
            .collect()
    }

    /// Whether some method other than `method` matches `path`.
    pub fn other_method_exists(&self, method: &str, path: &str) -> bool {
        let mut scratch = Params::new();
        self.trees
            .iter()
            .filter(|t| t.method != method)
            .any(|t| {
                let found = t.tree.find(path, &mut scratch).is_some();
                scratch.clear();
                found
            })
    }

    /// Registered methods, in first-registration order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.trees.iter().map(|t| t.method.as_str())
    }

    /// Total number of registered routes across all methods.
    pub fn len(&self) -> usize {
        self.trees.iter().map(|t| t.tree.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_path_different_methods() {
        let mut table = RouteTable::new();
        table.insert("GET", "/health", 1).unwrap();
        table.insert("POST", "/health", 2).unwrap();

        let mut params = Params::new();
        assert_eq!(table.find("GET", "/health", &mut params).map(|m| *m.value), Some(1));
        assert_eq!(table.find("POST", "/health", &mut params).map(|m| *m.value), Some(2));
        assert!(table.find("PUT", "/health", &mut params).is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_is_per_method() {
        let mut table = RouteTable::new();
        table.insert("GET", "/users/:id", 1).unwrap();

        assert!(matches!(
            table.insert("GET", "/users/:id", 2),
            Err(RouteError::DuplicateRoute { .. })
        ));
        assert!(table.insert("DELETE", "/users/:id", 3).is_ok());
    }

    #[test]
    fn test_methods_are_case_sensitive() {
        let mut table = RouteTable::new();
        table.insert("GET", "/x", 1).unwrap();

        let mut params = Params::new();
        assert!(table.find("get", "/x", &mut params).is_none());
        assert!(table.other_method_exists("get", "/x"));
    }

    #[test]
    fn test_allowed_methods() {
        let mut table = RouteTable::new();
        table.insert("GET", "/items/:id", ()).unwrap();
        table.insert("PUT", "/items/:id", ()).unwrap();
        table.insert("POST", "/items", ()).unwrap();

        assert_eq!(table.allowed_methods("/items/3", None), vec!["GET", "PUT"]);
        assert_eq!(table.allowed_methods("/items/3", Some("GET")), vec!["PUT"]);
        assert!(table.other_method_exists("DELETE", "/items/3"));
        assert!(!table.other_method_exists("POST", "/nothing"));
        assert_eq!(table.methods().collect::<Vec<_>>(), vec!["GET", "PUT", "POST"]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut table: RouteTable<()> = RouteTable::new();
        assert!(matches!(table.insert("", "/x", ()), Err(RouteError::EmptyMethod { .. })));
        assert!(matches!(table.insert("GET", "x", ()), Err(RouteError::InvalidPath { .. })));
        assert!(table.is_empty());
        assert_eq!(table.methods().count(), 0);
    }
}
