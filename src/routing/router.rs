//! Method + pattern router
//!
//! Path matching is delegated to `matchit`; this layer keeps a per-pattern
//! method table so a path hit with the wrong method can be told apart from
//! a miss, and implements strict-slash redirects.

use std::collections::HashMap;

use hyper::Method;

use crate::http::Params;

/// Outcome of registering a (method, pattern) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Added,
    /// The pair was already registered; the earlier endpoint is kept
    Duplicate,
}

/// Result of looking up a request
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found { endpoint: &'a T, params: Params },
    /// The path matched but no endpoint accepts the method
    MethodNotAllowed { allowed: Vec<Method> },
    /// Strict slash: the path matches with its trailing slash toggled
    Redirect(String),
    NotFound,
}

pub struct Router<T> {
    tree: matchit::Router<usize>,
    patterns: HashMap<String, usize>,
    methods: Vec<Vec<(Method, T)>>,
    strict_slash: bool,
}

impl<T> Router<T> {
    pub fn new(strict_slash: bool) -> Self {
        Self {
            tree: matchit::Router::new(),
            patterns: HashMap::new(),
            methods: Vec::new(),
            strict_slash,
        }
    }

    /// Register `endpoint` for `method` on `pattern`.
    ///
    /// Fails when `pattern` is malformed or conflicts with a different
    /// pattern already in the tree (e.g. `/a/{x}` vs `/a/{y}`).
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        endpoint: T,
    ) -> Result<Inserted, matchit::InsertError> {
        let slot = if let Some(&slot) = self.patterns.get(pattern) {
            slot
        } else {
            let slot = self.methods.len();
            self.tree.insert(pattern, slot)?;
            self.patterns.insert(pattern.to_string(), slot);
            self.methods.push(Vec::new());
            slot
        };

        let table = &mut self.methods[slot];
        if table.iter().any(|(m, _)| *m == method) {
            return Ok(Inserted::Duplicate);
        }
        table.push((method, endpoint));
        Ok(Inserted::Added)
    }

    pub fn at(&self, method: &Method, path: &str, query: Option<&str>) -> Lookup<'_, T> {
        if let Ok(matched) = self.tree.at(path) {
            let table = &self.methods[*matched.value];
            return match table.iter().find(|(m, _)| m == method) {
                Some((_, endpoint)) => Lookup::Found {
                    endpoint,
                    params: Params::from(matched.params),
                },
                None => Lookup::MethodNotAllowed {
                    allowed: table.iter().map(|(m, _)| m.clone()).collect(),
                },
            };
        }

        if self.strict_slash {
            if let Some(alternate) = toggle_trailing_slash(path) {
                if self.tree.at(&alternate).is_ok() {
                    let location = match query {
                        Some(q) => format!("{alternate}?{q}"),
                        None => alternate,
                    };
                    return Lookup::Redirect(location);
                }
            }
        }

        Lookup::NotFound
    }

    pub fn len(&self) -> usize {
        self.methods.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn toggle_trailing_slash(path: &str) -> Option<String> {
    if path == "/" || path.is_empty() {
        return None;
    }
    match path.strip_suffix('/') {
        Some(trimmed) => Some(trimmed.to_string()),
        None => Some(format!("{path}/")),
    }
}
