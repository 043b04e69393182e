use std::collections::HashMap;
use std::sync::Arc;

use crate::method::Method;
use crate::request::{Params, Request};
use crate::response::ResponseWriter;

/// A handler bound to a method/pattern pair.
///
/// `(ResponseWriter, &mut Request) -> ()` per spec §6's public surface.
pub type HandlerFn = dyn Fn(&mut ResponseWriter, &mut Request) + Send + Sync;
pub type Handler = Arc<HandlerFn>;

/// A function that wraps a `Handler`, producing a new one — used for
/// cross-cutting behavior applied at registration time (spec §4.E).
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Applies `mws` to `handler` in reverse order, so `mws[0]` ends up
/// outermost (spec §4.E).
fn chain(mut handler: Handler, mws: &[Middleware]) -> Handler {
    for mw in mws.iter().rev() {
        handler = mw(handler);
    }
    handler
}

/// One node of the radix tree (spec §3 "Route node"), stored in an
/// append-only arena (`Router::nodes`) rather than as owned `Box` children —
/// grounded on the slab/arena technique in
/// `examples/kowito-chopin/chopin/src/slab.rs`, which sidesteps the
/// self-referential-ownership problem a `Box`-based trie runs into once
/// nodes need to be split and reparented in place.
struct Node {
    /// The byte string stored along the edge into this node from its parent.
    pattern: Vec<u8>,
    /// Children keyed by the first byte of their `pattern`; that byte is
    /// unique among siblings.
    children: HashMap<u8, usize>,
    /// At most one parameter edge per node (spec §9's recommended radix
    /// extension): matches any byte run up to the next `/` and records it
    /// under the declared name.
    param_child: Option<(String, usize)>,
    /// Per-method handler map. The known single-`(method, handler)`-per-leaf
    /// aliasing bug from the original source is the one behavior spec.md
    /// explicitly redesigns (§9): two methods on the same pattern now
    /// coexist instead of the second silently overwriting the first.
    handlers: HashMap<Method, Handler>,
}

impl Node {
    fn new(pattern: Vec<u8>) -> Self {
        Self {
            pattern,
            children: HashMap::new(),
            param_child: None,
            handlers: HashMap::new(),
        }
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

enum Segment {
    Literal(Vec<u8>),
    Param(String),
}

/// Splits a registration pattern on `{name}` placeholders. A placeholder
/// must bound a whole path segment, matching the convention the original
/// source's segment matcher used (`mux.go`'s `{...}` check) — `/x/{id}/y`,
/// not `/x-{id}/y`.
fn split_segments(pattern: &[u8]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = pattern;
    loop {
        match rest.iter().position(|&b| b == b'{') {
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_vec()));
                }
                break;
            }
            Some(open) => {
                if open > 0 {
                    segments.push(Segment::Literal(rest[..open].to_vec()));
                }
                let after_open = &rest[open + 1..];
                match after_open.iter().position(|&b| b == b'}') {
                    Some(close) => {
                        let name = String::from_utf8_lossy(&after_open[..close]).into_owned();
                        segments.push(Segment::Param(name));
                        rest = &after_open[close + 1..];
                    }
                    None => {
                        segments.push(Segment::Literal(rest[open..].to_vec()));
                        break;
                    }
                }
            }
        }
    }
    segments
}

struct Inserted {
    /// Index that should replace the node passed in, in its parent's
    /// children map (unchanged unless a split occurred).
    replace: usize,
    /// Index of the node corresponding to this literal chunk being fully
    /// consumed — where the next segment (if any) continues from.
    terminal: usize,
}

/// Ports the original source's `addRoute`/`splitRoute` (`router.go`) to the
/// arena, with `assign` threaded through instead of an unconditional
/// "mark leaf" so a non-final segment of a parameterized pattern can walk
/// the tree into existence without prematurely registering a handler.
fn add_route(
    nodes: &mut Vec<Node>,
    node_idx: usize,
    pattern: &[u8],
    assign: Option<(Method, Handler)>,
) -> Inserted {
    if pattern.is_empty() {
        if let Some((method, handler)) = assign {
            nodes[node_idx].handlers.insert(method, handler);
        }
        return Inserted {
            replace: node_idx,
            terminal: node_idx,
        };
    }

    let node_pattern = std::mem::take(&mut nodes[node_idx].pattern);
    let cpl = common_prefix(&node_pattern, pattern);
    nodes[node_idx].pattern = node_pattern;

    if cpl < nodes[node_idx].pattern.len() {
        return split_route(nodes, node_idx, pattern, cpl, assign);
    }

    if cpl == nodes[node_idx].pattern.len() && cpl < pattern.len() {
        let suffix = &pattern[cpl..];
        let first = suffix[0];
        let existing = nodes[node_idx].children.get(&first).copied();
        let result = match existing {
            Some(child_idx) => add_route(nodes, child_idx, suffix, assign),
            None => {
                let mut leaf = Node::new(suffix.to_vec());
                if let Some((method, handler)) = assign {
                    leaf.handlers.insert(method, handler);
                }
                nodes.push(leaf);
                let idx = nodes.len() - 1;
                Inserted {
                    replace: idx,
                    terminal: idx,
                }
            }
        };
        nodes[node_idx].children.insert(first, result.replace);
        return Inserted {
            replace: node_idx,
            terminal: result.terminal,
        };
    }

    // cpl == node.pattern.len() && cpl == pattern.len(): exact match.
    if let Some((method, handler)) = assign {
        nodes[node_idx].handlers.insert(method, handler);
    }
    Inserted {
        replace: node_idx,
        terminal: node_idx,
    }
}

fn split_route(
    nodes: &mut Vec<Node>,
    node_idx: usize,
    pattern: &[u8],
    cpl: usize,
    assign: Option<(Method, Handler)>,
) -> Inserted {
    let old_pattern = std::mem::take(&mut nodes[node_idx].pattern);
    let nn_pattern = old_pattern[..cpl].to_vec();
    let node_suffix = old_pattern[cpl..].to_vec();
    nodes[node_idx].pattern = node_suffix.clone();

    let mut nn = Node::new(nn_pattern);
    nn.children.insert(node_suffix[0], node_idx);
    nodes.push(nn);
    let nn_idx = nodes.len() - 1;

    let terminal = if cpl < pattern.len() {
        let leaf_pattern = pattern[cpl..].to_vec();
        let mut leaf = Node::new(leaf_pattern.clone());
        if let Some((method, handler)) = assign {
            leaf.handlers.insert(method, handler);
        }
        nodes.push(leaf);
        let leaf_idx = nodes.len() - 1;
        nodes[nn_idx].children.insert(leaf_pattern[0], leaf_idx);
        leaf_idx
    } else {
        if let Some((method, handler)) = assign {
            nodes[nn_idx].handlers.insert(method, handler);
        }
        nn_idx
    };

    Inserted {
        replace: nn_idx,
        terminal,
    }
}

/// `Router` owns the root node, an accumulated prefix (empty for a
/// top-level router), and an ordered middleware list applied at
/// registration time (spec §3 "Router", §4.E).
pub struct Router {
    nodes: Vec<Node>,
    root: usize,
    prefix: String,
    mws: Vec<Middleware>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(Vec::new())],
            root: 0,
            prefix: String::new(),
            mws: Vec::new(),
        }
    }

    /// Appends to the router's own middleware list. Resolved at
    /// registration time, not per request — adding middleware after a
    /// route is registered does not affect that route (spec §4.E, §9).
    pub fn use_mw(&mut self, mw: Middleware) {
        self.mws.push(mw);
    }

    pub fn get(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Get, pattern, handler);
    }

    pub fn post(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Post, pattern, handler);
    }

    pub fn put(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Put, pattern, handler);
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Patch, pattern, handler);
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Delete, pattern, handler);
    }

    fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static,
    ) {
        let handler: Handler = chain(Arc::new(handler), &self.mws);
        let full = format!("{}{}", self.prefix, pattern);
        self.insert(&full, method, handler);
    }

    pub(crate) fn insert(&mut self, pattern: &str, method: Method, handler: Handler) {
        let segments = split_segments(pattern.as_bytes());
        let mut current = self.root;
        if segments.is_empty() {
            self.nodes[current].handlers.insert(method, handler);
            return;
        }
        let last = segments.len() - 1;
        for (i, segment) in segments.into_iter().enumerate() {
            let assign = if i == last {
                Some((method, handler.clone()))
            } else {
                None
            };
            match segment {
                Segment::Literal(bytes) => {
                    let result = add_route(&mut self.nodes, current, &bytes, assign);
                    current = result.terminal;
                }
                Segment::Param(name) => {
                    let child_idx = match self.nodes[current].param_child.clone() {
                        Some((_, idx)) => idx,
                        None => {
                            self.nodes.push(Node::new(Vec::new()));
                            let idx = self.nodes.len() - 1;
                            self.nodes[current].param_child = Some((name.clone(), idx));
                            idx
                        }
                    };
                    if let Some((method, handler)) = assign {
                        self.nodes[child_idx].handlers.insert(method, handler);
                    }
                    current = child_idx;
                }
            }
        }
    }

    /// Matches `(method, path)` against the registered routes (spec §4.D).
    /// Byte-exact; no case folding, no path normalization (spec §9).
    pub fn match_route(&self, method: Method, path: &str) -> Option<(Handler, Params)> {
        let (handler, param_pairs) = self.match_node(self.root, path.as_bytes(), method)?;
        let mut params = Params::new();
        for (name, value) in param_pairs {
            params.insert(name, value);
        }
        Some((handler, params))
    }

    fn match_node(
        &self,
        node_idx: usize,
        remaining: &[u8],
        method: Method,
    ) -> Option<(Handler, Vec<(String, String)>)> {
        let node = &self.nodes[node_idx];
        let cpl = common_prefix(remaining, &node.pattern);

        if cpl < node.pattern.len() {
            return None;
        }

        if cpl == node.pattern.len() && cpl == remaining.len() {
            return node.handlers.get(&method).map(|h| (h.clone(), Vec::new()));
        }

        // cpl == node.pattern.len() && cpl < remaining.len(): more to match.
        let rest = &remaining[cpl..];
        if let Some(&child_idx) = node.children.get(&rest[0]) {
            if let Some(found) = self.match_node(child_idx, rest, method) {
                return Some(found);
            }
        }
        if let Some((name, child_idx)) = &node.param_child {
            if let Some(found) = self.match_param(*child_idx, name, rest, method) {
                return Some(found);
            }
        }
        None
    }

    fn match_param(
        &self,
        node_idx: usize,
        name: &str,
        remaining: &[u8],
        method: Method,
    ) -> Option<(Handler, Vec<(String, String)>)> {
        let end = remaining.iter().position(|&b| b == b'/').unwrap_or(remaining.len());
        if end == 0 {
            return None;
        }
        let value = String::from_utf8_lossy(&remaining[..end]).into_owned();
        let rest = &remaining[end..];
        let (handler, mut params) = self.match_node(node_idx, rest, method)?;
        params.push((name.to_string(), value));
        Some((handler, params))
    }

    /// Depth-first pre-order traversal over every registered `(method,
    /// pattern, handler)` (spec §4.D "Walk"). Not required to preserve
    /// insertion order.
    pub fn walk(&self, mut f: impl FnMut(Method, &str, &Handler)) {
        self.walk_node(self.root, String::new(), &mut f);
    }

    fn walk_node(&self, node_idx: usize, prefix: String, f: &mut impl FnMut(Method, &str, &Handler)) {
        let node = &self.nodes[node_idx];
        let full = format!("{prefix}{}", String::from_utf8_lossy(&node.pattern));
        for (method, handler) in &node.handlers {
            f(*method, &full, handler);
        }
        for &child_idx in node.children.values() {
            self.walk_node(child_idx, full.clone(), f);
        }
        if let Some((name, child_idx)) = &node.param_child {
            self.walk_node(*child_idx, format!("{full}{{{name}}}"), f);
        }
    }

    /// Registers routes under `prefix`, chaining the group's own middleware
    /// before the router's (spec §4.E). Groups may nest.
    pub fn group(&mut self, prefix: &str, f: impl FnOnce(&mut Group)) {
        let mut group = Group {
            router: self,
            prefix: prefix.to_string(),
            mws: Vec::new(),
        };
        f(&mut group);
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// A transient view over a `Router` carrying an accumulated prefix and a
/// middleware list scoped only to this group's own registrations — the
/// original source's bug of leaking a group's `Use` into the parent
/// router's middleware list is the one behavior spec.md redesigns here
/// (spec §4.E, §9).
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
    mws: Vec<Middleware>,
}

impl<'r> Group<'r> {
    pub fn use_mw(&mut self, mw: Middleware) {
        self.mws.push(mw);
    }

    fn register(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static,
    ) {
        let handler: Handler = Arc::new(handler);
        let handler = chain(handler, &self.mws);
        let handler = chain(handler, &self.router.mws);
        let full = format!("{}{}{}", self.router.prefix, self.prefix, pattern);
        self.router.insert(&full, method, handler);
    }

    pub fn get(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Get, pattern, handler);
    }

    pub fn post(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Post, pattern, handler);
    }

    pub fn put(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Put, pattern, handler);
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Patch, pattern, handler);
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Fn(&mut ResponseWriter, &mut Request) + Send + Sync + 'static) {
        self.register(Method::Delete, pattern, handler);
    }

    pub fn group(&mut self, prefix: &str, f: impl FnOnce(&mut Group)) {
        let mut nested = Group {
            router: self.router,
            prefix: format!("{}{}", self.prefix, prefix),
            mws: Vec::new(),
        };
        f(&mut nested);
    }
}
