//! `TaskId`: a parsed method + path with typed dynamic-segment slots, and
//! the matching/forking algorithm of spec §4.1.

use crate::convert::{AnyConverter, Converter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Task method. `Any` is the wildcard method (spec §3 "TaskID").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Any,
}

impl Method {
    /// `None` (no requirement) iff `self` is [`Method::Any`]; spec §4.1
    /// step 1 treats the wildcard as "method unset" on a pattern.
    fn matches(self, other: Method) -> bool {
        self == Method::Any || self == other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Any => "*",
        }
    }

    pub fn parse(raw: &str) -> Option<Method> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "PATCH" => Some(Method::Patch),
            "DELETE" => Some(Method::Delete),
            "OPTIONS" => Some(Method::Options),
            "*" => Some(Method::Any),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One path segment: either a literal or a named, typed dynamic slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Dynamic(String),
}

/// A parsed task address: method + path with typed dynamic slots
/// (spec §3/§4.1).
///
/// Immutable after construction. Two `TaskId`s are compared with
/// [`TaskId::matches`], not `PartialEq`, because matching a *pattern*
/// against a *candidate* is directional (spec §4.1) — a plain equality
/// comparison is provided only for the fully-static round-trip case
/// (spec §8 "load_from_str round-trip").
#[derive(Clone)]
pub struct TaskId {
    method: Method,
    segments: Vec<Segment>,
    /// index into `segments` -> converter, for each `Segment::Dynamic`.
    converters: HashMap<usize, Arc<dyn Converter>>,
    separator: char,
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskId")
            .field("method", &self.method)
            .field("path", &self.path_source())
            .finish()
    }
}

/// Outcome of matching a pattern `TaskId` against a candidate.
pub type MatchParams = HashMap<String, serde_json::Value>;

impl TaskId {
    /// Construct a `TaskId` from a method and a raw path.
    ///
    /// Splits `raw_path` on `separator` (default `/`) and strips empty
    /// edge segments (spec §4.1, §8 trailing-slash normalization). A
    /// segment written `{name}` becomes a dynamic slot; `types` maps
    /// dynamic names to a converter, falling back to [`AnyConverter`]
    /// when a name has no declared type.
    pub fn new(
        method: Method,
        raw_path: &str,
        separator: char,
        types: &HashMap<String, Arc<dyn Converter>>,
    ) -> Self {
        let mut segments = Vec::new();
        let mut converters = HashMap::new();

        for raw_segment in raw_path.split(separator) {
            if raw_segment.is_empty() {
                continue;
            }
            if let Some(name) = raw_segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                let idx = segments.len();
                let converter = types
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Arc::new(AnyConverter));
                converters.insert(idx, converter);
                segments.push(Segment::Dynamic(name.to_string()));
            } else {
                segments.push(Segment::Static(raw_segment.to_string()));
            }
        }

        Self { method, segments, converters, separator }
    }

    /// Shorthand for `TaskId::new` with no declared parameter types (all
    /// dynamic slots get the identity/any converter).
    pub fn simple(method: Method, raw_path: &str) -> Self {
        Self::new(method, raw_path, '/', &HashMap::new())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// True iff this `TaskId` has no dynamic segments and no wildcard
    /// method (spec §3).
    pub fn is_static(&self) -> bool {
        self.method != Method::Any && !self.segments.iter().any(|s| matches!(s, Segment::Dynamic(_)))
    }

    /// Reconstruct the original `{name}`-form path, suitable for
    /// round-tripping through [`TaskId::new`] again (spec §8
    /// "load_from_str round-trip").
    pub fn path_source(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push(self.separator);
            match seg {
                Segment::Static(s) => out.push_str(s),
                Segment::Dynamic(name) => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
        }
        if out.is_empty() {
            out.push(self.separator);
        }
        out
    }

    /// The canonical static-key form used by the registry's static table:
    /// `METHOD path` with dynamic slots rendered as their bare name. Only
    /// meaningful when [`TaskId::is_static`] is true, but also used (with
    /// the method/shape) to detect "same pattern" in [`crate::registry`].
    pub fn static_key(&self) -> String {
        let path: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Static(s) => s.as_str(),
                Segment::Dynamic(_) => "",
            })
            .collect();
        format!("{} /{}", self.method, path.join("/"))
    }

    /// Segment-shape key (method + per-position static/dynamic kind),
    /// used by `add_handler` to decide whether a dynamic-path handler
    /// binding merges into an existing entry (spec §4.2).
    pub fn shape_key(&self) -> String {
        let shape: Vec<&str> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Static(s) => s.as_str(),
                Segment::Dynamic(_) => "*",
            })
            .collect();
        format!("{} /{}", self.method, shape.join("/"))
    }

    /// Number of path segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Try to match `self` (the pattern) against `candidate` (a static
    /// `TaskId`), per the algorithm in spec §4.1.
    ///
    /// Returns the resolved parameter map on success.
    pub fn matches(&self, candidate: &TaskId) -> Option<MatchParams> {
        // Step 1: method.
        if !self.method.matches(candidate.method) {
            return None;
        }
        // Step 2: segment count.
        if self.segments.len() != candidate.segments.len() {
            return None;
        }
        // Step 3: no dynamic segments -> plain element-wise compare.
        let has_dynamic = self.segments.iter().any(|s| matches!(s, Segment::Dynamic(_)));
        if !has_dynamic {
            let equal = self
                .segments
                .iter()
                .zip(candidate.segments.iter())
                .all(|(p, c)| match (p, c) {
                    (Segment::Static(a), Segment::Static(b)) => a == b,
                    _ => false,
                });
            return equal.then(MatchParams::new);
        }

        // Step 4: walk positions.
        let mut params = MatchParams::new();
        for (i, (pattern_seg, cand_seg)) in self.segments.iter().zip(candidate.segments.iter()).enumerate() {
            match pattern_seg {
                Segment::Static(expected) => {
                    let Segment::Static(actual) = cand_seg else { return None };
                    if expected != actual {
                        return None;
                    }
                }
                Segment::Dynamic(name) => {
                    let raw = match cand_seg {
                        Segment::Static(s) => s.as_str(),
                        Segment::Dynamic(_) => {
                            // Matching two patterns against each other (used only by
                            // TaskId equality in tests) treats the literal name as the raw text.
                            return None;
                        }
                    };
                    let converter = self.converters.get(&i).expect("dynamic segment without converter");
                    let value = converter.convert(raw).ok()?;
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }

    /// Produce a new `TaskId` whose path is `prefix` prepended to this
    /// one's path, merging the prefix's own dynamic converters in ahead
    /// of this one's (spec §4.1 "Forking").
    pub fn fork(&self, prefix: &TaskId) -> TaskId {
        let mut segments = prefix.segments.clone();
        let mut converters = prefix.converters.clone();

        let offset = segments.len();
        for (i, seg) in self.segments.iter().enumerate() {
            segments.push(seg.clone());
            if let Some(conv) = self.converters.get(&i) {
                converters.insert(offset + i, conv.clone());
            }
        }

        TaskId {
            // Forking never changes the method; it only applies when merging
            // registries, and the method stays whatever the entry declared.
            method: self.method,
            segments,
            converters,
            separator: self.separator,
        }
    }
}

impl PartialEq for TaskId {
    /// Structural equality for fully-static `TaskId`s (spec §8 round-trip
    /// property). Dynamic `TaskId`s are never meaningfully `==`; use
    /// [`TaskId::matches`] instead.
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.segments == other.segments
    }
}

impl Eq for TaskId {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn types(pairs: &[(&str, Arc<dyn Converter>)]) -> HashMap<String, Arc<dyn Converter>> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn static_lookup_round_trip() {
        let a = TaskId::simple(Method::Get, "/users");
        let b = TaskId::simple(Method::Get, "/users/");
        // trailing slash strips to the same segments
        assert_eq!(a, b);
        assert_eq!(TaskId::simple(Method::Get, &a.path_source()), a);
    }

    #[test]
    fn dynamic_match_converts_int_param() {
        use crate::convert::IntConverter;
        let pattern = TaskId::new(
            Method::Get,
            "/users/{id}",
            '/',
            &types(&[("id", Arc::new(IntConverter))]),
        );
        let candidate = TaskId::simple(Method::Get, "/users/42");
        let params = pattern.matches(&candidate).expect("should match");
        assert_eq!(params["id"], serde_json::json!(42));

        let bad_candidate = TaskId::simple(Method::Get, "/users/abc");
        assert!(pattern.matches(&bad_candidate).is_none());
    }

    #[test]
    fn wildcard_method_matches_any() {
        let pattern = TaskId::simple(Method::Any, "/ping");
        assert!(pattern.matches(&TaskId::simple(Method::Get, "/ping")).is_some());
        assert!(pattern.matches(&TaskId::simple(Method::Post, "/ping")).is_some());
    }

    #[test]
    fn segment_count_mismatch_fails() {
        let pattern = TaskId::simple(Method::Get, "/users/{id}");
        let candidate = TaskId::simple(Method::Get, "/users");
        assert!(pattern.matches(&candidate).is_none());
    }

    #[test]
    fn fork_prepends_prefix_and_merges_converters() {
        use crate::convert::IntConverter;
        let prefix = TaskId::new(
            Method::Any,
            "/tenants/{tenant_id}",
            '/',
            &types(&[("tenant_id", Arc::new(IntConverter))]),
        );
        let original = TaskId::simple(Method::Get, "/users");
        let forked = original.fork(&prefix);
        assert_eq!(forked.path_source(), "/tenants/{tenant_id}/users");
        assert_eq!(forked.method(), Method::Get);

        let candidate = TaskId::simple(Method::Get, "/tenants/7/users");
        let params = forked.matches(&candidate).unwrap();
        assert_eq!(params["tenant_id"], serde_json::json!(7));
    }
}
