//! Canonical operation signatures.
//!
//! A signature is a deterministic, value-insensitive rendering of an
//! operation's requested shape: sibling selections sorted lexicographically,
//! aliases dropped, argument literals elided (argument names kept), fragment
//! spreads inlined at point of use. Two documents that differ only in
//! argument values, aliases, field ordering, or fragment spelling render to
//! byte-identical strings, so a signature works as a grouping or cache key
//! for monitoring systems.

use crate::config::SignaturePolicy;
use crate::error::SignatureError;
use crate::parser::{parse, OperationView};
use async_graphql_parser::types::{
    Directive, FragmentDefinition, Selection, SelectionSet,
};
use async_graphql_parser::Positioned;
use async_graphql_value::{Name, Value};
use lru::LruCache;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// A canonical, low-cardinality identifier for one operation shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Signature(String);

impl Signature {
    /// The signature as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the signature of a resolved operation.
pub fn compute_signature(
    operation: &OperationView<'_>,
    policy: &SignaturePolicy,
) -> Result<Signature, SignatureError> {
    let mut walker = Walker::new(operation.fragments, policy);
    let body = walker.braced(&operation.definition.selection_set.node)?;
    Ok(Signature(format!(
        "{} {} {}",
        operation.kind(),
        operation.display_name(),
        body
    )))
}

/// Parse a query string and compute the signature of its operation in one
/// step.
pub fn signature_of(
    query: &str,
    operation_name: Option<&str>,
    policy: &SignaturePolicy,
) -> Result<Signature, SignatureError> {
    let document = parse(query)?;
    let operation = document.operation(operation_name)?;
    compute_signature(&operation, policy)
}

/// Depth-first walker over an operation's selection shape.
///
/// Inlines fragment spreads at point of use; the `active_spreads` stack
/// detects cyclic spreads so malformed documents fail instead of hanging.
/// The walk only inspects the requested shape, never response data.
struct Walker<'a> {
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    policy: &'a SignaturePolicy,
    active_spreads: Vec<&'a str>,
}

impl<'a> Walker<'a> {
    fn new(
        fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
        policy: &'a SignaturePolicy,
    ) -> Self {
        Self {
            fragments,
            policy,
            active_spreads: Vec::new(),
        }
    }

    /// Render a selection set as `{ ... }` with sorted, merged entries.
    fn braced(&mut self, set: &'a SelectionSet) -> Result<String, SignatureError> {
        let mut entries = self.entries(set)?;
        entries.sort();
        entries.dedup();
        Ok(format!("{{ {} }}", entries.join(" ")))
    }

    /// Produce one canonical entry string per selection.
    ///
    /// Inline fragments without a type condition are pure grouping and get
    /// spliced into the parent set instead of contributing an entry.
    fn entries(&mut self, set: &'a SelectionSet) -> Result<Vec<String>, SignatureError> {
        let mut out = Vec::with_capacity(set.items.len());
        for item in &set.items {
            match &item.node {
                Selection::Field(field) => {
                    let field = &field.node;
                    let mut entry = field.name.node.to_string();
                    let mut args: Vec<String> = field
                        .arguments
                        .iter()
                        .map(|(name, value)| self.argument(&name.node, &value.node))
                        .collect();
                    if !args.is_empty() {
                        args.sort();
                        entry.push('(');
                        entry.push_str(&args.join(", "));
                        entry.push(')');
                    }
                    push_directives(&mut entry, directive_names(&field.directives));
                    if !field.selection_set.node.items.is_empty() {
                        entry.push(' ');
                        entry.push_str(&self.braced(&field.selection_set.node)?);
                    }
                    out.push(entry);
                }
                Selection::FragmentSpread(spread) => {
                    let spread = &spread.node;
                    let name = spread.fragment_name.node.as_str();
                    if self.active_spreads.contains(&name) {
                        return Err(SignatureError::CyclicFragment(name.to_string()));
                    }
                    let fragment = self
                        .fragments
                        .get(&spread.fragment_name.node)
                        .ok_or_else(|| SignatureError::UnknownFragment(name.to_string()))?;
                    // Directives applied at the spread site and on the
                    // definition both shape execution of the inlined set.
                    let mut directives = directive_names(&spread.directives);
                    directives.extend(directive_names(&fragment.node.directives));
                    self.active_spreads.push(name);
                    let entry = self.typed_entry(
                        fragment.node.type_condition.node.on.node.as_str(),
                        directives,
                        &fragment.node.selection_set.node,
                    )?;
                    self.active_spreads.pop();
                    out.push(entry);
                }
                Selection::InlineFragment(inline) => {
                    let inline = &inline.node;
                    match &inline.type_condition {
                        Some(condition) => out.push(self.typed_entry(
                            condition.node.on.node.as_str(),
                            directive_names(&inline.directives),
                            &inline.selection_set.node,
                        )?),
                        None => out.extend(self.entries(&inline.selection_set.node)?),
                    }
                }
            }
        }
        Ok(out)
    }

    /// Render an inlined fragment (spread or inline) with its type
    /// condition. The condition is part of the operation's shape, so a named
    /// fragment and an equivalent inline fragment render identically.
    fn typed_entry(
        &mut self,
        type_condition: &str,
        directives: BTreeSet<&'a str>,
        set: &'a SelectionSet,
    ) -> Result<String, SignatureError> {
        let mut entry = format!("... on {}", type_condition);
        push_directives(&mut entry, directives);
        entry.push(' ');
        entry.push_str(&self.braced(set)?);
        Ok(entry)
    }

    /// Render one argument. Literal values are elided to keep cardinality
    /// bounded; enum and boolean literals survive only when the policy
    /// retains them.
    fn argument(&self, name: &Name, value: &Value) -> String {
        match value {
            Value::Enum(literal) if self.policy.retain_enum_literals => {
                format!("{}: {}", name, literal)
            }
            Value::Boolean(literal) if self.policy.retain_boolean_literals => {
                format!("{}: {}", name, literal)
            }
            _ => name.to_string(),
        }
    }
}

/// Directive names, sorted and deduplicated; argument values are never part
/// of a signature.
fn directive_names(directives: &[Positioned<Directive>]) -> BTreeSet<&str> {
    directives
        .iter()
        .map(|directive| directive.node.name.node.as_str())
        .collect()
}

fn push_directives(entry: &mut String, names: BTreeSet<&str>) {
    for name in names {
        entry.push_str(" @");
        entry.push_str(name);
    }
}

/// A bounded cache of signatures keyed by raw query text and operation name.
///
/// Signature computation is pure, so a given request body only needs to be
/// walked once; subsequent executions of the same shape hit the cache.
/// Errors are not cached.
pub struct SignatureCache {
    inner: Mutex<LruCache<(String, Option<String>), Signature>>,
}

impl SignatureCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up the signature for `query`/`operation_name`, computing and
    /// storing it on a miss.
    pub fn get_or_compute(
        &self,
        query: &str,
        operation_name: Option<&str>,
        policy: &SignaturePolicy,
    ) -> Result<Signature, SignatureError> {
        let key = (query.to_string(), operation_name.map(str::to_string));
        {
            let mut cache = self.lock();
            if let Some(signature) = cache.get(&key) {
                return Ok(signature.clone());
            }
        }
        let signature = signature_of(query, operation_name, policy)?;
        self.lock().put(key, signature.clone());
        Ok(signature)
    }

    /// Number of cached signatures.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<(String, Option<String>), Signature>> {
        // Recover from poisoning; the cache holds no invariants beyond the
        // map itself.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
