//! Prefix tree mapping MQTT topic filters to arbitrary values, with matching
//! against concrete topic names.
//!
//! A filter level is one of a literal segment, `+` (single-level wildcard),
//! or `#` (multi-level wildcard, only legal as the final level). Lookup
//! walks a published topic's levels against the tree, following the literal
//! child, the `+` child, and the node's `#` value in parallel at each step.
//!
//! `$`-prefixed topics (the MQTT convention for broker-internal topics like
//! `$SYS/...`) never match a filter whose first level is `+` or `#` — a
//! plain subscription to `#` must not silently receive system messages.

use ahash::AHashMap;
use compact_str::CompactString;
use smallvec::SmallVec;

/// How one '/'-separated segment of a filter or topic should be treated.
enum Level<'a> {
    Literal(&'a str),
    Single,
    Multi,
}

impl<'a> Level<'a> {
    fn classify(segment: &'a str) -> Self {
        match segment {
            "+" => Level::Single,
            "#" => Level::Multi,
            other => Level::Literal(other),
        }
    }
}

struct TrieNode<V> {
    exact: Option<V>,
    by_segment: AHashMap<CompactString, TrieNode<V>>,
    single: Option<Box<TrieNode<V>>>,
    multi: Option<V>,
}

impl<V> TrieNode<V> {
    fn empty() -> Self {
        Self {
            exact: None,
            by_segment: AHashMap::with_capacity(4),
            single: None,
            multi: None,
        }
    }
}

impl<V> Default for TrieNode<V> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A trie of topic filters, used both for the broker's subscriber index and
/// for each session's own record of what it's subscribed to.
pub struct TopicTrie<V> {
    root: TrieNode<V>,
}

impl<V> TopicTrie<V> {
    pub fn new() -> Self {
        Self {
            root: TrieNode::empty(),
        }
    }

    /// Associates `value` with `filter`, overwriting any existing value at
    /// that exact filter.
    pub fn insert(&mut self, filter: &str, value: V) {
        let mut node = &mut self.root;

        for segment in filter.split('/') {
            match Level::classify(segment) {
                Level::Multi => {
                    node.multi = Some(value);
                    return;
                }
                Level::Single => {
                    node = node.single.get_or_insert_with(|| Box::new(TrieNode::empty()));
                }
                Level::Literal(s) => {
                    node = node.by_segment.entry(CompactString::new(s)).or_default();
                }
            }
        }

        node.exact = Some(value);
    }

    /// Mutable access to the value stored at an exact filter (not a topic
    /// match — `filter` is walked literally, `+`/`#` segments included).
    pub fn get_mut(&mut self, filter: &str) -> Option<&mut V> {
        let mut node = &mut self.root;
        let mut segments = filter.split('/').peekable();

        while let Some(segment) = segments.next() {
            let last = segments.peek().is_none();

            node = match Level::classify(segment) {
                Level::Multi => return node.multi.as_mut(),
                Level::Single => node.single.as_mut()?,
                Level::Literal(s) => node.by_segment.get_mut(s)?,
            };

            if last {
                return node.exact.as_mut();
            }
        }

        node.exact.as_mut()
    }

    /// Removes and returns the value stored at an exact filter.
    pub fn remove(&mut self, filter: &str) -> Option<V> {
        let segments: SmallVec<[&str; 8]> = filter.split('/').collect();
        remove_at(&mut self.root, &segments)
    }

    /// Drops every stored value (exact, `+`, or `#`) for which `keep`
    /// returns `false`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&mut V) -> bool,
    {
        retain_in(&mut self.root, &mut keep);
    }

    /// Calls `visit` once for every value whose filter matches `topic`,
    /// honoring the `$`-topic exclusion for wildcard filters at the root.
    pub fn matches<F>(&self, topic: &str, mut visit: F)
    where
        F: FnMut(&V),
    {
        let is_system_topic = topic.starts_with('$');
        let segments: SmallVec<[&str; 8]> = topic.split('/').collect();
        walk(&self.root, &segments, is_system_topic, &mut visit);
    }
}

fn remove_at<V>(node: &mut TrieNode<V>, segments: &[&str]) -> Option<V> {
    let Some((&head, rest)) = segments.split_first() else {
        return node.exact.take();
    };

    match Level::classify(head) {
        Level::Multi => node.multi.take(),
        Level::Single => descend_and_remove(node.single.as_deref_mut(), rest),
        Level::Literal(s) => descend_and_remove(node.by_segment.get_mut(s), rest),
    }
}

fn descend_and_remove<V>(child: Option<&mut TrieNode<V>>, rest: &[&str]) -> Option<V> {
    let child = child?;
    if rest.is_empty() {
        child.exact.take()
    } else {
        remove_at(child, rest)
    }
}

fn retain_in<V, F>(node: &mut TrieNode<V>, keep: &mut F)
where
    F: FnMut(&mut V) -> bool,
{
    if let Some(v) = &mut node.exact {
        if !keep(v) {
            node.exact = None;
        }
    }
    if let Some(v) = &mut node.multi {
        if !keep(v) {
            node.multi = None;
        }
    }
    if let Some(child) = node.single.as_deref_mut() {
        retain_in(child, keep);
    }
    for child in node.by_segment.values_mut() {
        retain_in(child, keep);
    }
}

fn walk<V, F>(node: &TrieNode<V>, levels: &[&str], is_system_topic: bool, visit: &mut F)
where
    F: FnMut(&V),
{
    walk_from(node, levels, 0, is_system_topic, visit);
}

fn walk_from<V, F>(
    node: &TrieNode<V>,
    levels: &[&str],
    index: usize,
    is_system_topic: bool,
    visit: &mut F,
) where
    F: FnMut(&V),
{
    // `$SYS/...` and friends never match a filter whose first level was a
    // wildcard, so both wildcard checks are skipped at index 0 for those.
    let wildcards_allowed = !(is_system_topic && index == 0);

    if wildcards_allowed {
        if let Some(v) = node.multi.as_ref() {
            visit(v);
        }
    }

    let Some(&segment) = levels.get(index) else {
        if let Some(v) = node.exact.as_ref() {
            visit(v);
        }
        return;
    };

    if wildcards_allowed {
        if let Some(child) = node.single.as_deref() {
            walk_from(child, levels, index + 1, is_system_topic, visit);
        }
    }

    if let Some(child) = node.by_segment.get(segment) {
        walk_from(child, levels, index + 1, is_system_topic, visit);
    }
}
