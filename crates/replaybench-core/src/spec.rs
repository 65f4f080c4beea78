// Url spec resolution
//
// A url spec maps benchmark names to either a comma separated list of other
// benchmark names, a single request descriptor, or a sequence of descriptors.
// Resolving a name flattens aliases left to right into the list of requests
// the engine dispatches.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{BenchError, Result};

/// One synthesized request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Path relative to the configured url root
    pub uri: String,

    /// Raw query string, without the leading `?`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,

    /// Send no session cookie so the target creates a fresh session
    #[serde(default)]
    pub new_session: bool,
}

impl RequestDescriptor {
    /// Create a descriptor for a plain GET of `uri`
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            query_string: None,
            new_session: false,
        }
    }

    /// Attach a query string
    pub fn with_query(mut self, query_string: impl Into<String>) -> Self {
        self.query_string = Some(query_string.into());
        self
    }

    /// Request a fresh session for this descriptor
    pub fn with_new_session(mut self) -> Self {
        self.new_session = true;
        self
    }
}

/// Value side of a url spec entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecEntry {
    /// Comma separated list of other benchmark names
    Alias(String),
    /// A single request
    Single(RequestDescriptor),
    /// An ordered list of requests
    Sequence(Vec<RequestDescriptor>),
}

/// Mapping of benchmark name to spec entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlSpec {
    entries: BTreeMap<String, SpecEntry>,
}

impl UrlSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, entry: SpecEntry) -> &mut Self {
        self.entries.insert(name.into(), entry);
        self
    }

    /// Builder-style variant of [`UrlSpec::insert`]
    pub fn with(mut self, name: impl Into<String>, entry: SpecEntry) -> Self {
        self.insert(name, entry);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Benchmark names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `name` into the ordered list of requests it stands for.
    ///
    /// Aliases are expanded depth-first in left-to-right order. A name that
    /// reaches itself again through aliases fails with
    /// [`BenchError::CyclicSpec`]; the same name reached along two separate
    /// paths is expanded twice.
    pub fn resolve(&self, name: &str) -> Result<Vec<RequestDescriptor>> {
        let mut resolved = Vec::new();
        let mut chain = Vec::new();
        self.resolve_into(name, &mut chain, &mut resolved)?;
        Ok(resolved)
    }

    /// Resolve `name` and keep the name alongside the requests
    pub fn resolve_list(&self, name: &str) -> Result<ResolvedUrlList> {
        Ok(ResolvedUrlList {
            name: name.to_string(),
            urls: self.resolve(name)?,
        })
    }

    fn resolve_into(
        &self,
        name: &str,
        chain: &mut Vec<String>,
        out: &mut Vec<RequestDescriptor>,
    ) -> Result<()> {
        if chain.iter().any(|visited| visited == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(BenchError::CyclicSpec { chain: cycle });
        }

        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| BenchError::unknown_benchmark(name))?;

        match entry {
            SpecEntry::Alias(aliases) => {
                chain.push(name.to_string());
                for alias in aliases.split(',').map(str::trim).filter(|a| !a.is_empty()) {
                    self.resolve_into(alias, chain, out)?;
                }
                chain.pop();
            }
            SpecEntry::Single(descriptor) => out.push(descriptor.clone()),
            SpecEntry::Sequence(descriptors) => out.extend(descriptors.iter().cloned()),
        }

        Ok(())
    }
}

/// Flattened request list of one benchmark, read-only during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrlList {
    name: String,
    urls: Vec<RequestDescriptor>,
}

impl ResolvedUrlList {
    pub fn new(name: impl Into<String>, urls: Vec<RequestDescriptor>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }

    /// Benchmark name the list was resolved from
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn urls(&self) -> &[RequestDescriptor] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RequestDescriptor> {
        self.urls.iter()
    }
}

impl FromIterator<(String, SpecEntry)> for UrlSpec {
    fn from_iter<I: IntoIterator<Item = (String, SpecEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
