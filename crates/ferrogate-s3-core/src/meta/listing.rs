//! Listing over sorted metadata rows.
//!
//! Rows arrive in key order with the versions of one key latest first. Keys
//! sharing a delimiter-terminated prefix fold into one common prefix, which
//! counts toward `max_keys` like an object. At most `max_keys + 1` entries are
//! materialized; the extra one only decides truncation.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use super::types::{MultipartUploadRecord, ObjectRecord};

/// Parameters of an object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only keys starting with this.
    pub prefix: String,
    /// Fold keys on this; empty disables folding.
    pub delimiter: String,
    /// Exclusive start key.
    pub marker: String,
    /// Page size.
    pub max_keys: usize,
}

/// One page of objects.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Latest, non-deleted rows.
    pub objects: Vec<ObjectRecord>,
    /// Folded prefixes, each once.
    pub common_prefixes: Vec<String>,
    /// More entries follow.
    pub is_truncated: bool,
    /// Last key or prefix of the page when truncated.
    pub next_marker: Option<String>,
}

/// Parameters of a version listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionQuery {
    /// Only keys starting with this.
    pub prefix: String,
    /// Fold keys on this.
    pub delimiter: String,
    /// Start key.
    pub key_marker: String,
    /// Exclusive start version inside `key_marker`; empty skips the whole key.
    pub version_id_marker: String,
    /// Page size.
    pub max_keys: usize,
}

/// One page of versions.
#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    /// Rows with their latest flag.
    pub versions: Vec<(ObjectRecord, bool)>,
    /// Folded prefixes.
    pub common_prefixes: Vec<String>,
    /// More entries follow.
    pub is_truncated: bool,
    /// Key to resume from.
    pub next_key_marker: Option<String>,
    /// Version to resume after.
    pub next_version_id_marker: Option<String>,
}

/// Parameters of an upload listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadQuery {
    /// Only keys starting with this.
    pub prefix: String,
    /// Fold keys on this.
    pub delimiter: String,
    /// Start key.
    pub key_marker: String,
    /// Exclusive start upload inside `key_marker`.
    pub upload_id_marker: String,
    /// Page size.
    pub max_uploads: usize,
}

/// One page of uploads.
#[derive(Debug, Clone, Default)]
pub struct UploadPage {
    /// In-progress uploads.
    pub uploads: Vec<MultipartUploadRecord>,
    /// Folded prefixes.
    pub common_prefixes: Vec<String>,
    /// More entries follow.
    pub is_truncated: bool,
    /// Key to resume from.
    pub next_key_marker: Option<String>,
    /// Upload to resume after.
    pub next_upload_id_marker: Option<String>,
}

/// The common prefix `key` folds into, if any.
fn fold(key: &str, prefix: &str, delimiter: &str) -> Option<String> {
    if delimiter.is_empty() {
        return None;
    }
    let rest = key.get(prefix.len()..)?;
    rest.find(delimiter)
        .map(|pos| format!("{prefix}{}{delimiter}", &rest[..pos]))
}

/// Rows with keys at or after `start`.
fn rows_from<'a>(
    rows: &'a BTreeMap<String, Vec<ObjectRecord>>,
    start: &str,
) -> impl Iterator<Item = (&'a String, &'a Vec<ObjectRecord>)> {
    rows.range::<str, _>((Bound::Included(start), Bound::Unbounded))
}

/// Tracks page membership while scanning.
struct Collector {
    max: usize,
    count: usize,
    seen: HashSet<String>,
    prefixes: Vec<String>,
    truncated: bool,
}

impl Collector {
    fn new(max: usize) -> Self {
        Self {
            max,
            count: 0,
            seen: HashSet::new(),
            prefixes: Vec::new(),
            truncated: false,
        }
    }

    /// Reserve a slot; false once the page is full and truncation noted.
    fn admit(&mut self) -> bool {
        if self.count >= self.max {
            self.truncated = true;
            return false;
        }
        self.count += 1;
        true
    }

    /// Add a common prefix. Returns `None` when the page is full, `Some(true)`
    /// when the prefix was new.
    fn add_prefix(&mut self, cp: String) -> Option<bool> {
        if self.seen.contains(&cp) {
            return Some(false);
        }
        if !self.admit() {
            return None;
        }
        self.seen.insert(cp.clone());
        self.prefixes.push(cp);
        Some(true)
    }
}

/// List the latest live object of each key.
pub fn list_objects(rows: &BTreeMap<String, Vec<ObjectRecord>>, query: &ListQuery) -> ListPage {
    let mut collector = Collector::new(query.max_keys);
    let mut objects = Vec::new();
    let mut last: Option<String> = None;

    let start = query.marker.as_str().max(query.prefix.as_str());
    for (key, versions) in rows_from(rows, start) {
        if !key.starts_with(&query.prefix) {
            break;
        }
        if !query.marker.is_empty() && key.as_str() <= query.marker.as_str() {
            continue;
        }
        let Some(latest) = versions.first() else { continue };
        if latest.delete_marker {
            continue;
        }

        if let Some(cp) = fold(key, &query.prefix, &query.delimiter) {
            if cp.as_str() <= query.marker.as_str() {
                continue;
            }
            match collector.add_prefix(cp.clone()) {
                Some(true) => last = Some(cp),
                Some(false) => {}
                None => break,
            }
            continue;
        }

        if !collector.admit() {
            break;
        }
        last = Some(key.clone());
        objects.push(latest.clone());
    }

    ListPage {
        objects,
        common_prefixes: collector.prefixes,
        is_truncated: collector.truncated,
        next_marker: if collector.truncated { last } else { None },
    }
}

/// List every version row.
pub fn list_versions(
    rows: &BTreeMap<String, Vec<ObjectRecord>>,
    query: &VersionQuery,
) -> VersionPage {
    let mut collector = Collector::new(query.max_keys);
    let mut versions = Vec::new();
    let mut last: Option<(String, Option<String>)> = None;

    let start = query.key_marker.as_str().max(query.prefix.as_str());
    'keys: for (key, entries) in rows_from(rows, start) {
        if !key.starts_with(&query.prefix) {
            break;
        }
        let at_marker = key.as_str() == query.key_marker;
        if at_marker && query.version_id_marker.is_empty() {
            continue;
        }

        if let Some(cp) = fold(key, &query.prefix, &query.delimiter) {
            if !query.key_marker.is_empty() && cp.as_str() <= query.key_marker.as_str() {
                continue;
            }
            match collector.add_prefix(cp.clone()) {
                Some(true) => last = Some((cp, None)),
                Some(false) => {}
                None => break,
            }
            continue;
        }

        let mut skipping = at_marker;
        for (idx, row) in entries.iter().enumerate() {
            if skipping {
                if row.version_id == query.version_id_marker {
                    skipping = false;
                }
                continue;
            }
            if !collector.admit() {
                break 'keys;
            }
            last = Some((key.clone(), Some(row.version_id.clone())));
            versions.push((row.clone(), idx == 0));
        }
    }

    let (next_key_marker, next_version_id_marker) = match (collector.truncated, last) {
        (true, Some((key, version))) => (Some(key), version),
        _ => (None, None),
    };
    VersionPage {
        versions,
        common_prefixes: collector.prefixes,
        is_truncated: collector.truncated,
        next_key_marker,
        next_version_id_marker,
    }
}

/// List in-progress uploads ordered by key, then upload id.
pub fn list_uploads(
    uploads: &BTreeMap<(String, String), MultipartUploadRecord>,
    query: &UploadQuery,
) -> UploadPage {
    let mut collector = Collector::new(query.max_uploads);
    let mut page = Vec::new();
    let mut last: Option<(String, Option<String>)> = None;

    for ((key, upload_id), upload) in uploads {
        if !key.starts_with(&query.prefix) {
            continue;
        }
        if !query.key_marker.is_empty() {
            let before = if query.upload_id_marker.is_empty() {
                key.as_str() <= query.key_marker.as_str()
            } else {
                (key.as_str(), upload_id.as_str())
                    <= (query.key_marker.as_str(), query.upload_id_marker.as_str())
            };
            if before {
                continue;
            }
        }

        if let Some(cp) = fold(key, &query.prefix, &query.delimiter) {
            match collector.add_prefix(cp.clone()) {
                Some(true) => last = Some((cp, None)),
                Some(false) => {}
                None => break,
            }
            continue;
        }

        if !collector.admit() {
            break;
        }
        last = Some((key.clone(), Some(upload_id.clone())));
        page.push(upload.clone());
    }

    let (next_key_marker, next_upload_id_marker) = match (collector.truncated, last) {
        (true, Some((key, id))) => (Some(key), id),
        _ => (None, None),
    };
    UploadPage {
        uploads: page,
        common_prefixes: collector.prefixes,
        is_truncated: collector.truncated,
        next_key_marker,
        next_upload_id_marker,
    }
}
