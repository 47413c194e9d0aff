//! Manifest dialects and path normalization.
//!
//! Two manifest shapes exist in the family. The legacy flat dialect is a
//! `key = value` line format where unmatched lines are ignored and any
//! non-reserved key names a subset. The structured dialect is a YAML
//! document whose top-level mapping plays the same role, with subset values
//! allowed to be list-file paths, directories, or explicit path sequences.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ImportError;

static FLAT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\w+)\s*=\s*(.+)$").expect("valid manifest line pattern"));

/// A parsed manifest, loaded once and immutable afterwards.
#[derive(Clone, Debug)]
pub(crate) enum Manifest {
    /// Flat `key = value` lines, first-insertion order, duplicates keep the
    /// last value.
    Flat(IndexMap<String, String>),
    /// A YAML mapping in document order.
    Yaml(serde_yaml::Mapping),
}

impl Manifest {
    pub(crate) fn load_flat(path: &Path) -> Result<Self, ImportError> {
        let data = fs::read_to_string(path)?;
        let mut entries = IndexMap::new();

        for line in data.lines() {
            if let Some(caps) = FLAT_LINE.captures(line) {
                entries.insert(caps[1].to_string(), caps[2].to_string());
            }
        }

        Ok(Manifest::Flat(entries))
    }

    pub(crate) fn load_yaml(path: &Path) -> Result<Self, ImportError> {
        let data = fs::read_to_string(path)?;
        let value: serde_yaml::Value =
            serde_yaml::from_str(&data).map_err(|source| ImportError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        match value {
            serde_yaml::Value::Mapping(mapping) => Ok(Manifest::Yaml(mapping)),
            _ => Err(ImportError::ManifestInvalid {
                path: path.to_path_buf(),
                message: "expected a top-level mapping".to_string(),
            }),
        }
    }

    /// Keys naming subsets, in manifest order, with reserved keys excluded.
    pub(crate) fn subset_names(&self, reserved: &[&str]) -> Vec<String> {
        match self {
            Manifest::Flat(entries) => entries
                .keys()
                .filter(|key| !reserved.contains(&key.as_str()))
                .cloned()
                .collect(),
            Manifest::Yaml(mapping) => mapping
                .iter()
                .filter_map(|(key, _)| key.as_str())
                .filter(|key| !reserved.contains(key))
                .map(str::to_string)
                .collect(),
        }
    }

    /// String value for `key`, if present.
    pub(crate) fn get_str(&self, key: &str) -> Option<&str> {
        match self {
            Manifest::Flat(entries) => entries.get(key).map(String::as_str),
            Manifest::Yaml(mapping) => mapping.get(key).and_then(|value| value.as_str()),
        }
    }

    /// Raw YAML value for `key` (structured dialect only).
    pub(crate) fn yaml_entry(&self, key: &str) -> Option<&serde_yaml::Value> {
        match self {
            Manifest::Flat(_) => None,
            Manifest::Yaml(mapping) => mapping.get(key),
        }
    }
}

/// Normalizes a manifest-relative path: trims, slash-normalizes, collapses
/// `.`/`..` segments, and strips the conventional `data/` prefix. Applied
/// before any filesystem access.
pub(crate) fn localize_path(path: &str) -> String {
    let normalized = normalize_path(path.trim());
    match normalized.strip_prefix("data/") {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

/// Derives an item id from a (manifest-relative) image path: localizes,
/// strips `skip` leading segments unless the path is absolute or too short,
/// then drops the extension. Interior separators survive, so nested ids are
/// allowed.
pub(crate) fn name_from_path(path: &str, skip: usize) -> String {
    let localized = localize_path(path);
    let absolute = localized.starts_with('/');

    let parts: Vec<&str> = localized.split('/').collect();
    let stripped = if parts.len() > skip && !absolute {
        parts[skip..].join("/")
    } else {
        localized
    };

    strip_extension(&stripped)
}

/// Drops the extension of the final path segment, keeping dotfiles intact.
pub(crate) fn strip_extension(path: &str) -> String {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path.rfind('.') {
        Some(dot) if dot > segment_start => path[..dot].to_string(),
        _ => path.to_string(),
    }
}

fn normalize_path(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let absolute = replaced.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in replaced.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(&s) if s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
