//! Static domain → index routing table

use crate::defaults::{DEFAULT_CORPUS_INDEX, DEFAULT_DOMAIN};
use crate::error::{Result, RetrievalError};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Targets {
    One(String),
    Many(Vec<String>),
}

impl From<Targets> for Vec<String> {
    fn from(t: Targets) -> Self {
        match t {
            Targets::One(s) => vec![s],
            Targets::Many(v) => v,
        }
    }
}

/// Maps a query's declared domain to the indexes it should be searched in
///
/// An entry may fan out to several indexes. Unknown domains use the
/// `default` entry when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainMap {
    entries: HashMap<String, Vec<String>>,
}

impl DomainMap {
    pub fn new(entries: HashMap<String, Vec<String>>) -> Self {
        Self { entries }
    }

    /// Table shipped with the service: everything routes to the civil code
    pub fn builtin() -> Self {
        let civil = vec![DEFAULT_CORPUS_INDEX.to_string()];
        Self::new(HashMap::from([
            ("civil".to_string(), civil.clone()),
            (DEFAULT_DOMAIN.to_string(), civil),
        ]))
    }

    /// Parse `{"domain": "index" | ["index", ...], ...}`
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Targets> = serde_json::from_str(json)
            .map_err(|e| RetrievalError::config(format!("domain map: {}", e)))?;
        Ok(Self::new(
            raw.into_iter().map(|(k, v)| (k, v.into())).collect(),
        ))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Target indexes for a domain, falling back to `default`
    pub fn resolve(&self, domain: Option<&str>) -> Option<&[String]> {
        domain
            .and_then(|d| self.entries.get(d))
            .or_else(|| self.entries.get(DEFAULT_DOMAIN))
            .map(Vec::as_slice)
    }
}
