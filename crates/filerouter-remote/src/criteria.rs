use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter sent with a catalog listing, serialized as a JSON object in the
/// `criteria` query parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Criteria(BTreeMap<String, Value>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn to_query(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

/// Where a listing starts and how many records each page request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingParams {
    /// First page to fetch (starts from 1).
    pub page: u32,
    pub per_page: u32,
}

impl PagingParams {
    pub const DEFAULT_PER_PAGE: u32 = 25;

    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(per_page: u32) -> Self {
        Self::new(1, per_page)
    }
}

impl Default for PagingParams {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}
