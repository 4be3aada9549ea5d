//! Response shaping
//!
//! Turns the fetched row snapshot into the four lookup structures returned by
//! `/api/service_data`. Everything is derived from one pass order over the same
//! rows, so key order and last-write-wins resolution are deterministic.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::models::{key_of, ServiceDetailRow};

/// Rows bucketed by category, buckets in first-seen order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedData {
    buckets: Vec<(String, Vec<ServiceDetailRow>)>,
    index: HashMap<String, usize>,
}

impl GroupedData {
    /// Append a row to its category bucket, creating the bucket on first sight
    pub fn push(&mut self, category: String, row: ServiceDetailRow) {
        match self.index.get(&category) {
            Some(&slot) => self.buckets[slot].1.push(row),
            None => {
                self.index.insert(category.clone(), self.buckets.len());
                self.buckets.push((category, vec![row]));
            }
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(category, _)| category.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[ServiceDetailRow]> {
        self.index
            .get(category)
            .map(|&slot| self.buckets[slot].1.as_slice())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl Serialize for GroupedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (category, rows) in &self.buckets {
            map.serialize_entry(category, rows)?;
        }
        map.end()
    }
}

/// Full response body for a successful lookup
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ServiceData {
    pub grouped_data: GroupedData,
    pub option_price_map: Map<String, JsonValue>,
    pub keyword_price_map: Map<String, JsonValue>,
    pub option_keyword_map: Map<String, JsonValue>,
}

/// Shape a row snapshot into the response structures.
///
/// Flat maps keep the position of a key's first insertion; a later row with the
/// same key only replaces the value.
pub fn shape(rows: Vec<ServiceDetailRow>) -> ServiceData {
    let mut data = ServiceData::default();

    for row in &rows {
        data.option_price_map
            .insert(key_of(row.option()), row.price().clone());
        data.keyword_price_map
            .insert(key_of(row.keyword()), row.price().clone());
        data.option_keyword_map
            .insert(key_of(row.option()), row.keyword().clone());
    }

    for row in rows {
        let category = key_of(row.category());
        data.grouped_data.push(category, row);
    }

    data
}
