//! Search criteria canonicalization
//!
//! Two criteria values built from the same field/value pairs must produce
//! the same cache key no matter the order the fields were added in. Fields
//! are kept in a BTreeMap so serialization is always lexicographic, and the
//! serialized form is base64url-encoded into an opaque token.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An unordered set of search filter fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCriteria {
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an arbitrary filter field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn property_type(self, value: impl Into<String>) -> Self {
        self.with_field("property_type", value.into())
    }

    pub fn listing_kind(self, value: impl Into<String>) -> Self {
        self.with_field("listing_kind", value.into())
    }

    pub fn min_price(self, value: i64) -> Self {
        self.with_field("min_price", value)
    }

    pub fn max_price(self, value: i64) -> Self {
        self.with_field("max_price", value)
    }

    pub fn city(self, value: impl Into<String>) -> Self {
        self.with_field("city", value.into())
    }

    pub fn bedrooms(self, value: i64) -> Self {
        self.with_field("bedrooms", value)
    }

    pub fn page(self, value: i64) -> Self {
        self.with_field("page", value)
    }

    pub fn per_page(self, value: i64) -> Self {
        self.with_field("per_page", value)
    }

    pub fn sort(self, value: impl Into<String>) -> Self {
        self.with_field("sort", value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reads a string-valued field, if present
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Reads an integer-valued field, if present
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    /// Reads a boolean-valued field, if present
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Produces the deterministic, order-independent cache token.
    ///
    /// BTreeMap iteration is lexicographic by field name, so the JSON text
    /// is canonical; serializing a map of `Value`s cannot fail.
    pub fn canonical_token(&self) -> String {
        let json = serde_json::to_string(&self.fields).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }
}
