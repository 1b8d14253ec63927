// Tolerant decoding of vendor payloads
//
// Every vendor field read goes through here. A missing field, a null, or a
// value of the wrong JSON type decodes to the zero value instead of failing
// the whole payload.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

// ============================================================================
// serde field adapters (used with #[serde(default, deserialize_with = ...)])
// ============================================================================

pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

/// Accepts a JSON string or number as an identifier.
pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

pub fn f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Value::deserialize(d)?.as_f64().unwrap_or(0.0))
}

/// Numbers are truncated toward zero like the vendors' own integer casts.
pub fn i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(Value::deserialize(d)?.as_f64().map(|v| v as i64).unwrap_or(0))
}

/// `true` only for an explicit JSON `true`.
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(matches!(Value::deserialize(d)?, Value::Bool(true)))
}

/// `false` only for an explicit JSON `false`. Pair with `default = "yes"`.
pub fn flag_unless_false<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(!matches!(Value::deserialize(d)?, Value::Bool(false)))
}

pub fn yes() -> bool {
    true
}

/// `{"name": "..."}` → the name; anything else → empty.
pub fn nested_name<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

/// An object decoded with `T`'s own lenient rules; non-objects become `None`.
pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// A list whose undecodable entries are dropped instead of failing the list.
pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(decode_list(Value::deserialize(d)?))
}

/// Decode every entry of a JSON array that `T` accepts, skipping the rest.
pub fn decode_list<T: DeserializeOwned>(value: Value) -> Vec<T> {
    let Value::Array(entries) = value else {
        return Vec::new();
    };

    let total = entries.len();
    let decoded: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();

    if decoded.len() < total {
        tracing::warn!(
            skipped = total - decoded.len(),
            "Skipped malformed entries in vendor list"
        );
    }

    decoded
}

// ============================================================================
// Record: dynamic view over one OData entity
// ============================================================================

/// Read-only accessor over a JSON object whose field names are only known at
/// runtime (vendor field-mapping tables).
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    pub fn string(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn f64(&self, key: &str) -> f64 {
        self.fields.get(key).and_then(Value::as_f64).unwrap_or(0.0)
    }

    pub fn i64(&self, key: &str) -> i64 {
        self.fields
            .get(key)
            .and_then(Value::as_f64)
            .map(|v| v as i64)
            .unwrap_or(0)
    }

    /// `true` only for an explicit JSON `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.fields.get(key), Some(Value::Bool(true)))
    }

    /// Nested objects of an array field; non-object entries are skipped.
    pub fn children(&self, key: &str) -> Vec<Record<'a>> {
        match self.fields.get(key) {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(Value::as_object)
                .map(Record::new)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Wire {
        #[serde(default, deserialize_with = "id")]
        id: String,
        #[serde(default, deserialize_with = "f64")]
        price: f64,
        #[serde(default, deserialize_with = "i64")]
        stock: i64,
        #[serde(default = "yes", deserialize_with = "flag_unless_false")]
        is_active: bool,
        #[serde(default, deserialize_with = "flag")]
        is_default: bool,
        #[serde(default, deserialize_with = "nested_name")]
        category: String,
    }

    #[test]
    fn test_missing_fields_decode_to_zero_values() {
        let wire: Wire = serde_json::from_value(json!({})).unwrap();
        assert_eq!(wire.id, "");
        assert_eq!(wire.price, 0.0);
        assert_eq!(wire.stock, 0);
        assert!(wire.is_active);
        assert!(!wire.is_default);
        assert_eq!(wire.category, "");
    }

    #[test]
    fn test_mistyped_fields_decode_to_zero_values() {
        let wire: Wire = serde_json::from_value(json!({
            "id": 42,
            "price": null,
            "stock": "many",
            "is_active": "no",
            "is_default": 1,
            "category": "flat"
        }))
        .unwrap();

        assert_eq!(wire.id, "42");
        assert_eq!(wire.price, 0.0);
        assert_eq!(wire.stock, 0);
        assert!(wire.is_active);
        assert!(!wire.is_default);
        assert_eq!(wire.category, "");
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let wire: Wire = serde_json::from_value(json!({
            "price": 9.99,
            "stock": 7.9,
            "is_active": false,
            "is_default": true,
            "category": {"name": "Посуд"}
        }))
        .unwrap();

        assert_eq!(wire.price, 9.99);
        assert_eq!(wire.stock, 7);
        assert!(!wire.is_active);
        assert!(wire.is_default);
        assert_eq!(wire.category, "Посуд");
    }

    #[test]
    fn test_decode_list_skips_non_objects() {
        let rows: Vec<Wire> = decode_list(json!([{"id": "1"}, "garbage", 3, {"id": "2"}]));
        let ids: Vec<&str> = rows.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let none: Vec<Wire> = decode_list(json!({"id": "1"}));
        assert!(none.is_empty());
    }

    #[test]
    fn test_record_accessors() {
        let value = json!({
            "Ref_Key": "abc",
            "Вага": 1.5,
            "Кількість": 3.0,
            "ПозначкаВидалення": true,
            "Товари": [{"Ціна": 10.0}, "junk"]
        });
        let record = Record::new(value.as_object().unwrap());

        assert_eq!(record.string("Ref_Key"), "abc");
        assert_eq!(record.string("Вага"), "");
        assert_eq!(record.f64("Вага"), 1.5);
        assert_eq!(record.i64("Кількість"), 3);
        assert!(record.flag("ПозначкаВидалення"));
        assert!(!record.flag("Ref_Key"));
        assert_eq!(record.children("Товари").len(), 1);
        assert!(record.children("missing").is_empty());
    }
}
