use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

pub type Fields = BTreeMap<String, Value>;

/// A Firestore value in its REST (typed JSON) encoding, e.g. `{"integerValue": "42"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(#[serde(with = "double")] f64),
    TimestampValue(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(serde_json::Value),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

/// Doubles arrive as JSON numbers, except the non-finite ones which Firestore
/// spells `"NaN"`, `"Infinity"` and `"-Infinity"`.
mod double {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDouble {
        Number(f64),
        Text(String),
    }

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else if value.is_infinite() {
            serializer.serialize_str("-Infinity")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match RawDouble::deserialize(deserializer)? {
            RawDouble::Number(value) => Ok(value),
            RawDouble::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse()
                    .map_err(|_| D::Error::custom(format!("invalid double {other:?}"))),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(default)]
    pub fields: Fields,
}

impl Value {
    pub fn integer(value: u64) -> Self {
        Value::IntegerValue(value.to_string())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::StringValue(value.into())
    }

    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Value::ArrayValue(ArrayValue {
            values: values.into_iter().collect(),
        })
    }

    /// Milliseconds since the epoch, for the value kinds that can carry a point in time.
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Value::IntegerValue(raw) => raw.trim().parse().ok(),
            Value::DoubleValue(value) if value.is_finite() => Some(*value as i64),
            Value::TimestampValue(at) => i64::try_from(at.unix_timestamp_nanos() / 1_000_000).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::StringValue(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn millis(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_millis)
    }

    /// A string field, treating an empty string the same as a missing one.
    pub fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentWrite<'a> {
    pub fields: &'a Fields,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn value__should_decode_rest_encoding() {
        // Given
        let raw = r#"{
            "name": "projects/p/databases/(default)/documents/users/u1",
            "fields": {
                "createdAt": {"integerValue": "1709294400000"},
                "nickname": {"stringValue": "kim"},
                "seen": {"timestampValue": "2024-03-01T12:00:00.250Z"},
                "tags": {"arrayValue": {"values": [{"stringValue": "a"}]}},
                "empty": {"arrayValue": {}},
                "profile": {"mapValue": {"fields": {"age": {"integerValue": "30"}}}},
                "gone": {"nullValue": null}
            },
            "createTime": "2024-03-01T12:00:00Z"
        }"#;

        // When
        let document: Document = serde_json::from_str(raw).expect("decode document");

        // Then
        assert_eq!(document.millis("createdAt"), Some(1_709_294_400_000));
        assert_eq!(document.millis("seen"), Some(1_709_294_400_250));
        assert_eq!(document.non_empty_str("nickname"), Some("kim"));
        assert_eq!(document.fields["empty"], Value::array([]));
        assert_eq!(document.fields["gone"], Value::NullValue(()));
        assert!(matches!(document.fields["profile"], Value::MapValue(_)));
    }

    #[test]
    fn value__should_encode_integers_as_strings() {
        // Given
        let mut fields = Fields::new();
        fields.insert("totalUsers".to_string(), Value::integer(12));
        fields.insert(
            "lastUpdated".to_string(),
            Value::TimestampValue(datetime!(2024-03-01 12:00 UTC)),
        );

        // When
        let json = serde_json::to_value(DocumentWrite { fields: &fields }).expect("encode");

        // Then
        assert_eq!(
            json,
            serde_json::json!({
                "fields": {
                    "lastUpdated": {"timestampValue": "2024-03-01T12:00:00Z"},
                    "totalUsers": {"integerValue": "12"}
                }
            })
        );
    }

    #[test]
    fn millis__should_ignore_non_temporal_values() {
        // Then
        assert_eq!(Value::string("1709294400000").as_millis(), None);
        assert_eq!(Value::BooleanValue(true).as_millis(), None);
        assert_eq!(Value::IntegerValue("abc".to_string()).as_millis(), None);
        assert_eq!(Value::DoubleValue(1.5e3).as_millis(), Some(1500));
    }

    #[test]
    fn list_response__should_decode_non_finite_doubles() {
        // Given
        let raw = r#"{"documents": [{"name": "users/u1", "fields": {
            "score": {"doubleValue": "NaN"},
            "ceiling": {"doubleValue": "Infinity"},
            "floor": {"doubleValue": "-Infinity"},
            "ratio": {"doubleValue": 0.5},
            "createdAt": {"integerValue": "1709294400000"}
        }}]}"#;

        // When
        let page: ListDocumentsResponse = serde_json::from_str(raw).expect("decode page");

        // Then
        let document = &page.documents[0];
        assert!(matches!(document.fields["score"], Value::DoubleValue(value) if value.is_nan()));
        assert_eq!(document.fields["ceiling"], Value::DoubleValue(f64::INFINITY));
        assert_eq!(document.fields["floor"], Value::DoubleValue(f64::NEG_INFINITY));
        assert_eq!(document.fields["ratio"], Value::DoubleValue(0.5));
        assert_eq!(document.millis("score"), None);
        assert_eq!(document.millis("createdAt"), Some(1_709_294_400_000));
    }

    #[test]
    fn value__should_encode_non_finite_doubles_as_strings() {
        // When
        let json = serde_json::to_value(Value::DoubleValue(f64::NEG_INFINITY)).expect("encode");

        // Then
        assert_eq!(json, serde_json::json!({ "doubleValue": "-Infinity" }));
    }

    #[test]
    fn list_response__should_default_missing_documents() {
        // When
        let page: ListDocumentsResponse = serde_json::from_str("{}").expect("decode page");

        // Then
        assert!(page.documents.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
