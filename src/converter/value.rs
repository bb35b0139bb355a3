use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Handler-side representation of a converted payload.
///
/// Records keep their schema name so a handler can tell an `OfferID` from a
/// `TaskID` without inspecting fields. `Bytes` is never interpreted as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HandlerValue {
    Null,
    Bool(bool),
    Int(i64),
    #[serde(rename = "uint")]
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<HandlerValue>),
    Record {
        schema: String,
        fields: BTreeMap<String, HandlerValue>,
    },
}

impl HandlerValue {
    pub fn schema(&self) -> Option<&str> {
        match self {
            HandlerValue::Record { schema, .. } => Some(schema),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&HandlerValue> {
        match self {
            HandlerValue::Record { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    /// Follows a dotted path through nested records, e.g. `task_id.value`.
    pub fn path(&self, path: &str) -> Option<&HandlerValue> {
        path.split('.')
            .try_fold(self, |value, name| value.field(name))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            HandlerValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HandlerValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HandlerValue::Int(value) => Some(*value),
            HandlerValue::UInt(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            HandlerValue::UInt(value) => Some(*value),
            HandlerValue::Int(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Dotted path of the first NaN or infinite float, if any.
    ///
    /// JSON has no encoding for them, so such a value cannot be decoded back.
    pub fn non_finite_path(&self) -> Option<String> {
        match self {
            HandlerValue::Float(value) if !value.is_finite() => Some(String::new()),
            HandlerValue::List(items) => items.iter().enumerate().find_map(|(index, item)| {
                item.non_finite_path()
                    .map(|rest| join_path(&format!("[{}]", index), &rest))
            }),
            HandlerValue::Record { fields, .. } => fields.iter().find_map(|(name, value)| {
                value.non_finite_path().map(|rest| join_path(name, &rest))
            }),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HandlerValue]> {
        match self {
            HandlerValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Text or bytes rendered for logs; invalid UTF-8 is replaced.
    pub fn to_text_lossy(&self) -> String {
        match self {
            HandlerValue::Text(text) => text.clone(),
            HandlerValue::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            other => format!("{:?}", other),
        }
    }

    /// Plain JSON shape used to decode a value back into a protocol record.
    ///
    /// Bytes become an array of numbers, which is how serde reads `Vec<u8>`.
    pub fn to_json(&self) -> Value {
        match self {
            HandlerValue::Null => Value::Null,
            HandlerValue::Bool(value) => Value::Bool(*value),
            HandlerValue::Int(value) => Value::Number(Number::from(*value)),
            HandlerValue::UInt(value) => Value::Number(Number::from(*value)),
            HandlerValue::Float(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            HandlerValue::Text(text) => Value::String(text.clone()),
            HandlerValue::Bytes(bytes) => {
                Value::Array(bytes.iter().map(|b| Value::Number((*b).into())).collect())
            }
            HandlerValue::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            HandlerValue::Record { fields, .. } => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

fn join_path(head: &str, rest: &str) -> String {
    if rest.is_empty() {
        head.to_string()
    } else if rest.starts_with('[') {
        format!("{}{}", head, rest)
    } else {
        format!("{}.{}", head, rest)
    }
}

/// A single field value that can be encoded into a [`HandlerValue`].
pub trait HandlerField {
    fn encode(&self) -> HandlerValue;
}

impl HandlerField for String {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Text(self.clone())
    }
}

impl HandlerField for bool {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Bool(*self)
    }
}

impl HandlerField for u32 {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Int(i64::from(*self))
    }
}

impl HandlerField for i32 {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Int(i64::from(*self))
    }
}

impl HandlerField for u64 {
    fn encode(&self) -> HandlerValue {
        HandlerValue::UInt(*self)
    }
}

impl HandlerField for f64 {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Float(*self)
    }
}

/// Collects the fields present in a record, skipping unset optionals and
/// empty repeated fields.
#[derive(Debug, Default)]
pub struct FieldEncoder {
    fields: BTreeMap<String, HandlerValue>,
}

impl FieldEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: HandlerField>(mut self, name: &str, value: &T) -> Self {
        self.fields.insert(name.to_string(), value.encode());
        self
    }

    pub fn optional<T: HandlerField>(mut self, name: &str, value: &Option<T>) -> Self {
        if let Some(value) = value {
            self.fields.insert(name.to_string(), value.encode());
        }
        self
    }

    pub fn repeated<T: HandlerField>(mut self, name: &str, values: &[T]) -> Self {
        if !values.is_empty() {
            self.fields.insert(
                name.to_string(),
                HandlerValue::List(values.iter().map(HandlerField::encode).collect()),
            );
        }
        self
    }

    pub fn bytes(mut self, name: &str, value: &Option<Vec<u8>>) -> Self {
        if let Some(bytes) = value {
            self.fields
                .insert(name.to_string(), HandlerValue::Bytes(bytes.clone()));
        }
        self
    }

    pub fn finish(self, schema: &str) -> HandlerValue {
        HandlerValue::Record {
            schema: schema.to_string(),
            fields: self.fields,
        }
    }
}
