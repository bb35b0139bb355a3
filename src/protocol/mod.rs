//! Protocol records exchanged with the cluster driver.
//!
//! Each record names its schema and knows which of its fields are required,
//! mirroring the wire schema's `required` markers. A record with an empty
//! required field cannot be serialized and therefore cannot be converted.

/// Lets records nest inside other records' field encoders.
macro_rules! nested_records {
    ($($record:ty),* $(,)?) => {
        $(
            impl $crate::converter::HandlerField for $record {
                fn encode(&self) -> $crate::converter::HandlerValue {
                    $crate::protocol::ProtocolRecord::to_record_value(self)
                }
            }
        )*
    };
}

pub(crate) use nested_records;

mod ids;
mod records;

pub use ids::{ExecutorId, FrameworkId, OfferId, SlaveId, TaskId};
pub use records::{
    Attribute, CommandInfo, CommandUri, ExecutorInfo, Filters, FrameworkInfo, MasterInfo, Offer,
    Range, Ranges, Request, Resource, Scalar, Set, SlaveInfo, TaskInfo, TaskState, TaskStatus,
    Text, ValueType,
};

use crate::converter::{FieldEncoder, HandlerValue};
use serde::{de::DeserializeOwned, Serialize};

pub trait ProtocolRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Schema name as known to the registry, e.g. `"TaskStatus"`.
    const SCHEMA: &'static str;

    /// Appends the dotted paths of unset required fields to `missing`.
    fn collect_missing(&self, path: &str, missing: &mut Vec<String>);

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder;

    fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        self.collect_missing("", &mut missing);
        missing
    }

    fn to_record_value(&self) -> HandlerValue {
        self.encode_fields(FieldEncoder::new()).finish(Self::SCHEMA)
    }
}

/// Every schema name defined in this module.
pub const SCHEMAS: &[&str] = &[
    FrameworkId::SCHEMA,
    OfferId::SCHEMA,
    SlaveId::SCHEMA,
    TaskId::SCHEMA,
    ExecutorId::SCHEMA,
    MasterInfo::SCHEMA,
    FrameworkInfo::SCHEMA,
    SlaveInfo::SCHEMA,
    ExecutorInfo::SCHEMA,
    CommandInfo::SCHEMA,
    CommandUri::SCHEMA,
    TaskInfo::SCHEMA,
    TaskStatus::SCHEMA,
    Offer::SCHEMA,
    Resource::SCHEMA,
    Attribute::SCHEMA,
    Scalar::SCHEMA,
    Range::SCHEMA,
    Ranges::SCHEMA,
    Set::SCHEMA,
    Text::SCHEMA,
    Request::SCHEMA,
    Filters::SCHEMA,
];

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

pub(crate) fn require_text(missing: &mut Vec<String>, path: &str, name: &str, value: &str) {
    if value.is_empty() {
        missing.push(child_path(path, name));
    }
}

pub(crate) fn require_nested<R: ProtocolRecord>(
    missing: &mut Vec<String>,
    path: &str,
    name: &str,
    value: &R,
) {
    value.collect_missing(&child_path(path, name), missing);
}

pub(crate) fn check_optional<R: ProtocolRecord>(
    missing: &mut Vec<String>,
    path: &str,
    name: &str,
    value: &Option<R>,
) {
    if let Some(value) = value {
        require_nested(missing, path, name, value);
    }
}

pub(crate) fn check_repeated<R: ProtocolRecord>(
    missing: &mut Vec<String>,
    path: &str,
    name: &str,
    values: &[R],
) {
    for (index, value) in values.iter().enumerate() {
        value.collect_missing(&format!("{}[{}]", child_path(path, name), index), missing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn schema_names_are_unique() {
        let unique: HashSet<_> = SCHEMAS.iter().collect();
        assert_eq!(unique.len(), SCHEMAS.len());
    }

    #[test]
    fn missing_fields_use_dotted_paths() {
        let offer = Offer {
            id: OfferId::new(""),
            framework_id: FrameworkId::new("fw"),
            slave_id: SlaveId::new("s1"),
            hostname: String::new(),
            resources: vec![Resource::scalar("", 1.0)],
            ..Default::default()
        };

        assert_eq!(
            offer.missing_fields(),
            vec![
                "id.value".to_string(),
                "hostname".to_string(),
                "resources[0].name".to_string()
            ]
        );
    }
}
