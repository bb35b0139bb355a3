use super::{
    check_optional, check_repeated, nested_records, require_nested, require_text, ExecutorId,
    FrameworkId, OfferId, ProtocolRecord, SlaveId, TaskId,
};
use crate::converter::{FieldEncoder, HandlerField, HandlerValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    #[default]
    Scalar,
    Ranges,
    Set,
    Text,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Scalar => "SCALAR",
            ValueType::Ranges => "RANGES",
            ValueType::Set => "SET",
            ValueType::Text => "TEXT",
        }
    }
}

impl HandlerField for ValueType {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Text(self.as_str().to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scalar {
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub begin: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranges {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range: Vec<Range>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(default)]
    pub value: String,
}

impl ProtocolRecord for Scalar {
    const SCHEMA: &'static str = "Value.Scalar";

    fn collect_missing(&self, _path: &str, _missing: &mut Vec<String>) {}

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.field("value", &self.value)
    }
}

impl ProtocolRecord for Range {
    const SCHEMA: &'static str = "Value.Range";

    fn collect_missing(&self, _path: &str, _missing: &mut Vec<String>) {}

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.field("begin", &self.begin).field("end", &self.end)
    }
}

impl ProtocolRecord for Ranges {
    const SCHEMA: &'static str = "Value.Ranges";

    fn collect_missing(&self, _path: &str, _missing: &mut Vec<String>) {}

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.repeated("range", &self.range)
    }
}

impl ProtocolRecord for Set {
    const SCHEMA: &'static str = "Value.Set";

    fn collect_missing(&self, _path: &str, _missing: &mut Vec<String>) {}

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.repeated("item", &self.item)
    }
}

impl ProtocolRecord for Text {
    const SCHEMA: &'static str = "Value.Text";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "value", &self.value);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.field("value", &self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Ranges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Set>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Resource {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: ValueType::Scalar,
            scalar: Some(Scalar { value }),
            ..Default::default()
        }
    }

    pub fn ranges(name: impl Into<String>, ranges: Vec<Range>) -> Self {
        Self {
            name: name.into(),
            kind: ValueType::Ranges,
            ranges: Some(Ranges { range: ranges }),
            ..Default::default()
        }
    }
}

impl ProtocolRecord for Resource {
    const SCHEMA: &'static str = "Resource";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "name", &self.name);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("name", &self.name)
            .field("type", &self.kind)
            .optional("scalar", &self.scalar)
            .optional("ranges", &self.ranges)
            .optional("set", &self.set)
            .optional("role", &self.role)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalar: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Ranges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Set>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
}

impl ProtocolRecord for Attribute {
    const SCHEMA: &'static str = "Attribute";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "name", &self.name);
        check_optional(missing, path, "text", &self.text);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("name", &self.name)
            .field("type", &self.kind)
            .optional("scalar", &self.scalar)
            .optional("ranges", &self.ranges)
            .optional("set", &self.set)
            .optional("text", &self.text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ip: u32,
    #[serde(default = "default_master_port")]
    pub port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

fn default_master_port() -> u32 {
    5050
}

impl ProtocolRecord for MasterInfo {
    const SCHEMA: &'static str = "MasterInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "id", &self.id);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("id", &self.id)
            .field("ip", &self.ip)
            .field("port", &self.port)
            .optional("pid", &self.pid)
            .optional("hostname", &self.hostname)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<FrameworkId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_timeout: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl ProtocolRecord for FrameworkInfo {
    const SCHEMA: &'static str = "FrameworkInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "user", &self.user);
        require_text(missing, path, "name", &self.name);
        check_optional(missing, path, "id", &self.id);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("user", &self.user)
            .field("name", &self.name)
            .optional("id", &self.id)
            .optional("failover_timeout", &self.failover_timeout)
            .optional("checkpoint", &self.checkpoint)
            .optional("role", &self.role)
            .optional("hostname", &self.hostname)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaveInfo {
    #[serde(default)]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<bool>,
}

impl ProtocolRecord for SlaveInfo {
    const SCHEMA: &'static str = "SlaveInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "hostname", &self.hostname);
        check_repeated(missing, path, "resources", &self.resources);
        check_repeated(missing, path, "attributes", &self.attributes);
        check_optional(missing, path, "id", &self.id);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("hostname", &self.hostname)
            .optional("port", &self.port)
            .repeated("resources", &self.resources)
            .repeated("attributes", &self.attributes)
            .optional("id", &self.id)
            .optional("checkpoint", &self.checkpoint)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandUri {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<bool>,
}

impl ProtocolRecord for CommandUri {
    const SCHEMA: &'static str = "CommandInfo.URI";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "value", &self.value);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("value", &self.value)
            .optional("executable", &self.executable)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<CommandUri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl CommandInfo {
    pub fn shell(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }
}

impl ProtocolRecord for CommandInfo {
    const SCHEMA: &'static str = "CommandInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "value", &self.value);
        check_repeated(missing, path, "uris", &self.uris);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("value", &self.value)
            .repeated("uris", &self.uris)
            .optional("user", &self.user)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    #[serde(default)]
    pub executor_id: ExecutorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<FrameworkId>,
    #[serde(default)]
    pub command: CommandInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl ProtocolRecord for ExecutorInfo {
    const SCHEMA: &'static str = "ExecutorInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_nested(missing, path, "executor_id", &self.executor_id);
        check_optional(missing, path, "framework_id", &self.framework_id);
        require_nested(missing, path, "command", &self.command);
        check_repeated(missing, path, "resources", &self.resources);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("executor_id", &self.executor_id)
            .optional("framework_id", &self.framework_id)
            .field("command", &self.command)
            .repeated("resources", &self.resources)
            .optional("name", &self.name)
            .optional("source", &self.source)
            .bytes("data", &self.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_id: TaskId,
    #[serde(default)]
    pub slave_id: SlaveId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
}

impl ProtocolRecord for TaskInfo {
    const SCHEMA: &'static str = "TaskInfo";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_text(missing, path, "name", &self.name);
        require_nested(missing, path, "task_id", &self.task_id);
        require_nested(missing, path, "slave_id", &self.slave_id);
        check_repeated(missing, path, "resources", &self.resources);
        check_optional(missing, path, "executor", &self.executor);
        check_optional(missing, path, "command", &self.command);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("name", &self.name)
            .field("task_id", &self.task_id)
            .field("slave_id", &self.slave_id)
            .repeated("resources", &self.resources)
            .optional("executor", &self.executor)
            .optional("command", &self.command)
            .bytes("data", &self.data)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    #[default]
    #[serde(rename = "TASK_STAGING")]
    Staging,
    #[serde(rename = "TASK_STARTING")]
    Starting,
    #[serde(rename = "TASK_RUNNING")]
    Running,
    #[serde(rename = "TASK_FINISHED")]
    Finished,
    #[serde(rename = "TASK_FAILED")]
    Failed,
    #[serde(rename = "TASK_KILLED")]
    Killed,
    #[serde(rename = "TASK_LOST")]
    Lost,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Staging => "TASK_STAGING",
            TaskState::Starting => "TASK_STARTING",
            TaskState::Running => "TASK_RUNNING",
            TaskState::Finished => "TASK_FINISHED",
            TaskState::Failed => "TASK_FAILED",
            TaskState::Killed => "TASK_KILLED",
            TaskState::Lost => "TASK_LOST",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Finished | TaskState::Failed | TaskState::Killed | TaskState::Lost
        )
    }
}

impl HandlerField for TaskState {
    fn encode(&self) -> HandlerValue {
        HandlerValue::Text(self.as_str().to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub task_id: TaskId,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl TaskStatus {
    pub fn new(task_id: TaskId, state: TaskState) -> Self {
        Self {
            task_id,
            state,
            ..Default::default()
        }
    }
}

impl ProtocolRecord for TaskStatus {
    const SCHEMA: &'static str = "TaskStatus";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_nested(missing, path, "task_id", &self.task_id);
        check_optional(missing, path, "slave_id", &self.slave_id);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("task_id", &self.task_id)
            .field("state", &self.state)
            .optional("message", &self.message)
            .bytes("data", &self.data)
            .optional("slave_id", &self.slave_id)
            .optional("timestamp", &self.timestamp)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(default)]
    pub id: OfferId,
    #[serde(default)]
    pub framework_id: FrameworkId,
    #[serde(default)]
    pub slave_id: SlaveId,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executor_ids: Vec<ExecutorId>,
}

impl Offer {
    pub fn new(
        id: OfferId,
        framework_id: FrameworkId,
        slave_id: SlaveId,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            id,
            framework_id,
            slave_id,
            hostname: hostname.into(),
            ..Default::default()
        }
    }
}

impl ProtocolRecord for Offer {
    const SCHEMA: &'static str = "Offer";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        require_nested(missing, path, "id", &self.id);
        require_nested(missing, path, "framework_id", &self.framework_id);
        require_nested(missing, path, "slave_id", &self.slave_id);
        require_text(missing, path, "hostname", &self.hostname);
        check_repeated(missing, path, "resources", &self.resources);
        check_repeated(missing, path, "attributes", &self.attributes);
        check_repeated(missing, path, "executor_ids", &self.executor_ids);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .field("id", &self.id)
            .field("framework_id", &self.framework_id)
            .field("slave_id", &self.slave_id)
            .field("hostname", &self.hostname)
            .repeated("resources", &self.resources)
            .repeated("attributes", &self.attributes)
            .repeated("executor_ids", &self.executor_ids)
    }
}

/// Resource request sent through `SchedulerDriver::request_resources`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<SlaveId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

impl ProtocolRecord for Request {
    const SCHEMA: &'static str = "Request";

    fn collect_missing(&self, path: &str, missing: &mut Vec<String>) {
        check_optional(missing, path, "slave_id", &self.slave_id);
        check_repeated(missing, path, "resources", &self.resources);
    }

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields
            .optional("slave_id", &self.slave_id)
            .repeated("resources", &self.resources)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuse_seconds: Option<f64>,
}

impl ProtocolRecord for Filters {
    const SCHEMA: &'static str = "Filters";

    fn collect_missing(&self, _path: &str, _missing: &mut Vec<String>) {}

    fn encode_fields(&self, fields: FieldEncoder) -> FieldEncoder {
        fields.optional("refuse_seconds", &self.refuse_seconds)
    }
}

nested_records!(
    Scalar,
    Range,
    Ranges,
    Set,
    Text,
    Resource,
    Attribute,
    MasterInfo,
    FrameworkInfo,
    SlaveInfo,
    CommandUri,
    CommandInfo,
    ExecutorInfo,
    TaskInfo,
    TaskStatus,
    Offer,
    Request,
    Filters,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_status_encodes_state_as_text() {
        let status = TaskStatus {
            message: Some("started".to_string()),
            ..TaskStatus::new(TaskId::new("t1"), TaskState::Running)
        };
        let value = status.to_record_value();

        assert_eq!(value.schema(), Some("TaskStatus"));
        assert_eq!(
            value.field("state").and_then(HandlerValue::as_text),
            Some("TASK_RUNNING")
        );
        assert_eq!(
            value.path("task_id.value").and_then(HandlerValue::as_text),
            Some("t1")
        );
        assert!(value.field("slave_id").is_none());
    }

    #[test]
    fn task_state_wire_names_match_serde() {
        for state in [
            TaskState::Staging,
            TaskState::Running,
            TaskState::Finished,
            TaskState::Lost,
        ] {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, serde_json::Value::String(state.as_str().to_string()));
        }
        assert!(TaskState::Killed.is_terminal());
        assert!(!TaskState::Starting.is_terminal());
    }

    #[test]
    fn executor_info_requires_command() {
        let info = ExecutorInfo {
            executor_id: ExecutorId::new("exec"),
            ..Default::default()
        };
        assert_eq!(info.missing_fields(), vec!["command.value".to_string()]);
    }

    #[test]
    fn master_info_defaults_port() {
        let info: MasterInfo = serde_json::from_str(r#"{"id": "master@1", "ip": 1}"#).unwrap();
        assert_eq!(info.port, 5050);
        assert!(info.missing_fields().is_empty());
    }
}
