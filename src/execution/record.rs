use super::status::ExecutionStatus;
use crate::definition::{BoundingBox, ProcessDefinition, ResourceIdentifier, StepOperation, Tool};
use crate::error::ExecutionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a revision of a process definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessIdentifier {
    pub id: i64,
    pub version: i64,
}

impl ProcessIdentifier {
    pub fn new(id: i64, version: i64) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for ProcessIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} (v{})", self.id, self.version)
    }
}

/// The role a file plays for the step that recorded it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepFileRole {
    Input,
    Output,
    Configuration,
    Kpi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataFormat {
    Csv,
    Gpx,
    Geojson,
    OsmXml,
    OsmPbf,
    Shapefile,
    Json,
    Xml,
    RdfXml,
    RdfXmlAbbrev,
    Turtle,
    NTriples,
    N3,
}

/// A file consumed or produced by an executed step.
///
/// The path is the record's identity and never changes once recorded;
/// only the fields carried by [`FileUpdate`] may be filled in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExecutionStepFileRecord {
    pub role: StepFileRole,
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub data_format: Option<DataFormat>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub output_part: Option<String>,
    #[serde(default)]
    pub resource: Option<ResourceIdentifier>,
    #[serde(default)]
    pub verified: bool,
}

impl ProcessExecutionStepFileRecord {
    pub fn new(role: StepFileRole, path: &str) -> Self {
        Self {
            role,
            path: path.to_string(),
            size: None,
            data_format: None,
            bounding_box: None,
            table_name: None,
            output_part: None,
            resource: None,
            verified: false,
        }
    }

    /// Shorthand for an OUTPUT file of the given part.
    pub fn output(path: &str, part: &str) -> Self {
        Self {
            output_part: Some(part.to_string()),
            ..Self::new(StepFileRole::Output, path)
        }
    }

    pub fn with_table(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }

    pub fn with_format(mut self, data_format: DataFormat) -> Self {
        self.data_format = Some(data_format);
        self
    }

    /// Identity fields must agree for two records of the same path.
    fn same_identity(&self, other: &Self) -> bool {
        self.role == other.role
            && self.path == other.path
            && self.data_format == other.data_format
            && self.output_part == other.output_part
    }

    pub(crate) fn apply(&mut self, update: &FileUpdate) {
        self.size = update.size.or(self.size);
        self.bounding_box = update.bounding_box.or(self.bounding_box);
        if update.table_name.is_some() {
            self.table_name = update.table_name.clone();
        }
        self.resource = update.resource.or(self.resource);
    }
}

/// The updatable subset of a file record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileUpdate {
    pub size: Option<u64>,
    pub bounding_box: Option<BoundingBox>,
    pub table_name: Option<String>,
    pub resource: Option<ResourceIdentifier>,
}

impl From<&ProcessExecutionStepFileRecord> for FileUpdate {
    fn from(record: &ProcessExecutionStepFileRecord) -> Self {
        Self {
            size: record.size,
            bounding_box: record.bounding_box,
            table_name: record.table_name.clone(),
            resource: record.resource,
        }
    }
}

/// What one step of an execution did, and which files it touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExecutionStepRecord {
    pub key: i32,
    pub name: String,
    pub tool: Tool,
    pub operation: StepOperation,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub files: Vec<ProcessExecutionStepFileRecord>,
}

impl ProcessExecutionStepRecord {
    pub fn new(key: i32, name: &str, tool: Tool) -> Self {
        Self {
            key,
            name: name.to_string(),
            tool,
            operation: tool.operation(),
            status: ExecutionStatus::Unknown,
            started_on: None,
            completed_on: None,
            error_message: None,
            files: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_file(mut self, file: ProcessExecutionStepFileRecord) -> Self {
        self.files.push(file);
        self
    }

    pub fn file(&self, role: StepFileRole, part: Option<&str>) -> Option<&ProcessExecutionStepFileRecord> {
        self.files
            .iter()
            .find(|f| f.role == role && f.output_part.as_deref() == part)
    }

    pub fn output_file(&self, part: &str) -> Option<&ProcessExecutionStepFileRecord> {
        self.file(StepFileRole::Output, Some(part))
    }

    pub fn file_by_path(&self, path: &str) -> Option<&ProcessExecutionStepFileRecord> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Appends a new file or refreshes the updatable fields of an existing one.
    /// Returns `false` when `file` collides with a recorded file's identity.
    pub(crate) fn merge_file(&mut self, file: ProcessExecutionStepFileRecord) -> bool {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) if existing.same_identity(&file) => {
                existing.apply(&FileUpdate::from(&file));
                true
            }
            Some(_) => false,
            None => {
                self.files.push(file);
                true
            }
        }
    }
}

/// A requested change to an execution. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionUpdate {
    pub status: Option<ExecutionStatus>,
    pub started_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ExecutionUpdate {
    pub fn status(status: ExecutionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ExecutionStatus::Running),
            started_on: Some(at),
            ..Self::default()
        }
    }

    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ExecutionStatus::Completed),
            completed_on: Some(at),
            ..Self::default()
        }
    }

    pub fn failed(at: DateTime<Utc>, error_message: &str) -> Self {
        Self {
            status: Some(ExecutionStatus::Failed),
            completed_on: Some(at),
            error_message: Some(error_message.to_string()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.started_on.is_none()
            && self.completed_on.is_none()
            && self.error_message.is_none()
    }
}

/// A single run of a process definition revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessExecutionRecord {
    pub id: i64,
    pub process: ProcessIdentifier,
    pub submitted_on: DateTime<Utc>,
    #[serde(default)]
    pub started_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub steps: Vec<ProcessExecutionStepRecord>,
}

impl ProcessExecutionRecord {
    /// A freshly submitted execution, in UNKNOWN status.
    pub fn new(id: i64, process: ProcessIdentifier, submitted_on: DateTime<Utc>) -> Self {
        Self {
            id,
            process,
            submitted_on,
            started_on: None,
            completed_on: None,
            status: ExecutionStatus::Unknown,
            error_message: None,
            steps: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn step(&self, key: i32) -> Option<&ProcessExecutionStepRecord> {
        self.steps.iter().find(|s| s.key == key)
    }

    pub fn step_by_name(&self, name: &str) -> Option<&ProcessExecutionStepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Re-keys step records after their definition was renumbered (see
    /// [`ProcessDefinition::normalize`]). Records are matched to steps by
    /// name; a record with no step of that name keeps its key. Returns the
    /// number of records whose key changed.
    pub fn align_step_keys(&mut self, definition: &ProcessDefinition) -> usize {
        let mut changed = 0;
        for record in &mut self.steps {
            if let Some(step) = definition.step_by_name(&record.name) {
                if record.key != step.key {
                    record.key = step.key;
                    changed += 1;
                }
            }
        }
        changed
    }

    pub(crate) fn step_mut(&mut self, key: i32) -> Option<&mut ProcessExecutionStepRecord> {
        self.steps.iter_mut().find(|s| s.key == key)
    }

    pub fn start(&mut self, at: DateTime<Utc>) -> Result<(), ExecutionError> {
        self.apply(&ExecutionUpdate::started(at))
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), ExecutionError> {
        self.apply(&ExecutionUpdate::completed(at))
    }

    pub fn fail(&mut self, at: DateTime<Utc>, error_message: &str) -> Result<(), ExecutionError> {
        self.apply(&ExecutionUpdate::failed(at, error_message))
    }

    pub fn stop(&mut self) -> Result<(), ExecutionError> {
        self.apply(&ExecutionUpdate::status(ExecutionStatus::Stopped))
    }

    /// Applies `update` if every lifecycle rule holds; otherwise the record
    /// is left exactly as it was.
    ///
    /// A missing `started_on` on UNKNOWN→RUNNING, or a missing `completed_on`
    /// on RUNNING→COMPLETED/FAILED, is filled with the current time.
    pub fn apply(&mut self, update: &ExecutionUpdate) -> Result<(), ExecutionError> {
        let previous = self.status;
        let next = update.status.unwrap_or(previous);

        if previous.is_terminal() {
            if next != previous {
                return Err(self.invalid_transition(next));
            }
            if !update_is_status_only(update) {
                return Err(self.invalid_update(format!(
                    "status {previous} is terminal; the execution can no longer change"
                )));
            }
            return Ok(());
        }

        if next != previous && !previous.can_transition_to(next) {
            return Err(self.invalid_transition(next));
        }

        let starting = previous == ExecutionStatus::Unknown && next == ExecutionStatus::Running;
        let finishing = previous == ExecutionStatus::Running
            && matches!(next, ExecutionStatus::Completed | ExecutionStatus::Failed);

        if update.started_on.is_some() && !starting {
            return Err(self.invalid_update(
                "`started_on` can only be set when moving from UNKNOWN to RUNNING".to_string(),
            ));
        }
        if update.completed_on.is_some() && !finishing {
            return Err(self.invalid_update(
                "`completed_on` can only be set when moving from RUNNING to COMPLETED or FAILED"
                    .to_string(),
            ));
        }

        let error_message = update.error_message.as_deref().map(str::trim);
        match (next, error_message) {
            (ExecutionStatus::Failed, Some(message)) if !message.is_empty() => {}
            (ExecutionStatus::Failed, _) => {
                return Err(self.invalid_update(
                    "a FAILED execution requires a non-empty error message".to_string(),
                ));
            }
            (_, Some(_)) => {
                return Err(self.invalid_update(
                    "an error message is only accepted for FAILED executions".to_string(),
                ));
            }
            _ => {}
        }

        if starting {
            self.started_on = Some(update.started_on.unwrap_or_else(Utc::now));
        }
        if finishing {
            self.completed_on = Some(update.completed_on.unwrap_or_else(Utc::now));
        }
        if let Some(message) = &update.error_message {
            self.error_message = Some(message.clone());
        }
        self.status = next;
        Ok(())
    }

    fn invalid_transition(&self, to: ExecutionStatus) -> ExecutionError {
        ExecutionError::InvalidTransition {
            execution_id: self.id,
            from: self.status,
            to,
        }
    }

    fn invalid_update(&self, reason: String) -> ExecutionError {
        ExecutionError::InvalidUpdate {
            execution_id: self.id,
            reason,
        }
    }
}

fn update_is_status_only(update: &ExecutionUpdate) -> bool {
    update.started_on.is_none() && update.completed_on.is_none() && update.error_message.is_none()
}
