//! Entities of the inthe.am API: tasks, their annotations and enumerations.
//!
//! # Design
//! Each entity declares its shape once and is an immutable snapshot of a
//! record that passed it. Changing a task goes through `Schemed::update`,
//! which produces a new snapshot or fails leaving the old one intact.
//!
//! Provider-specific keys (`resource_uri`, the `intheam*` kanban and email
//! metadata, `imask`, `wait`, ...) are validated but not interpreted. They
//! are kept in a passthrough record so a task fetched from the server
//! serializes back with every key it arrived with.

use std::fmt;
use std::sync::{Arc, LazyLock, Weak};

use uuid::Uuid;

use crate::coerce::{Clock, SystemClock, Timestamp};
use crate::enumeration::Enum;
use crate::error::{ApiError, ValidationError};
use crate::schema::{Coercer, Datum, Field, Fields, Kind, Record, Schemed, Shape, Source, Validator};

static STATUS_SYMBOLS: LazyLock<Enum<String>> = LazyLock::new(|| {
    Enum::define(
        "Status",
        &[],
        &[
            ("PENDING", "pending"),
            ("COMPLETED", "completed"),
            ("WAITING", "waiting"),
            ("DELETED", "deleted"),
        ],
    )
    .unwrap_or_else(|err| unreachable!("{err}"))
});

static PRIORITY_SYMBOLS: LazyLock<Enum<String>> = LazyLock::new(|| {
    Enum::define("Priority", &[], &[("HIGH", "H"), ("MEDIUM", "M"), ("LOW", "L")])
        .unwrap_or_else(|err| unreachable!("{err}"))
});

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Completed,
    Waiting,
    Deleted,
}

impl Status {
    /// The symbol table used to coerce raw status strings.
    pub fn symbols() -> &'static Enum<String> {
        &STATUS_SYMBOLS
    }

    /// Wire value, e.g. `"pending"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
            Status::Waiting => "waiting",
            Status::Deleted => "deleted",
        }
    }

    fn from_value(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Status::Pending),
            "completed" => Some(Status::Completed),
            "waiting" => Some(Status::Waiting),
            "deleted" => Some(Status::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority; the wire values are single letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn symbols() -> &'static Enum<String> {
        &PRIORITY_SYMBOLS
    }

    /// Wire value, e.g. `"H"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "H",
            Priority::Medium => "M",
            Priority::Low => "L",
        }
    }

    fn from_value(value: &str) -> Option<Self> {
        match value {
            "H" => Some(Priority::High),
            "M" => Some(Priority::Medium),
            "L" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

static ANNOTATION_SHAPE: LazyLock<Shape> = LazyLock::new(|| {
    Shape::new(
        "Annotation",
        vec![
            Field::required("description", Validator::NonEmptyStr),
            Field::required("entry", Validator::nullable(Validator::timestamp())),
        ],
    )
});

/// A note attached to a task.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    description: String,
    entry: Option<Timestamp>,
}

impl Annotation {
    /// Annotation stamped with the current wall-clock time.
    pub fn new(description: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new_with_clock(description, &SystemClock)
    }

    /// Annotation stamped with `clock.now()`, read at call time.
    pub fn new_with_clock(
        description: impl Into<String>,
        clock: &dyn Clock,
    ) -> Result<Self, ValidationError> {
        Self::with_entry(description, clock.now())
    }

    /// Annotation with an explicit entry: a timestamp, an RFC 2822 string,
    /// or `None`/`Datum::Null` for no entry at all.
    pub fn with_entry(
        description: impl Into<String>,
        entry: impl Into<Datum>,
    ) -> Result<Self, ValidationError> {
        let record: Record = [
            ("description", Datum::Str(description.into())),
            ("entry", entry.into()),
        ]
        .into_iter()
        .collect();
        <Self as Schemed>::validate(record)
    }

    /// Annotation with no entry timestamp.
    pub fn without_entry(description: impl Into<String>) -> Result<Self, ValidationError> {
        Self::with_entry(description, Datum::Null)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn entry(&self) -> Option<Timestamp> {
        self.entry
    }

    /// Validate raw data into an annotation.
    ///
    /// A bare string becomes an annotation with that description and no
    /// entry; anything else goes through the annotation shape.
    pub fn validate(source: impl Into<Source<Self>>) -> Result<Self, ValidationError> {
        match source.into() {
            Source::Raw(Datum::Str(description)) => Self::without_entry(description),
            other => <Self as Schemed>::validate(other),
        }
    }

    // Nested validator for `Task.annotations` items.
    fn coerce_nested(value: &Datum) -> Result<Datum, ValidationError> {
        Self::validate(value.clone()).map(|annotation| Datum::Record(annotation.to_record()))
    }
}

impl Schemed for Annotation {
    fn shape() -> &'static Shape {
        &ANNOTATION_SHAPE
    }

    fn from_record(record: Record) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(record);
        Ok(Self {
            description: fields.string("description")?,
            entry: fields.opt_timestamp("entry")?,
        })
    }

    fn to_record(&self) -> Record {
        [
            ("description", Datum::from(self.description.clone())),
            ("entry", Datum::from(self.entry)),
        ]
        .into_iter()
        .collect()
    }
}

impl From<Annotation> for Source<Annotation> {
    fn from(value: Annotation) -> Self {
        Source::Instance(value)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Keys kept verbatim in `Task::passthrough`, in declared order.
const PASSTHROUGH_FIELDS: [&str; 14] = [
    "resource_uri",
    "url",
    "uuid",
    "imask",
    "wait",
    "intheamattachments",
    "intheamkanbanassignee",
    "intheamkanbanboarduuid",
    "intheamkanbancolor",
    "intheamkanbancolumn",
    "intheamkanbansortorder",
    "intheamkanbantaskuuid",
    "intheamoriginalemailid",
    "intheamoriginalemailsubject",
];

static TASK_SHAPE: LazyLock<Shape> = LazyLock::new(|| {
    use Validator as V;

    let text = || V::Exact(Kind::Str);
    let nullable_date = || V::nullable(V::timestamp());

    Shape::new(
        "Task",
        vec![
            Field::required("description", V::NonEmptyStr),
            Field::required("status", V::nullable(V::Use(Coercer::Symbol(Status::symbols())))),
            Field::required("priority", V::nullable(V::Use(Coercer::Symbol(Priority::symbols())))),
            Field::required("id", V::identifier()),
            Field::required(
                "annotations",
                V::list_of(V::Use(Coercer::Function(Annotation::coerce_nested))),
            ),
            Field::required("blocks", V::list_of(V::identifier())),
            Field::required("depends", V::list_of(V::identifier())),
            Field::required("due", nullable_date()),
            Field::required("entry", V::timestamp()),
            Field::required("modified", V::timestamp()),
            Field::required("progress", V::nullable(V::Exact(Kind::Float))),
            Field::required("project", V::nullable(V::NonEmptyStr)),
            Field::required("scheduled", nullable_date()),
            Field::required("start", nullable_date()),
            Field::required("short_id", V::Exact(Kind::Int)),
            Field::required("urgency", V::Exact(Kind::Float)),
            Field::required("tags", V::list_of(V::NonEmptyStr)),
            // Added by the server; locally created tasks do not have them.
            Field::optional("resource_uri", V::nullable(V::NonEmptyStr)),
            Field::optional("url", V::nullable(V::NonEmptyStr)),
            Field::optional("uuid", V::identifier()),
            // Validated but unused.
            Field::required("imask", V::nullable(text())),
            Field::required("wait", V::nullable(V::identifier())),
            Field::optional("intheamattachments", V::nullable(V::list_of(V::NonEmptyStr))),
            Field::optional("intheamkanbanassignee", V::nullable(text())),
            Field::optional("intheamkanbanboarduuid", V::nullable(V::identifier())),
            Field::optional("intheamkanbancolor", V::nullable(text())),
            Field::optional("intheamkanbancolumn", V::nullable(text())),
            Field::optional("intheamkanbansortorder", V::nullable(text())),
            Field::optional("intheamkanbantaskuuid", V::nullable(V::identifier())),
            Field::optional("intheamoriginalemailid", V::nullable(text())),
            Field::optional("intheamoriginalemailsubject", V::nullable(text())),
        ],
    )
});

/// Remote operations a task can forward to its owning session.
pub trait TaskOps: Send + Sync {
    fn refresh_task(&self, task: &Task) -> Result<Task, ApiError>;
    fn start_task(&self, task: &Task) -> Result<Task, ApiError>;
    fn stop_task(&self, task: &Task) -> Result<Task, ApiError>;
    fn delete_task(&self, task: &Task) -> Result<Task, ApiError>;
}

/// Non-owning link from a task to the session it came from.
#[derive(Clone, Default)]
struct ApiHandle(Option<Weak<dyn TaskOps>>);

impl ApiHandle {
    fn upgrade(&self) -> Option<Arc<dyn TaskOps>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Debug for ApiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.0 {
            None => "detached",
            Some(weak) if weak.strong_count() > 0 => "attached",
            Some(_) => "dropped",
        };
        f.write_str(state)
    }
}

/// A task as exposed by the inthe.am API.
///
/// Equality compares snapshots only; the session link is ignored.
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub id: Uuid,
    pub annotations: Vec<Annotation>,
    pub blocks: Vec<Uuid>,
    pub depends: Vec<Uuid>,
    pub due: Option<Timestamp>,
    pub entry: Timestamp,
    pub modified: Timestamp,
    pub progress: Option<f64>,
    pub project: Option<String>,
    pub scheduled: Option<Timestamp>,
    pub start: Option<Timestamp>,
    pub short_id: i64,
    pub urgency: f64,
    pub tags: Vec<String>,
    passthrough: Record,
    api: ApiHandle,
}

impl Task {
    /// Validate `source` and link the result to `api`.
    pub fn new(
        api: Option<Weak<dyn TaskOps>>,
        source: impl Into<Source<Self>>,
    ) -> Result<Self, ValidationError> {
        let mut task = <Self as Schemed>::validate(source)?;
        task.api = ApiHandle(api);
        Ok(task)
    }

    /// Same snapshot, linked to `api`.
    pub fn with_api(mut self, api: Weak<dyn TaskOps>) -> Self {
        self.api = ApiHandle(Some(api));
        self
    }

    pub fn is_attached(&self) -> bool {
        self.api.upgrade().is_some()
    }

    /// Identifier used in resource URLs: `uuid` when the server sent one,
    /// `id` otherwise.
    pub fn remote_id(&self) -> Uuid {
        self.uuid().unwrap_or(self.id)
    }

    pub fn uuid(&self) -> Option<Uuid> {
        match self.passthrough.get("uuid") {
            Some(Datum::Identifier(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn resource_uri(&self) -> Option<&str> {
        self.passthrough.get("resource_uri").and_then(Datum::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.passthrough.get("url").and_then(Datum::as_str)
    }

    /// Provider-specific keys, validated but not interpreted.
    pub fn passthrough(&self) -> &Record {
        &self.passthrough
    }

    pub fn refresh_data(&self) -> Result<Task, ApiError> {
        self.session()?.refresh_task(self)
    }

    pub fn mark_started(&self) -> Result<Task, ApiError> {
        self.session()?.start_task(self)
    }

    pub fn mark_stopped(&self) -> Result<Task, ApiError> {
        self.session()?.stop_task(self)
    }

    pub fn delete(&self) -> Result<Task, ApiError> {
        self.session()?.delete_task(self)
    }

    fn session(&self) -> Result<Arc<dyn TaskOps>, ApiError> {
        self.api.upgrade().ok_or(ApiError::Detached)
    }
}

impl Schemed for Task {
    fn shape() -> &'static Shape {
        &TASK_SHAPE
    }

    fn from_record(record: Record) -> Result<Self, ValidationError> {
        let mut fields = Fields::new(record);

        let status = fields
            .opt_string("status")?
            .map(|value| {
                Status::from_value(&value).ok_or(ValidationError::WrongType {
                    path: "status".into(),
                    expected: "status value",
                    found: "string",
                })
            })
            .transpose()?;
        let priority = fields
            .opt_string("priority")?
            .map(|value| {
                Priority::from_value(&value).ok_or(ValidationError::WrongType {
                    path: "priority".into(),
                    expected: "priority value",
                    found: "string",
                })
            })
            .transpose()?;
        let annotations = fields
            .list("annotations")?
            .into_iter()
            .map(|item| match item {
                Datum::Record(record) => Annotation::from_record(record),
                other => Err(ValidationError::WrongType {
                    path: "annotations".into(),
                    expected: "mapping",
                    found: other.kind(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let blocks = identifiers(fields.list("blocks")?, "blocks")?;
        let depends = identifiers(fields.list("depends")?, "depends")?;
        let tags = fields
            .list("tags")?
            .into_iter()
            .map(|item| match item {
                Datum::Str(tag) => Ok(tag),
                other => Err(ValidationError::WrongType {
                    path: "tags".into(),
                    expected: "string",
                    found: other.kind(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            description: fields.string("description")?,
            status,
            priority,
            id: fields.identifier("id")?,
            annotations,
            blocks,
            depends,
            due: fields.opt_timestamp("due")?,
            entry: fields.timestamp("entry")?,
            modified: fields.timestamp("modified")?,
            progress: fields.opt_float("progress")?,
            project: fields.opt_string("project")?,
            scheduled: fields.opt_timestamp("scheduled")?,
            start: fields.opt_timestamp("start")?,
            short_id: fields.int("short_id")?,
            urgency: fields.float("urgency")?,
            tags,
            passthrough: fields.rest(),
            api: ApiHandle::default(),
        })
    }

    fn to_record(&self) -> Record {
        let mut record: Record = [
            ("description", Datum::from(self.description.clone())),
            ("status", Datum::from(self.status.map(|s| s.as_str()))),
            ("priority", Datum::from(self.priority.map(|p| p.as_str()))),
            ("id", Datum::from(self.id)),
            (
                "annotations",
                Datum::List(
                    self.annotations
                        .iter()
                        .map(|a| Datum::Record(a.to_record()))
                        .collect(),
                ),
            ),
            ("blocks", Datum::from(self.blocks.clone())),
            ("depends", Datum::from(self.depends.clone())),
            ("due", Datum::from(self.due)),
            ("entry", Datum::from(self.entry)),
            ("modified", Datum::from(self.modified)),
            ("progress", Datum::from(self.progress)),
            ("project", Datum::from(self.project.clone())),
            ("scheduled", Datum::from(self.scheduled)),
            ("start", Datum::from(self.start)),
            ("short_id", Datum::from(self.short_id)),
            ("urgency", Datum::from(self.urgency)),
            ("tags", Datum::from(self.tags.clone())),
        ]
        .into_iter()
        .collect();

        for key in PASSTHROUGH_FIELDS {
            if let Some(value) = self.passthrough.get(key) {
                record.insert(key, value.clone());
            }
        }
        record
    }

    /// Keeps the session link of the original snapshot.
    fn update(&self, changes: impl Into<Datum>) -> Result<Self, ValidationError> {
        let mut task = Self::from_record(self.merged(changes)?)?;
        task.api = self.api.clone();
        Ok(task)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.to_record() == other.to_record()
    }
}

impl From<Task> for Source<Task> {
    fn from(value: Task) -> Self {
        Source::Instance(value)
    }
}

fn identifiers(items: Vec<Datum>, path: &str) -> Result<Vec<Uuid>, ValidationError> {
    items
        .into_iter()
        .map(|item| match item {
            Datum::Identifier(id) => Ok(id),
            other => Err(ValidationError::WrongType {
                path: path.to_string(),
                expected: "identifier",
                found: other.kind(),
            }),
        })
        .collect()
}
