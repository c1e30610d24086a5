//! Client core for the inthe.am task-management API.
//!
//! # Overview
//! Wire documents are validated against declarative shapes (`schema`) into
//! typed entities (`Task`, `Annotation`). Timestamps use RFC 2822 style
//! (`Mon, 22 Jun 2015 22:26:00 +0100`), identifiers are UUIDs, and symbolic
//! fields go through runtime enumerations (`enumeration`).
//!
//! # Design
//! - `InTheAmClient` is stateless. Each operation is split into `build_*`
//!   (produces an `HttpRequest`) and `parse_*` (consumes an `HttpResponse`),
//!   so the I/O boundary is explicit.
//! - `Session` pairs the client with a `Transport` and links the tasks it
//!   returns back to itself, so `Task::mark_started` and friends can reach
//!   the server.
//! - Entities are immutable snapshots: `Schemed::update` merges changes and
//!   re-validates the whole record, returning a new value.

pub mod client;
pub mod coerce;
pub mod config;
pub mod enumeration;
pub mod error;
pub mod http;
pub mod schema;
pub mod serialize;
pub mod session;
pub mod transport;
pub mod types;

pub use client::InTheAmClient;
pub use coerce::{Clock, FixedClock, SystemClock, Timestamp};
pub use config::ClientConfig;
pub use enumeration::Enum;
pub use error::{ApiError, CoercionError, ConfigError, EnumDefinitionError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use schema::{Datum, Record, Schemed, Source};
pub use serialize::{to_json, JsonOptions};
pub use session::Session;
pub use transport::{Transport, UreqTransport};
pub use types::{Annotation, Priority, Status, Task, TaskOps};
