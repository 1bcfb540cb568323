use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

/// Turns a `json!({...})` literal into a payload. Non-object values give an
/// empty payload.
pub fn payload_from(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => EventPayload::new(),
    }
}

/// Append-only `events.jsonl` shared by every session and the ingestor.
///
/// Each line carries `type`, `instance_id` and `ts` (RFC3339 UTC, micros);
/// caller keys are merged last and win on collision.
#[derive(Debug, Clone)]
pub struct EventWriter {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    path: PathBuf,
    instance_id: String,
    append_lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                path: path.into(),
                instance_id: instance_id.into(),
                append_lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn instance_id(&self) -> &str {
        &self.shared.instance_id
    }

    fn envelope(&self, event_type: &str, payload: EventPayload) -> EventPayload {
        let mut event = EventPayload::new();
        event.insert("type".to_string(), Value::from(event_type));
        event.insert(
            "instance_id".to_string(),
            Value::from(self.shared.instance_id.as_str()),
        );
        event.insert(
            "ts".to_string(),
            Value::from(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        event.extend(payload);
        event
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let path = &self.shared.path;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let _guard = self
            .shared
            .append_lock
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Appends one event and returns what was written.
    pub fn emit(&self, event_type: &str, payload: EventPayload) -> Result<Value> {
        let event = self.envelope(event_type, payload);
        self.append_line(&serde_json::to_string(&event)?)?;
        Ok(Value::Object(event))
    }

    pub fn emit_json(&self, event_type: &str, payload: Value) -> Result<Value> {
        self.emit(event_type, payload_from(payload))
    }

    /// Every event so far, skipping lines that are not JSON objects.
    pub fn read_all(&self) -> Result<Vec<EventPayload>> {
        let raw = match fs::read_to_string(&self.shared.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read {}", self.shared.path.display()))
            }
        };
        Ok(raw
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}
