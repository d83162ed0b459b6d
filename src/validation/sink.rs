//! Collection point for non-fatal configuration diagnostics

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Information,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Information => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// A single human-readable diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub log_level: LogLevel,
    pub validation: String,
}

impl Validation {
    pub fn new(log_level: LogLevel, validation: impl Into<String>) -> Self {
        Self {
            log_level,
            validation: validation.into(),
        }
    }
}

/// The moment a diagnostic was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Parse,
    Finalize,
    PostFinalize,
}

/// Diagnostics of one configured list entry, kept apart per phase
#[derive(Debug, Clone, Default)]
pub struct EntryValidations {
    parse: Vec<Validation>,
    finalize: Vec<Validation>,
    post_finalize: Vec<Validation>,
}

impl EntryValidations {
    pub fn record(&mut self, phase: Phase, validations: Vec<Validation>) {
        let bucket = match phase {
            Phase::Parse => &mut self.parse,
            Phase::Finalize => &mut self.finalize,
            Phase::PostFinalize => &mut self.post_finalize,
        };
        bucket.extend(validations);
    }

    /// All phases in order: parse, finalize, post-finalize
    pub fn merged(&self) -> Vec<Validation> {
        self.parse
            .iter()
            .chain(&self.finalize)
            .chain(&self.post_finalize)
            .cloned()
            .collect()
    }

    pub fn phase(&self, phase: Phase) -> &[Validation] {
        match phase {
            Phase::Parse => &self.parse,
            Phase::Finalize => &self.finalize,
            Phase::PostFinalize => &self.post_finalize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parse.is_empty() && self.finalize.is_empty() && self.post_finalize.is_empty()
    }
}

/// Diagnostics attached to an identity key rather than a list position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UuidValidations {
    pub uuid: Uuid,
    pub validations: Vec<Validation>,
}

/// Buffers diagnostics while a configuration entry is being processed
///
/// Positional messages accumulate in a current buffer that the owner drains
/// into the entry being worked on. Keyed messages go to a per-uuid list kept
/// in first-seen order.
#[derive(Debug, Default)]
pub struct ValidationSink {
    current: Vec<Validation>,
    by_uuid: Vec<UuidValidations>,
    uuid_index: AHashMap<Uuid, usize>,
}

impl ValidationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against the entry currently being processed
    pub fn message(&mut self, log_level: LogLevel, message: impl Into<String>) {
        let validation = Validation::new(log_level, message);
        trace_validation(&validation);
        self.current.push(validation);
    }

    /// Record a message against an identity key, falling back to the
    /// current entry when the node carries none
    pub fn message_by_uuid(
        &mut self,
        uuid: Option<Uuid>,
        log_level: LogLevel,
        message: impl Into<String>,
    ) {
        let Some(uuid) = uuid else {
            self.message(log_level, message);
            return;
        };

        let validation = Validation::new(log_level, message);
        trace_validation(&validation);
        let index = *self.uuid_index.entry(uuid).or_insert_with(|| {
            self.by_uuid.push(UuidValidations {
                uuid,
                validations: Vec::new(),
            });
            self.by_uuid.len() - 1
        });
        self.by_uuid[index].validations.push(validation);
    }

    /// Drain the current buffer
    pub fn take_current(&mut self) -> Vec<Validation> {
        std::mem::take(&mut self.current)
    }

    pub fn current(&self) -> &[Validation] {
        &self.current
    }

    pub fn uuid_validations(&self) -> &[UuidValidations] {
        &self.by_uuid
    }

    pub fn for_uuid(&self, uuid: Uuid) -> &[Validation] {
        self.uuid_index
            .get(&uuid)
            .map(|&i| self.by_uuid[i].validations.as_slice())
            .unwrap_or(&[])
    }
}

fn trace_validation(validation: &Validation) {
    match validation.log_level {
        LogLevel::Information => tracing::debug!("{}", validation.validation),
        LogLevel::Warning | LogLevel::Error => {
            tracing::warn!(level = %validation.log_level, "{}", validation.validation)
        }
    }
}
