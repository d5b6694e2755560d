//! Execution-record bookkeeping.
//!
//! One [`ExecutionRecord`] exists per execution-identity token. Field hooks
//! append [`FieldTiming`] entries while the host engine resolves fields,
//! possibly concurrently; completion seals the record and hands it to the
//! [`TelemetrySink`]. Locking is scoped to a single record, so distinct
//! executions never contend with each other.

use crate::config::CorrelatorConfig;
use crate::error::HookError;
use crate::hooks::{CompletionStatus, ExecutionId, FieldInfo, InstrumentationHook, OperationInfo};
use crate::parser::OperationKind;
use crate::signature::Signature;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, warn};

/// Final outcome of one operation execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Success,
    Error,
    /// The host engine never signalled completion; the record was
    /// force-sealed by the abandoned-execution policy or by a drain.
    Incomplete,
}

/// Timing and outcome of a single field resolution.
#[derive(Debug, Clone, Serialize)]
pub struct FieldTiming {
    /// Dotted response path.
    pub path: String,
    /// Parent type the field was resolved on.
    pub parent_type: String,
    /// Offset from execution start to field-resolve start.
    pub offset: Duration,
    /// Elapsed resolution time.
    pub duration: Duration,
    /// Whether the resolver reported an error.
    pub errored: bool,
}

/// The aggregated result of one operation execution.
///
/// Append-only while the execution is live; sealed (owned, immutable) when
/// handed to the telemetry sink.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    /// The host-supplied execution-identity token.
    pub execution: String,
    pub kind: OperationKind,
    pub operation_name: String,
    pub signature: Signature,
    pub started_at: SystemTime,
    /// Total wall-clock duration of the execution.
    pub duration: Duration,
    pub outcome: ExecutionOutcome,
    /// Field timings in completion order.
    pub fields: Vec<FieldTiming>,
}

/// Receives sealed execution records.
pub trait TelemetrySink: Send + Sync {
    fn accept(&self, record: ExecutionRecord);
}

/// Default sink: logs sealed records at `debug` level.
pub struct LoggingSink;

impl TelemetrySink for LoggingSink {
    fn accept(&self, record: ExecutionRecord) {
        debug!(
            execution = %record.execution,
            signature = %record.signature,
            outcome = ?record.outcome,
            duration_ms = record.duration.as_millis() as u64,
            fields = record.fields.len(),
            "execution record sealed"
        );
    }
}

/// Snapshot of correlator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CorrelatorStats {
    pub started: u64,
    pub completed: u64,
    pub abandoned: u64,
}

/// Mutable state of a live execution, guarded by its own mutex.
struct LiveRecord {
    record: ExecutionRecord,
    started: Instant,
    /// Field-resolve start instants awaiting their end event, keyed by path.
    pending: HashMap<String, Instant>,
}

impl LiveRecord {
    fn new(execution: &ExecutionId, operation: &OperationInfo) -> Self {
        Self {
            record: ExecutionRecord {
                execution: execution.to_string(),
                kind: operation.kind,
                operation_name: operation.operation_name.clone(),
                signature: operation.signature.clone(),
                started_at: SystemTime::now(),
                duration: Duration::ZERO,
                outcome: ExecutionOutcome::Incomplete,
                fields: Vec::new(),
            },
            started: Instant::now(),
            pending: HashMap::new(),
        }
    }

    fn seal(mut self, outcome: ExecutionOutcome) -> ExecutionRecord {
        self.record.outcome = outcome;
        self.record.duration = self.started.elapsed();
        self.record
    }
}

/// Correlates hook firings by execution identity into one record per
/// execution.
///
/// Owns no threads: abandoned records are reaped opportunistically on every
/// [`begin`](ExecutionCorrelator::begin) and whenever the application calls
/// [`reap_abandoned`](ExecutionCorrelator::reap_abandoned) directly.
pub struct ExecutionCorrelator {
    live: DashMap<ExecutionId, Mutex<LiveRecord>>,
    sink: Arc<dyn TelemetrySink>,
    abandoned_timeout: Duration,
    started: AtomicU64,
    completed: AtomicU64,
    abandoned: AtomicU64,
}

impl ExecutionCorrelator {
    /// Create a correlator handing sealed records to `sink`.
    pub fn new(config: &CorrelatorConfig, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            live: DashMap::new(),
            sink,
            abandoned_timeout: config.abandoned_timeout(),
            started: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
        }
    }

    /// Allocate the record for a new execution.
    ///
    /// Exactly one record may exist per token; a second `begin` for the same
    /// token is a wiring bug in the host engine and is rejected.
    pub fn begin(
        &self,
        execution: &ExecutionId,
        operation: &OperationInfo,
    ) -> Result<(), HookError> {
        self.reap_abandoned();
        match self.live.entry(execution.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(HookError::DuplicateExecution(execution.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Mutex::new(LiveRecord::new(execution, operation)));
                self.started.fetch_add(1, Ordering::Relaxed);
                debug!(execution = %execution, signature = %operation.signature, "execution started");
                Ok(())
            }
        }
    }

    /// Note that a field resolution started.
    pub fn field_start(
        &self,
        execution: &ExecutionId,
        field: &FieldInfo,
    ) -> Result<(), HookError> {
        let entry = self
            .live
            .get(execution)
            .ok_or_else(|| HookError::UnknownExecution(execution.to_string()))?;
        let mut live = lock(&entry);
        live.pending.insert(field.path.clone(), Instant::now());
        Ok(())
    }

    /// Append the timing entry for a finished field resolution.
    ///
    /// Safe under concurrent sibling resolutions: the append happens inside
    /// the record's own lock.
    pub fn field_end(
        &self,
        execution: &ExecutionId,
        field: &FieldInfo,
        errored: bool,
    ) -> Result<(), HookError> {
        let entry = self
            .live
            .get(execution)
            .ok_or_else(|| HookError::UnknownExecution(execution.to_string()))?;
        let now = Instant::now();
        let mut live = lock(&entry);
        // An end without a matching start yields a zero-duration entry
        // rather than losing the event.
        let start = live.pending.remove(&field.path).unwrap_or(now);
        let offset = start.saturating_duration_since(live.started);
        live.record.fields.push(FieldTiming {
            path: field.path.clone(),
            parent_type: field.parent_type.clone(),
            offset,
            duration: now.saturating_duration_since(start),
            errored,
        });
        Ok(())
    }

    /// Seal the record with the given completion status and hand it off.
    pub fn finish(
        &self,
        execution: &ExecutionId,
        status: CompletionStatus,
    ) -> Result<(), HookError> {
        let (_, cell) = self
            .live
            .remove(execution)
            .ok_or_else(|| HookError::UnknownExecution(execution.to_string()))?;
        let outcome = if status.is_error() {
            ExecutionOutcome::Error
        } else {
            ExecutionOutcome::Success
        };
        let record = into_inner(cell).seal(outcome);
        self.completed.fetch_add(1, Ordering::Relaxed);
        debug!(execution = %execution, outcome = ?record.outcome, "execution finished");
        self.sink.accept(record);
        Ok(())
    }

    /// Force-seal and evict executions older than the configured timeout.
    ///
    /// Bounds memory growth when the host engine fails to signal
    /// completion. Reaped records carry the [`ExecutionOutcome::Incomplete`]
    /// marker.
    pub fn reap_abandoned(&self) {
        let expired: Vec<ExecutionId> = self
            .live
            .iter()
            .filter(|entry| lock(entry).started.elapsed() >= self.abandoned_timeout)
            .map(|entry| entry.key().clone())
            .collect();
        for execution in expired {
            if let Some((_, cell)) = self.live.remove(&execution) {
                warn!(execution = %execution, "execution abandoned, force-sealing record");
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                self.sink.accept(into_inner(cell).seal(ExecutionOutcome::Incomplete));
            }
        }
    }

    /// Force-seal every live record, for application shutdown.
    pub fn drain(&self) {
        let all: Vec<ExecutionId> = self.live.iter().map(|entry| entry.key().clone()).collect();
        for execution in all {
            if let Some((_, cell)) = self.live.remove(&execution) {
                self.abandoned.fetch_add(1, Ordering::Relaxed);
                self.sink.accept(into_inner(cell).seal(ExecutionOutcome::Incomplete));
            }
        }
    }

    /// Number of live (unsealed) executions.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no executions are live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CorrelatorStats {
        CorrelatorStats {
            started: self.started.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// The correlator consumes the same event stream as any other hook, so it
/// registers in the [`HookRegistry`](crate::hooks::HookRegistry) directly.
/// The registry's error isolation keeps a [`HookError::DuplicateExecution`]
/// from ever reaching the host engine.
impl InstrumentationHook for ExecutionCorrelator {
    fn on_execute_start(
        &self,
        execution: &ExecutionId,
        operation: &OperationInfo,
    ) -> Result<(), HookError> {
        self.begin(execution, operation)
    }

    fn on_field_start(&self, execution: &ExecutionId, field: &FieldInfo) -> Result<(), HookError> {
        self.field_start(execution, field)
    }

    fn on_field_end(
        &self,
        execution: &ExecutionId,
        field: &FieldInfo,
        errored: bool,
    ) -> Result<(), HookError> {
        self.field_end(execution, field, errored)
    }

    fn on_execute_end(
        &self,
        execution: &ExecutionId,
        status: CompletionStatus,
    ) -> Result<(), HookError> {
        self.finish(execution, status)
    }
}

fn lock<'a>(cell: &'a Mutex<LiveRecord>) -> std::sync::MutexGuard<'a, LiveRecord> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn into_inner(cell: Mutex<LiveRecord>) -> LiveRecord {
    cell.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
}
