//! Operation signatures and execution instrumentation for GraphQL engines.
//!
//! Derives a stable, low-cardinality signature for each GraphQL operation
//! shape and collects per-field timing and outcome data from a host
//! execution engine, without altering query semantics.
//!
//! # Features
//!
//! - Canonical operation signatures (sorted fields, aliases dropped,
//!   argument values elided, fragments inlined) for grouping in monitoring
//!   systems
//! - Operation classification (query/mutation/subscription, declared or
//!   `<anonymous>` name)
//! - Lifecycle hook registry (parse, validate, execute, per-field resolve)
//!   with registration-order invocation and hook-failure isolation
//! - Execution correlator producing one sealed [`ExecutionRecord`] per
//!   execution, safe under concurrent field resolution, with an
//!   abandoned-execution eviction policy
//! - Bounded signature cache keyed by raw query text
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use graphql_instrumentation::{
//!     signature_of, CompletionStatus, ExecutionCorrelator, ExecutionId, FieldInfo,
//!     HookRegistry, InstrumentationConfig, LoggingSink, OperationInfo, OperationKind,
//! };
//!
//! let config = InstrumentationConfig::default();
//! let correlator = Arc::new(ExecutionCorrelator::new(
//!     &config.correlator,
//!     Arc::new(LoggingSink),
//! ));
//! let mut hooks = HookRegistry::new();
//! hooks.register(correlator.clone());
//!
//! // The host engine drives the lifecycle:
//! let signature = signature_of("{ user(id: 1) { name email } }", None, &config.signature)?;
//! let execution = ExecutionId::from("request-1");
//! hooks.notify_execute_start(&execution, &OperationInfo {
//!     kind: OperationKind::Query,
//!     operation_name: "<anonymous>".into(),
//!     signature,
//! });
//! let field = FieldInfo::new("user", "Query");
//! hooks.notify_field_start(&execution, &field);
//! hooks.notify_field_end(&execution, &field, false);
//! hooks.notify_execute_end(&execution, CompletionStatus::Success);
//! # Ok::<(), graphql_instrumentation::SignatureError>(())
//! ```

pub mod config;
pub mod correlator;
pub mod error;
pub mod hooks;
pub mod parser;
pub mod signature;

pub use config::{CorrelatorConfig, InstrumentationConfig, SignaturePolicy};
pub use correlator::{
    CorrelatorStats, ExecutionCorrelator, ExecutionOutcome, ExecutionRecord, FieldTiming,
    LoggingSink, TelemetrySink,
};
pub use error::{HookError, SignatureError};
pub use hooks::{
    CompletionStatus, ErrorReporter, ExecutionId, FieldInfo, HookRegistry, InstrumentationHook,
    OperationInfo, TracingReporter,
};
pub use parser::{parse, OperationKind, OperationView, ParsedDocument, ANONYMOUS_OPERATION};
pub use signature::{compute_signature, signature_of, Signature, SignatureCache};
