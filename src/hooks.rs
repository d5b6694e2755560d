//! Instrumentation lifecycle hooks and their registry.
//!
//! The host GraphQL engine invokes the registry's `notify_*` methods at
//! well-defined lifecycle moments. Hooks are an explicit ordered list of
//! typed callback handles, constructed once at application startup; there is
//! no global or static registration. A failing hook is isolated at the
//! registry boundary: it is logged, handed to the [`ErrorReporter`], and
//! never allowed to affect the host's query execution or response content.

use crate::error::HookError;
use crate::parser::OperationKind;
use crate::signature::Signature;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Opaque token correlating all hook firings of one operation execution.
///
/// Supplied by the host engine; stable for the lifetime of one execution.
/// Cheap to clone and usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionId(Arc<str>);

impl ExecutionId {
    /// Wrap a host-supplied identity token.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// The token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ExecutionId {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Identity of the operation behind an execution, passed at execute-start.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    /// Query, mutation, or subscription.
    pub kind: OperationKind,
    /// Declared name or the `<anonymous>` placeholder.
    pub operation_name: String,
    /// Canonical shape signature.
    pub signature: Signature,
}

/// Identity of a single field resolution within an execution.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Dotted response path, e.g. `user.friends.name`.
    pub path: String,
    /// Name of the parent type the field is resolved on.
    pub parent_type: String,
}

impl FieldInfo {
    pub fn new(path: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            parent_type: parent_type.into(),
        }
    }
}

/// Terminal outcome of a lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Success,
    Error,
}

impl CompletionStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Callbacks fired around parsing, validation, execution, and each field
/// resolution.
///
/// All methods default to no-ops so a hook only implements the lifecycle
/// points it cares about. Hooks signal failure by returning `Err`; they must
/// not panic. Field hooks may be invoked concurrently from the host engine's
/// worker threads, so implementations must be `Send + Sync`.
#[allow(unused_variables)]
pub trait InstrumentationHook: Send + Sync {
    fn on_parse_start(&self, execution: &ExecutionId) -> Result<(), HookError> {
        Ok(())
    }

    fn on_parse_end(
        &self,
        execution: &ExecutionId,
        status: CompletionStatus,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_validation_start(&self, execution: &ExecutionId) -> Result<(), HookError> {
        Ok(())
    }

    fn on_validation_end(
        &self,
        execution: &ExecutionId,
        status: CompletionStatus,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_execute_start(
        &self,
        execution: &ExecutionId,
        operation: &OperationInfo,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_field_start(&self, execution: &ExecutionId, field: &FieldInfo) -> Result<(), HookError> {
        Ok(())
    }

    fn on_field_end(
        &self,
        execution: &ExecutionId,
        field: &FieldInfo,
        errored: bool,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn on_execute_end(
        &self,
        execution: &ExecutionId,
        status: CompletionStatus,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// Receives hook failures after the registry isolates them.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, execution: &ExecutionId, error: &HookError);
}

/// Default reporter: logs hook failures at `warn` level.
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, execution: &ExecutionId, error: &HookError) {
        warn!(execution = %execution, error = %error, "instrumentation hook failed");
    }
}

/// An explicit ordered list of instrumentation hooks.
///
/// Hooks fire in registration order. Invocation never short-circuits: a hook
/// returning `Err` does not prevent later hooks from firing, and the error
/// never reaches the host engine.
pub struct HookRegistry {
    hooks: Vec<Arc<dyn InstrumentationHook>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl HookRegistry {
    /// Create an empty registry reporting hook failures via `tracing`.
    pub fn new() -> Self {
        Self::with_reporter(Arc::new(TracingReporter))
    }

    /// Create an empty registry with a custom error reporter.
    pub fn with_reporter(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            hooks: Vec::new(),
            reporter,
        }
    }

    /// Append a hook. Hooks fire in the order they were registered.
    pub fn register(&mut self, hook: Arc<dyn InstrumentationHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether any hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn notify_parse_start(&self, execution: &ExecutionId) {
        self.each(execution, |hook| hook.on_parse_start(execution));
    }

    pub fn notify_parse_end(&self, execution: &ExecutionId, status: CompletionStatus) {
        self.each(execution, |hook| hook.on_parse_end(execution, status));
    }

    pub fn notify_validation_start(&self, execution: &ExecutionId) {
        self.each(execution, |hook| hook.on_validation_start(execution));
    }

    pub fn notify_validation_end(&self, execution: &ExecutionId, status: CompletionStatus) {
        self.each(execution, |hook| hook.on_validation_end(execution, status));
    }

    pub fn notify_execute_start(&self, execution: &ExecutionId, operation: &OperationInfo) {
        self.each(execution, |hook| hook.on_execute_start(execution, operation));
    }

    pub fn notify_field_start(&self, execution: &ExecutionId, field: &FieldInfo) {
        self.each(execution, |hook| hook.on_field_start(execution, field));
    }

    pub fn notify_field_end(&self, execution: &ExecutionId, field: &FieldInfo, errored: bool) {
        self.each(execution, |hook| hook.on_field_end(execution, field, errored));
    }

    pub fn notify_execute_end(&self, execution: &ExecutionId, status: CompletionStatus) {
        self.each(execution, |hook| hook.on_execute_end(execution, status));
    }

    fn each<F>(&self, execution: &ExecutionId, mut call: F)
    where
        F: FnMut(&dyn InstrumentationHook) -> Result<(), HookError>,
    {
        for hook in &self.hooks {
            if let Err(error) = call(hook.as_ref()) {
                self.reporter.report(execution, &error);
            }
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl InstrumentationHook for Recording {
        fn on_execute_start(
            &self,
            _execution: &ExecutionId,
            _operation: &OperationInfo,
        ) -> Result<(), HookError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:execute_start", self.label));
            if self.fail {
                Err(HookError::failed("intentional"))
            } else {
                Ok(())
            }
        }

        fn on_field_end(
            &self,
            _execution: &ExecutionId,
            field: &FieldInfo,
            errored: bool,
        ) -> Result<(), HookError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:field_end:{}:{}", self.label, field.path, errored));
            Ok(())
        }
    }

    struct Collecting {
        errors: Arc<Mutex<Vec<String>>>,
    }

    impl ErrorReporter for Collecting {
        fn report(&self, execution: &ExecutionId, error: &HookError) {
            self.errors
                .lock()
                .unwrap()
                .push(format!("{}:{}", execution, error));
        }
    }

    fn operation_info() -> OperationInfo {
        OperationInfo {
            kind: OperationKind::Query,
            operation_name: "GetUser".into(),
            signature: crate::signature::signature_of(
                "query GetUser { user { name } }",
                None,
                &crate::config::SignaturePolicy::default(),
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_hooks_fire_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(Recording {
            label: "first",
            log: log.clone(),
            fail: false,
        }));
        registry.register(Arc::new(Recording {
            label: "second",
            log: log.clone(),
            fail: false,
        }));

        let id = ExecutionId::from("exec-1");
        registry.notify_execute_start(&id, &operation_info());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:execute_start", "second:execute_start"]
        );
    }

    #[test]
    fn test_failing_hook_does_not_block_later_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::with_reporter(Arc::new(Collecting {
            errors: errors.clone(),
        }));
        registry.register(Arc::new(Recording {
            label: "failing",
            log: log.clone(),
            fail: true,
        }));
        registry.register(Arc::new(Recording {
            label: "after",
            log: log.clone(),
            fail: false,
        }));

        let id = ExecutionId::from("exec-2");
        registry.notify_execute_start(&id, &operation_info());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["failing:execute_start", "after:execute_start"]
        );
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("exec-2"));
        assert!(errors[0].contains("intentional"));
    }

    #[test]
    fn test_field_events_carry_path_and_outcome() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();
        registry.register(Arc::new(Recording {
            label: "h",
            log: log.clone(),
            fail: false,
        }));

        let id = ExecutionId::from("exec-3");
        registry.notify_field_end(&id, &FieldInfo::new("user.name", "User"), true);

        assert_eq!(*log.lock().unwrap(), vec!["h:field_end:user.name:true"]);
    }

    #[test]
    fn test_default_hook_methods_are_noops() {
        struct Passive;
        impl InstrumentationHook for Passive {}

        let mut registry = HookRegistry::new();
        registry.register(Arc::new(Passive));
        assert_eq!(registry.len(), 1);

        let id = ExecutionId::from("exec-4");
        registry.notify_parse_start(&id);
        registry.notify_parse_end(&id, CompletionStatus::Success);
        registry.notify_validation_start(&id);
        registry.notify_validation_end(&id, CompletionStatus::Error);
        registry.notify_execute_end(&id, CompletionStatus::Success);
    }

    #[test]
    fn test_execution_id_round_trip() {
        let id = ExecutionId::from("abc".to_string());
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id, ExecutionId::from("abc"));
    }
}
