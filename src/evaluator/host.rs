//! The seam between executed scripts and host-provided capabilities.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::value::Value;

/// Failure reported by a host function.
#[derive(Debug, Clone)]
pub enum HostError {
    /// Surfaces inside the script as a thrown value.
    Thrown(Value),
    /// The call belongs to an abandoned attempt; the script is unwound
    /// without running any further user code.
    Refused,
}

impl HostError {
    /// Convenience for throwing a plain `Error` with `message`.
    pub fn message(message: impl Into<String>) -> Self {
        HostError::Thrown(Value::error(super::value::ErrorKind::Error, message))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        HostError::Thrown(Value::error(super::value::ErrorKind::TypeError, message))
    }
}

pub type HostResult = Result<Value, HostError>;

/// A function the host exposes to executed code.
///
/// Implementations receive positional arguments already evaluated by the
/// interpreter. The returned future is awaited by the caller, so anything
/// that suspends here is a suspension point for the script.
#[async_trait]
pub trait HostFunction: Send + Sync {
    /// Name used in diagnostics and `String(fn)`.
    fn name(&self) -> &str;

    async fn call(&self, args: Vec<Value>) -> HostResult;
}

struct AsyncFnHost<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> HostFunction for AsyncFnHost<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HostResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: Vec<Value>) -> HostResult {
        (self.f)(args).await
    }
}

struct SyncFnHost<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> HostFunction for SyncFnHost<F>
where
    F: Fn(Vec<Value>) -> HostResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: Vec<Value>) -> HostResult {
        (self.f)(args)
    }
}

/// Wrap an async closure as a [`HostFunction`].
pub fn host_fn<F, Fut>(name: impl Into<String>, f: F) -> Arc<dyn HostFunction>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HostResult> + Send + 'static,
{
    Arc::new(AsyncFnHost {
        name: name.into(),
        f,
    })
}

/// Wrap a synchronous closure as a [`HostFunction`].
pub fn sync_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn HostFunction>
where
    F: Fn(Vec<Value>) -> HostResult + Send + Sync + 'static,
{
    Arc::new(SyncFnHost {
        name: name.into(),
        f,
    })
}
