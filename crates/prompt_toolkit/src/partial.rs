use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type Supplier = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A value pre-bound onto a template with [`crate::ImagePromptTemplate::partial`].
///
/// Suppliers run once per `format` call, so they can produce fresh values
/// (timestamps, signed URLs) every time.
#[derive(Clone)]
pub enum PartialValue {
    Literal(Value),
    Supplier(Supplier),
}

impl PartialValue {
    pub fn literal(value: impl Into<Value>) -> Self {
        PartialValue::Literal(value.into())
    }

    pub fn from_fn<F, V>(f: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        PartialValue::Supplier(Arc::new(move || {
            let value = f().into();
            async move { Ok(value) }.boxed()
        }))
    }

    pub fn from_async<F, Fut, V, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        V: Into<Value>,
        E: fmt::Display,
    {
        PartialValue::Supplier(Arc::new(move || {
            let fut = f();
            async move {
                fut.await
                    .map(Into::into)
                    .map_err(|e| Error::Supplier(e.to_string()))
            }
            .boxed()
        }))
    }

    pub async fn resolve(&self) -> Result<Value> {
        match self {
            PartialValue::Literal(value) => Ok(value.clone()),
            PartialValue::Supplier(supplier) => supplier().await,
        }
    }
}

impl fmt::Debug for PartialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            PartialValue::Supplier(_) => f.write_str("Supplier(..)"),
        }
    }
}

impl From<Value> for PartialValue {
    fn from(value: Value) -> Self {
        PartialValue::Literal(value)
    }
}

impl From<&str> for PartialValue {
    fn from(value: &str) -> Self {
        PartialValue::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for PartialValue {
    fn from(value: String) -> Self {
        PartialValue::Literal(Value::String(value))
    }
}
