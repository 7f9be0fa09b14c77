use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    marker::PhantomData,
};

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{DispatchError, OperationError, SerializationError},
    operation::Operation,
};

/// Handles one kind of operation.
///
/// # Example
///
/// ```rust,ignore
/// struct GetAttributeForEditingHandler {
///     repository: Arc<AttributeRepository>,
/// }
///
/// impl Handler<GetAttributeForEditing> for GetAttributeForEditingHandler {
///     type Output = EditableAttribute;
///
///     async fn handle(&self, query: GetAttributeForEditing) -> Result<EditableAttribute, OperationError> {
///         self.repository
///             .get(query.attribute_id)
///             .ok_or_else(|| OperationError::not_found("Attribute not found"))
///     }
/// }
/// ```
pub trait Handler<O: Operation>: Send + Sync + 'static {
    /// The domain result of the operation.
    type Output: Serialize + Send;

    fn handle(
        &self,
        operation: O,
    ) -> impl Future<Output = Result<Self::Output, OperationError>> + Send;
}

/// A [`Handler`] backed by an async function.
#[derive(Clone, Copy, Debug)]
pub struct FnHandler<F>(F);

/// Wraps an async function as a handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F> {
    FnHandler(f)
}

impl<O, F, Fut, T> Handler<O> for FnHandler<F>
where
    O: Operation,
    F: Fn(O) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, OperationError>> + Send,
    T: Serialize + Send,
{
    type Output = T;

    fn handle(&self, operation: O) -> impl Future<Output = Result<T, OperationError>> + Send {
        (self.0)(operation)
    }
}

trait ErasedHandler: Send + Sync {
    fn handle(&self, operation: Box<dyn Any + Send>) -> BoxFuture<'_, Result<Value, DispatchError>>;
}

struct Erased<O, H> {
    handler: H,
    _operation: PhantomData<fn(O)>,
}

impl<O, H> ErasedHandler for Erased<O, H>
where
    O: Operation,
    H: Handler<O>,
{
    fn handle(&self, operation: Box<dyn Any + Send>) -> BoxFuture<'_, Result<Value, DispatchError>> {
        Box::pin(async move {
            let operation = operation
                .downcast::<O>()
                .map_err(|_| DispatchError::HandlerNotFound {
                    operation: O::NAME,
                })?;
            let output = self.handler.handle(*operation).await?;
            let normalized = serde_json::to_value(output).map_err(SerializationError::from)?;
            Ok(normalized)
        })
    }
}

/// Routes operations to their registered handlers.
///
/// Handlers are registered once at startup, after which the bus is only
/// read and can be shared between requests.
#[derive(Default)]
pub struct OperationBus {
    handlers: HashMap<TypeId, Box<dyn ErasedHandler>>,
}

impl OperationBus {
    pub fn new() -> Self {
        OperationBus::default()
    }

    /// Registers the handler for `O`, builder style.
    pub fn with<O, H>(mut self, handler: H) -> Self
    where
        O: Operation,
        H: Handler<O>,
    {
        self.register::<O, H>(handler);
        self
    }

    /// Registers the handler for `O`, replacing any previous handler.
    pub fn register<O, H>(&mut self, handler: H)
    where
        O: Operation,
        H: Handler<O>,
    {
        self.handlers.insert(
            TypeId::of::<O>(),
            Box::new(Erased {
                handler,
                _operation: PhantomData::<fn(O)>,
            }),
        );
    }

    /// Returns true if a handler is registered for `O`.
    pub fn handles<O: Operation>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<O>())
    }

    /// Dispatches an operation to its handler, returning the normalized result.
    ///
    /// Errors raised by the handler are passed through unchanged.
    pub async fn handle<O: Operation>(&self, operation: O) -> Result<Value, DispatchError> {
        let Some(handler) = self.handlers.get(&TypeId::of::<O>()) else {
            return Err(DispatchError::HandlerNotFound { operation: O::NAME });
        };

        debug!(operation = O::NAME, kind = %O::KIND, "dispatching operation");
        handler.handle(Box::new(operation)).await
    }
}

impl fmt::Debug for OperationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
