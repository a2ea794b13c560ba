//! Handler registry mapping `batch_type` strings to handlers.
//!
//! Handlers are opaque to the engine: they receive the batch metadata and
//! the shared dependencies, may enqueue child batches, and never touch
//! batch status. The dispatcher claims a batch and uses this registry to
//! deserialize and execute it in one step.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;

use crate::kernel::PipelineDeps;

/// Type alias for the async handler function.
///
/// The typed payload is reconstructed from the stored metadata when the
/// handler is registered.
type BoxedHandler = Box<
    dyn Fn(serde_json::Value, Arc<PipelineDeps>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

struct HandlerRegistration {
    handler: BoxedHandler,
}

/// Registry that maps batch type strings to handlers.
///
/// Aliases let several batch types share one handler (`album_discovery`
/// runs the `album_page` handler). A batch type with no alias resolves to
/// itself, so operators can introduce new types by registering a handler
/// without touching the dispatcher.
#[derive(Default)]
pub struct HandlerRegistry {
    registrations: HashMap<&'static str, HandlerRegistration>,
    aliases: HashMap<&'static str, &'static str>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Register a batch type with its handler.
    ///
    /// # Example
    ///
    /// ```ignore
    /// registry.register::<AlbumPagePayload, _, _>(
    ///     AlbumPagePayload::BATCH_TYPE,
    ///     |payload, deps| async move { album_page::run(payload, &deps).await },
    /// );
    /// ```
    pub fn register<P, F, Fut>(&mut self, batch_type: &'static str, handler: F)
    where
        P: DeserializeOwned + Send + 'static,
        F: Fn(P, Arc<PipelineDeps>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: BoxedHandler = Box::new(move |value, deps| {
            let handler = handler.clone();
            Box::pin(async move {
                let payload: P = serde_json::from_value(value)
                    .map_err(|e| anyhow!("failed to deserialize {} metadata: {}", batch_type, e))?;
                handler(payload, deps).await
            })
        });

        self.registrations
            .insert(batch_type, HandlerRegistration { handler: boxed });
    }

    /// Route one batch type to another type's handler.
    pub fn alias(&mut self, from: &'static str, to: &'static str) {
        self.aliases.insert(from, to);
    }

    /// Resolve a batch type to its handler name. Unaliased types resolve to
    /// themselves.
    pub fn resolve<'a>(&self, batch_type: &'a str) -> &'a str {
        match self.aliases.get(batch_type) {
            Some(target) => target,
            None => batch_type,
        }
    }

    /// Deserialize and execute the handler for a batch's metadata.
    pub async fn execute(
        &self,
        batch_type: &str,
        metadata: serde_json::Value,
        deps: Arc<PipelineDeps>,
    ) -> Result<()> {
        let resolved = self.resolve(batch_type);
        let registration = self
            .registrations
            .get(resolved)
            .ok_or_else(|| anyhow!("no handler registered for batch type: {}", resolved))?;

        (registration.handler)(metadata, deps).await
    }

    pub fn is_registered(&self, batch_type: &str) -> bool {
        self.registrations.contains_key(self.resolve(batch_type))
    }

    pub fn registered_types(&self) -> Vec<&'static str> {
        self.registrations.keys().copied().collect()
    }
}

/// Thread-safe registry wrapped in Arc.
pub type SharedHandlerRegistry = Arc<HandlerRegistry>;
