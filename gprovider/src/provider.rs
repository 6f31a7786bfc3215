use std::future::Future;
use std::pin::Pin;

use crate::{BoxedEventStream, ModelRequest, ProviderError};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Incremental generation backend.
///
/// The engine is streaming-only: a provider opens one event stream per
/// submission and the continuation controller consumes it to a terminal
/// signal.
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>>;
}
