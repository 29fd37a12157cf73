//! The seam between the dispatcher and the network.

use std::sync::Arc;

use crate::error::Result;
use crate::types::BackendReply;

/// Something that can answer one user message.
///
/// A call is one attempt: implementations must not retry internally, since
/// the dispatcher owns the retry budget and the attempt timeout.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Send `text` and return the normalized reply.
    async fn send(&self, text: &str) -> Result<BackendReply>;
}

#[async_trait::async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn send(&self, text: &str) -> Result<BackendReply> {
        self.as_ref().send(text).await
    }
}
