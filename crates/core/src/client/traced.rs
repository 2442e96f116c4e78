// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced client wrapper for consistent observability

use super::{ClientError, CoordinationClient, Watcher};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any CoordinationClient
#[derive(Clone)]
pub struct TracedClient<C> {
    inner: C,
}

impl<C> TracedClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: CoordinationClient> CoordinationClient for TracedClient<C> {
    async fn create_sequential_ephemeral(
        &self,
        path_prefix: &str,
        data: &[u8],
    ) -> Result<String, ClientError> {
        let span = tracing::info_span!("client.create", path_prefix);
        async {
            let start = std::time::Instant::now();
            let result = self.inner.create_sequential_ephemeral(path_prefix, data).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(path) => tracing::debug!(
                    path,
                    data_len = data.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "node created"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "create failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn children(&self, parent: &str) -> Result<Vec<String>, ClientError> {
        let result = self.inner.children(parent).await;
        match &result {
            Ok(children) => tracing::trace!(parent, count = children.len(), "listed children"),
            Err(e) => tracing::warn!(parent, error = %e, "list children failed"),
        }
        result
    }

    async fn watch_data(&self, path: &str, watcher: Watcher) -> Result<Vec<u8>, ClientError> {
        let span = tracing::debug_span!("client.watch", path);
        async {
            let result = self.inner.watch_data(path, watcher).await;
            match &result {
                Ok(_) => tracing::debug!("watch registered"),
                // Expected race: the watched node went away before we got to it
                Err(ClientError::NoNode(_)) => tracing::debug!("watched node already gone"),
                Err(e) => tracing::warn!(error = %e, "watch failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, path: &str, guaranteed: bool) -> Result<(), ClientError> {
        let span = tracing::info_span!("client.delete", path, guaranteed);
        async {
            let result = self.inner.delete(path, guaranteed).await;
            match &result {
                Ok(()) => tracing::debug!("node deleted"),
                Err(e) => tracing::warn!(error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn is_active(&self) -> bool {
        let active = self.inner.is_active();
        tracing::trace!(active, "checked session");
        active
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
