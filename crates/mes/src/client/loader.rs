use std::future::Future;

use tokio::sync::watch;

use super::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

/// A value that becomes available asynchronously. Consumers hold the
/// loader and ask for its state instead of checking a shared flag.
#[derive(Debug, Clone)]
pub struct ResourceLoader<T> {
    rx: watch::Receiver<LoadState<T>>,
}

impl<T> ResourceLoader<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Starts `load` on the current tokio runtime.
    pub fn spawn<F, E>(load: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display,
    {
        let (tx, rx) = watch::channel(LoadState::Loading);
        tokio::spawn(async move {
            let state = match load.await {
                Ok(value) => LoadState::Ready(value),
                Err(e) => {
                    tracing::warn!(error = %e, "resource failed to load");
                    LoadState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });
        Self { rx }
    }

    /// Already loaded.
    pub fn ready_value(value: T) -> Self {
        let (_tx, rx) = watch::channel(LoadState::Ready(value));
        Self { rx }
    }

    pub fn state(&self) -> LoadState<T> {
        self.rx.borrow().clone()
    }

    /// Waits for the load to finish.
    pub async fn ready(&self) -> ClientResult<T> {
        let mut rx = self.rx.clone();
        let state = rx
            .wait_for(|s| !matches!(s, LoadState::Loading))
            .await
            .map_err(|_| ClientError::LoadFailed("loader task ended without a result".into()))?;

        match &*state {
            LoadState::Ready(value) => Ok(value.clone()),
            LoadState::Failed(msg) => Err(ClientError::LoadFailed(msg.clone())),
            LoadState::Loading => Err(ClientError::LoadFailed("still loading".into())),
        }
    }
}
