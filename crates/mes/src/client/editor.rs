//! The Operation List editor: a status board of routing operations with
//! an edit mode for reordering and renaming rows.
//!
//! Edits go into a draft copy of the rows. The confirmed rows only change
//! when the server answers a reload, so cancelling is just dropping the
//! draft.

use std::collections::BTreeSet;

use super::backend::RoutingBackend;
use super::error::{ClientError, ClientResult};
use crate::routing::order::{move_item, order_entries};
use crate::routing::{BatchUpdate, NameEntry, Operation, OperationPatch, OperationStatus};

fn rejected(err: ClientError) -> ClientError {
    tracing::warn!(error = %err, "edit rejected");
    err
}

pub struct OperationList<B> {
    backend: B,
    confirmed: Vec<Operation>,
    draft: Option<Vec<Operation>>,
    selected: Option<i64>,
}

impl<B: RoutingBackend> OperationList<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            confirmed: Vec::new(),
            draft: None,
            selected: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // ---- View ----

    /// Rows as displayed: the draft while editing, else the confirmed list.
    pub fn rows(&self) -> &[Operation] {
        self.draft.as_deref().unwrap_or(&self.confirmed)
    }

    pub fn confirmed(&self) -> &[Operation] {
        &self.confirmed
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    /// Names a row can be renamed to: the distinct names of the confirmed
    /// rows, sorted.
    pub fn name_options(&self) -> Vec<String> {
        self.confirmed
            .iter()
            .map(|op| op.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ---- Gestures ----

    /// Replaces the confirmed rows with the server's list and leaves edit
    /// mode. A selection pointing at a vanished row is cleared.
    pub async fn load(&mut self) -> ClientResult<()> {
        let rows = self.backend.fetch_operations().await.map_err(|e| {
            tracing::warn!(error = %e, "loading operations failed");
            e
        })?;

        if let Some(id) = self.selected {
            if !rows.iter().any(|op| op.id == id) {
                self.selected = None;
            }
        }
        self.confirmed = rows;
        self.draft = None;

        tracing::debug!(rows = self.confirmed.len(), "operations loaded");
        Ok(())
    }

    pub fn toggle_edit(&mut self) {
        if self.is_editing() {
            self.cancel();
        } else {
            self.draft = Some(self.confirmed.clone());
        }
    }

    /// Leaves edit mode, discarding every pending reorder and rename.
    pub fn cancel(&mut self) {
        self.draft = None;
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> ClientResult<()> {
        let draft = self.draft.as_mut().ok_or_else(|| rejected(ClientError::NotEditing))?;
        let len = draft.len();
        if !move_item(draft, from, to) {
            let index = if from >= len { from } else { to };
            return Err(rejected(ClientError::IndexOutOfRange { index, len }));
        }
        Ok(())
    }

    pub fn rename(&mut self, id: i64, name: &str) -> ClientResult<()> {
        if !self.is_editing() {
            return Err(rejected(ClientError::NotEditing));
        }
        if !self.name_options().iter().any(|n| n == name) {
            return Err(rejected(ClientError::NameNotOffered(name.to_string())));
        }

        let row = self
            .draft
            .iter_mut()
            .flatten()
            .find(|op| op.id == id)
            .ok_or_else(|| rejected(ClientError::UnknownOperation(id)))?;
        row.name = name.to_string();
        Ok(())
    }

    pub fn select(&mut self, id: i64) -> ClientResult<()> {
        if !self.rows().iter().any(|op| op.id == id) {
            return Err(rejected(ClientError::UnknownOperation(id)));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Sends the new order, then each row's name in displayed order, then
    /// reloads. Stops at the first failure and keeps the draft; calls that
    /// already succeeded stay applied on the server.
    pub async fn save(&mut self) -> ClientResult<()> {
        let draft = self
            .draft
            .clone()
            .ok_or_else(|| rejected(ClientError::NotEditing))?;

        let result = async {
            self.backend.update_order(&order_entries(&draft)).await?;
            for op in &draft {
                self.backend
                    .update_operation(op.id, &OperationPatch::rename(op.name.clone()))
                    .await?;
            }
            Ok::<_, ClientError>(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "saving operation list failed; draft kept");
            return Err(e);
        }
        self.load().await
    }

    /// Same payload as `save`, applied by the server in one transaction.
    pub async fn save_batched(&mut self) -> ClientResult<()> {
        let draft = self
            .draft
            .as_ref()
            .ok_or_else(|| rejected(ClientError::NotEditing))?;
        let batch = BatchUpdate {
            orders: order_entries(draft),
            names: draft
                .iter()
                .map(|op| NameEntry {
                    id: op.id,
                    name: op.name.clone(),
                })
                .collect(),
        };

        if let Err(e) = self.backend.apply_batch(&batch).await {
            tracing::warn!(error = %e, "batched save failed; draft kept");
            return Err(e);
        }
        self.load().await
    }

    /// Starts the selected operation. Without a selection nothing happens.
    pub async fn start(&mut self) -> ClientResult<()> {
        let Some(id) = self.selected else {
            return Ok(());
        };
        if let Err(e) = self.backend.start_operation(id).await {
            tracing::warn!(id, error = %e, "start failed");
            return Err(e);
        }
        self.load().await
    }

    /// Marks the selected operation completed. Without a selection nothing
    /// happens.
    pub async fn complete(&mut self) -> ClientResult<()> {
        let Some(id) = self.selected else {
            return Ok(());
        };
        let patch = OperationPatch::status(OperationStatus::Completed);
        if let Err(e) = self.backend.update_operation(id, &patch).await {
            tracing::warn!(id, error = %e, "complete failed");
            return Err(e);
        }
        self.load().await
    }
}
