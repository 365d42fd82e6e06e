//! # Status Repository
//!
//! User-defined product status labels. At most one is the default; making a
//! status the default clears the flag on every other one in the same store
//! unit of work.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use salesbook_core::validation::{validate_status_input, validate_status_patch};
use salesbook_core::{CoreError, Status, StatusInput, StatusPatch, DEFAULT_STATUSES};

use crate::error::DbResult;
use crate::store::{StatusStore, StatusWrite};

#[derive(Debug, Clone)]
pub struct StatusRepository<S> {
    store: S,
}

impl<S: StatusStore> StatusRepository<S> {
    pub fn new(store: S) -> Self {
        StatusRepository { store }
    }

    /// All statuses, ordered by `order`.
    pub async fn list(&self) -> DbResult<Vec<Status>> {
        self.store.select_statuses().await
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Status>> {
        self.store.select_status(id).await
    }

    pub async fn get_default(&self) -> DbResult<Option<Status>> {
        let statuses = self.store.select_statuses().await?;
        Ok(statuses.into_iter().find(|s| s.is_default))
    }

    /// Creates a status. `order` defaults to the current number of statuses.
    pub async fn create(&self, input: StatusInput) -> DbResult<Status> {
        validate_status_input(&input)?;

        let order = match input.order {
            Some(order) => order,
            None => self.store.select_statuses().await?.len() as i64,
        };

        let now = Utc::now();
        let status = Status {
            id: Uuid::new_v4().to_string(),
            label: input.label.trim().to_string(),
            color: input.color.trim().to_string(),
            is_default: input.is_default,
            order,
            created_at: now,
            updated_at: now,
        };

        if status.is_default {
            self.store
                .write_default_status(&status, StatusWrite::Insert)
                .await?;
        } else {
            self.store.insert_status(&status).await?;
        }

        info!(id = %status.id, label = %status.label, is_default = status.is_default, "Status created");
        Ok(status)
    }

    pub async fn update(&self, id: &str, patch: StatusPatch) -> DbResult<Status> {
        validate_status_patch(&patch)?;

        let mut status = self
            .store
            .select_status(id)
            .await?
            .ok_or_else(|| CoreError::StatusNotFound(id.to_string()))?;

        if let Some(label) = patch.label {
            status.label = label.trim().to_string();
        }
        if let Some(color) = patch.color {
            status.color = color.trim().to_string();
        }
        if let Some(order) = patch.order {
            status.order = order;
        }
        if let Some(is_default) = patch.is_default {
            status.is_default = is_default;
        }
        status.updated_at = Utc::now();

        if patch.is_default == Some(true) {
            self.store
                .write_default_status(&status, StatusWrite::Update)
                .await?;
        } else {
            self.store.update_status(&status).await?;
        }

        debug!(id = %id, "Status updated");
        Ok(status)
    }

    /// Deletes a status. Products keep their (now dangling) status id.
    pub async fn remove(&self, id: &str) -> DbResult<()> {
        if !self.store.delete_status(id).await? {
            return Err(CoreError::StatusNotFound(id.to_string()).into());
        }
        info!(id = %id, "Status removed");
        Ok(())
    }

    /// Sets each status's order to its position in `ids`.
    pub async fn reorder(&self, ids: &[String]) -> DbResult<()> {
        self.store.reorder_statuses(ids, Utc::now()).await?;
        debug!(count = ids.len(), "Statuses reordered");
        Ok(())
    }

    /// Seeds the built-in statuses when none exist. Returns the current list.
    pub async fn ensure_defaults(&self) -> DbResult<Vec<Status>> {
        let existing = self.store.select_statuses().await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let mut created = Vec::with_capacity(DEFAULT_STATUSES.len());
        for (position, (label, color)) in DEFAULT_STATUSES.iter().enumerate() {
            let status = self
                .create(StatusInput {
                    label: label.to_string(),
                    color: color.to_string(),
                    is_default: position == 0,
                    order: Some(position as i64),
                })
                .await?;
            created.push(status);
        }

        info!(count = created.len(), "Default statuses seeded");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    fn input(label: &str, is_default: bool) -> StatusInput {
        StatusInput {
            label: label.to_string(),
            color: "#111111".to_string(),
            is_default,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_single_default_invariant() {
        let repo = StatusRepository::new(LocalStore::in_memory());
        let a = repo.create(input("A", true)).await.unwrap();
        let b = repo.create(input("B", true)).await.unwrap();

        assert_eq!(repo.get_default().await.unwrap().unwrap().id, b.id);
        assert!(!repo.get(&a.id).await.unwrap().unwrap().is_default);

        repo.update(&a.id, StatusPatch { is_default: Some(true), ..Default::default() })
            .await
            .unwrap();
        let defaults: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|s| s.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, a.id);
    }

    #[tokio::test]
    async fn test_order_defaults_to_count_and_reorder() {
        let repo = StatusRepository::new(LocalStore::in_memory());
        let a = repo.create(input("A", false)).await.unwrap();
        let b = repo.create(input("B", false)).await.unwrap();
        assert_eq!((a.order, b.order), (0, 1));

        repo.reorder(&[b.id.clone(), a.id.clone()]).await.unwrap();
        let labels: Vec<_> = repo.list().await.unwrap().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_missing_status_errors() {
        let repo = StatusRepository::new(LocalStore::in_memory());
        assert!(repo
            .update("nope", StatusPatch::default())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(repo.remove("nope").await.unwrap_err().is_not_found());
        assert!(repo.create(input("  ", false)).await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_defaults_is_idempotent() {
        let repo = StatusRepository::new(LocalStore::in_memory());
        let seeded = repo.ensure_defaults().await.unwrap();
        assert_eq!(seeded.len(), 4);
        assert_eq!(seeded[0].label, "Disponible");
        assert!(seeded[0].is_default);

        let again = repo.ensure_defaults().await.unwrap();
        assert_eq!(again.len(), 4);
        assert_eq!(repo.get_default().await.unwrap().unwrap().label, "Disponible");
    }
}
