use super::bundle::BundleRepository;
use super::ordering::{insertion_index, validate_ordering};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use storefront_core::models::{Bundle, NewBundle, OwnerRef};
use storefront_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process bundle repository
///
/// Holds each owner's bundles as an ordered list; used by tests and local development
/// without a database.
#[derive(Default)]
pub struct InMemoryBundleRepository {
    owners: RwLock<HashMap<OwnerRef, Vec<Bundle>>>,
}

impl InMemoryBundleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn renumber(list: &mut [Bundle]) {
    for (index, bundle) in list.iter_mut().enumerate() {
        bundle.position = index as i32;
    }
}

#[async_trait]
impl BundleRepository for InMemoryBundleRepository {
    async fn create(&self, bundle: NewBundle) -> Result<Bundle, AppError> {
        let mut owners = self.owners.write().await;

        if owners
            .values()
            .flatten()
            .any(|b| b.bundle_id == bundle.bundle_id)
        {
            return Err(AppError::InvalidInput(format!(
                "Bundle {} already exists",
                bundle.bundle_id
            )));
        }

        let list = owners.entry(bundle.owner.clone()).or_default();
        let index = insertion_index(bundle.position, list.len());
        list.insert(
            index,
            Bundle {
                bundle_id: bundle.bundle_id,
                owner: bundle.owner,
                position: index as i32,
                source_filename: bundle.source_filename,
                variants: bundle.variants,
                created_at: Utc::now(),
            },
        );
        renumber(list);

        Ok(list[index].clone())
    }

    async fn get(&self, bundle_id: Uuid) -> Result<Option<Bundle>, AppError> {
        let owners = self.owners.read().await;
        Ok(owners
            .values()
            .flatten()
            .find(|b| b.bundle_id == bundle_id)
            .cloned())
    }

    async fn list_by_owner(&self, owner: &OwnerRef) -> Result<Vec<Bundle>, AppError> {
        let owners = self.owners.read().await;
        Ok(owners.get(owner).cloned().unwrap_or_default())
    }

    async fn reorder(&self, owner: &OwnerRef, ordered_ids: &[Uuid]) -> Result<(), AppError> {
        let mut owners = self.owners.write().await;

        let current: Vec<Uuid> = owners
            .get(owner)
            .map(|list| list.iter().map(|b| b.bundle_id).collect())
            .unwrap_or_default();
        validate_ordering(&current, ordered_ids)?;

        let Some(list) = owners.get_mut(owner) else {
            return Ok(());
        };

        let mut by_id: HashMap<Uuid, Bundle> =
            list.drain(..).map(|b| (b.bundle_id, b)).collect();
        for id in ordered_ids {
            if let Some(bundle) = by_id.remove(id) {
                list.push(bundle);
            }
        }
        renumber(list);

        Ok(())
    }

    async fn delete(&self, bundle_id: Uuid) -> Result<Bundle, AppError> {
        let mut owners = self.owners.write().await;

        for list in owners.values_mut() {
            if let Some(index) = list.iter().position(|b| b.bundle_id == bundle_id) {
                let removed = list.remove(index);
                renumber(list);
                return Ok(removed);
            }
        }

        Err(AppError::NotFound(format!("Bundle {} not found", bundle_id)))
    }
}
