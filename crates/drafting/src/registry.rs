//! Knowledge store registry: the durable mapping from motion category
//! to provisioned knowledge-store id, plus document indexing.
//!
//! The mapping lives in a single JSON file rewritten whole on every
//! mutation. Provisioning is idempotent: a category that already has a
//! store id never triggers a second create call.

use briefsmith_config::RegistryFile;
use briefsmith_core::backend::{StoreAdmin, StoreFile};
use briefsmith_core::error::RegistryError;
use briefsmith_core::extraction::MotionCategory;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Category-to-store registry with a persistent JSON backing file.
pub struct KnowledgeStoreRegistry {
    path: PathBuf,
    file: RegistryFile,
    admin: Arc<dyn StoreAdmin>,
}

impl KnowledgeStoreRegistry {
    /// Open the registry at `path`, creating an empty one in memory if
    /// the file does not exist yet.
    pub fn open(path: PathBuf, admin: Arc<dyn StoreAdmin>) -> Result<Self, RegistryError> {
        let file = RegistryFile::load(&path)
            .map_err(|e| RegistryError::Persist(e.to_string()))?;
        Ok(Self { path, file, admin })
    }

    #[cfg(test)]
    pub(crate) fn in_memory(admin: Arc<dyn StoreAdmin>) -> Self {
        Self {
            path: std::env::temp_dir().join(format!("briefsmith-{}.json", uuid::Uuid::new_v4())),
            file: RegistryFile::default(),
            admin,
        }
    }

    /// The store id for `category`, if one has been provisioned.
    pub fn get(&self, category: MotionCategory) -> Option<&str> {
        self.file.vector_stores.get(category.slug()).map(String::as_str)
    }

    /// The store id for `category`, failing when none is configured.
    pub fn require(&self, category: MotionCategory) -> Result<String, RegistryError> {
        self.get(category)
            .map(String::from)
            .ok_or_else(|| RegistryError::NotConfigured(category.slug().to_string()))
    }

    /// The store id for `category`, provisioning one on first use.
    ///
    /// The new mapping is persisted before the id is returned, so a
    /// crash after provisioning never orphans the store.
    pub async fn get_or_create(
        &mut self,
        category: MotionCategory,
    ) -> Result<String, RegistryError> {
        if let Some(id) = self.get(category) {
            return Ok(id.to_string());
        }

        let name = format!("{}_store", category.slug());
        let id = self
            .admin
            .create_store(&name)
            .await
            .map_err(|e| RegistryError::Provision(e.to_string()))?;
        info!(category = category.slug(), store_id = %id, "Provisioned knowledge store");

        self.file
            .vector_stores
            .insert(category.slug().to_string(), id.clone());
        self.file
            .save(&self.path)
            .map_err(|e| RegistryError::Persist(e.to_string()))?;
        Ok(id)
    }

    /// All configured category → store-id pairs, in category order.
    pub fn list(&self) -> Vec<(String, String)> {
        self.file
            .vector_stores
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Upload `bytes` and attach the resulting document to the store
    /// for `category`, provisioning the store first when needed.
    pub async fn index_document(
        &mut self,
        category: MotionCategory,
        filename: &str,
        bytes: &[u8],
    ) -> Result<String, RegistryError> {
        let store_id = self.get_or_create(category).await?;
        let file_id = self
            .admin
            .upload_document(filename, bytes)
            .await
            .map_err(|e| RegistryError::Provision(e.to_string()))?;
        if let Err(e) = self.admin.attach_document(&store_id, &file_id).await {
            warn!(error = %e, %store_id, %file_id, "Attach failed after upload");
            return Err(RegistryError::Provision(e.to_string()));
        }
        info!(%store_id, %file_id, filename, "Document indexed");
        Ok(file_id)
    }

    /// The documents currently attached to the store for `category`.
    pub async fn indexed_files(
        &self,
        category: MotionCategory,
    ) -> Result<Vec<StoreFile>, RegistryError> {
        let store_id = self.require(category)?;
        self.admin
            .list_store_files(&store_id)
            .await
            .map_err(|e| RegistryError::Provision(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockAdmin;
    use tempfile::TempDir;

    #[tokio::test]
    async fn provisioning_is_idempotent() {
        let admin = Arc::new(MockAdmin::new());
        let mut registry = KnowledgeStoreRegistry::in_memory(admin.clone());

        let first = registry
            .get_or_create(MotionCategory::ValueClaim)
            .await
            .unwrap();
        let second = registry
            .get_or_create(MotionCategory::ValueClaim)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(admin.created_count(), 1);
    }

    #[tokio::test]
    async fn distinct_categories_get_distinct_stores() {
        let admin = Arc::new(MockAdmin::new());
        let mut registry = KnowledgeStoreRegistry::in_memory(admin.clone());

        let value = registry
            .get_or_create(MotionCategory::ValueClaim)
            .await
            .unwrap();
        let lien = registry
            .get_or_create(MotionCategory::AvoidLien)
            .await
            .unwrap();

        assert_ne!(value, lien);
        assert_eq!(admin.created_count(), 2);
    }

    #[tokio::test]
    async fn provisioned_mapping_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("briefsmith.json");
        let admin = Arc::new(MockAdmin::new());

        let id = {
            let mut registry =
                KnowledgeStoreRegistry::open(path.clone(), admin.clone()).unwrap();
            registry
                .get_or_create(MotionCategory::AvoidLien)
                .await
                .unwrap()
        };

        let reopened = KnowledgeStoreRegistry::open(path, admin.clone()).unwrap();
        assert_eq!(reopened.get(MotionCategory::AvoidLien), Some(id.as_str()));
        // Reopening alone never provisions.
        assert_eq!(admin.created_count(), 1);
    }

    #[test]
    fn require_fails_for_an_unconfigured_category() {
        let registry = KnowledgeStoreRegistry::in_memory(Arc::new(MockAdmin::new()));
        let err = registry.require(MotionCategory::ValueClaim).unwrap_err();
        assert!(matches!(err, RegistryError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn indexing_uploads_attaches_and_auto_provisions() {
        let admin = Arc::new(MockAdmin::new());
        let mut registry = KnowledgeStoreRegistry::in_memory(admin.clone());

        let file_id = registry
            .index_document(MotionCategory::ValueClaim, "local_rules.pdf", b"pdf")
            .await
            .unwrap();

        assert_eq!(file_id, "file_local_rules.pdf");
        assert_eq!(admin.created_count(), 1);
        let attached = admin.attached.lock().unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].1, "file_local_rules.pdf");
    }

    #[tokio::test]
    async fn indexed_files_lists_attached_documents() {
        let admin = Arc::new(MockAdmin::new());
        let mut registry = KnowledgeStoreRegistry::in_memory(admin.clone());
        registry
            .index_document(MotionCategory::ValueClaim, "forms.pdf", b"pdf")
            .await
            .unwrap();

        let files = registry
            .indexed_files(MotionCategory::ValueClaim)
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "forms.pdf");
    }

    #[tokio::test]
    async fn listing_is_in_category_order() {
        let admin = Arc::new(MockAdmin::new());
        let mut registry = KnowledgeStoreRegistry::in_memory(admin);
        registry
            .get_or_create(MotionCategory::ValueClaim)
            .await
            .unwrap();
        registry
            .get_or_create(MotionCategory::AvoidLien)
            .await
            .unwrap();

        let listing = registry.list();
        let slugs: Vec<&str> = listing.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(slugs, vec!["avoid_lien", "value_claim"]);
    }
}
