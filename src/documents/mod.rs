mod storage;

pub use storage::{BlobStore, FsBlobStore, StorageError, new_key};

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Case, CaseDocument, UserProfile};

/// DocumentIndex pairs document metadata rows with their stored blobs and
/// keeps the two in step. The metadata row is the source of truth for
/// existence: a row is only written after its blob landed, and only removed
/// after its blob is gone.
pub struct DocumentIndex {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
}

impl DocumentIndex {
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    pub async fn upload(
        &self,
        case_id: &str,
        file_name: &str,
        mime_type: &str,
        data: Bytes,
        actor: &UserProfile,
    ) -> Result<CaseDocument> {
        let case = self.editable_case(case_id, actor)?;

        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(Error::validation("file name is required"));
        }

        let key = new_key(&case.id);
        let size = data.len() as i64;
        self.blobs.put(&key, data).await?;

        let doc = CaseDocument {
            id: Uuid::new_v4().to_string(),
            case_id: case.id,
            file_name: file_name.to_string(),
            file_path: key,
            file_size: size,
            mime_type: if mime_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                mime_type.to_string()
            },
            uploaded_by: actor.user_id.clone(),
            created_at: Utc::now(),
        };
        self.store.create_document(&doc)?;

        Ok(doc)
    }

    pub async fn download(&self, doc_id: &str, actor: &UserProfile) -> Result<(CaseDocument, Bytes)> {
        let doc = self.visible_document(doc_id, actor)?;
        let data = self.blobs.get(&doc.file_path).await?;
        Ok((doc, data))
    }

    pub fn list(&self, case_id: &str, actor: &UserProfile) -> Result<Vec<CaseDocument>> {
        self.visible_case(case_id, actor)?;
        self.store.list_case_documents(case_id)
    }

    /// Two-phase delete: the blob goes first, and only if that succeeds is
    /// the metadata row removed. A failed blob removal leaves the row in
    /// place so the reference never dangles and a later attempt can finish
    /// the job. A blob that is already gone counts as removed.
    pub async fn delete(&self, doc_id: &str, actor: &UserProfile) -> Result<()> {
        let doc = self.visible_document(doc_id, actor)?;

        let case = self
            .store
            .get_case(&doc.case_id)?
            .ok_or(Error::NotFound("case"))?;
        if !actor.role.can_edit_case(&actor.user_id, &case) {
            return Err(Error::permission("this role cannot remove documents"));
        }

        self.blobs.delete(&doc.file_path).await?;
        self.store.delete_document(&doc.id)?;
        Ok(())
    }

    /// Best-effort blob cleanup after a case delete already removed the
    /// metadata rows. Failures are logged and leave orphaned blobs behind
    /// rather than failing the caller.
    pub async fn purge_blobs(&self, documents: &[CaseDocument]) {
        for doc in documents {
            if let Err(e) = self.blobs.delete(&doc.file_path).await {
                tracing::warn!(
                    document = %doc.id,
                    key = %doc.file_path,
                    "failed to remove stored blob: {}",
                    e
                );
            }
        }
    }

    fn visible_case(&self, case_id: &str, actor: &UserProfile) -> Result<Case> {
        let case = self
            .store
            .get_case(case_id)?
            .ok_or(Error::NotFound("case"))?;
        if !actor.role.can_view_case(&actor.user_id, &case) {
            return Err(Error::NotFound("case"));
        }
        Ok(case)
    }

    fn editable_case(&self, case_id: &str, actor: &UserProfile) -> Result<Case> {
        let case = self.visible_case(case_id, actor)?;
        if !actor.role.can_edit_case(&actor.user_id, &case) {
            return Err(Error::permission("this role cannot modify case documents"));
        }
        Ok(case)
    }

    fn visible_document(&self, doc_id: &str, actor: &UserProfile) -> Result<CaseDocument> {
        let doc = self
            .store
            .get_document(doc_id)?
            .ok_or(Error::NotFound("document"))?;
        self.visible_case(&doc.case_id, actor)?;
        Ok(doc)
    }
}
