//! Lecture and file plumbing services.
//!
//! Thin orchestration over the content repositories: creation, guarded
//! deletion, and the "what can this user see" listings that combine
//! ownership with actively granted access. The heavy decisions live in
//! the resolver and the grant ledger; nothing here touches grant rows
//! directly.

use lectern_core::error::LecternResult;
use lectern_core::gate;
use lectern_core::identity::Identity;
use lectern_core::models::file::{CreateFile, StoredFile};
use lectern_core::models::lecture::{CreateLecture, Lecture, UpdateLecture};
use lectern_core::models::resource::ResourceKind;
use lectern_core::repository::{
    FileRepository, GrantRepository, LectureRepository, PaginatedResult, Pagination,
};
use uuid::Uuid;

use crate::error::{FILE_DELETE_DENIED, LECTURE_MODIFY_DENIED};

/// Lecture plumbing service.
pub struct LectureService<L, R>
where
    L: LectureRepository,
    R: GrantRepository,
{
    lectures: L,
    grants: R,
}

impl<L, R> LectureService<L, R>
where
    L: LectureRepository,
    R: GrantRepository,
{
    pub fn new(lectures: L, grants: R) -> Self {
        Self { lectures, grants }
    }

    pub async fn create(&self, input: CreateLecture, actor: &Identity) -> LecternResult<Lecture> {
        self.lectures.create(input, actor.user_id).await
    }

    pub async fn get(&self, id: Uuid) -> LecternResult<Lecture> {
        self.lectures.get_by_id(id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateLecture,
        actor: &Identity,
    ) -> LecternResult<Lecture> {
        let lecture = self.lectures.get_by_id(id).await?;
        gate::require_owner_or_admin(lecture.created_by, actor, LECTURE_MODIFY_DENIED)?;
        self.lectures.update(id, input, actor.user_id).await
    }

    pub async fn delete(&self, id: Uuid, actor: &Identity) -> LecternResult<()> {
        let lecture = self.lectures.get_by_id(id).await?;
        gate::require_owner_or_admin(lecture.created_by, actor, LECTURE_MODIFY_DENIED)?;
        self.lectures.soft_delete(id, actor.user_id).await
    }

    pub async fn list(&self, pagination: Pagination) -> LecternResult<PaginatedResult<Lecture>> {
        self.lectures.list(pagination).await
    }

    /// Lectures the subject owns plus those they hold an unexpired
    /// grant on (expiry evaluated at read time in the query).
    pub async fn accessible_lectures(&self, subject: &Identity) -> LecternResult<Vec<Lecture>> {
        let owned = self.lectures.list_owned_by(subject.user_id).await?;
        let granted_ids = self
            .grants
            .active_resource_ids_for_subject(ResourceKind::Lecture, subject.user_id)
            .await?;
        let granted = self.lectures.list_by_ids(granted_ids).await?;

        Ok(merge_by_recency(owned, granted, |l: &Lecture| {
            (l.id, l.created_at)
        }))
    }
}

/// File plumbing service. Only the metadata row is managed here; the
/// bytes on disk are an external concern.
pub struct FileService<F, R>
where
    F: FileRepository,
    R: GrantRepository,
{
    files: F,
    grants: R,
}

impl<F, R> FileService<F, R>
where
    F: FileRepository,
    R: GrantRepository,
{
    pub fn new(files: F, grants: R) -> Self {
        Self { files, grants }
    }

    /// Record an uploaded file; the uploader becomes its owner.
    pub async fn register(&self, input: CreateFile, actor: &Identity) -> LecternResult<StoredFile> {
        self.files.create(input, actor.user_id).await
    }

    pub async fn get(&self, id: Uuid) -> LecternResult<StoredFile> {
        self.files.get_by_id(id).await
    }

    pub async fn get_by_filename(&self, filename: &str) -> LecternResult<StoredFile> {
        self.files.get_by_filename(filename).await
    }

    /// Delete a file record; owner or admin only. Grant rows cascade
    /// in the same transaction.
    pub async fn delete(&self, id: Uuid, actor: &Identity) -> LecternResult<()> {
        let file = self.files.get_by_id(id).await?;
        gate::require_owner_or_admin(file.uploaded_by, actor, FILE_DELETE_DENIED)?;
        self.files.delete(id).await
    }

    /// Files the subject owns plus those they hold an unexpired grant
    /// on.
    pub async fn accessible_files(&self, subject: &Identity) -> LecternResult<Vec<StoredFile>> {
        let owned = self.files.list_owned_by(subject.user_id).await?;
        let granted_ids = self
            .grants
            .active_resource_ids_for_subject(ResourceKind::File, subject.user_id)
            .await?;
        let granted = self.files.list_by_ids(granted_ids).await?;

        Ok(merge_by_recency(owned, granted, |f: &StoredFile| {
            (f.id, f.created_at)
        }))
    }
}

/// Merge two listings, dropping duplicates by id and ordering newest
/// first.
fn merge_by_recency<T>(
    owned: Vec<T>,
    granted: Vec<T>,
    key: impl Fn(&T) -> (Uuid, chrono::DateTime<chrono::Utc>),
) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    let mut all: Vec<T> = owned
        .into_iter()
        .chain(granted)
        .filter(|item| seen.insert(key(item).0))
        .collect();
    all.sort_by_key(|item| std::cmp::Reverse(key(item).1));
    all
}
