use async_trait::async_trait;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, USER_PROGRESS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::UserProgress,
};

#[async_trait]
pub trait UserProgressRepository: Send + Sync {
    /// Fetch the aggregate for a user, creating an empty one on first use.
    async fn get_or_create(&self, user_id: &str) -> AppResult<UserProgress>;

    /// Compare-and-swap save: the write only lands if the stored version
    /// still equals `expected_version`. The caller passes the updated
    /// aggregate with its version already incremented. A stale snapshot
    /// surfaces as `VersionConflict` so the grading engine can re-read and
    /// retry instead of losing an update.
    async fn save(&self, progress: UserProgress, expected_version: i64) -> AppResult<()>;
}

pub struct MongoUserProgressRepository {
    collection: Collection<UserProgress>,
}

impl MongoUserProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(USER_PROGRESS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for user_progress collection");

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_id_unique".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl UserProgressRepository for MongoUserProgressRepository {
    async fn get_or_create(&self, user_id: &str) -> AppResult<UserProgress> {
        if let Some(progress) = self.collection.find_one(doc! { "user_id": user_id }).await? {
            return Ok(progress);
        }

        let fresh = UserProgress::new(user_id);
        match self.collection.insert_one(&fresh).await {
            Ok(_) => Ok(fresh),
            // Two first-time gradings can race on the unique index; the
            // loser re-reads the winner's document.
            Err(_) => self
                .collection
                .find_one(doc! { "user_id": user_id })
                .await?
                .ok_or_else(|| {
                    AppError::DatabaseError(format!(
                        "Failed to create or fetch progress for user '{}'",
                        user_id
                    ))
                }),
        }
    }

    async fn save(&self, progress: UserProgress, expected_version: i64) -> AppResult<()> {
        let filter = doc! {
            "user_id": &progress.user_id,
            "version": expected_version,
        };

        let result = self.collection.replace_one(filter, &progress).await?;

        if result.matched_count == 0 {
            return Err(AppError::VersionConflict(format!(
                "Progress for user '{}' changed since it was read (expected version {})",
                progress.user_id, expected_version
            )));
        }

        Ok(())
    }
}
