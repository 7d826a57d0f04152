use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, Collection, IndexModel};

use crate::{
    db::{Database, SUBMISSIONS_COLLECTION},
    errors::AppResult,
    models::domain::Submission,
};

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, submission: Submission) -> AppResult<Submission>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>>;
    /// Newest first; every re-submission is retained for history.
    async fn find_by_user(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> AppResult<Vec<Submission>>;
}

pub struct MongoSubmissionRepository {
    collection: Collection<Submission>,
}

impl MongoSubmissionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(SUBMISSIONS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for submissions collection");

        let user_quiz_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "quiz_id": 1, "submitted_at": -1 })
            .build();
        self.collection.create_index(user_quiz_index).await?;

        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for MongoSubmissionRepository {
    async fn create(&self, submission: Submission) -> AppResult<Submission> {
        self.collection.insert_one(&submission).await?;
        Ok(submission)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Submission>> {
        let submission = self.collection.find_one(doc! { "id": id }).await?;
        Ok(submission)
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        quiz_id: Option<&str>,
    ) -> AppResult<Vec<Submission>> {
        let filter = match quiz_id {
            Some(qid) => doc! { "user_id": user_id, "quiz_id": qid },
            None => doc! { "user_id": user_id },
        };

        let find_options = FindOptions::builder()
            .sort(doc! { "submitted_at": -1 })
            .build();

        let cursor = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?;
        let items: Vec<Submission> = cursor.try_collect().await?;
        Ok(items)
    }
}
