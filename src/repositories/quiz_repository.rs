use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::FindOptions, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, QUIZZES_COLLECTION},
    errors::AppResult,
    models::domain::Quiz,
};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist a quiz and all of its questions atomically: the questions are
    /// embedded in the quiz document, so this is a single insert that either
    /// lands entirely or not at all.
    async fn create_quiz(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn list_quizzes(&self, offset: i64, limit: i64) -> AppResult<(Vec<Quiz>, i64)>;
    async fn list_quizzes_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZZES_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(id_index).await?;

        let user_index = IndexModel::builder()
            .keys(doc! { "created_by_user_id": 1 })
            .build();
        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn create_quiz(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn list_quizzes(&self, offset: i64, limit: i64) -> AppResult<(Vec<Quiz>, i64)> {
        let total = self.collection.count_documents(doc! {}).await? as i64;

        let find_options = FindOptions::builder()
            .skip(Some(offset.max(0) as u64))
            .limit(Some(limit))
            .build();

        let cursor = self
            .collection
            .find(doc! {})
            .with_options(find_options)
            .await?;
        let items: Vec<Quiz> = cursor.try_collect().await?;

        Ok((items, total))
    }

    async fn list_quizzes_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<Quiz>, i64)> {
        let filter = doc! { "created_by_user_id": user_id };
        let total = self.collection.count_documents(filter.clone()).await? as i64;

        let find_options = FindOptions::builder()
            .skip(Some(offset.max(0) as u64))
            .limit(Some(limit))
            .build();

        let cursor = self
            .collection
            .find(filter)
            .with_options(find_options)
            .await?;
        let items: Vec<Quiz> = cursor.try_collect().await?;

        Ok((items, total))
    }
}
