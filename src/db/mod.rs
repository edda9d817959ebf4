mod models;

pub use models::*;

use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::{Client, Collection, Database};

use crate::config::Config;

pub async fn connect(config: &Config) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(&config.mongo_uri).await?;
    let db = client.database(&config.db_name);
    ping(&db).await?;
    Ok(db)
}

pub async fn ping(db: &Database) -> Result<(), mongodb::error::Error> {
    db.run_command(doc! { "ping": 1 }).await?;
    Ok(())
}

pub async fn insert_record(
    records: &Collection<SubmissionRecord>,
    record: &SubmissionRecord,
) -> Result<ObjectId, mongodb::error::Error> {
    let result = records.insert_one(record).await?;
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| mongodb::error::Error::custom("inserted_id was not an ObjectId"))
}

pub async fn find_record(
    records: &Collection<SubmissionRecord>,
    id: ObjectId,
) -> Result<Option<SubmissionRecord>, mongodb::error::Error> {
    records.find_one(doc! { "_id": id }).await
}

pub async fn count_records(
    records: &Collection<SubmissionRecord>,
) -> Result<u64, mongodb::error::Error> {
    records.count_documents(doc! {}).await
}

pub async fn list_page(
    records: &Collection<SubmissionRecord>,
    skip: u64,
    limit: i64,
) -> Result<Vec<SubmissionRecord>, mongodb::error::Error> {
    let cursor = records
        .find(doc! {})
        .sort(doc! { "timestamp": -1 })
        .skip(skip)
        .limit(limit)
        .await?;
    cursor.try_collect().await
}
