use bson::{Document, doc, oid::ObjectId};
use mongodb::{ClientSession, Collection, Database};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Entity not found")]
    NotFound,
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Validation: {0}")]
    Validation(String),

    // Authorization
    #[error("Role '{role}' lacks the required capability")]
    PermissionDenied { role: String },
    #[error("Only an owner may perform this operation")]
    OwnerOnly,

    // Membership state conflicts
    #[error("A tenant must retain at least one owner")]
    LastOwnerProtected,
    #[error("Member already holds the owner role")]
    AlreadyOwner,
    #[error("Role '{0}' is not in the configured vocabulary")]
    InvalidRole(String),

    // Invitation lifecycle
    #[error("Invitation token is invalid")]
    InviteInvalidToken,
    #[error("Email already belongs to an active member of this tenant")]
    InviteAlreadyMember,
    #[error("A pending invitation for this email already exists")]
    InviteAlreadyPending,
    #[error("Invitation was issued to a different email address")]
    InviteEmailMismatch,
    #[error("Invitation has expired")]
    InviteExpired,
    #[error("Invitation was already accepted")]
    InviteAlreadyAccepted,
    #[error("Invitation was already declined")]
    InviteAlreadyDeclined,
    #[error("Invitation was already revoked")]
    InviteAlreadyRevoked,
}

pub type DaoResult<T> = Result<T, DaoError>;

pub struct BaseDao<T: Send + Sync> {
    collection: Collection<T>,
}

impl<T> BaseDao<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Unpin + Send + Sync,
{
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<T>(collection_name),
        }
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<T> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_id_in_tenant(
        &self,
        tenant_id: ObjectId,
        id: ObjectId,
    ) -> DaoResult<T> {
        self.collection
            .find_one(doc! { "_id": id, "tenant_id": tenant_id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_one_with(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).session(session).await?)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<Vec<T>> {
        let mut cursor = if let Some(sort) = sort {
            self.collection.find(filter).sort(sort).await?
        } else {
            self.collection.find(filter).await?
        };

        let mut results = Vec::new();
        use futures::TryStreamExt;
        while let Some(doc) = cursor.try_next().await? {
            results.push(doc);
        }
        Ok(results)
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .await
            .map_err(unwrap_duplicate_key)?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn insert_one_with(
        &self,
        doc: &T,
        session: &mut ClientSession,
    ) -> DaoResult<ObjectId> {
        let result = self
            .collection
            .insert_one(doc)
            .session(session)
            .await
            .map_err(unwrap_duplicate_key)?;
        inserted_object_id(result.inserted_id)
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> DaoResult<bool> {
        let update = stamp_updated_at(update);
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.modified_count > 0)
    }

    pub async fn update_one_with(
        &self,
        filter: Document,
        update: Document,
        session: &mut ClientSession,
    ) -> DaoResult<bool> {
        let update = stamp_updated_at(update);
        let result = self
            .collection
            .update_one(filter, update)
            .session(session)
            .await?;
        Ok(result.modified_count > 0)
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> DaoResult<u64> {
        let update = stamp_updated_at(update);
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    pub async fn update_by_id(&self, id: ObjectId, update: Document) -> DaoResult<bool> {
        self.update_one(doc! { "_id": id }, update).await
    }

    pub async fn count(&self, filter: Document) -> DaoResult<u64> {
        Ok(self.collection.count_documents(filter).await?)
    }

    pub async fn count_with(
        &self,
        filter: Document,
        session: &mut ClientSession,
    ) -> DaoResult<u64> {
        Ok(self
            .collection
            .count_documents(filter)
            .session(session)
            .await?)
    }
}

/// Open a client session with a transaction already started. Multi-document
/// invariant checks (owner counts, invitation status flips paired with
/// membership inserts) run inside one of these so concurrent writers
/// serialize at the store instead of racing past each other.
pub async fn start_txn(db: &Database) -> DaoResult<ClientSession> {
    let mut session = db.client().start_session().await?;
    session.start_transaction().await?;
    Ok(session)
}

/// Commit on success, abort on failure. The abort error is swallowed: the
/// caller's error is the one worth reporting, and an un-committed
/// transaction dies with the session anyway.
pub async fn finish_txn<T>(mut session: ClientSession, result: DaoResult<T>) -> DaoResult<T> {
    match result {
        Ok(value) => {
            session.commit_transaction().await?;
            Ok(value)
        }
        Err(e) => {
            let _ = session.abort_transaction().await;
            Err(e)
        }
    }
}

/// Every `$set` write also refreshes `updated_at`.
fn stamp_updated_at(mut update: Document) -> Document {
    match update.get_document_mut("$set") {
        Ok(set_doc) => {
            set_doc.insert("updated_at", bson::DateTime::now());
        }
        Err(_) => {
            update.insert("$set", doc! { "updated_at": bson::DateTime::now() });
        }
    }
    update
}

fn unwrap_duplicate_key(e: mongodb::error::Error) -> DaoError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
        ref write_error,
    )) = *e.kind
    {
        if write_error.code == 11000 {
            return DaoError::DuplicateKey(write_error.message.clone());
        }
    }
    DaoError::Mongo(e)
}

fn inserted_object_id(inserted_id: bson::Bson) -> DaoResult<ObjectId> {
    let id = inserted_id
        .as_object_id()
        .ok_or_else(|| DaoError::Validation("inserted_id was not an ObjectId".to_string()))?;
    debug!(?id, "Inserted document");
    Ok(id)
}
