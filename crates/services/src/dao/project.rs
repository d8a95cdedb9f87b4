use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use sitedesk_db::models::{Project, ProjectStatus};

use super::base::{BaseDao, DaoResult};

/// Thin tenant-scoped resource store. Projects are representative of the
/// CRUD surfaces that consume the core's verdicts: every query here filters
/// by tenant id, so a foreign id can neither be read nor mutated.
pub struct ProjectDao {
    pub base: BaseDao<Project>,
}

impl ProjectDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Project::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        tenant_id: ObjectId,
        name: String,
        code: String,
        client_name: Option<String>,
        created_by: ObjectId,
    ) -> DaoResult<Project> {
        let now = DateTime::now();
        let project = Project {
            id: None,
            tenant_id,
            name,
            code,
            status: ProjectStatus::Planning,
            client_name,
            created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let id = self.base.insert_one(&project).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_tenant(&self, tenant_id: ObjectId) -> DaoResult<Vec<Project>> {
        self.base
            .find_many(
                doc! { "tenant_id": tenant_id, "deleted_at": null },
                Some(doc! { "created_at": -1 }),
            )
            .await
    }

    pub async fn update(
        &self,
        tenant_id: ObjectId,
        project_id: ObjectId,
        name: Option<String>,
        status: Option<ProjectStatus>,
        client_name: Option<String>,
    ) -> DaoResult<bool> {
        let mut set_doc = doc! {};

        if let Some(name) = name {
            set_doc.insert("name", name);
        }
        if let Some(status) = status {
            set_doc.insert("status", bson::to_bson(&status)?);
        }
        if let Some(client_name) = client_name {
            set_doc.insert("client_name", client_name);
        }

        if set_doc.is_empty() {
            return Ok(false);
        }

        self.base
            .update_one(
                doc! { "_id": project_id, "tenant_id": tenant_id, "deleted_at": null },
                doc! { "$set": set_doc },
            )
            .await
    }

    pub async fn soft_delete(
        &self,
        tenant_id: ObjectId,
        project_id: ObjectId,
    ) -> DaoResult<bool> {
        self.base
            .update_one(
                doc! { "_id": project_id, "tenant_id": tenant_id, "deleted_at": null },
                doc! { "$set": { "deleted_at": DateTime::now() } },
            )
            .await
    }
}
