use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Tenants
    create_indexes(
        db,
        "tenants",
        vec![index_unique(bson::doc! { "slug": 1 })],
    )
    .await?;

    // Users
    create_indexes(
        db,
        "users",
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Memberships: one *active* row per (tenant, user); removed rows are
    // history and escape the uniqueness constraint.
    create_indexes(
        db,
        "memberships",
        vec![
            index_unique_partial(
                bson::doc! { "tenant_id": 1, "user_id": 1 },
                bson::doc! { "status": "active" },
            ),
            index(bson::doc! { "user_id": 1, "status": 1 }),
            index(bson::doc! { "tenant_id": 1, "status": 1, "role": 1 }),
        ],
    )
    .await?;

    // Invitations: single-use unique token; at most one pending invitation
    // per (tenant, email).
    create_indexes(
        db,
        "invitations",
        vec![
            index_unique(bson::doc! { "token": 1 }),
            index_unique_partial(
                bson::doc! { "tenant_id": 1, "email": 1 },
                bson::doc! { "status": "pending" },
            ),
            index(bson::doc! { "tenant_id": 1, "status": 1 }),
        ],
    )
    .await?;

    // Projects
    create_indexes(
        db,
        "projects",
        vec![
            index_unique(bson::doc! { "tenant_id": 1, "code": 1 }),
            index(bson::doc! { "tenant_id": 1, "status": 1, "created_at": -1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_partial(keys: bson::Document, filter: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(filter)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
