use sea_orm_migration::prelude::*;

mod m20260115_000001_create_users_table;
mod m20260115_000002_create_communities_table;
mod m20260115_000003_create_community_members_table;
mod m20260115_000004_create_threads_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260115_000001_create_users_table::Migration),
            Box::new(m20260115_000002_create_communities_table::Migration),
            Box::new(m20260115_000003_create_community_members_table::Migration),
            Box::new(m20260115_000004_create_threads_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    assert!(schema_manager.has_table("user").await?);
    assert!(schema_manager.has_table("community").await?);
    assert!(schema_manager.has_table("community_member").await?);
    assert!(schema_manager.has_table("thread").await?);

    Ok(())
}
