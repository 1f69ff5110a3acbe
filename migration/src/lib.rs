pub use sea_orm_migration::prelude::*;

mod m20241026_000001_create_users_and_media;
mod m20241026_000002_create_user_media_and_reviews;
mod m20241117_000001_create_schedules;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20241026_000001_create_users_and_media::Migration),
            Box::new(m20241026_000002_create_user_media_and_reviews::Migration),
            Box::new(m20241117_000001_create_schedules::Migration),
        ]
    }
}
