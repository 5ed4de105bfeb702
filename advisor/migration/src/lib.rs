pub use sea_orm_migration::prelude::*;

mod m20251201_000001_create_tasks_table;
mod m20251203_000002_add_task_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251201_000001_create_tasks_table::Migration),
            Box::new(m20251203_000002_add_task_indexes::Migration),
        ]
    }
}
