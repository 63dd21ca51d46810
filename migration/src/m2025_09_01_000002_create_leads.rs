//! Migration to create the leads table.
//!
//! Enumerated columns are stored as text holding the SCREAMING_SNAKE_CASE
//! variant name; budgets are 64-bit integers.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::FullName).text().not_null())
                    .col(ColumnDef::new(Leads::Email).text().null())
                    .col(ColumnDef::new(Leads::Phone).text().not_null())
                    .col(ColumnDef::new(Leads::City).text().not_null())
                    .col(ColumnDef::new(Leads::PropertyType).text().not_null())
                    .col(ColumnDef::new(Leads::Bhk).text().null())
                    .col(ColumnDef::new(Leads::Purpose).text().not_null())
                    .col(ColumnDef::new(Leads::BudgetMin).big_integer().null())
                    .col(ColumnDef::new(Leads::BudgetMax).big_integer().null())
                    .col(ColumnDef::new(Leads::Timeline).text().not_null())
                    .col(ColumnDef::new(Leads::Source).text().not_null())
                    .col(
                        ColumnDef::new(Leads::Status)
                            .text()
                            .not_null()
                            .default("NEW"),
                    )
                    .col(ColumnDef::new(Leads::Notes).text().null())
                    .col(ColumnDef::new(Leads::Tags).text().not_null().default(""))
                    .col(ColumnDef::new(Leads::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Leads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_leads_owner_id")
                            .from(Leads::Table, Leads::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Owner-scoped listing sorts by updated_at DESC
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_leads_owner_updated ON leads (owner_id, updated_at DESC)".to_string(),
            ))
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_leads_owner_status")
                    .table(Leads::Table)
                    .col(Leads::OwnerId)
                    .col(Leads::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_leads_owner_updated").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_leads_owner_status").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
    FullName,
    Email,
    Phone,
    City,
    PropertyType,
    Bhk,
    Purpose,
    BudgetMin,
    BudgetMax,
    Timeline,
    Source,
    Status,
    Notes,
    Tags,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
