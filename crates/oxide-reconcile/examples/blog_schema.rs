//! Example: Blog Application Schema
//!
//! Reconciles a users/posts/comments schema against an in-memory SQLite
//! database, then evolves the schema and reconciles again.
//!
//! Run with: cargo run --example blog_schema -p oxide-reconcile

use std::sync::Arc;

use oxide_reconcile::prelude::*;

fn blog_v1() -> Schema {
    Schema::new()
        .table(
            Table::new("Comment")
                .column(Column::new("ID", ColumnType::Integer))
                .column(Column::new("PostID", ColumnType::Integer))
                .column(Column::new("AuthorID", ColumnType::Integer))
                .column(Column::new("Body", ColumnType::Text))
                .child_of("Post", "PostID")
                .child_of("User", "AuthorID"),
        )
        .table(
            Table::new("Post")
                .column(Column::new("ID", ColumnType::Integer))
                .column(Column::new("UserID", ColumnType::Integer))
                .column(Column::new("Title", ColumnType::Varchar).length(200))
                .column(Column::new("PublishedAt", ColumnType::Timestamp))
                .child_of("User", "UserID")
                .has_many("Comment", "PostID")
                .index(Index::unique(["UserID", "Title"])),
        )
        .table(
            Table::new("User")
                .column(Column::new("ID", ColumnType::Integer))
                .column(Column::new("UserName", ColumnType::Varchar).length(100))
                .has_many("Post", "UserID")
                .index(Index::unique(["UserName"])),
        )
}

fn blog_v2() -> Schema {
    let user = blog_v1()
        .get_table("User")
        .cloned()
        .unwrap_or_else(|| Table::new("User"))
        .column(Column::new("EMail", ColumnType::Varchar).length(255))
        .column(Column::new("IsActive", ColumnType::Boolean))
        .index(Index::new(["EMail"]));
    blog_v1().table(user)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!(" OXIDE-RECONCILE: Blog Application Example");
    println!("{}", "=".repeat(70));
    println!();

    let pool = connect("sqlite::memory:").await?;
    let sink = Arc::new(MemorySink::new());

    println!("[1] Reconciling an empty database with v1...");
    let mut db = Database::new(pool.clone(), blog_v1(), Dialect::Sqlite, Arc::new(Rails))
        .with_sink(sink.clone());
    db.migrate().await?;
    print_statements(&sink);

    println!("[2] Reconciling again (nothing to do)...");
    sink.clear();
    db.migrate().await?;
    print_statements(&sink);

    println!("[3] Reconciling with v2 (new columns and index on User)...");
    sink.clear();
    let mut db =
        Database::new(pool, blog_v2(), Dialect::Sqlite, Arc::new(Rails)).with_sink(sink.clone());
    if !db.up_to_date().await? {
        println!("    modified: {}", db.modified_tables().join(", "));
    }
    db.migrate().await?;
    print_statements(&sink);

    println!("{}", "=".repeat(70));
    Ok(())
}

fn print_statements(sink: &MemorySink) {
    let statements = sink.statements();
    if statements.is_empty() {
        println!("    (no statements)\n");
        return;
    }
    for sql in statements {
        println!("    {sql};");
    }
    println!();
}
