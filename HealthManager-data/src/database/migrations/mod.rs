// Schema migrations, applied on every pool initialization
mod sqlite;
pub use sqlite::run_migrations as run_sqlite_migrations;
