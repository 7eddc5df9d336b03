/// Print the DDL the remote Postgres needs for semantic search.
pub fn remote_schema() {
    println!("{}", crate::remote::schema::REMOTE_SCHEMA_SQL);
}
