use super::schema::documents;

/// One stored subtree of the document tree, serialized as JSON text.
#[derive(Debug, Queryable, Clone)]
pub struct DocumentRow {
    pub path: String,
    pub value: String,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "documents"]
pub struct InsertFull<'a> {
    pub path: &'a str,
    pub value: &'a str,
    pub updated_at: &'a chrono::NaiveDateTime,
}
