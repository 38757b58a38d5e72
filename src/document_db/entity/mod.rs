use super::schema;

// Basic entity mappings on database tables (1:1 copies of our schema).
pub mod document_row;
pub use self::document_row::DocumentRow;
