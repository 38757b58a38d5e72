#[macro_use]
extern crate diesel;

pub mod document_db;
pub mod document_store;
pub mod export;
pub mod import;
pub mod inventory;
