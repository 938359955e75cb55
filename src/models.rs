use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = papers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Paper {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub year: i32,
    pub topic: String,
    pub summary: Option<String>,
    pub content: String,
    pub file_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = papers)]
pub struct NewPaper {
    pub title: String,
    pub company: String,
    pub year: i32,
    pub topic: String,
    pub summary: Option<String>,
    pub content: String,
    pub file_path: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Field overwrite applied when a scan revisits a known `file_path`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = papers)]
#[diesel(treat_none_as_null = true)]
pub struct PaperChangeset {
    pub title: String,
    pub company: String,
    pub year: i32,
    pub topic: String,
    pub summary: Option<String>,
    pub content: String,
}
