//! Record store for cataloged papers.
//!
//! Every function works against a borrowed connection so callers decide the
//! transaction boundary; the scanner wraps a whole batch, request handlers
//! run one statement at a time.

use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use thiserror::Error;

use crate::models::{NewPaper, Paper, PaperChangeset};
use crate::schema::papers;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("paper not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(diesel::result::Error),
}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Conjunctive list filter. `search` matches title, summary or content.
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub year: Option<i32>,
    pub topic: Option<String>,
    pub company: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Year,
    Topic,
    Company,
}

#[derive(Debug)]
pub enum UpsertOutcome {
    Added(Paper),
    Updated(Paper),
}

pub fn insert_paper(conn: &mut SqliteConnection, new_paper: &NewPaper) -> StoreResult<Paper> {
    let paper = diesel::insert_into(papers::table)
        .values(new_paper)
        .returning(Paper::as_returning())
        .get_result(conn)?;
    Ok(paper)
}

pub fn update_paper(
    conn: &mut SqliteConnection,
    paper_id: i32,
    changes: &PaperChangeset,
) -> StoreResult<Paper> {
    let now = Utc::now().naive_utc();
    let paper = diesel::update(papers::table.find(paper_id))
        .set((changes, papers::updated_at.eq(Some(now))))
        .returning(Paper::as_returning())
        .get_result(conn)?;
    Ok(paper)
}

pub fn delete_paper(conn: &mut SqliteConnection, paper_id: i32) -> StoreResult<()> {
    let deleted = diesel::delete(papers::table.find(paper_id)).execute(conn)?;
    if deleted == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub fn get_paper(conn: &mut SqliteConnection, paper_id: i32) -> StoreResult<Paper> {
    let paper = papers::table
        .find(paper_id)
        .select(Paper::as_select())
        .first(conn)?;
    Ok(paper)
}

pub fn find_by_file_path(
    conn: &mut SqliteConnection,
    file_path: &str,
) -> StoreResult<Option<Paper>> {
    let paper = papers::table
        .filter(papers::file_path.eq(file_path))
        .select(Paper::as_select())
        .first(conn)
        .optional()?;
    Ok(paper)
}

/// Inserts `new_paper`, or overwrites the record already owning its
/// `file_path`. Records without a path are always inserted.
pub fn upsert_by_file_path(
    conn: &mut SqliteConnection,
    new_paper: &NewPaper,
) -> StoreResult<UpsertOutcome> {
    let existing = match new_paper.file_path.as_deref() {
        Some(path) => find_by_file_path(conn, path)?,
        None => None,
    };

    match existing {
        Some(existing) => {
            let changes = PaperChangeset {
                title: new_paper.title.clone(),
                company: new_paper.company.clone(),
                year: new_paper.year,
                topic: new_paper.topic.clone(),
                summary: new_paper.summary.clone(),
                content: new_paper.content.clone(),
            };
            let paper = update_paper(conn, existing.id, &changes)?;
            Ok(UpsertOutcome::Updated(paper))
        }
        None => insert_paper(conn, new_paper).map(UpsertOutcome::Added),
    }
}

pub fn list_papers(conn: &mut SqliteConnection, filter: &PaperFilter) -> StoreResult<Vec<Paper>> {
    let mut query = papers::table.into_boxed();

    if let Some(year) = filter.year {
        query = query.filter(papers::year.eq(year));
    }
    if let Some(topic) = filter.topic.as_deref() {
        query = query.filter(papers::topic.eq(topic));
    }
    if let Some(company) = filter.company.as_deref() {
        query = query.filter(papers::company.eq(company));
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = format!("%{}%", escape_like(search));
        query = query.filter(
            papers::title
                .like(pattern.clone())
                .escape('\\')
                .or(papers::summary.like(pattern.clone()).escape('\\'))
                .or(papers::content.like(pattern).escape('\\')),
        );
    }

    let rows = query
        .order((papers::created_at.desc(), papers::id.desc()))
        .select(Paper::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn count_papers(conn: &mut SqliteConnection) -> StoreResult<i64> {
    let total = papers::table.select(count_star()).first(conn)?;
    Ok(total)
}

pub fn distinct_years(conn: &mut SqliteConnection) -> StoreResult<Vec<i32>> {
    let years = papers::table
        .select(papers::year)
        .distinct()
        .order(papers::year.desc())
        .load(conn)?;
    Ok(years)
}

pub fn distinct_topics(conn: &mut SqliteConnection) -> StoreResult<Vec<String>> {
    let topics = papers::table
        .select(papers::topic)
        .distinct()
        .order(papers::topic.asc())
        .load(conn)?;
    Ok(topics)
}

pub fn distinct_companies(conn: &mut SqliteConnection) -> StoreResult<Vec<String>> {
    let companies = papers::table
        .select(papers::company)
        .distinct()
        .order(papers::company.asc())
        .load(conn)?;
    Ok(companies)
}

/// Record counts per value of `field`, largest group first.
///
/// Ties keep the same order as the filter options: newest year first, names
/// alphabetically.
pub fn count_grouped(
    conn: &mut SqliteConnection,
    field: GroupField,
) -> StoreResult<Vec<(String, i64)>> {
    let mut groups: Vec<(String, i64)> = match field {
        GroupField::Year => {
            let mut rows: Vec<(i32, i64)> = papers::table
                .group_by(papers::year)
                .select((papers::year, count_star()))
                .load(conn)?;
            rows.sort_by(|a, b| b.0.cmp(&a.0));
            rows.into_iter()
                .map(|(year, count)| (year.to_string(), count))
                .collect()
        }
        GroupField::Topic => {
            let mut rows: Vec<(String, i64)> = papers::table
                .group_by(papers::topic)
                .select((papers::topic, count_star()))
                .load(conn)?;
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            rows
        }
        GroupField::Company => {
            let mut rows: Vec<(String, i64)> = papers::table
                .group_by(papers::company)
                .select((papers::company, count_star()))
                .load(conn)?;
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            rows
        }
    };

    // stable sort keeps the tie order established above
    groups.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(groups)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
