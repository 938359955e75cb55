use axum::extract::{Json, Multipart, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::extract::extract_summary;
use crate::models::{NewPaper, Paper};
use crate::scanner::ScanResult;
use crate::state::AppState;
use crate::store::{self, GroupField, PaperFilter, StoreError};

#[derive(Deserialize)]
pub struct PaperListQuery {
    pub year: Option<i32>,
    pub topic: Option<String>,
    pub company: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct PaperResponse {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub year: i32,
    pub topic: String,
    pub summary: Option<String>,
    pub content: String,
    pub file_path: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<Paper> for PaperResponse {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            company: paper.company,
            year: paper.year,
            topic: paper.topic,
            summary: paper.summary,
            content: paper.content,
            file_path: paper.file_path,
            created_at: to_iso(paper.created_at),
            updated_at: paper.updated_at.map(to_iso),
        }
    }
}

/// List view of a paper; the document body is left out.
#[derive(Serialize)]
pub struct PaperListItem {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub year: i32,
    pub topic: String,
    pub summary: Option<String>,
    pub created_at: String,
}

impl From<Paper> for PaperListItem {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            company: paper.company,
            year: paper.year,
            topic: paper.topic,
            summary: paper.summary,
            created_at: to_iso(paper.created_at),
        }
    }
}

#[derive(Serialize)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub topics: Vec<String>,
    pub companies: Vec<String>,
}

/// Grouped counts rendered as a JSON object that keeps the query order.
pub struct GroupCounts(pub Vec<(String, i64)>);

impl Serialize for GroupCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, count) in &self.0 {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
pub struct PaperStats {
    pub total_papers: i64,
    pub by_year: GroupCounts,
    pub by_topic: GroupCounts,
    pub by_company: GroupCounts,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

struct UploadRequest {
    bytes: Vec<u8>,
    filename: String,
    title: String,
    company: String,
    year: i32,
    topic: String,
    summary: Option<String>,
}

pub async fn list_papers(
    State(state): State<AppState>,
    Query(params): Query<PaperListQuery>,
) -> AppResult<Json<Vec<PaperListItem>>> {
    let filter = PaperFilter {
        year: params.year,
        topic: non_empty(params.topic),
        company: non_empty(params.company),
        search: non_empty(params.search),
    };

    let mut conn = state.db()?;
    let papers = store::list_papers(&mut conn, &filter)?;

    Ok(Json(papers.into_iter().map(PaperListItem::from).collect()))
}

pub async fn filter_options(State(state): State<AppState>) -> AppResult<Json<FilterOptions>> {
    let mut conn = state.db()?;

    Ok(Json(FilterOptions {
        years: store::distinct_years(&mut conn)?,
        topics: store::distinct_topics(&mut conn)?,
        companies: store::distinct_companies(&mut conn)?,
    }))
}

pub async fn paper_stats(State(state): State<AppState>) -> AppResult<Json<PaperStats>> {
    let mut conn = state.db()?;

    Ok(Json(PaperStats {
        total_papers: store::count_papers(&mut conn)?,
        by_year: GroupCounts(store::count_grouped(&mut conn, GroupField::Year)?),
        by_topic: GroupCounts(store::count_grouped(&mut conn, GroupField::Topic)?),
        by_company: GroupCounts(store::count_grouped(&mut conn, GroupField::Company)?),
    }))
}

pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> AppResult<Json<PaperResponse>> {
    let mut conn = state.db()?;
    let paper = store::get_paper(&mut conn, paper_id)?;
    Ok(Json(PaperResponse::from(paper)))
}

pub async fn upload_paper(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<PaperResponse>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut title: Option<String> = None;
    let mut company: Option<String> = None;
    let mut year: Option<String> = None;
    let mut topic: Option<String> = None;
    let mut summary: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                filename = field.file_name().map(|n| n.to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read file bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                file_bytes = Some(data.to_vec());
            }
            Some(other @ ("title" | "company" | "year" | "topic" | "summary")) => {
                let value = field.text().await.map_err(|err| {
                    error!(error = %err, field = other, "invalid form field");
                    AppError::bad_request(format!("invalid {other} field: {err}"))
                })?;
                let slot = match other {
                    "title" => &mut title,
                    "company" => &mut company,
                    "year" => &mut year,
                    "topic" => &mut topic,
                    _ => &mut summary,
                };
                *slot = Some(value);
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| {
        error!("upload rejected: missing file field");
        AppError::bad_request("file field is required")
    })?;
    let filename = filename
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| {
            error!("upload rejected: missing original filename");
            AppError::bad_request("filename is required")
        })?;

    if !filename.ends_with(".md") {
        warn!(filename = %filename, "upload rejected: not a markdown file");
        return Err(AppError::bad_request("Only .md files are allowed"));
    }

    let title = required_field("title", title)?;
    let company = required_field("company", company)?;
    let topic = required_field("topic", topic)?;
    let year: i32 = required_field("year", year)?
        .parse()
        .map_err(|_| AppError::bad_request("year must be an integer"))?;

    if !is_single_component(&topic) {
        return Err(AppError::bad_request(
            "topic must not contain path separators",
        ));
    }
    if !is_single_component(&filename) {
        return Err(AppError::bad_request(
            "filename must not contain path separators",
        ));
    }

    let request = UploadRequest {
        bytes: file_bytes,
        filename: filename.clone(),
        title,
        company,
        year,
        topic,
        summary: non_empty(summary),
    };

    match process_upload(&state, request).await {
        Ok(paper) => {
            info!(
                paper_id = paper.id,
                file_path = ?paper.file_path,
                "paper upload succeeded"
            );
            Ok((StatusCode::CREATED, Json(PaperResponse::from(paper))))
        }
        Err(err) => {
            error!(error = %err, filename = %filename, "paper upload failed");
            Err(err)
        }
    }
}

async fn process_upload(state: &AppState, request: UploadRequest) -> AppResult<Paper> {
    let UploadRequest {
        bytes,
        filename,
        title,
        company,
        year,
        topic,
        summary,
    } = request;

    let content = String::from_utf8(bytes)
        .map_err(|_| AppError::unprocessable("file must be valid UTF-8 text"))?;

    let relative_path = format!("{year}/{topic}/{filename}");

    {
        let mut conn = state.db()?;
        if store::find_by_file_path(&mut conn, &relative_path)?.is_some() {
            return Err(AppError::conflict(format!(
                "a paper is already stored at {relative_path}"
            )));
        }
    }

    state
        .storage
        .put_object(&relative_path, content.clone().into_bytes())
        .await
        .map_err(|err| {
            error!(error = %err, file_path = %relative_path, "failed to store paper file");
            AppError::internal(format!("failed to store paper file: {err}"))
        })?;

    let summary = summary.unwrap_or_else(|| extract_summary(&content));
    let new_paper = NewPaper {
        title,
        company,
        year,
        topic,
        summary: Some(summary),
        content,
        file_path: Some(relative_path.clone()),
        created_at: Utc::now().naive_utc(),
    };

    let inserted = state.db().and_then(|mut conn| {
        store::insert_paper(&mut conn, &new_paper).map_err(|err| match err {
            StoreError::Database(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => AppError::conflict(format!("a paper is already stored at {relative_path}")),
            other => AppError::from(other),
        })
    });

    match inserted {
        Ok(paper) => Ok(paper),
        // the path belongs to another record
        Err(err) if err.status() == StatusCode::CONFLICT => Err(err),
        Err(err) => {
            // no record owns the file
            if let Err(cleanup) = state.storage.delete_object(&relative_path).await {
                error!(
                    error = %cleanup,
                    file_path = %relative_path,
                    "failed to remove file after insert failure"
                );
            }
            Err(err)
        }
    }
}

pub async fn scan_papers(State(state): State<AppState>) -> AppResult<Json<ScanResult>> {
    let result = state.scan().await?;
    Ok(Json(result))
}

pub async fn delete_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    let paper = {
        let mut conn = state.db()?;
        let paper = store::get_paper(&mut conn, paper_id)?;
        store::delete_paper(&mut conn, paper_id)?;
        paper
    };
    info!(paper_id, "paper deleted");

    // the record is gone; the backing file is removed best-effort
    if let Some(file_path) = paper.file_path.as_deref() {
        match state.storage.delete_object(file_path).await {
            Ok(true) => {}
            Ok(false) => warn!(paper_id, file_path = %file_path, "backing file already gone"),
            Err(err) => {
                warn!(error = %err, paper_id, file_path = %file_path, "failed to delete paper file")
            }
        }
    }

    Ok(Json(MessageResponse {
        message: "Paper deleted successfully".to_string(),
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required_field(name: &str, value: Option<String>) -> AppResult<String> {
    non_empty(value).ok_or_else(|| AppError::bad_request(format!("{name} is required")))
}

fn is_single_component(value: &str) -> bool {
    !value.is_empty() && value != "." && value != ".." && !value.contains(['/', '\\'])
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_component_rejects_traversal() {
        assert!(is_single_component("report.md"));
        assert!(is_single_component("AI & Data"));
        assert!(!is_single_component(".."));
        assert!(!is_single_component("../etc"));
        assert!(!is_single_component("a\\b.md"));
        assert!(!is_single_component(""));
    }

    #[test]
    fn group_counts_serialize_in_given_order() {
        let counts = GroupCounts(vec![("2022".to_string(), 3), ("2024".to_string(), 1)]);
        let json = serde_json::to_string(&counts).expect("serialize");
        assert_eq!(json, r#"{"2022":3,"2024":1}"#);
    }

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" AI ".to_string())), Some("AI".to_string()));
    }
}
