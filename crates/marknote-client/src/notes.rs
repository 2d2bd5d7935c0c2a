//! Notes endpoints

use marknote_core::{Note, NoteCreateRequest, NoteUpdateRequest, NotesPage, Result};

use crate::api::ApiClient;
use crate::transport::ApiRequest;

/// Default page size used by the notes list
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Default number of recent notes
pub const DEFAULT_RECENT_LIMIT: u32 = 10;

/// Filters for the paged notes list
#[derive(Debug, Clone)]
pub struct NoteQuery {
    pub page: u32,
    pub size: u32,
    pub keyword: Option<String>,
    pub folder_id: Option<i64>,
}

impl Default for NoteQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            keyword: None,
            folder_id: None,
        }
    }
}

/// CRUD and search over the user's notes
#[derive(Debug, Clone)]
pub struct NotesApi {
    api: ApiClient,
}

impl NotesApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// One page of notes
    pub async fn get_notes(&self, query: &NoteQuery) -> Result<NotesPage> {
        let request = ApiRequest::get("/notes")
            .query("page", query.page)
            .query("size", query.size)
            .query_opt("keyword", query.keyword.as_deref())
            .query_opt("folderId", query.folder_id);
        self.api.fetch(request).await
    }

    pub async fn get_note(&self, id: i64) -> Result<Note> {
        self.api.fetch(ApiRequest::get(format!("/notes/{}", id))).await
    }

    pub async fn create_note(&self, note: &NoteCreateRequest) -> Result<Note> {
        let request = ApiRequest::post("/notes").json(serde_json::to_value(note)?);
        self.api.fetch(request).await
    }

    pub async fn update_note(&self, id: i64, update: &NoteUpdateRequest) -> Result<Note> {
        let request = ApiRequest::put(format!("/notes/{}", id)).json(serde_json::to_value(update)?);
        self.api.fetch(request).await
    }

    pub async fn delete_note(&self, id: i64) -> Result<()> {
        self.api
            .execute(ApiRequest::delete(format!("/notes/{}", id)))
            .await?;
        Ok(())
    }

    /// Full-text search by keyword
    pub async fn search_notes(&self, keyword: &str) -> Result<Vec<Note>> {
        self.api
            .fetch(ApiRequest::get("/notes/search").query("keyword", keyword))
            .await
    }

    /// Flip the starred flag
    pub async fn toggle_star(&self, id: i64) -> Result<()> {
        self.api
            .execute(ApiRequest::post(format!("/notes/{}/star", id)))
            .await?;
        Ok(())
    }

    pub async fn get_starred_notes(&self) -> Result<Vec<Note>> {
        self.api.fetch(ApiRequest::get("/notes/starred")).await
    }

    /// Most recently updated notes
    pub async fn get_recent_notes(&self, limit: Option<u32>) -> Result<Vec<Note>> {
        let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
        self.api
            .fetch(ApiRequest::get("/notes/recent").query("limit", limit))
            .await
    }
}
