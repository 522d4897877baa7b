#![allow(dead_code)] // https://github.com/rust-lang/rust/issues/46379

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use rdrive::{
    auth::Credentials, Body, Config, Drive, HttpRequest, HttpResponse, Transport, Urls,
    FOLDER_MIME_TYPE,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

pub const BASE_URL: &str = "https://fake.drive.test/";
pub const ACCESS_TOKEN: &str = "fake-access-token";

/// A file as stored by [`FakeDrive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub description: Option<String>,
    pub parents: Vec<String>,
    pub content: Vec<u8>,
    pub trashed: bool,
    pub created_time: String,
    pub modified_time: String,
}

impl StoredFile {
    fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    fn resource(&self) -> Value {
        json!({
            "kind": "drive#file",
            "id": self.id,
            "name": self.name,
            "mimeType": self.mime_type,
            "parents": self.parents,
            "createdTime": self.created_time,
            "modifiedTime": self.modified_time,
            "size": self.content.len().to_string(),
        })
    }

    fn matches(&self, clause: &Clause) -> bool {
        match clause {
            Clause::MimeType(v) => &self.mime_type == v,
            Clause::NotMimeType(v) => &self.mime_type != v,
            Clause::InParents(v) => self.parents.contains(v),
            Clause::NameContains(v) => self.name.contains(v.as_str()),
            Clause::NameEq(v) => &self.name == v,
            Clause::FullText(v) => {
                self.name.contains(v.as_str())
                    || String::from_utf8_lossy(&self.content).contains(v.as_str())
            }
            Clause::Trashed => self.trashed,
            Clause::Time { field, op, value } => {
                let actual = match field.as_str() {
                    "modifiedTime" => &self.modified_time,
                    _ => &self.created_time,
                };
                match op.as_str() {
                    "=" => actual == value,
                    ">" => actual > value,
                    ">=" => actual >= value,
                    "<" => actual < value,
                    _ => actual <= value,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    MimeType(String),
    NotMimeType(String),
    InParents(String),
    NameContains(String),
    NameEq(String),
    FullText(String),
    Trashed,
    Time {
        field: String,
        op: String,
        value: String,
    },
}

fn quoted(value: &str) -> Option<String> {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map(ToOwned::to_owned)
}

fn parse_clause(clause: &str) -> Option<Clause> {
    if let Some(v) = clause.strip_prefix("mimeType!=") {
        return quoted(v).map(Clause::NotMimeType);
    }
    if let Some(v) = clause.strip_prefix("mimeType=") {
        return quoted(v).map(Clause::MimeType);
    }
    if let Some(v) = clause.strip_suffix(" in parents") {
        return quoted(v).map(Clause::InParents);
    }
    if let Some(v) = clause.strip_prefix("name contains ") {
        return quoted(v).map(Clause::NameContains);
    }
    if let Some(v) = clause.strip_prefix("name = ") {
        return quoted(v).map(Clause::NameEq);
    }
    if let Some(v) = clause.strip_prefix("fullText contains ") {
        return quoted(v).map(Clause::FullText);
    }
    if clause == "trashed = true" {
        return Some(Clause::Trashed);
    }
    let mut parts = clause.splitn(3, ' ');
    let field = parts.next()?;
    let op = parts.next()?;
    let value = quoted(parts.next()?)?;
    if !matches!(field, "modifiedTime" | "createdTime")
        || !matches!(op, "=" | ">" | ">=" | "<" | "<=")
    {
        return None;
    }
    Some(Clause::Time {
        field: field.to_owned(),
        op: op.to_owned(),
        value,
    })
}

fn error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        json!({
            "error": {
                "code": status,
                "message": message,
                "errors": [{ "domain": "global", "reason": "fake", "message": message }]
            }
        })
        .to_string(),
    )
}

fn ok(value: Value) -> HttpResponse {
    HttpResponse::new(200, value.to_string())
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    pages: HashMap<String, Vec<String>>,
    failures: HashMap<String, u16>,
    requests: Vec<HttpRequest>,
    counter: u64,
}

impl State {
    fn tick(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    fn timestamp(&mut self) -> String {
        let offset = self.tick() as i64;
        Utc.timestamp_opt(1_700_000_000 + offset, 0)
            .unwrap()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn insert(
        &mut self,
        name: &str,
        mime_type: &str,
        parents: Vec<String>,
        content: Vec<u8>,
    ) -> StoredFile {
        let id = format!("id-{:04}", self.tick());
        let time = self.timestamp();
        let file = StoredFile {
            id: id.clone(),
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
            description: None,
            parents,
            content,
            trashed: false,
            created_time: time.clone(),
            modified_time: time,
        };
        self.files.insert(id, file.clone());
        file
    }
}

/// An in-memory Drive backend speaking the subset of the REST API used by this crate.
#[derive(Debug, Default)]
pub struct FakeDrive {
    state: Mutex<State>,
}

impl FakeDrive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stores a folder directly, without going through the API.
    pub fn add_folder(&self, name: &str, parent: Option<&str>) -> StoredFile {
        let parents = parent.map(|v| vec![v.to_owned()]).unwrap_or_default();
        self.state
            .lock()
            .unwrap()
            .insert(name, FOLDER_MIME_TYPE, parents, Vec::new())
    }

    /// Stores a file directly, without going through the API.
    pub fn add_file(&self, name: &str, parent: Option<&str>, content: &[u8]) -> StoredFile {
        let parents = parent.map(|v| vec![v.to_owned()]).unwrap_or_default();
        self.state
            .lock()
            .unwrap()
            .insert(name, "text/plain", parents, content.to_vec())
    }

    pub fn trash(&self, id: &str) {
        if let Some(file) = self.state.lock().unwrap().files.get_mut(id) {
            file.trashed = true;
        }
    }

    /// Makes every request concerning `id` fail with `status`.
    pub fn fail_with(&self, id: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(id.to_owned(), status);
    }

    pub fn get(&self, id: &str) -> Option<StoredFile> {
        self.state.lock().unwrap().files.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        if request.bearer.as_deref() != Some(ACCESS_TOKEN) {
            return error(401, "Request had invalid authentication credentials.");
        }
        let path = request.url.path().to_owned();
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if path == "/upload/drive/v3/files" && request.method == Method::POST {
            return upload(&mut state, request);
        }
        let rest = match path.strip_prefix("/drive/v3/files") {
            Some(v) => v.trim_start_matches('/').to_owned(),
            None => return error(404, "Not Found"),
        };
        if let Some(status) = state.failures.get(&rest) {
            return error(*status, "Backend Error");
        }
        let method = &request.method;
        match rest.as_str() {
            "" if *method == Method::GET => list(&mut state, request),
            "" if *method == Method::POST => create(&mut state, request),
            "trash" if *method == Method::DELETE => {
                state.files.retain(|_, v| !v.trashed);
                HttpResponse::new(204, "")
            }
            id if *method == Method::GET => match state.files.get(id) {
                Some(file) if request.query_param("alt") == Some("media") => {
                    HttpResponse::new(200, file.content.clone())
                }
                Some(file) => ok(file.resource()),
                None => not_found(id),
            },
            id if *method == Method::PATCH => patch(&mut state, id, request),
            id if *method == Method::DELETE => match state.files.remove(id) {
                Some(_) => HttpResponse::new(204, ""),
                None => not_found(id),
            },
            _ => error(405, "Method Not Allowed"),
        }
    }
}

#[async_trait]
impl Transport for FakeDrive {
    async fn send(&self, request: HttpRequest) -> rdrive::Result<HttpResponse> {
        Ok(self.handle(&request))
    }
}

fn not_found(id: &str) -> HttpResponse {
    error(404, &format!("File not found: {}.", id))
}

fn list(state: &mut State, request: &HttpRequest) -> HttpResponse {
    let page_size = request
        .query_param("pageSize")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(100);
    let remaining = match request.query_param("pageToken") {
        Some(token) => match state.pages.remove(token) {
            Some(ids) => ids,
            None => return error(400, "Invalid Value"),
        },
        None => {
            let mut clauses = Vec::new();
            if let Some(q) = request.query_param("q") {
                for clause in q.split(" and ") {
                    match parse_clause(clause) {
                        Some(v) => clauses.push(v),
                        None => return error(400, "Invalid Value"),
                    }
                }
            }
            let mut matching = state
                .files
                .values()
                .filter(|file| clauses.iter().all(|c| file.matches(c)))
                .collect::<Vec<_>>();
            for key in request
                .query_param("orderBy")
                .unwrap_or_default()
                .split(',')
                .filter(|v| !v.is_empty())
                .rev()
            {
                match key {
                    "name" => matching.sort_by(|a, b| a.name.cmp(&b.name)),
                    "createdTime" => matching.sort_by(|a, b| a.created_time.cmp(&b.created_time)),
                    "modifiedTime" => {
                        matching.sort_by(|a, b| a.modified_time.cmp(&b.modified_time))
                    }
                    "folder" => matching.sort_by_key(|v| !v.is_folder()),
                    _ => return error(400, "Invalid Value"),
                }
            }
            matching.into_iter().map(|v| v.id.clone()).collect()
        }
    };

    let mut remaining = remaining
        .into_iter()
        .filter(|id| state.files.contains_key(id))
        .collect::<Vec<_>>();
    let rest = remaining.split_off(page_size.min(remaining.len()));
    let mut body = json!({
        "kind": "drive#fileList",
        "incompleteSearch": false,
        "files": remaining
            .iter()
            .map(|id| state.files[id].resource())
            .collect::<Vec<_>>(),
    });
    if !rest.is_empty() {
        let token = format!("page-{}", state.tick());
        state.pages.insert(token.clone(), rest);
        body["nextPageToken"] = json!(token);
    }
    ok(body)
}

fn json_body(request: &HttpRequest) -> Value {
    match &request.body {
        Body::Json(v) => v.clone(),
        _ => json!({}),
    }
}

fn create(state: &mut State, request: &HttpRequest) -> HttpResponse {
    let body = json_body(request);
    let parents = body["parents"]
        .as_array()
        .map(|v| {
            v.iter()
                .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                .collect()
        })
        .unwrap_or_default();
    let mut file = state.insert(
        body["name"].as_str().unwrap_or("Untitled"),
        body["mimeType"].as_str().unwrap_or("application/octet-stream"),
        parents,
        Vec::new(),
    );
    if let Some(description) = body["description"].as_str() {
        file.description = Some(description.to_owned());
        state.files.insert(file.id.clone(), file.clone());
    }
    ok(file.resource())
}

fn upload(state: &mut State, request: &HttpRequest) -> HttpResponse {
    if request.query_param("uploadType") != Some("media") {
        return error(400, "Invalid upload type");
    }
    match &request.body {
        Body::Bytes { content_type, data } => {
            let file = state.insert("Untitled", content_type, Vec::new(), data.to_vec());
            ok(file.resource())
        }
        _ => error(400, "Missing media"),
    }
}

fn patch(state: &mut State, id: &str, request: &HttpRequest) -> HttpResponse {
    let body = json_body(request);
    let time = state.timestamp();
    let file = match state.files.get_mut(id) {
        Some(v) => v,
        None => return not_found(id),
    };
    if let Some(name) = body["name"].as_str() {
        file.name = name.to_owned();
    }
    if let Some(description) = body["description"].as_str() {
        file.description = Some(description.to_owned());
    }
    if let Some(parent) = request.query_param("addParents") {
        if !file.parents.iter().any(|v| v == parent) {
            file.parents.push(parent.to_owned());
        }
    }
    file.modified_time = time;
    ok(file.resource())
}

pub fn config(fake: &Arc<FakeDrive>) -> Config {
    Config::builder()
        .credentials(Credentials::AccessToken(ACCESS_TOKEN.to_owned()))
        .urls(Urls::unofficial(Url::parse(BASE_URL).unwrap()).unwrap())
        .transport(Arc::clone(fake) as Arc<dyn Transport>)
        .build()
}

pub fn drive(fake: &Arc<FakeDrive>) -> Drive {
    Drive::new(config(fake))
}

/// Writes `content` to a fresh file in the temporary directory and returns its path.
pub async fn local_file(name: &str, content: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("rdrive-test-{}-{}", std::process::id(), name));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join(name);
    tokio::fs::write(&path, content).await.unwrap();
    path
}
