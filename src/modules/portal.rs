//! Portal routes
//!
//! | route                     | handler                 |
//! |---------------------------|-------------------------|
//! | `GET /`                   | liveness text           |
//! | `POST /login`             | [`Portal::login`]       |
//! | `POST /upload`            | [`Portal::upload`]      |
//! | `GET /files/:branch_name` | [`Portal::list_files`]  |
//!
//! Handlers are synchronous; the server runs them on the blocking pool.

use serde::Serialize;

use super::auth::{self, Credentials};
use super::branches::Branch;
use super::enhanced_error::ApiError;
use super::form::{content_type_param, media_type, parse_urlencoded};
use super::http_request::Request;
use super::http_response::HttpResponse;
use super::multipart::MultipartForm;
use super::upload_store::{is_safe_filename, UploadStore};

pub const LIVENESS_TEXT: &str = "Gadaa Bank Backend is running.";

#[derive(Debug, Serialize)]
pub struct FileList {
    pub files: Vec<String>,
}

pub struct Portal {
    store: UploadStore,
}

impl Portal {
    pub fn new(store: UploadStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// Route a request and turn any handler failure into its JSON response
    pub fn handle(&self, request: &Request) -> HttpResponse {
        let mut response = self.route(request).unwrap_or_else(ApiError::into_response);
        response.add_security_headers();
        response
    }

    fn route(&self, request: &Request) -> Result<HttpResponse, ApiError> {
        // HEAD is answered like GET; the server drops the body.
        let method = match request.method.as_str() {
            "HEAD" => "GET",
            other => other,
        };
        let path = request.path.as_str();

        match (method, path) {
            ("GET", "/") => Ok(HttpResponse::text(200, LIVENESS_TEXT)),
            (_, "/") => Ok(HttpResponse::method_not_allowed(&["GET", "HEAD"])),
            ("POST", "/login") => self.login(request),
            (_, "/login") => Ok(HttpResponse::method_not_allowed(&["POST"])),
            ("POST", "/upload") => self.upload(request),
            (_, "/upload") => Ok(HttpResponse::method_not_allowed(&["POST"])),
            _ => match branch_segment(path) {
                Some(segment) if method == "GET" => self.list_files(segment),
                Some(_) => Ok(HttpResponse::method_not_allowed(&["GET", "HEAD"])),
                None => Ok(HttpResponse::message(404, "Not found.")),
            },
        }
    }

    /// `POST /login`: JSON or urlencoded `{username, password}`
    pub fn login(&self, request: &Request) -> Result<HttpResponse, ApiError> {
        let credentials = read_credentials(request)?;

        match auth::login(&credentials) {
            Some(body) => {
                log::info!("Login succeeded for {} ({})", body.user.username, body.user.role);
                Ok(HttpResponse::json(200, &body))
            }
            None => {
                log::warn!("Login failed for {:?}", credentials.username);
                Err(ApiError::unauthorized("Invalid username or password."))
            }
        }
    }

    /// `POST /upload`: stage the file, validate the branch, move it into place
    pub fn upload(&self, request: &Request) -> Result<HttpResponse, ApiError> {
        let form = read_multipart(request)?;

        let file = form
            .file("file")
            .ok_or_else(|| ApiError::bad_request("No file uploaded."))?;
        let filename = file.filename.as_deref().unwrap_or_default();
        if !is_safe_filename(filename) {
            log::warn!("Rejected upload with unsafe file name {:?}", filename);
            return Err(ApiError::bad_request("Invalid file name."));
        }

        let staged = self
            .store
            .stage(filename, &file.data)
            .map_err(|e| ApiError::internal("Failed to store uploaded file.", &e))?;

        let branch_field = form.field("branch").unwrap_or_default();
        if branch_field.is_empty() {
            self.store.discard(&staged);
            return Err(ApiError::bad_request("Branch name is missing from the request."));
        }
        let Some(branch) = Branch::parse(&branch_field) else {
            self.store.discard(&staged);
            log::warn!("Rejected upload of {:?} to unknown branch {:?}", filename, branch_field);
            return Err(ApiError::bad_request("Invalid branch selected."));
        };

        // A failed move leaves the staged file behind.
        let placed = self
            .store
            .place(&staged, branch)
            .map_err(|e| ApiError::internal("Failed to move file to final destination.", &e))?;

        log::info!(
            "Stored {} ({} bytes, {})",
            placed.display(),
            file.data.len(),
            file.content_type.as_deref().unwrap_or("no content type")
        );
        Ok(HttpResponse::ok_message(&format!(
            "File \"{}\" uploaded to branch \"{}\"!",
            filename, branch
        )))
    }

    /// `GET /files/:branch_name` with the raw (still percent-encoded) segment
    pub fn list_files(&self, raw_branch: &str) -> Result<HttpResponse, ApiError> {
        let name = urlencoding::decode(raw_branch)
            .map_err(|_| ApiError::bad_request("Invalid branch name."))?;
        let branch = Branch::parse(&name).ok_or_else(|| ApiError::bad_request("Invalid branch name."))?;

        let files = self
            .store
            .list(branch)
            .map_err(|e| ApiError::internal("Error retrieving files.", &e))?;

        Ok(HttpResponse::json(200, &FileList { files }))
    }
}

/// The `:branch_name` segment of `/files/:branch_name`, allowing one
/// trailing slash
fn branch_segment(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/files/")?;
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(rest)
}

fn read_credentials(request: &Request) -> Result<Credentials, ApiError> {
    if request.body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Credentials::default());
    }

    let media = request.content_type().map(media_type).unwrap_or_default();
    match media.as_str() {
        "application/json" => serde_json::from_slice::<serde_json::Value>(&request.body)
            .map(|body| Credentials::from_json(&body))
            .map_err(|_| ApiError::bad_request("Malformed request body.")),
        "application/x-www-form-urlencoded" => {
            let mut params = parse_urlencoded(&String::from_utf8_lossy(&request.body));
            Ok(Credentials {
                username: params.remove("username").unwrap_or_default(),
                password: params.remove("password").unwrap_or_default(),
            })
        }
        // Bodies of other types are not read, so no credentials arrive.
        _ => Ok(Credentials::default()),
    }
}

fn read_multipart(request: &Request) -> Result<MultipartForm, ApiError> {
    let content_type = request.content_type().unwrap_or_default();
    if media_type(content_type) != "multipart/form-data" {
        return Err(ApiError::bad_request("No file uploaded."));
    }

    let boundary = content_type_param(content_type, "boundary")
        .ok_or_else(|| ApiError::bad_request("Malformed multipart body."))?;

    MultipartForm::parse(&request.body, &boundary).map_err(|e| {
        log::warn!("Rejected upload: {}", e);
        ApiError::bad_request("Malformed multipart body.")
    })
}
