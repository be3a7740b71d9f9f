//! Google Sheets client authenticated with a service-account key.
//!
//! Authentication is the OAuth 2.0 JWT-bearer flow: an RS256-signed
//! assertion built from the key file is exchanged for a short-lived access
//! token, which is cached until shortly before it expires.
//!
//! The spreadsheet is addressed by its human-readable name and resolved to
//! an id through a Drive search on first use, unless an explicit id is
//! configured. Rows go to the first worksheet.

use crate::error::SheetError;
use crate::outputs::sheet::SheetStore;
use crate::utils::{redact, truncate_for_log};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tokio::fs;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};
use url::Url;

const SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The subset of a Google service-account JSON key this client needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &redact(&self.private_key))
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    #[instrument(level = "info")]
    pub async fn from_file(path: &str) -> Result<Self, SheetError> {
        let raw = fs::read_to_string(path)
            .await
            .map_err(|e| SheetError::Credentials(format!("{path}: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| SheetError::Credentials(format!("{path}: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

pub struct GoogleSheets {
    http: reqwest::Client,
    key: ServiceAccountKey,
    sheet_name: String,
    drive_files_url: String,
    sheets_url: String,
    token: Mutex<Option<AccessToken>>,
    spreadsheet_id: OnceCell<String>,
}

impl GoogleSheets {
    pub fn new(key: ServiceAccountKey, sheet_name: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key,
            sheet_name,
            drive_files_url: DRIVE_FILES_URL.to_string(),
            sheets_url: SHEETS_URL.to_string(),
            token: Mutex::new(None),
            spreadsheet_id: OnceCell::new(),
        }
    }

    /// Skip the Drive lookup and write to this spreadsheet id directly.
    pub fn with_spreadsheet_id(self, id: String) -> Self {
        Self {
            spreadsheet_id: OnceCell::new_with(Some(id)),
            ..self
        }
    }

    /// Point the Drive search and the Sheets API at other hosts. The token
    /// endpoint comes from the key's `token_uri`.
    pub fn with_api_urls(
        self,
        drive_files_url: impl Into<String>,
        sheets_url: impl Into<String>,
    ) -> Self {
        Self {
            drive_files_url: drive_files_url.into(),
            sheets_url: sheets_url.into(),
            ..self
        }
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> Result<String, SheetError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    async fn access_token(&self) -> Result<String, SheetError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let assertion = self.signed_assertion(now)?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %truncate_for_log(&body, 300), "Token exchange rejected");
            return Err(SheetError::Auth(format!("token endpoint returned {status}")));
        }

        let token: TokenResponse = serde_json::from_str(&resp.text().await?)?;
        debug!(expires_in = token.expires_in, "Obtained Google access token");
        let fresh = AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        };
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn spreadsheet_id(&self) -> Result<&str, SheetError> {
        self.spreadsheet_id
            .get_or_try_init(|| self.lookup_spreadsheet_id())
            .await
            .map(String::as_str)
    }

    #[instrument(level = "info", skip(self), fields(sheet_name = %self.sheet_name))]
    async fn lookup_spreadsheet_id(&self) -> Result<String, SheetError> {
        let token = self.access_token().await?;
        let query = drive_query(&self.sheet_name);
        let url = Url::parse_with_params(
            &self.drive_files_url,
            &[("q", query.as_str()), ("fields", "files(id,name)"), ("pageSize", "1")],
        )
        .map_err(|e| SheetError::Parse(e.to_string()))?;

        let resp = self.http.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SheetError::api(status.as_u16(), &body));
        }

        let list: FileList = serde_json::from_str(&resp.text().await?)?;
        let id = list
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetError::NotFound(self.sheet_name.clone()))?;
        info!(%id, "Resolved spreadsheet");
        Ok(id)
    }
}

#[async_trait]
impl SheetStore for GoogleSheets {
    async fn append_row(&self, row: &[String]) -> Result<(), SheetError> {
        let id = self.spreadsheet_id().await?;
        let token = self.access_token().await?;
        let url = append_url(&self.sheets_url, id);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "majorDimension": "ROWS", "values": [row] }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %truncate_for_log(&body, 300), "Sheets append returned non-success");
            return Err(SheetError::api(status.as_u16(), &body));
        }
        Ok(())
    }
}

/// Drive search expression matching a live spreadsheet named exactly `name`.
fn drive_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

/// Append endpoint targeting the first worksheet (a bare `A1` range).
fn append_url(sheets_url: &str, spreadsheet_id: &str) -> String {
    format!(
        "{}/{}/values/A1:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        sheets_url,
        urlencoding::encode(spreadsheet_id)
    )
}
