//! Google Sheets backend for the user list, authenticated with a service account.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, OnceCell};

use super::sheet::{CellUpdate, SheetError, UserSheet, COLUMNS, FIRST_DATA_ROW};
use crate::config::SpreadsheetConfig;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Tokens are refreshed this many seconds before they expire.
const TOKEN_MARGIN_SECS: u64 = 300;

#[derive(Deserialize)]
struct ServiceAccount {
    private_key: String,
    client_email: String,
    token_uri: String,
}

#[derive(Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

pub struct GoogleSheet {
    client: Client,
    account: ServiceAccount,
    spreadsheet_id: String,
    worksheet: String,
    access_token: Mutex<Option<(String, u64)>>, // (token, expiry_timestamp)
    sheet_id: OnceCell<i64>,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Cell values come back as strings, but numbers typed by hand may not.
fn cell_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl GoogleSheet {
    pub fn new(config: &SpreadsheetConfig) -> Result<Self, SheetError> {
        Self::from_key_file(
            &config.service_account_file,
            &config.spreadsheet_id,
            &config.worksheet,
        )
    }

    pub fn from_key_file(path: &Path, spreadsheet_id: &str, worksheet: &str) -> Result<Self, SheetError> {
        let json_content = std::fs::read_to_string(path)?;
        let account = serde_json::from_str::<ServiceAccount>(&json_content)?;

        Ok(Self {
            client: Client::new(),
            account,
            spreadsheet_id: spreadsheet_id.to_string(),
            worksheet: worksheet.to_string(),
            access_token: Mutex::new(None),
            sheet_id: OnceCell::new(),
        })
    }

    async fn get_access_token(&self) -> Result<String, SheetError> {
        let mut token_lock = self.access_token.lock().await;
        let now = unix_now();

        if let Some((token, expiry)) = &*token_lock {
            if *expiry > now + TOKEN_MARGIN_SECS {
                return Ok(token.clone());
            }
        }

        let claims = JwtClaims {
            iss: self.account.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: self.account.token_uri.clone(),
            exp: now + 3600,
            iat: now,
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())?;
        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;

        *token_lock = Some((token.access_token.clone(), now + token.expires_in));
        tracing::debug!("SHEETS: obtained access token for {}", self.account.client_email);
        Ok(token.access_token)
    }

    /// `https://.../spreadsheets/{id}` followed by `segments`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, SheetError> {
        let mut url = Url::parse(SHEETS_API).map_err(|e| SheetError::Url(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetError::Url(SHEETS_API.to_string()))?;
            path.push(&self.spreadsheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn url_with_suffix(&self, suffix: &str) -> Result<Url, SheetError> {
        let mut url = self.url(&[])?;
        let path = format!("{}{}", url.path(), suffix);
        url.set_path(&path);
        Ok(url)
    }

    fn range(&self, cells: &str) -> String {
        format!("'{}'!{}", self.worksheet.replace('\'', "''"), cells)
    }

    fn data_range(&self) -> String {
        self.range(&format!(
            "{}{}:{}",
            COLUMNS[0],
            FIRST_DATA_ROW,
            COLUMNS[COLUMNS.len() - 1]
        ))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SheetError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn request(&self, method: Method, url: Url, body: Option<Value>) -> Result<reqwest::Response, SheetError> {
        let token = self.get_access_token().await?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::check(request.send().await?).await
    }

    async fn worksheet_id(&self) -> Result<i64, SheetError> {
        self.sheet_id
            .get_or_try_init(|| async {
                let mut url = self.url(&[])?;
                url.query_pairs_mut().append_pair("fields", "sheets.properties");
                let meta: SpreadsheetMeta = self.request(Method::GET, url, None).await?.json().await?;
                meta.sheets
                    .into_iter()
                    .map(|s| s.properties)
                    .find(|p| p.title == self.worksheet)
                    .map(|p| p.sheet_id)
                    .ok_or_else(|| SheetError::MissingWorksheet(self.worksheet.clone()))
            })
            .await
            .copied()
    }
}

#[async_trait]
impl UserSheet for GoogleSheet {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, SheetError> {
        let url = self.url(&["values", &self.data_range()])?;
        let range: ValueRange = self.request(Method::GET, url, None).await?.json().await?;

        Ok(range
            .values
            .iter()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect())
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetError> {
        let mut url = self.url(&["values", &format!("{}:append", self.data_range())])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        self.request(Method::POST, url, Some(json!({ "values": [row] })))
            .await?;
        Ok(())
    }

    async fn update_cells(&self, updates: Vec<CellUpdate>) -> Result<(), SheetError> {
        if updates.is_empty() {
            return Ok(());
        }
        let data: Vec<Value> = updates
            .iter()
            .map(|u| json!({ "range": self.range(&u.cell), "values": [[u.value]] }))
            .collect();

        let url = self.url_with_suffix("/values:batchUpdate")?;
        self.request(
            Method::POST,
            url,
            Some(json!({ "valueInputOption": "RAW", "data": data })),
        )
        .await?;
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), SheetError> {
        if row_number < FIRST_DATA_ROW {
            return Err(SheetError::RowOutOfRange(row_number));
        }
        let sheet_id = self.worksheet_id().await?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_number - 1,
                        "endIndex": row_number,
                    }
                }
            }]
        });

        let url = self.url_with_suffix(":batchUpdate")?;
        self.request(Method::POST, url, Some(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sheet(worksheet: &str) -> GoogleSheet {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type":"service_account","private_key":"k","client_email":"bot@example.iam.gserviceaccount.com","token_uri":"https://oauth2.googleapis.com/token"}}"#
        )
        .unwrap();
        GoogleSheet::from_key_file(file.path(), "sheet123", worksheet).unwrap()
    }

    #[test]
    fn test_values_url_encodes_range() {
        let sheet = sheet("Users");
        let url = sheet.url(&["values", &sheet.data_range()]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/'Users'!A2:E"
        );
    }

    #[test]
    fn test_worksheet_names_with_spaces_and_quotes() {
        let sheet = sheet("Art club's users");
        assert_eq!(sheet.range("C5"), "'Art club''s users'!C5");
        let url = sheet.url(&["values", &sheet.range("C5")]).unwrap();
        assert!(url.as_str().contains("Art%20club''s%20users"));
    }

    #[test]
    fn test_batch_update_urls() {
        let sheet = sheet("Users");
        assert_eq!(
            sheet.url_with_suffix(":batchUpdate").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123:batchUpdate"
        );
        assert_eq!(
            sheet.url_with_suffix("/values:batchUpdate").unwrap().as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values:batchUpdate"
        );
    }

    #[test]
    fn test_numeric_cells_are_stringified() {
        assert_eq!(cell_to_string(&json!(42)), "42");
        assert_eq!(cell_to_string(&json!("abc")), "abc");
        assert_eq!(cell_to_string(&Value::Null), "");
    }

    #[test]
    fn test_missing_key_file_is_io_error() {
        let result = GoogleSheet::from_key_file(Path::new("/nonexistent/key.json"), "id", "Users");
        assert!(matches!(result, Err(SheetError::Io(_))));
    }
}
