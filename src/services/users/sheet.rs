use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use super::UserDTO;

/// Column letters of the user worksheet, in order.
pub const COLUMNS: [&str; 5] = ["A", "B", "C", "D", "E"];
/// Header written by the in-memory sheet and expected as row 1 of the real one.
pub const HEADER: [&str; 5] = ["id", "nickname", "phone", "name", "last_name"];
/// First sheet row holding a user (row 1 is the header).
pub const FIRST_DATA_ROW: usize = 2;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token signing failed: {0}")]
    Auth(#[from] jsonwebtoken::errors::Error),
    #[error("could not read service account: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid request url: {0}")]
    Url(String),
    #[error("worksheet '{0}' not found")]
    MissingWorksheet(String),
    #[error("row {0} is out of range")]
    RowOutOfRange(usize),
}

/// A single cell write, e.g. `C5` = `+79991234567`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub cell: String,
    pub value: String,
}

impl CellUpdate {
    pub fn new(column: &str, row: usize, value: impl Into<String>) -> Self {
        Self {
            cell: format!("{column}{row}"),
            value: value.into(),
        }
    }
}

/// The handful of spreadsheet operations the user repository needs.
#[async_trait]
pub trait UserSheet: Send + Sync {
    /// Data rows (header excluded), top to bottom.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, SheetError>;

    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetError>;

    async fn update_cells(&self, updates: Vec<CellUpdate>) -> Result<(), SheetError>;

    /// Deletes a row by its 1-based sheet row number; rows below move up.
    async fn delete_row(&self, row_number: usize) -> Result<(), SheetError>;
}

pub fn user_to_row(user: &UserDTO) -> Vec<String> {
    vec![
        user.id.to_string(),
        user.nickname.clone().unwrap_or_default(),
        user.phone.clone().unwrap_or_default(),
        user.first_name.clone().unwrap_or_default(),
        user.last_name.clone().unwrap_or_default(),
    ]
}

/// Parses a data row. Rows without a numeric id are not users.
pub fn user_from_row(row: &[String]) -> Option<UserDTO> {
    let cell = |i: usize| {
        row.get(i)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let id = cell(0)?.parse::<i64>().ok()?;

    Some(UserDTO {
        id,
        nickname: cell(1),
        phone: cell(2),
        first_name: cell(3),
        last_name: cell(4),
    })
}

/// Cell writes that bring row `row_number` in line with `user` (id column untouched).
pub fn cell_updates_for(user: &UserDTO, row_number: usize) -> Vec<CellUpdate> {
    user_to_row(user)
        .into_iter()
        .zip(COLUMNS)
        .skip(1)
        .map(|(value, column)| CellUpdate::new(column, row_number, value))
        .collect()
}

fn column_index(cell: &str) -> Option<(usize, usize)> {
    let split = cell.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell.split_at(split);
    let column = COLUMNS.iter().position(|c| *c == letters)?;
    let row = digits.parse::<usize>().ok()?;
    Some((column, row))
}

/// Spreadsheet stand-in kept in memory. Row 1 is the header, like the real worksheet.
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
}

impl Default for MemorySheet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySheet {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(vec![HEADER.iter().map(|h| h.to_string()).collect()]),
        }
    }

    pub fn with_users(users: &[UserDTO]) -> Self {
        let mut rows: Vec<Vec<String>> = vec![HEADER.iter().map(|h| h.to_string()).collect()];
        rows.extend(users.iter().map(user_to_row));
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Snapshot of every row including the header.
    pub async fn snapshot(&self) -> Vec<Vec<String>> {
        self.rows.lock().await.clone()
    }
}

#[async_trait]
impl UserSheet for MemorySheet {
    async fn read_rows(&self) -> Result<Vec<Vec<String>>, SheetError> {
        Ok(self.rows.lock().await.iter().skip(1).cloned().collect())
    }

    async fn append_row(&self, row: Vec<String>) -> Result<(), SheetError> {
        self.rows.lock().await.push(row);
        Ok(())
    }

    async fn update_cells(&self, updates: Vec<CellUpdate>) -> Result<(), SheetError> {
        let mut rows = self.rows.lock().await;
        for update in updates {
            let (column, row_number) = column_index(&update.cell)
                .ok_or_else(|| SheetError::Url(format!("bad cell reference {}", update.cell)))?;
            let row = rows
                .get_mut(row_number.wrapping_sub(1))
                .ok_or(SheetError::RowOutOfRange(row_number))?;
            if row.len() <= column {
                row.resize(column + 1, String::new());
            }
            row[column] = update.value;
        }
        Ok(())
    }

    async fn delete_row(&self, row_number: usize) -> Result<(), SheetError> {
        let mut rows = self.rows.lock().await;
        if row_number < FIRST_DATA_ROW || row_number > rows.len() {
            return Err(SheetError::RowOutOfRange(row_number));
        }
        rows.remove(row_number - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> UserDTO {
        UserDTO {
            id: 42,
            nickname: Some("painter".to_string()),
            phone: Some("+79991234567".to_string()),
            first_name: Some("Anna".to_string()),
            last_name: None,
        }
    }

    #[test]
    fn test_row_codec_keeps_empty_cells_as_none() {
        let row = user_to_row(&sample_user());
        assert_eq!(row, vec!["42", "painter", "+79991234567", "Anna", ""]);
        assert_eq!(user_from_row(&row), Some(sample_user()));
    }

    #[test]
    fn test_rows_without_numeric_id_are_skipped() {
        assert_eq!(user_from_row(&["".to_string()]), None);
        assert_eq!(user_from_row(&["abc".to_string(), "x".to_string()]), None);
    }

    #[test]
    fn test_cell_updates_address_columns_b_to_e() {
        let updates = cell_updates_for(&sample_user(), 7);
        let cells: Vec<&str> = updates.iter().map(|u| u.cell.as_str()).collect();
        assert_eq!(cells, vec!["B7", "C7", "D7", "E7"]);
        assert_eq!(updates[1].value, "+79991234567");
    }

    #[tokio::test]
    async fn test_memory_sheet_update_and_delete() {
        let sheet = MemorySheet::with_users(&[sample_user()]);
        sheet
            .update_cells(vec![CellUpdate::new("E", 2, "Ivanova")])
            .await
            .unwrap();
        assert_eq!(sheet.read_rows().await.unwrap()[0][4], "Ivanova");

        assert!(sheet.delete_row(1).await.is_err());
        sheet.delete_row(2).await.unwrap();
        assert!(sheet.read_rows().await.unwrap().is_empty());
    }
}
