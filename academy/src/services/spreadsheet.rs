//! Spreadsheet parsing for bulk user import.
//!
//! Reads the first sheet of a workbook (or a CSV file), matches the header
//! row against English and Arabic column names, and turns every non-blank
//! row into an [`ImportRecord`]. Validation of the values is left to the
//! creation endpoint.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::services::ImportError;

pub const EMAIL_HEADERS: &[&str] = &["email", "Email", "البريد"];
pub const PASSWORD_HEADERS: &[&str] = &["password", "Password", "كلمة_المرور"];
pub const NAME_HEADERS: &[&str] = &["full_name", "name", "Name", "الاسم"];
pub const ROLE_HEADERS: &[&str] = &["role", "Role", "الدور"];
pub const STATUS_HEADERS: &[&str] = &["status", "Status", "الحالة"];

pub const DEFAULT_ROLE: &str = "user";
pub const DEFAULT_STATUS: &str = "approved";

/// UTF-8 BOM bytes.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One candidate account from an uploaded sheet.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
}

impl ImportRecord {
    /// Whether the fields the creation endpoint insists on are filled in.
    pub fn has_required_fields(&self) -> bool {
        !self.email.trim().is_empty()
            && !self.password.is_empty()
            && !self.full_name.trim().is_empty()
    }
}

impl fmt::Debug for ImportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportRecord")
            .field("email", &self.email)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

/// Header row plus data rows of the first sheet, all cells as text.
#[derive(Debug, Default)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reads and maps a spreadsheet file in one step.
pub fn parse_file(path: &Path) -> Result<Vec<ImportRecord>, ImportError> {
    let sheet = read_rows(path)?;
    let records = records_from_rows(&sheet.headers, &sheet.rows);
    info!(path = %path.display(), records = records.len(), "parsed import file");
    Ok(records)
}

pub fn read_rows(path: &Path) -> Result<SheetRows, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => {
            let bytes = std::fs::read(path)
                .map_err(|e| ImportError::Spreadsheet(format!("{}: {e}", path.display())))?;
            read_csv(&bytes)
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        other => Err(ImportError::UnsupportedFile(if other.is_empty() {
            path.display().to_string()
        } else {
            format!(".{other}")
        })),
    }
}

fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(UTF8_BOM).unwrap_or(data)
}

pub fn read_csv(data: &[u8]) -> Result<SheetRows, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(strip_utf8_bom(data));

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Spreadsheet(format!("failed to read header row: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ImportError::Spreadsheet(format!("failed to read row: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(SheetRows { headers, rows })
}

fn read_workbook(path: &Path) -> Result<SheetRows, ImportError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::Spreadsheet(format!("{}: {e}", path.display())))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ImportError::Spreadsheet("workbook has no sheets".to_string()))?;
    debug!(sheet = %sheet_name, "reading first sheet");

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::Spreadsheet(format!("sheet {sheet_name}: {e}")))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = match rows.next() {
        Some(headers) => headers.into_iter().map(|h| h.trim().to_string()).collect(),
        None => return Ok(SheetRows::default()),
    };

    Ok(SheetRows {
        headers,
        rows: rows.collect(),
    })
}

/// Maps sheet rows to records using the recognised header names.
///
/// For each field the first synonym with a non-empty cell wins. Unknown
/// columns are ignored and rows with no content at all are skipped.
pub fn records_from_rows(headers: &[String], rows: &[Vec<String>]) -> Vec<ImportRecord> {
    let mut columns: HashMap<&str, usize> = HashMap::new();
    for (idx, header) in headers.iter().enumerate() {
        columns.entry(header.as_str()).or_insert(idx);
    }

    // Blank cells are skipped when choosing a column; the chosen cell is
    // returned as written.
    let pick = |row: &[String], synonyms: &[&str]| -> Option<String> {
        synonyms
            .iter()
            .filter_map(|name| columns.get(name))
            .filter_map(|&idx| row.get(idx))
            .find(|cell| !cell.trim().is_empty())
            .cloned()
    };
    let pick_trimmed = |row: &[String], synonyms: &[&str]| pick(row, synonyms).map(|v| v.trim().to_string());

    rows.iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| ImportRecord {
            email: pick_trimmed(row, EMAIL_HEADERS).unwrap_or_default(),
            password: pick(row, PASSWORD_HEADERS).unwrap_or_default(),
            full_name: pick_trimmed(row, NAME_HEADERS).unwrap_or_default(),
            role: pick_trimmed(row, ROLE_HEADERS)
                .unwrap_or_else(|| DEFAULT_ROLE.to_string())
                .to_lowercase(),
            status: pick_trimmed(row, STATUS_HEADERS)
                .unwrap_or_else(|| DEFAULT_STATUS.to_string())
                .to_lowercase(),
        })
        .collect()
}

/// Writes a CSV template with the expected columns and one example row.
pub fn write_template(path: &Path) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ImportError::Spreadsheet(format!("{}: {e}", path.display())))?;
    let template = ImportRecord {
        email: "user@example.com".to_string(),
        password: "password123".to_string(),
        full_name: "اسم المستخدم".to_string(),
        role: DEFAULT_ROLE.to_string(),
        status: DEFAULT_STATUS.to_string(),
    };
    writer
        .serialize(&template)
        .and_then(|_| writer.flush().map_err(csv::Error::from))
        .map_err(|e| ImportError::Spreadsheet(e.to_string()))
}
