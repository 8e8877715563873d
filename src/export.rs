use tracing::info;

use crate::csv_export::users_to_csv;
use crate::error::ExportError;
use crate::storage::BlobStorage;
use crate::store::UserStore;

/// Lets spreadsheet applications detect UTF-8.
pub const BOM: char = '\u{FEFF}';
pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// A finished download: body plus the headers it should be served with.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub file_name: String,
    pub body: String,
}

impl CsvExport {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.file_name)
    }
}

pub fn export_csv<S: BlobStorage>(store: &UserStore<S>, file_name: &str) -> Result<CsvExport, ExportError> {
    let users = store.list_all();
    if users.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut body = String::new();
    body.push(BOM);
    body.push_str(&users_to_csv(&users));

    info!("Exported {} users to CSV", users.len());
    Ok(CsvExport {
        file_name: file_name.to_string(),
        body,
    })
}
