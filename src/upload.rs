use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::Path;

use crate::session::Role;

/// JSON body for the upload endpoint. The whole file travels base64-encoded
/// in one request; there is no chunking or resumability.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UploadPayload {
    pub file_content: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub title: String,
    pub description: String,
    pub user_name: String,
    pub user_email: String,
    pub user_role: String,
}

/// Which form field currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadField {
    #[default]
    File,
    Title,
    Description,
    UserName,
    UserEmail,
}

impl UploadField {
    pub fn next(self) -> Self {
        match self {
            UploadField::File => UploadField::Title,
            UploadField::Title => UploadField::Description,
            UploadField::Description => UploadField::UserName,
            UploadField::UserName => UploadField::UserEmail,
            UploadField::UserEmail => UploadField::File,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            UploadField::File => UploadField::UserEmail,
            UploadField::Title => UploadField::File,
            UploadField::Description => UploadField::Title,
            UploadField::UserName => UploadField::Description,
            UploadField::UserEmail => UploadField::UserName,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadField::File => "File path",
            UploadField::Title => "Title",
            UploadField::Description => "Description",
            UploadField::UserName => "User name",
            UploadField::UserEmail => "User email",
        }
    }
}

/// Knowledge-upload form state. The file is referenced by path (the TUI
/// equivalent of the browser's file picker) and only read when the form is
/// submitted.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub user_name: String,
    pub user_email: String,
    pub focus: UploadField,
}

impl UploadForm {
    /// Field-level validation, checked before any file I/O or network call.
    /// Returns the message to show inline when the form is incomplete.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.file_path.trim().is_empty() {
            return Err("Please select a file to upload.");
        }
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.user_name.trim().is_empty()
            || self.user_email.trim().is_empty()
        {
            return Err("Please fill in all fields.");
        }
        Ok(())
    }

    /// Read the file fully into memory, base64-encode it, and bundle it
    /// with the metadata. Assumes `validate()` passed.
    pub async fn build_payload(&self, role: Option<Role>) -> Result<UploadPayload> {
        let path = self.file_path.trim();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Could not read file: {}", path))?;

        let base_name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let (file_name, file_type) = split_file_name(&base_name);

        Ok(UploadPayload {
            file_content: STANDARD.encode(bytes),
            file_name,
            file_type,
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            user_name: self.user_name.trim().to_string(),
            user_email: self.user_email.trim().to_string(),
            user_role: role.map(|r| r.as_str()).unwrap_or("unknown").to_string(),
        })
    }

    /// Clear every field after a successful submission.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn focused_value_mut(&mut self) -> &mut String {
        match self.focus {
            UploadField::File => &mut self.file_path,
            UploadField::Title => &mut self.title,
            UploadField::Description => &mut self.description,
            UploadField::UserName => &mut self.user_name,
            UploadField::UserEmail => &mut self.user_email,
        }
    }
}

/// Split a file name into stem (`file_name`) and extension (`file_type`).
/// Multi-dot names keep everything before the last dot as the stem; names
/// without an extension get no type.
fn split_file_name(name: &str) -> (String, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            (stem.to_string(), Some(ext.to_string()))
        }
        _ => (name.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn filled_form(file_path: String) -> UploadForm {
        UploadForm {
            file_path,
            title: "Q3 Financial Report".to_string(),
            description: "Summary of Q3 results".to_string(),
            user_name: "Jane Doe".to_string(),
            user_email: "jane@example.com".to_string(),
            focus: UploadField::default(),
        }
    }

    #[test]
    fn test_missing_file_is_blocked() {
        let form = filled_form(String::new());
        assert_eq!(form.validate(), Err("Please select a file to upload."));
    }

    #[test]
    fn test_missing_metadata_is_blocked() {
        let mut form = filled_form("/tmp/report.txt".to_string());
        form.title.clear();
        assert_eq!(form.validate(), Err("Please fill in all fields."));
    }

    #[test]
    fn test_complete_form_passes_validation() {
        let form = filled_form("/tmp/report.txt".to_string());
        assert_eq!(form.validate(), Ok(()));
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("report.txt"),
            ("report".to_string(), Some("txt".to_string()))
        );
        assert_eq!(
            split_file_name("archive.tar.gz"),
            ("archive.tar".to_string(), Some("gz".to_string()))
        );
        assert_eq!(split_file_name("README"), ("README".to_string(), None));
        assert_eq!(
            split_file_name(".bashrc"),
            (".bashrc".to_string(), None)
        );
    }

    #[tokio::test]
    async fn test_payload_carries_base64_content_and_role() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let form = filled_form(path);
        let payload = form.build_payload(Some(Role::Employee)).await.unwrap();

        assert_eq!(payload.file_content, STANDARD.encode(b"hello world"));
        assert_eq!(payload.user_role, "employee");
        assert_eq!(payload.title, "Q3 Financial Report");
    }

    #[tokio::test]
    async fn test_unreadable_file_is_an_error() {
        let form = filled_form("/no/such/file.txt".to_string());
        assert!(form.build_payload(Some(Role::Employee)).await.is_err());
    }

    #[test]
    fn test_reset_clears_all_fields() {
        let mut form = filled_form("/tmp/report.txt".to_string());
        form.reset();
        assert!(form.file_path.is_empty());
        assert!(form.title.is_empty());
        assert!(form.user_email.is_empty());
    }

    #[test]
    fn test_payload_omits_missing_file_type() {
        let payload = UploadPayload {
            file_content: "aGk=".to_string(),
            file_name: "README".to_string(),
            file_type: None,
            title: "t".to_string(),
            description: "d".to_string(),
            user_name: "n".to_string(),
            user_email: "e@example.com".to_string(),
            user_role: "employee".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("file_type").is_none());
        assert_eq!(json["file_name"], "README");
    }
}
