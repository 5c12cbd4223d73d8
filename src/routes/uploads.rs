/// Shared multipart handling for upload endpoints.
///
/// A form is read once into memory: parts carrying a filename become
/// [`UploadedFile`]s, the rest are collected as text fields. The media
/// gateway receives whole byte buffers, so streaming stops here.

use std::collections::HashMap;

use actix_multipart::Multipart;
use futures::TryStreamExt;

use crate::error::AppError;

const MAX_PART_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct CollectedForm {
    pub texts: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl CollectedForm {
    pub fn text(&self, field: &str) -> Option<&str> {
        self.texts.get(field).map(|s| s.as_str())
    }

    pub fn required_text(&self, field: &str) -> Result<&str, AppError> {
        self.text(field).filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            AppError::Validation(format!("{} is required", field))
        })
    }

    pub fn files_for(&self, field: &str) -> Vec<&UploadedFile> {
        self.files.iter().filter(|f| f.field == field).collect()
    }
}

pub async fn collect_form(mut payload: Multipart) -> Result<CollectedForm, AppError> {
    let mut form = CollectedForm::default();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().to_string();
        let file_name = field
            .content_disposition()
            .get_filename()
            .map(|f| f.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_PART_BYTES {
                return Err(AppError::Validation(format!(
                    "{} exceeds the maximum upload size",
                    name
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) => form.files.push(UploadedFile {
                field: name,
                file_name,
                bytes,
            }),
            None => {
                let value = String::from_utf8_lossy(&bytes).to_string();
                form.texts.insert(name, value);
            }
        }
    }

    Ok(form)
}
