use std::path::Path;

use mime::Mime;

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file_name} is not an accepted upload format")]
pub struct UnsupportedUpload {
    pub file_name: String,
}

/// File extensions the document upload accepts, with their content types.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    accepted: Vec<(&'static str, Mime)>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        let mut accepted = vec![
            ("pdf", mime::APPLICATION_PDF),
            ("jpg", mime::IMAGE_JPEG),
            ("jpeg", mime::IMAGE_JPEG),
            ("png", mime::IMAGE_PNG),
        ];
        for (extension, raw) in [("docx", DOCX), ("xlsx", XLSX)] {
            if let Ok(parsed) = raw.parse::<Mime>() {
                accepted.push((extension, parsed));
            }
        }
        Self { accepted }
    }
}

impl UploadPolicy {
    /// Content type for an accepted file name, matched on its extension.
    pub fn classify(&self, file_name: &str) -> Result<Mime, UnsupportedUpload> {
        let extension = Path::new(file_name.trim())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        extension
            .and_then(|ext| {
                self.accepted
                    .iter()
                    .find(|(accepted, _)| *accepted == ext)
                    .map(|(_, mime)| mime.clone())
            })
            .ok_or_else(|| UnsupportedUpload {
                file_name: file_name.to_string(),
            })
    }

    /// `.pdf, .jpg, ...` as shown next to the upload widget.
    pub fn accepted_list(&self) -> String {
        self.accepted
            .iter()
            .map(|(ext, _)| format!(".{ext}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
