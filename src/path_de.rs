use thiserror::Error;

use crate::document::Document;

/// JSON text that could not be turned into a [`Document`].
#[derive(Debug, Error)]
#[error("at JSON path {path} → {message}")]
pub struct DocumentError {
    pub path: String,
    pub message: String,
}

/// Parse JSON text with JSON-path context in error messages.
pub fn document_from_str(src: &str) -> Result<Document, DocumentError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    finish(serde_path_to_error::deserialize::<_, Document>(de))
}

pub fn document_from_slice(bytes: &[u8]) -> Result<Document, DocumentError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    finish(serde_path_to_error::deserialize::<_, Document>(de))
}

fn finish(
    result: Result<Document, serde_path_to_error::Error<serde_json::Error>>,
) -> Result<Document, DocumentError> {
    match result {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(DocumentError { path, message: err.into_inner().to_string() })
        }
    }
}
