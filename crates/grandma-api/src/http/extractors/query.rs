//! Query parameter extractors for list endpoints.

use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::AppError;

/// `GET /api/conversations`.
#[derive(Debug, Deserialize, Default)]
pub struct ConversationListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

/// `GET /api/documents` and `GET /api/documents/ids`.
#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub conversation_id: Uuid,
    /// Cursor document id. Empty means no cursor.
    pub before_id: Option<String>,
    pub limit: Option<u32>,
}

impl DocumentListQuery {
    pub fn cursor(&self) -> Result<Option<Uuid>, AppError> {
        match self.before_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Uuid::parse_str(raw)
                .map(Some)
                .map_err(|e| AppError::Validation(format!("invalid before_id: {e}"))),
        }
    }
}

/// `GET /api/stories`.
#[derive(Debug, Deserialize, Default)]
pub struct StoryListQuery {
    pub guid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(before_id: Option<&str>) -> DocumentListQuery {
        DocumentListQuery {
            conversation_id: Uuid::nil(),
            before_id: before_id.map(str::to_string),
            limit: None,
        }
    }

    #[test]
    fn test_cursor_parsing() {
        assert_eq!(query(None).cursor().unwrap(), None);
        assert_eq!(query(Some(" ")).cursor().unwrap(), None);
        let id = Uuid::now_v7();
        assert_eq!(query(Some(&id.to_string())).cursor().unwrap(), Some(id));
        assert!(query(Some("nope")).cursor().is_err());
    }
}
