//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid aspect ratio: {0}")]
    InvalidRatio(String),

    #[error("Post {0} not found")]
    NotFound(String),

    #[error("Cannot move {id} from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_not_found() {
        let error = Error::NotFound("ABC".to_string());
        assert_eq!(format!("{}", error), "Post ABC not found");
    }

    #[test]
    fn test_error_display_transition() {
        let error = Error::InvalidTransition {
            id: "ABC".to_string(),
            from: "rejected".to_string(),
            to: "approved".to_string(),
        };
        assert_eq!(format!("{}", error), "Cannot move ABC from rejected to approved");
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
