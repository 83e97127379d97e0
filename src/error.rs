use std::path::PathBuf;

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The root path exists but is not a directory.
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The root directory could not be read.
    #[error("Cannot scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A previewed file could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Markdown renderer rejected the content.
    #[error("Render error: {0}")]
    Render(String),

    /// The filesystem notification backend failed.
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("failed to enter raw mode".into());
        assert_eq!(err.to_string(), "Terminal error: failed to enter raw mode");
    }

    #[test]
    fn not_a_directory_display() {
        let err = AppError::NotADirectory(PathBuf::from("/tmp/readme.md"));
        assert_eq!(err.to_string(), "Path is not a directory: /tmp/readme.md");
    }

    #[test]
    fn load_error_names_path_and_cause() {
        let err = AppError::Load {
            path: PathBuf::from("/docs/gone.md"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/docs/gone.md"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn watch_error_conversion() {
        let err: AppError = notify::Error::generic("inotify limit reached").into();
        assert!(matches!(err, AppError::Watch(_)));
        assert!(err.to_string().starts_with("Watch error:"));
    }
}
