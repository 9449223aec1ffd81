use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    InvalidArgument(String),
    SourceRootMissing(PathBuf),
    SerializationError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO 错误: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "解析错误 {}: {}", file.display(), message)
            }
            Error::InvalidArgument(msg) => write!(f, "无效参数: {}", msg),
            Error::SourceRootMissing(path) => {
                write!(f, "源目录不存在或不可读: {}", path.display())
            }
            Error::SerializationError(msg) => write!(f, "序列化错误: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON 序列化错误: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML 序列化错误: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_root_missing_mentions_path() {
        let err = Error::SourceRootMissing(PathBuf::from("/no/such/sdk/api"));
        assert!(err.to_string().contains("/no/such/sdk/api"));
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_yaml_error_converts_to_serialization_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("key: [unclosed").unwrap_err();
        let err = Error::from(yaml_err);
        assert!(matches!(err, Error::SerializationError(_)));
    }
}
