use std::fmt;

#[derive(Debug)]
pub enum ExportError {
    InvalidConfiguration(String),
    InvalidDocument(String),
    ExportInFlight(String),
    CaptureNotReady(String),
    Render(String),
    Cancelled,
    Io(std::io::Error),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ExportError::InvalidDocument(message) => {
                write!(f, "document failed validation: {}", message)
            }
            ExportError::ExportInFlight(number) => {
                write!(f, "an export for document {} is already in flight", number)
            }
            ExportError::CaptureNotReady(message) => {
                write!(f, "preview capture not ready: {}", message)
            }
            ExportError::Render(message) => write!(f, "render error: {}", message),
            ExportError::Cancelled => write!(f, "export cancelled"),
            ExportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        ExportError::Io(value)
    }
}
