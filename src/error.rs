use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum BrainError {
    Io { path: PathBuf, source: io::Error },
    Decode { path: PathBuf, source: serde_json::Error },
    Encode { source: serde_json::Error },
    ShapeMismatch { expected: usize, found: usize, state: Option<String> },
}

impl fmt::Display for BrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "brain i/o failed at {}: {source}", path.display()),
            Self::Decode { path, source } => {
                write!(f, "brain image {} is not decodable: {source}", path.display())
            }
            Self::Encode { source } => write!(f, "brain image encoding failed: {source}"),
            Self::ShapeMismatch {
                expected,
                found,
                state: Some(state),
            } => write!(
                f,
                "state {state} has {found} action values, expected {expected}"
            ),
            Self::ShapeMismatch {
                expected,
                found,
                state: None,
            } => write!(f, "brain image built for {found} actions, expected {expected}"),
        }
    }
}

impl std::error::Error for BrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode { source, .. } | Self::Encode { source } => Some(source),
            Self::ShapeMismatch { .. } => None,
        }
    }
}
