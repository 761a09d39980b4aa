use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("selection path holds at most {max} names, got {actual}")]
    TooDeep { max: usize, actual: usize },
    #[error("selection path segment {index} is empty")]
    EmptySegment { index: usize },
}
