//! Input validation limits for labels and context nesting

/// Maximum length for entity labels (256 chars)
pub const MAX_LABEL_LEN: usize = 256;

/// Maximum nesting depth of graph contexts below the root (64)
pub const MAX_CONTEXT_DEPTH: usize = 64;

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyLabel,
    LabelTooLong { len: usize, max: usize },
    ContextTooDeep { depth: usize, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "Label cannot be empty"),
            Self::LabelTooLong { len, max } => {
                write!(f, "Label too long: {} chars (max {})", len, max)
            }
            Self::ContextTooDeep { depth, max } => {
                write!(f, "Context nested too deep: {} (max {})", depth, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate an entity label
pub fn validate_label(label: &str) -> Result<(), ValidationError> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyLabel);
    }
    let len = label.chars().count();
    if len > MAX_LABEL_LEN {
        return Err(ValidationError::LabelTooLong {
            len,
            max: MAX_LABEL_LEN,
        });
    }
    Ok(())
}

/// Validate the depth a new nested context would sit at
pub fn validate_context_depth(depth: usize) -> Result<(), ValidationError> {
    if depth > MAX_CONTEXT_DEPTH {
        return Err(ValidationError::ContextTooDeep {
            depth,
            max: MAX_CONTEXT_DEPTH,
        });
    }
    Ok(())
}
