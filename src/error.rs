pub type GlimmerResult<T> = Result<T, GlimmerError>;

#[derive(thiserror::Error, Debug)]
pub enum GlimmerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unknown layer kind: {0}")]
    InvalidKind(String),

    #[error("layer not found: {0}")]
    NotFound(String),

    #[error("script error in layer '{layer}': {message}")]
    Script { layer: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GlimmerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_kind(kind: impl Into<String>) -> Self {
        Self::InvalidKind(kind.into())
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn script(layer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            layer: layer.into(),
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
