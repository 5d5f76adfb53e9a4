// src/error.rs
pub type FxResult<T> = Result<T, FxError>;

#[derive(thiserror::Error, Debug)]
pub enum FxError {
    #[error("member list error: {0}")]
    MemberList(#[from] serde_json::Error),

    #[error("member list is empty")]
    NoMembers,

    #[error("missing anchor element `{0}`")]
    MissingAnchor(String),

    #[error("renderer error: {0}")]
    Renderer(String),
}

impl FxError {
    pub fn missing_anchor(id: impl Into<String>) -> Self {
        Self::MissingAnchor(id.into())
    }

    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(FxError::NoMembers.to_string().contains("empty"));
        assert!(
            FxError::missing_anchor("binaryCanvas")
                .to_string()
                .contains("`binaryCanvas`")
        );
        assert!(
            FxError::renderer("no adapter")
                .to_string()
                .starts_with("renderer error:")
        );
    }
}
