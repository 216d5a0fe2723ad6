use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed to read recipe file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid recipe: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("recipe rejected: {0}")]
    Invalid(String),
}
