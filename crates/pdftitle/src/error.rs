#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Target {0} already exists")]
    TargetExists(String),

    #[error("Cannot read {0}: {1}")]
    Unreadable(String, String),

    #[error("Rename failed: {0}")]
    RenameFailed(String),
}
