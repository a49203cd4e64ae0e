use camino::Utf8PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read profile {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse profile: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Action '{id}' missing 'command'")]
    MissingCommand { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Read,
    Parse,
    MissingCommand,
}

impl ConfigError {
    pub fn kind(&self) -> ConfigErrorKind {
        match self {
            ConfigError::Read { .. } => ConfigErrorKind::Read,
            ConfigError::Parse(_) => ConfigErrorKind::Parse,
            ConfigError::MissingCommand { .. } => ConfigErrorKind::MissingCommand,
        }
    }
}
