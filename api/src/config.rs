use std::path::{Path, PathBuf};

const fn default_create_missing_directory() -> bool {
    true
}

fn default_file_extension() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Configuration of a [`FileSystemContractRegistry`](crate::FileSystemContractRegistry).
pub struct RegistryConfig {
    /// Directory holding one file per contract descriptor.
    pub base_path: PathBuf,
    /// Extension of descriptor files, without the leading dot. Default is `json`.
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    /// Create `base_path` if it does not exist. Default is true.
    #[serde(default = "default_create_missing_directory")]
    pub create_missing_directory: bool,
}

impl RegistryConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            file_extension: default_file_extension(),
            create_missing_directory: default_create_missing_directory(),
        }
    }

    /// Set the extension of descriptor files.
    pub fn with_file_extension(mut self, file_extension: impl Into<String>) -> Self {
        self.file_extension = file_extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Should the registry create a missing base directory. Default is true.
    pub const fn with_create_missing_directory(mut self, create_missing_directory: bool) -> Self {
        self.create_missing_directory = create_missing_directory;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub(crate) fn file_path(&self, identifier: &str) -> PathBuf {
        self.base_path
            .join(format!("{identifier}.{}", self.file_extension))
    }
}
