use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DATA_DIR_ENV_VAR: &str = "LOSTFILES_DATA_DIR";

/// Where the model cache and the per-run tables live.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The LOSTFILES_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/lostfiles/)
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(DATA_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            xdg::BaseDirectories::with_prefix("lostfiles")
                .get_data_home()
                .ok_or_else(|| {
                    Error::Config(
                        "could not determine XDG data home directory".into(),
                    )
                })?
        };

        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache for downloaded model artifacts.
    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    pub fn corpus_table(&self) -> PathBuf {
        self.root.join("corpus.csv")
    }

    pub fn embeddings_table(&self) -> PathBuf {
        self.root.join("encoded_corpus.csv")
    }
}
