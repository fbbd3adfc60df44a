//! Holding area for documents waiting on a duplicate decision.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};
use uuid::Uuid;

use super::document::{self, Document};
use crate::errors::{ExchangeError, ExchangeResult};

const FILE_PREFIX: &str = "import_";
const FILE_SUFFIX: &str = ".json";

#[async_trait]
pub trait StagingArea: Send + Sync {
    /// Persist a document and hand back the token that retrieves it.
    async fn stage(&self, document: &Document) -> ExchangeResult<String>;

    async fn retrieve(&self, token: &str) -> ExchangeResult<Document>;

    async fn discard(&self, token: &str) -> ExchangeResult<()>;

    /// Tokens of every document still waiting for a decision.
    async fn pending(&self) -> ExchangeResult<Vec<String>>;
}

/// One `import_<token>.json` file per staged document.
#[derive(Debug, Clone)]
pub struct FileStagingArea {
    dir: PathBuf,
}

impl FileStagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, token: &str) -> ExchangeResult<PathBuf> {
        if !is_valid_token(token) {
            return Err(ExchangeError::StagingNotFound(token.to_string()));
        }
        Ok(self.dir.join(format!("{}{}{}", FILE_PREFIX, token, FILE_SUFFIX)))
    }
}

#[async_trait]
impl StagingArea for FileStagingArea {
    async fn stage(&self, document: &Document) -> ExchangeResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let token = new_token();
        let path = self.path_for(&token)?;
        let partial = path.with_extension("json.partial");

        tokio::fs::write(&partial, serde_json::to_vec(document)?).await?;
        tokio::fs::rename(&partial, &path).await?;

        info!(
            "Staged import {} ({} stories) at {}",
            token,
            document.stories.len(),
            path.display()
        );
        Ok(token)
    }

    async fn retrieve(&self, token: &str) -> ExchangeResult<Document> {
        let path = self.path_for(token)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ExchangeError::StagingNotFound(token.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        document::parse(&bytes)
    }

    async fn discard(&self, token: &str) -> ExchangeResult<()> {
        let path = self.path_for(token)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed staged import {}", token);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(ExchangeError::StagingNotFound(token.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn pending(&self) -> ExchangeResult<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut tokens = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(token) = name
                .to_str()
                .and_then(|name| name.strip_prefix(FILE_PREFIX))
                .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
            else {
                continue;
            };
            if is_valid_token(token) {
                tokens.push(token.to_string());
            }
        }

        tokens.sort();
        Ok(tokens)
    }
}

pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// 32 lowercase hex characters, the simple form of a UUID.
pub fn is_valid_token(token: &str) -> bool {
    token.len() == 32 && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
