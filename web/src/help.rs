//! Help content: markdown files named after their topic.
//!
//! A topic is read from `{dir}/{topic}.md` the first time it is asked for and
//! served from memory afterwards. Topic names are limited to lowercase
//! letters, digits and `-`, so a topic can never point outside `dir`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

/// Why a topic could not be served.
#[derive(Error, Debug)]
pub enum HelpError {
    /// The name contains characters outside `[a-z0-9-]`
    #[error("Invalid help topic: {0}")]
    InvalidTopic(String),

    /// No file for the topic
    #[error("Help content not found: {0}.md")]
    NotFound(String),

    /// The file exists but could not be read
    #[error("Error loading help content: {0}")]
    Read(#[source] io::Error),
}

/// Cached reader over a help directory.
#[derive(Debug)]
pub struct HelpProvider {
    dir: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl HelpProvider {
    /// Serve topics from `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Directory topics are read from
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Markdown for `topic`.
    ///
    /// # Errors
    ///
    /// [`HelpError::InvalidTopic`] for names outside `[a-z0-9-]`,
    /// [`HelpError::NotFound`] when the file is missing and
    /// [`HelpError::Read`] for any other I/O failure. Failures are not cached.
    pub async fn load(&self, topic: &str) -> Result<String, HelpError> {
        if !is_valid_topic(topic) {
            return Err(HelpError::InvalidTopic(topic.to_string()));
        }
        if let Some(content) = self.cache.read().await.get(topic) {
            return Ok(content.clone());
        }

        let path = self.dir.join(format!("{topic}.md"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(topic, path = %path.display(), "help topic missing");
                return Err(HelpError::NotFound(topic.to_string()));
            },
            Err(e) => {
                tracing::warn!(topic, error = %e, "help topic unreadable");
                return Err(HelpError::Read(e));
            },
        };

        self.cache
            .write()
            .await
            .insert(topic.to_string(), content.clone());
        Ok(content)
    }
}

fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty()
        && topic
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_and_caches_topics() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quick-help.md"), "# Quick help").unwrap();
        let help = HelpProvider::new(dir.path());

        assert_eq!(help.load("quick-help").await.unwrap(), "# Quick help");

        std::fs::write(dir.path().join("quick-help.md"), "# Changed").unwrap();
        assert_eq!(help.load("quick-help").await.unwrap(), "# Quick help");
    }

    #[tokio::test]
    async fn missing_topic_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let help = HelpProvider::new(dir.path());

        let err = help.load("deploy-dc").await.unwrap_err();
        assert_eq!(err.to_string(), "Help content not found: deploy-dc.md");
    }

    #[tokio::test]
    async fn unreadable_topic_reports_the_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("deploy-pop.md")).unwrap();
        let help = HelpProvider::new(dir.path());

        let err = help.load("deploy-pop").await.unwrap_err();
        assert!(matches!(err, HelpError::Read(_)));
        assert!(err.to_string().starts_with("Error loading help content: "));
    }

    #[tokio::test]
    async fn topic_names_cannot_escape_the_directory() {
        let help = HelpProvider::new("help");
        for topic in ["../secret", "Quick-Help", "a/b", "", "x.md"] {
            assert!(matches!(help.load(topic).await, Err(HelpError::InvalidTopic(_))), "{topic}");
        }
    }
}
