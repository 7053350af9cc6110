use crate::core::error::AishError;
use crate::providers::{Message, Speaker};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    created_at: DateTime<Utc>,
    messages: Vec<Message>,
}

/// Disk-backed store of named conversation transcripts, one JSON document
/// per session. Writes always replace the whole document via a temp file
/// and rename, so a racing invocation never observes a partial transcript.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> Result<PathBuf, AishError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(AishError::Input(format!("Invalid session name: {}", name)));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn load(&self, name: &str) -> Result<Vec<Message>, AishError> {
        let path = self.path(name)?;
        if !path.exists() {
            return Err(AishError::SessionNotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| AishError::SessionStorage(format!("Read {}: {}", path.display(), e)))?;
        let file: SessionFile = serde_json::from_str(&contents).map_err(|e| {
            AishError::SessionStorage(format!("Corrupt session {}: {}", path.display(), e))
        })?;
        Ok(file.messages)
    }

    /// Transcript of an existing session, or an empty one for a name that
    /// is about to be created.
    pub fn load_or_empty(&self, name: &str) -> Result<Vec<Message>, AishError> {
        match self.load(name) {
            Ok(messages) => Ok(messages),
            Err(AishError::SessionNotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Append exactly one message, preserving the alternation invariant.
    pub fn append(&self, name: &str, message: Message) -> Result<(), AishError> {
        let mut messages = self.load_or_empty(name)?;
        messages.push(message);
        check_alternation(&messages)?;
        self.replace(name, messages)
    }

    /// Persist a completed exchange in one atomic write. This is the
    /// pipeline's persist step: either both messages land or neither does.
    pub fn append_exchange(
        &self,
        name: &str,
        user: Message,
        assistant: Message,
    ) -> Result<(), AishError> {
        let mut messages = self.load_or_empty(name)?;
        messages.push(user);
        messages.push(assistant);
        check_alternation(&messages)?;
        self.replace(name, messages)
    }

    /// Whole-document replace-on-write.
    pub fn replace(&self, name: &str, messages: Vec<Message>) -> Result<(), AishError> {
        check_alternation(&messages)?;
        let path = self.path(name)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| AishError::SessionStorage(format!("Create session dir: {}", e)))?;

        let created_at = read_created_at(&path).unwrap_or_else(Utc::now);
        let file = SessionFile {
            created_at,
            messages,
        };

        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&file)?;
        fs::write(&tmp, body)
            .map_err(|e| AishError::SessionStorage(format!("Write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| AishError::SessionStorage(format!("Replace {}: {}", path.display(), e)))?;
        debug!(session = name, "transcript written");
        Ok(())
    }

    pub fn clear(&self, name: &str) -> Result<(), AishError> {
        if !self.exists(name) {
            return Err(AishError::SessionNotFound(name.to_string()));
        }
        self.replace(name, Vec::new())
    }

    pub fn delete(&self, name: &str) -> Result<(), AishError> {
        let path = self.path(name)?;
        if !path.exists() {
            return Err(AishError::SessionNotFound(name.to_string()));
        }
        fs::remove_file(&path)
            .map_err(|e| AishError::SessionStorage(format!("Delete {}: {}", path.display(), e)))
    }

    pub fn list(&self) -> Result<Vec<String>, AishError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| AishError::SessionStorage(format!("List sessions: {}", e)))?
        {
            let path = entry
                .map_err(|e| AishError::SessionStorage(format!("List sessions: {}", e)))?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

fn read_created_at(path: &Path) -> Option<DateTime<Utc>> {
    let contents = fs::read_to_string(path).ok()?;
    let file: SessionFile = serde_json::from_str(&contents).ok()?;
    Some(file.created_at)
}

/// A transcript is an optional leading system message followed by strict
/// user/assistant alternation starting with the user.
pub fn check_alternation(messages: &[Message]) -> Result<(), AishError> {
    let mut expected = Speaker::User;
    for (i, message) in messages.iter().enumerate() {
        match message.role {
            Speaker::System if i == 0 => continue,
            Speaker::System => {
                return Err(AishError::InvalidTranscript(format!(
                    "system message at position {}",
                    i
                )));
            }
            role if role == expected => {
                expected = match expected {
                    Speaker::User => Speaker::Assistant,
                    _ => Speaker::User,
                };
            }
            role => {
                return Err(AishError::InvalidTranscript(format!(
                    "expected {} at position {}, found {}",
                    expected.as_str(),
                    i,
                    role.as_str()
                )));
            }
        }
    }
    Ok(())
}
