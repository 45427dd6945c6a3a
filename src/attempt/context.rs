// src/attempt/context.rs

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{result::ExamResult, student::Student};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("session file error: {0}")]
    Io(#[from] io::Error),

    #[error("session file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Who is using the client and what they last did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    /// Student identity from the most recent registration.
    pub student: Option<Student>,
    pub last_result: Option<ExamResult>,
}

/// A [`SessionContext`] bound to the file it is loaded from.
///
/// Loaded once at start-up; every mutation goes through [`SessionStore::update`],
/// which writes the file back before returning.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    context: SessionContext,
}

impl SessionStore {
    /// Reads the session at `path`. A missing file yields an empty session.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ContextError> {
        let path = path.into();
        let context = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => SessionContext::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), "session loaded");
        Ok(Self { path, context })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn update<F>(&mut self, mutate: F) -> Result<(), ContextError>
    where
        F: FnOnce(&mut SessionContext),
    {
        mutate(&mut self.context);
        self.save()
    }

    pub fn clear(&mut self) -> Result<(), ContextError> {
        self.update(|context| *context = SessionContext::default())
    }

    fn save(&self) -> Result<(), ContextError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.context)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::student::STUDENT_ROLE;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("quizwizard-{}", uuid::Uuid::new_v4().simple()))
            .join("session.json")
    }

    #[test]
    fn missing_file_is_an_empty_session() {
        let store = SessionStore::load(temp_path()).unwrap();
        assert_eq!(store.context(), &SessionContext::default());
    }

    #[test]
    fn updates_are_persisted() {
        let path = temp_path();
        let mut store = SessionStore::load(&path).unwrap();
        let student = Student {
            id: 3,
            email: "a@b.com".into(),
            role: STUDENT_ROLE.into(),
        };
        store
            .update(|c| c.student = Some(student.clone()))
            .unwrap();

        let reloaded = SessionStore::load(&path).unwrap();
        assert_eq!(reloaded.context().student.as_ref(), Some(&student));

        let mut reloaded = reloaded;
        reloaded.clear().unwrap();
        assert!(SessionStore::load(&path).unwrap().context().student.is_none());

        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{not json").unwrap();

        assert!(matches!(SessionStore::load(&path), Err(ContextError::Format(_))));
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
