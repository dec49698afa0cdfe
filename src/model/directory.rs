use std::collections::HashMap;

use tracing::warn;

use super::task::StudentId;
use crate::io::backend::Backend;

/// Student id to display-name lookup, consulted only when rendering
#[derive(Debug, Clone, Default)]
pub struct StudentDirectory {
    names: HashMap<StudentId, String>,
}

impl StudentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: StudentId, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    /// Display name for `id`, or the raw id when the student is unknown
    pub fn display_name(&self, id: &StudentId) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fetch names for `ids` one by one. A failed lookup falls back to the id
    /// itself so the rest of the directory still loads.
    pub async fn resolve<B, I>(backend: &B, ids: I) -> Self
    where
        B: Backend + ?Sized,
        I: IntoIterator<Item = StudentId>,
    {
        let mut dir = StudentDirectory::new();
        for id in ids {
            if dir.names.contains_key(&id) {
                continue;
            }
            match backend.get_student_by_id(&id).await {
                Ok(student) => {
                    let name = student.display_name();
                    if name.is_empty() {
                        dir.insert(id.clone(), id.to_string());
                    } else {
                        dir.insert(id, name);
                    }
                }
                Err(e) => {
                    warn!(student = %id, error = %e, "failed to load student, showing raw id");
                    dir.insert(id.clone(), id.to_string());
                }
            }
        }
        dir
    }
}
