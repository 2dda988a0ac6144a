use std::path::PathBuf;

use uuid::Uuid;

use crate::session::EditSession;

/// Single open document: its edit session and where it came from. View state
/// (camera, active tool) is canvas-scoped, not per-document, and lives in
/// the app's `EditContext`.
pub struct Document {
    pub id: Uuid,
    pub session: EditSession,
    /// `None` for images pasted or otherwise not yet on disk.
    pub path: Option<PathBuf>,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    /// Session revision last written to disk; dirty when it trails the
    /// session's current revision.
    pub saved_revision: u64,
}

impl Document {
    pub fn new_untitled(untitled_counter: usize, session: EditSession) -> Self {
        let saved_revision = session.revision();
        Self {
            id: Uuid::new_v4(),
            session,
            path: None,
            name: format!("Untitled-{}", untitled_counter),
            saved_revision,
        }
    }

    pub fn from_file(path: PathBuf, session: EditSession) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        let saved_revision = session.revision();

        Self {
            id: Uuid::new_v4(),
            session,
            path: Some(path),
            name,
            saved_revision,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.session.revision() != self.saved_revision
    }

    pub fn mark_saved(&mut self) {
        self.saved_revision = self.session.revision();
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Unknown".to_string());
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty() {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Ordered set of open documents with at most one active.
#[derive(Default)]
pub struct DocumentManager {
    documents: Vec<Document>,
    active: Option<Uuid>,
    untitled_counter: usize,
}

impl DocumentManager {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    pub fn next_untitled(&mut self) -> usize {
        self.untitled_counter += 1;
        self.untitled_counter
    }

    /// Add a document and make it active.
    pub fn add(&mut self, document: Document) -> Uuid {
        let id = document.id;
        self.documents.push(document);
        self.active = Some(id);
        id
    }

    pub fn select(&mut self, id: Uuid) {
        if self.documents.iter().any(|d| d.id == id) {
            self.active = Some(id);
        }
    }

    /// Close a document. When it was active, its neighbor takes over.
    pub fn remove(&mut self, id: Uuid) {
        let Some(index) = self.documents.iter().position(|d| d.id == id) else {
            return;
        };
        self.documents.remove(index);
        if self.active == Some(id) {
            self.active = self
                .documents
                .get(index.min(self.documents.len().saturating_sub(1)))
                .map(|d| d.id);
        }
    }

    pub fn active(&self) -> Option<&Document> {
        let id = self.active?;
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn active_mut(&mut self) -> Option<&mut Document> {
        let id = self.active?;
        self.documents.iter_mut().find(|d| d.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn doc(mgr: &mut DocumentManager) -> Document {
        let mut session = EditSession::default();
        session.init(RgbaImage::new(10, 10)).unwrap();
        let n = mgr.next_untitled();
        Document::new_untitled(n, session)
    }

    #[test]
    fn add_activates_the_new_document() {
        let mut mgr = DocumentManager::default();
        let first = doc(&mut mgr);
        let a = mgr.add(first);
        assert_eq!(mgr.active_id(), Some(a));
        let second = doc(&mut mgr);
        assert_eq!(second.name, "Untitled-2");
        let b = mgr.add(second);
        assert_eq!(mgr.active_id(), Some(b));
        assert_eq!(mgr.iter().count(), 2);
    }

    #[test]
    fn removing_the_active_document_activates_a_neighbor() {
        let mut mgr = DocumentManager::default();
        let first = doc(&mut mgr);
        let a = mgr.add(first);
        let second = doc(&mut mgr);
        let b = mgr.add(second);
        mgr.remove(b);
        assert_eq!(mgr.active_id(), Some(a));
        mgr.remove(a);
        assert_eq!(mgr.active_id(), None);
        assert!(mgr.is_empty());
    }

    #[test]
    fn dirty_tracks_the_session_revision() {
        let mut mgr = DocumentManager::default();
        let mut d = doc(&mut mgr);
        assert!(!d.is_dirty());
        assert_eq!(d.display_title(), "Untitled-1");
        d.session.bump();
        assert!(d.is_dirty());
        assert_eq!(d.display_title(), "Untitled-1*");
        d.mark_saved();
        assert!(!d.is_dirty());
    }
}
