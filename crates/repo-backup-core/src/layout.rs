use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name of the repository section that holds node folders.
pub const NODE_SECTION: &str = "node";

/// Two-level bucketed layout of node folders in the file repository:
/// `<root>/node/24/64/fd5a-749e-4572-b390-53efb766256a` for node
/// `2464fd5a-749e-4572-b390-53efb766256a`.
#[derive(Debug, Clone)]
pub struct RepositoryLayout {
    root: PathBuf,
}

impl RepositoryLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Leaf storage folder of a node.
    pub fn node_folder(&self, uuid: &Uuid) -> PathBuf {
        let hyphenated = uuid.hyphenated().to_string();
        // The hyphenated form is pure ASCII, so byte slicing is safe.
        self.root
            .join(NODE_SECTION)
            .join(&hyphenated[0..2])
            .join(&hyphenated[2..4])
            .join(&hyphenated[4..])
    }
}
