use crate::catalog::NodeCatalog;
use crate::error::Result;
use crate::layout::RepositoryLayout;
use crate::selection::NodeQuery;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, trace, warn};

/// Bucket directories to archive, plus how many nodes mapped onto them.
#[derive(Debug, Clone, Default)]
pub struct ResolvedBuckets {
    pub nodes_visited: usize,
    pub buckets: Vec<PathBuf>,
}

/// Run the query and collapse the returned nodes onto their bucket
/// directories: the leaf storage folder with its last segment removed.
/// Buckets come back deduplicated and sorted.
pub fn resolve(
    catalog: &dyn NodeCatalog,
    layout: &RepositoryLayout,
    query: &NodeQuery,
) -> Result<ResolvedBuckets> {
    let nodes = catalog.nodes(query)?;
    info!("{} items to back up", nodes.len());

    let folders = nodes.iter().map(|node| {
        trace!("Backing up node {} ({})", node.id, node.uuid);
        layout.node_folder(&node.uuid)
    });
    let buckets = bucket_paths(folders);
    debug!(
        "{} nodes collapse into {} buckets",
        nodes.len(),
        buckets.len()
    );

    Ok(ResolvedBuckets {
        nodes_visited: nodes.len(),
        buckets,
    })
}

/// Strip one trailing segment off every folder, dedupe and sort.
pub fn bucket_paths<I>(folders: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut buckets = BTreeSet::new();
    for folder in folders {
        match folder.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                buckets.insert(parent.to_path_buf());
            }
            _ => warn!("Node folder {} has no parent, skipping", folder.display()),
        }
    }
    buckets.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_paths_dedupes_and_sorts() {
        let folders = vec![
            PathBuf::from("/repo/node/31/02/c"),
            PathBuf::from("/repo/node/24/64/b"),
            PathBuf::from("/repo/node/24/64/a"),
        ];
        assert_eq!(
            bucket_paths(folders),
            vec![
                PathBuf::from("/repo/node/24/64"),
                PathBuf::from("/repo/node/31/02"),
            ]
        );
    }

    #[test]
    fn test_bucket_paths_skips_rootless_folder() {
        let folders = vec![PathBuf::from("/"), PathBuf::from("lonely")];
        assert!(bucket_paths(folders).is_empty());
    }
}
