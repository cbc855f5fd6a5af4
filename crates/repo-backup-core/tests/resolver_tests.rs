mod common;

use common::*;
use repo_backup_core::catalog::SqliteCatalog;
use repo_backup_core::layout::RepositoryLayout;
use repo_backup_core::resolver::resolve;
use repo_backup_core::selection::{select, DateField, Selection};
use repo_backup_core::NodeQuery;
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn test_three_nodes_collapse_into_two_buckets() {
    let catalog = FixedCatalog::new(vec![
        node(1, UUID_A, 0, 0),
        node(2, UUID_B, 0, 0),
        node(3, UUID_C, 0, 0),
    ]);
    let layout = RepositoryLayout::new("/repo");
    let resolved = resolve(&catalog, &layout, &NodeQuery::All).unwrap();

    assert_eq!(resolved.nodes_visited, 3);
    assert_eq!(
        resolved.buckets,
        vec![
            PathBuf::from("/repo/node/24/64"),
            PathBuf::from("/repo/node/31/02"),
        ]
    );
    assert_eq!(catalog.calls.get(), 1);
}

#[test]
fn test_bucket_order_does_not_depend_on_catalog_order() {
    let layout = RepositoryLayout::new("/repo");
    let forward = FixedCatalog::new(vec![
        node(1, UUID_A, 0, 0),
        node(2, UUID_B, 0, 0),
        node(3, UUID_C, 0, 0),
    ]);
    let backward = FixedCatalog::new(vec![
        node(3, UUID_C, 0, 0),
        node(2, UUID_B, 0, 0),
        node(1, UUID_A, 0, 0),
    ]);
    assert_eq!(
        resolve(&forward, &layout, &NodeQuery::All).unwrap().buckets,
        resolve(&backward, &layout, &NodeQuery::All).unwrap().buckets
    );
}

#[test]
fn test_empty_catalog_yields_no_buckets() {
    let catalog = FixedCatalog::new(Vec::new());
    let layout = RepositoryLayout::new("/repo");
    let resolved = resolve(&catalog, &layout, &NodeQuery::All).unwrap();
    assert_eq!(resolved.nodes_visited, 0);
    assert!(resolved.buckets.is_empty());
}

#[test]
fn test_past_days_window_against_sqlite_catalog() {
    let catalog = SqliteCatalog::open_in_memory().unwrap();
    let now = at(1_760_745_600);
    let day = 86_400;
    // Modified 10 days ago, 2 days ago, and today.
    for (uuid, age_days) in [(UUID_A, 10), (UUID_B, 2), (UUID_C, 0)] {
        let t = at(now.timestamp() - age_days * day);
        catalog
            .insert_node(&Uuid::parse_str(uuid).unwrap(), t, t)
            .unwrap();
    }

    let selection = Selection::ByPastDays {
        days: 5,
        field: DateField::Modification,
    };
    let query = select(&selection, now).unwrap();
    let layout = RepositoryLayout::new("/repo");
    let resolved = resolve(&catalog, &layout, &query).unwrap();

    assert_eq!(resolved.nodes_visited, 2);
    assert_eq!(
        resolved.buckets,
        vec![
            PathBuf::from("/repo/node/24/64"),
            PathBuf::from("/repo/node/31/02"),
        ]
    );
}
