// tests/routing.rs
mod common;

use common::{insert_operation, set_status, setup_db};

use mes::error::{domain_error, MesError};
use mes::routing::{
    BatchUpdate, NameEntry, OperationPatch, OperationStatus, OperationsRepo, OrderEntry,
    SearchQuery, SearchType,
};
use serial_test::serial;

fn ids_in_order(ops: &[mes::routing::Operation]) -> Vec<(i64, i32)> {
    ops.iter().map(|op| (op.id, op.order)).collect()
}

#[tokio::test]
#[serial]
async fn register_appends_to_sequence() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;
    let c = insert_operation(&pool, "P-C", "Clear coat").await;

    assert_eq!((a.order, b.order, c.order), (1, 2, 3));
    assert_eq!(a.status, OperationStatus::Pending);
    assert!(a.start_time.is_none());

    let status = repo.list_status().await.unwrap();
    assert_eq!(ids_in_order(&status), vec![(a.id, 1), (b.id, 2), (c.id, 3)]);

    assert_eq!(repo.get(b.id).await.unwrap(), Some(b));
    assert!(repo.get(9_999).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_code_is_a_conflict() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    insert_operation(&pool, "P-A", "Primer").await;
    assert!(repo.is_code_taken("P-A").await.unwrap());
    assert!(!repo.is_code_taken("P-Z").await.unwrap());

    let err = repo
        .register(mes::routing::NewOperation {
            code: "P-A".into(),
            name: "Again".into(),
            description: None,
            standard_time: 5,
        })
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn reorder_applies_full_permutation() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;
    let c = insert_operation(&pool, "P-C", "Clear coat").await;

    repo.reorder(&[
        OrderEntry { id: b.id, order: 1 },
        OrderEntry { id: c.id, order: 2 },
        OrderEntry { id: a.id, order: 3 },
    ])
    .await
    .unwrap();

    let status = repo.list_status().await.unwrap();
    assert_eq!(ids_in_order(&status), vec![(b.id, 1), (c.id, 2), (a.id, 3)]);
}

#[tokio::test]
#[serial]
async fn invalid_reorder_changes_nothing() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;
    let c = insert_operation(&pool, "P-C", "Clear coat").await;
    let before = repo.list_status().await.unwrap();

    // missing one row
    let err = repo
        .reorder(&[
            OrderEntry { id: c.id, order: 1 },
            OrderEntry { id: a.id, order: 2 },
        ])
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));

    // duplicate order value
    let err = repo
        .reorder(&[
            OrderEntry { id: a.id, order: 1 },
            OrderEntry { id: b.id, order: 1 },
            OrderEntry { id: c.id, order: 3 },
        ])
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));

    // an empty list does not cover the existing rows
    let err = repo.reorder(&[]).await.unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));

    assert_eq!(repo.list_status().await.unwrap(), before);
}

#[tokio::test]
#[serial]
async fn empty_reorder_of_empty_table_is_accepted() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    repo.reorder(&[]).await.unwrap();
    assert!(repo.list_status().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_registers_get_distinct_orders() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let handles: Vec<_> = (1..=16)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.register(mes::routing::NewOperation {
                    code: format!("C-{i:02}"),
                    name: format!("Coat {i}"),
                    description: None,
                    standard_time: 5,
                })
                .await
            })
        })
        .collect();
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let mut orders: Vec<i32> = repo
        .list_status()
        .await
        .unwrap()
        .iter()
        .map(|op| op.order)
        .collect();
    orders.sort_unstable();
    assert_eq!(orders, (1..=16).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn racing_code_changes_end_in_one_conflict() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;

    let patch = OperationPatch {
        code: Some("P-Z".into()),
        ..OperationPatch::default()
    };
    let (ra, rb) = tokio::join!(
        tokio::spawn({
            let (repo, patch) = (repo.clone(), patch.clone());
            async move { repo.update(a.id, &patch).await }
        }),
        tokio::spawn({
            let (repo, patch) = (repo.clone(), patch.clone());
            async move { repo.update(b.id, &patch).await }
        }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(domain_error(err), Some(MesError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn start_sets_start_time_and_only_from_pending() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let started = repo.start(a.id).await.unwrap();
    assert_eq!(started.status, OperationStatus::InProgress);
    assert!(started.start_time.is_some());

    let err = repo.start(a.id).await.unwrap_err();
    assert!(matches!(
        domain_error(&err),
        Some(MesError::InvalidTransition { .. })
    ));

    let done = repo
        .update(a.id, &OperationPatch::status(OperationStatus::Completed))
        .await
        .unwrap();
    assert_eq!(done.status, OperationStatus::Completed);
    assert_eq!(done.start_time, started.start_time);

    let err = repo.start(a.id).await.unwrap_err();
    assert!(matches!(
        domain_error(&err),
        Some(MesError::InvalidTransition { .. })
    ));

    let err = repo.start(9_999).await.unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::NotFound { .. })));
}

#[tokio::test]
#[serial]
async fn terminal_operations_reject_changes_but_accept_noops() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    set_status(&pool, a.id, "COMPLETED").await;

    let same = repo
        .update(a.id, &OperationPatch::rename("Primer"))
        .await
        .unwrap();
    assert_eq!(same.name, "Primer");

    // padded values are stored trimmed, so this changes nothing either
    let padded = repo
        .update(
            a.id,
            &OperationPatch {
                code: Some(" P-A".into()),
                name: Some(" Primer ".into()),
                ..OperationPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!((padded.code.as_str(), padded.name.as_str()), ("P-A", "Primer"));

    let err = repo
        .update(a.id, &OperationPatch::rename("Other"))
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Conflict(_))));
}

#[tokio::test]
#[serial]
async fn completing_a_pending_operation_is_rejected() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let err = repo
        .update(a.id, &OperationPatch::status(OperationStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(
        domain_error(&err),
        Some(MesError::InvalidTransition { .. })
    ));
}

#[tokio::test]
#[serial]
async fn batch_is_all_or_nothing() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;
    let c = insert_operation(&pool, "P-C", "Clear coat").await;
    set_status(&pool, c.id, "COMPLETED").await;
    let before = repo.list_status().await.unwrap();

    // renaming a completed row sinks the whole batch, reorder included
    let err = repo
        .apply_batch(&BatchUpdate {
            orders: vec![
                OrderEntry { id: c.id, order: 1 },
                OrderEntry { id: a.id, order: 2 },
                OrderEntry { id: b.id, order: 3 },
            ],
            names: vec![NameEntry {
                id: c.id,
                name: "Primer".into(),
            }],
        })
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Conflict(_))));
    assert_eq!(repo.list_status().await.unwrap(), before);

    repo.apply_batch(&BatchUpdate {
        orders: vec![
            OrderEntry { id: c.id, order: 1 },
            OrderEntry { id: a.id, order: 2 },
            OrderEntry { id: b.id, order: 3 },
        ],
        names: vec![NameEntry {
            id: b.id,
            name: "Primer".into(),
        }],
    })
    .await
    .unwrap();

    let after = repo.list_status().await.unwrap();
    assert_eq!(ids_in_order(&after), vec![(c.id, 1), (a.id, 2), (b.id, 3)]);
    assert_eq!(after[2].name, "Primer");
}

#[tokio::test]
#[serial]
async fn delete_compacts_orders() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    let a = insert_operation(&pool, "P-A", "Primer").await;
    let b = insert_operation(&pool, "P-B", "Base coat").await;
    let c = insert_operation(&pool, "P-C", "Clear coat").await;

    repo.delete(b.id).await.unwrap();
    let status = repo.list_status().await.unwrap();
    assert_eq!(ids_in_order(&status), vec![(a.id, 1), (c.id, 2)]);

    let err = repo.delete(b.id).await.unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::NotFound { .. })));

    let d = insert_operation(&pool, "P-D", "Drying").await;
    assert_eq!(d.order, 3);
}

#[tokio::test]
#[serial]
async fn search_pages_and_filters() {
    let Some(pool) = setup_db().await else { return };
    let repo = OperationsRepo::new(pool.clone());

    for i in 1..=12 {
        insert_operation(&pool, &format!("P-{i:02}"), &format!("Coat {i}")).await;
    }
    insert_operation(&pool, "X-01", "Inspection").await;

    let page = repo
        .search(&SearchQuery {
            page: Some(2),
            limit: Some(5),
            search_type: SearchType::All,
            search_term: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total_elements, 13);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.content.len(), 5);
    assert_eq!(page.content[0].code, "P-06");

    let by_name = repo
        .search(&SearchQuery {
            page: None,
            limit: None,
            search_type: SearchType::Name,
            search_term: Some("inspect".into()),
        })
        .await
        .unwrap();
    assert_eq!(by_name.total_elements, 1);
    assert_eq!(by_name.content[0].code, "X-01");

    let by_code = repo
        .search(&SearchQuery {
            page: Some(0),
            limit: Some(100),
            search_type: SearchType::Code,
            search_term: Some("p-1".into()),
        })
        .await
        .unwrap();
    assert_eq!(by_code.page, 1);
    assert_eq!(by_code.total_elements, 3);

    let catalogue = repo.catalogue(Some("  coat 1 ")).await.unwrap();
    assert_eq!(catalogue.len(), 4);
}
