// tests/inventory.rs
mod common;

use chrono::NaiveDate;
use common::{insert_item, insert_supplier, setup_db};

use mes::error::{domain_error, MesError};
use mes::inventory::{InventoryRepo, NewInbound, NewOutbound};
use mes::items::RawItemsRepo;
use mes::partners::PartnersRepo;
use serial_test::serial;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn inbound(raw_item_id: i64, qty: i32, date: NaiveDate) -> NewInbound {
    NewInbound {
        raw_item_id,
        qty,
        inbound_date: date,
        manufacturing_date: day(1),
    }
}

fn outbound(raw_item_id: i64, qty: i32, date: NaiveDate) -> NewOutbound {
    NewOutbound {
        raw_item_id,
        qty,
        outbound_date: date,
    }
}

#[tokio::test]
#[serial]
async fn lot_numbers_count_up_per_day() {
    let Some(pool) = setup_db().await else { return };
    let repo = InventoryRepo::new(pool.clone());

    let supplier = insert_supplier(&pool, "Hanil Paint").await;
    let item = insert_item(&pool, "RM-001", supplier.id).await;

    let first = repo.register_inbound(inbound(item.id, 10, day(14))).await.unwrap();
    let second = repo.register_inbound(inbound(item.id, 5, day(14))).await.unwrap();
    let next_day = repo.register_inbound(inbound(item.id, 1, day(15))).await.unwrap();

    assert_eq!(first.lot_number, "MINC-20250314-001");
    assert_eq!(second.lot_number, "MINC-20250314-002");
    assert_eq!(next_day.lot_number, "MINC-20250315-001");

    let stock = repo.inventory_status(None).await.unwrap();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].qty, 16);

    let history = repo.list_inbound().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].id, next_day.id);
}

#[tokio::test]
#[serial]
async fn outbound_cannot_exceed_stock() {
    let Some(pool) = setup_db().await else { return };
    let repo = InventoryRepo::new(pool.clone());

    let supplier = insert_supplier(&pool, "Hanil Paint").await;
    let item = insert_item(&pool, "RM-001", supplier.id).await;

    // no stock row yet
    let err = repo
        .register_outbound(outbound(item.id, 1, day(14)))
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));

    repo.register_inbound(inbound(item.id, 10, day(14))).await.unwrap();

    let err = repo
        .register_outbound(outbound(item.id, 11, day(14)))
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));
    assert!(repo.list_outbound().await.unwrap().is_empty());

    let out = repo
        .register_outbound(outbound(item.id, 10, day(14)))
        .await
        .unwrap();
    assert_eq!(out.outbound_number, "MOUT-20250314-001");

    let stock = repo.inventory_status(Some("rm-001")).await.unwrap();
    assert_eq!(stock[0].qty, 0);
    // empty stock is not offered for outbound
    assert!(repo.outbound_eligible(None).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn inactive_items_and_suppliers_are_not_eligible() {
    let Some(pool) = setup_db().await else { return };
    let repo = InventoryRepo::new(pool.clone());
    let items = RawItemsRepo::new(pool.clone());
    let partners = PartnersRepo::new(pool.clone());

    let hanil = insert_supplier(&pool, "Hanil Paint").await;
    let kcc = insert_supplier(&pool, "KCC").await;
    let a = insert_item(&pool, "RM-001", hanil.id).await;
    let b = insert_item(&pool, "RM-002", kcc.id).await;
    let c = insert_item(&pool, "RM-003", hanil.id).await;

    assert_eq!(repo.inbound_eligible(None).await.unwrap().len(), 3);
    let by_supplier = repo.inbound_eligible(Some("kcc")).await.unwrap();
    assert_eq!(by_supplier.len(), 1);
    assert_eq!(by_supplier[0].raw_item_id, b.id);

    items.set_active(c.id, false).await.unwrap();
    partners.set_active(kcc.id, false).await.unwrap();

    let eligible = repo.inbound_eligible(None).await.unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].raw_item_id, a.id);

    let err = repo
        .register_inbound(inbound(b.id, 3, day(14)))
        .await
        .unwrap_err();
    assert!(matches!(domain_error(&err), Some(MesError::Validation(_))));
}
