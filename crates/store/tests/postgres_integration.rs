//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use common::{BookId, Money, OrderId, ShipperId};
use domain::{DiscountKind, NewOrder, OrderLine, OrderStatus, PromotionDraft};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    AssignmentStore, BookStore, OrderStore, PostgresStore, PromotionStore, StockLedger,
    StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!("../../../migrations/001_create_tables.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn fresh_store() -> PostgresStore {
    let info = get_container_info().await;
    let pool = PgPool::connect(&info.connection_string).await.unwrap();

    // Each test starts from empty tables.
    sqlx::raw_sql(
        "TRUNCATE shipper_assignments, stock_reservations, order_lines, orders, \
         promotion_books, promotions, users, books RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn draft(start: NaiveDate, end: NaiveDate, books: Vec<BookId>) -> PromotionDraft {
    PromotionDraft {
        name: "TET10".to_string(),
        kind: DiscountKind::Percent,
        value: 10,
        start_date: start,
        end_date: end,
        book_ids: books,
    }
}

fn new_order(lines: Vec<OrderLine>) -> NewOrder {
    let total: Money = lines.iter().map(OrderLine::subtotal).sum();
    NewOrder {
        customer_name: "An".to_string(),
        customer_phone: "0900000001".to_string(),
        shipping_address: Some("12 Lý Thường Kiệt, Hà Nội".to_string()),
        payment_method: None,
        lines,
        total_amount: total,
        discount_amount: Money::zero(),
        final_amount: total,
        promotion_id: None,
    }
}

#[tokio::test]
#[serial]
async fn conditional_decrement_enforces_stock() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 5)
        .await
        .unwrap();

    store
        .reserve_stock(OrderId::new(1), &[(book.id, 3)])
        .await
        .unwrap();
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 2);

    let result = store.reserve_stock(OrderId::new(2), &[(book.id, 3)]).await;
    match result {
        Err(StoreError::InsufficientStock { book_ids }) => assert_eq!(book_ids, vec![book.id]),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[serial]
async fn concurrent_reservations_never_oversell() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 5)
        .await
        .unwrap();

    let s1 = store.clone();
    let s2 = store.clone();
    let id = book.id;
    let t1 = tokio::spawn(async move { s1.reserve_stock(OrderId::new(1), &[(id, 3)]).await });
    let t2 = tokio::spawn(async move { s2.reserve_stock(OrderId::new(2), &[(id, 3)]).await });

    let r1 = t1.await.unwrap();
    let r2 = t2.await.unwrap();
    assert_eq!(r1.is_ok() as u8 + r2.is_ok() as u8, 1, "exactly one succeeds");
    assert_eq!(store.get_book(id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[serial]
async fn release_is_idempotent() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();
    let order_id = OrderId::new(1);

    store.reserve_stock(order_id, &[(book.id, 4)]).await.unwrap();
    assert!(store.release_stock(order_id).await.unwrap());
    assert!(!store.release_stock(order_id).await.unwrap());
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
#[serial]
async fn create_order_is_all_or_nothing() {
    let store = fresh_store().await;
    let plenty = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();
    let scarce = store
        .insert_book("Lão Hạc", Money::new(45_000), 1)
        .await
        .unwrap();

    let lines = vec![
        OrderLine::new(plenty.id, 2, plenty.price).unwrap(),
        OrderLine::new(scarce.id, 3, scarce.price).unwrap(),
    ];
    let result = store.create_order(new_order(lines)).await;
    assert!(matches!(result, Err(StoreError::InsufficientStock { .. })));

    // The rolled-back transaction left no order and no stock change.
    assert!(store.list_orders().await.unwrap().is_empty());
    assert_eq!(store.get_book(plenty.id).await.unwrap().unwrap().stock, 10);
    assert_eq!(store.get_book(scarce.id).await.unwrap().unwrap().stock, 1);
}

#[tokio::test]
#[serial]
async fn status_swap_applies_once() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();
    let order = store
        .create_order(new_order(vec![OrderLine::new(book.id, 1, book.price).unwrap()]))
        .await
        .unwrap();

    assert!(
        store
            .transition_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap()
    );
    assert!(
        !store
            .transition_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap()
    );
    assert_eq!(
        store.get_order(order.id).await.unwrap().unwrap().status,
        OrderStatus::Confirmed
    );
}

#[tokio::test]
#[serial]
async fn cancel_reverses_stock_exactly_once() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();
    let order = store
        .create_order(new_order(vec![OrderLine::new(book.id, 4, book.price).unwrap()]))
        .await
        .unwrap();
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 6);

    assert!(
        store
            .cancel_order(order.id, OrderStatus::Pending)
            .await
            .unwrap()
    );
    assert!(
        !store
            .cancel_order(order.id, OrderStatus::Pending)
            .await
            .unwrap()
    );
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().stock, 10);
}

#[tokio::test]
#[serial]
async fn overlapping_promotions_conflict_in_transaction() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();

    store
        .insert_promotion(draft(date(2025, 1, 1), date(2025, 1, 31), vec![book.id]))
        .await
        .unwrap();

    let result = store
        .insert_promotion(draft(date(2025, 1, 31), date(2025, 2, 28), vec![book.id]))
        .await;
    match result {
        Err(StoreError::PromotionConflict { book_ids }) => assert_eq!(book_ids, vec![book.id]),
        other => panic!("expected PromotionConflict, got {other:?}"),
    }

    // A window starting the day after is free.
    store
        .insert_promotion(draft(date(2025, 2, 1), date(2025, 2, 28), vec![book.id]))
        .await
        .unwrap();
}

#[tokio::test]
#[serial]
async fn promotion_update_excludes_its_own_window() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();

    let promo = store
        .insert_promotion(draft(date(2025, 1, 1), date(2025, 1, 31), vec![book.id]))
        .await
        .unwrap();
    let updated = store
        .update_promotion(
            promo.id,
            draft(date(2025, 1, 1), date(2025, 2, 15), vec![book.id]),
        )
        .await
        .unwrap();
    assert_eq!(updated.end_date, date(2025, 2, 15));

    let stored = store.get_promotion(promo.id).await.unwrap().unwrap();
    assert_eq!(stored.end_date, date(2025, 2, 15));
    assert_eq!(stored.book_ids, vec![book.id]);
}

#[tokio::test]
#[serial]
async fn assignment_lifecycle_with_unique_active_rows() {
    let store = fresh_store().await;
    let book = store
        .insert_book("Truyện Kiều", Money::new(75_000), 10)
        .await
        .unwrap();
    let shipper = ShipperId::new(1);

    let mut orders = Vec::new();
    for _ in 0..2 {
        let order = store
            .create_order(new_order(vec![OrderLine::new(book.id, 1, book.price).unwrap()]))
            .await
            .unwrap();
        store
            .transition_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap();
        orders.push(order);
    }

    let assignment = store.assign_shipper(orders[0].id, shipper).await.unwrap();
    assert!(assignment.is_active());
    assert_eq!(
        store.get_order(orders[0].id).await.unwrap().unwrap().status,
        OrderStatus::Delivering
    );

    // Busy shipper is rejected, and the status CAS it performed rolls back.
    let result = store.assign_shipper(orders[1].id, shipper).await;
    assert!(matches!(result, Err(StoreError::ShipperUnavailable { .. })));
    assert_eq!(
        store.get_order(orders[1].id).await.unwrap().unwrap().status,
        OrderStatus::Confirmed
    );

    // Wrong shipper cannot complete.
    let wrong = store.complete_delivery(orders[0].id, ShipperId::new(2)).await;
    assert!(matches!(wrong, Err(StoreError::NotAssignedShipper { .. })));

    let done = store.complete_delivery(orders[0].id, shipper).await.unwrap();
    assert!(done.completed_at.is_some());
    assert_eq!(
        store.get_order(orders[0].id).await.unwrap().unwrap().status,
        OrderStatus::Delivered
    );

    // The shipper is free again for the second order.
    store.assign_shipper(orders[1].id, shipper).await.unwrap();
    store.unassign_shipper(orders[1].id).await.unwrap();
    assert_eq!(
        store.get_order(orders[1].id).await.unwrap().unwrap().status,
        OrderStatus::Confirmed
    );
    assert!(store.active_assignment(orders[1].id).await.unwrap().is_none());
}
