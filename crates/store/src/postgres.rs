//! PostgreSQL-backed store implementation.
//!
//! Atomicity mapping:
//! - stock reservation: row locks in id order plus conditional
//!   `stock >= quantity` decrements, all in one transaction
//! - status transitions: single conditional `UPDATE … WHERE status = $from`
//! - promotion writes: `pg_advisory_xact_lock` serializes writers so the
//!   overlap re-validation and the insert see the same committed state
//! - single-active-assignment: partial unique indexes back the in-
//!   transaction checks under races

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{BookId, Money, OrderId, PromotionId, ShipperId, UserId};
use domain::{
    Book, DateRange, NewOrder, Order, OrderLine, OrderStatus, Promotion, PromotionDraft,
    PromotionWindow, Role, ShipperAssignment, User, conflicting_books, overlapping_windows,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::error::{Result, StoreError};
use crate::traits::{
    AssignmentStore, BookStore, OrderStore, PromotionStore, StockLedger, UserStore,
};

/// Advisory lock key serializing promotion writers.
const PROMOTION_WRITE_LOCK: i64 = 0x50_52_4F_4D; // "PROM"

/// PostgreSQL store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus> {
    raw.parse()
        .map_err(|e: String| StoreError::Decode(e))
}

fn parse_role(raw: &str) -> Result<Role> {
    raw.parse()
        .map_err(|e: String| StoreError::Decode(e))
}

fn to_u32(value: i64, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Decode(format!("{what} out of range: {value}")))
}

fn row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        id: BookId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        price: Money::new(row.try_get("price")?),
        stock: to_u32(row.try_get("stock")?, "stock")?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        role: parse_role(&role)?,
        phone: row.try_get("phone")?,
    })
}

fn row_to_assignment(row: &PgRow) -> Result<ShipperAssignment> {
    Ok(ShipperAssignment {
        order_id: OrderId::new(row.try_get("order_id")?),
        shipper_id: ShipperId::new(row.try_get("shipper_id")?),
        assigned_at: row.try_get::<DateTime<Utc>, _>("assigned_at")?,
        completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
    })
}

fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        customer_name: row.try_get("customer_name")?,
        customer_phone: row.try_get("customer_phone")?,
        shipping_address: row.try_get("shipping_address")?,
        payment_method: row.try_get("payment_method")?,
        status: parse_status(&status)?,
        lines,
        total_amount: Money::new(row.try_get("total_amount")?),
        discount_amount: Money::new(row.try_get("discount_amount")?),
        final_amount: Money::new(row.try_get("final_amount")?),
        promotion_id: row
            .try_get::<Option<i64>, _>("promotion_id")?
            .map(PromotionId::new),
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        book_id: BookId::new(row.try_get("book_id")?),
        quantity: to_u32(row.try_get("quantity")?, "quantity")?,
        unit_price: Money::new(row.try_get("unit_price")?),
    })
}

/// Locks the affected book rows in id order, checks every line, then
/// applies conditional decrements and records the reservation. Runs inside
/// the caller's transaction.
async fn reserve_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    lines: &[(BookId, u32)],
) -> Result<()> {
    // Duplicate lines for the same book are checked against their sum.
    let mut needed: BTreeMap<i64, i64> = BTreeMap::new();
    for (book_id, quantity) in lines {
        *needed.entry(book_id.value()).or_default() += i64::from(*quantity);
    }
    let ids: Vec<i64> = needed.keys().copied().collect();

    // Locking in id order keeps concurrent reservations deadlock-free.
    let rows = sqlx::query("SELECT id, stock FROM books WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await?;
    let mut stocks: HashMap<i64, i64> = HashMap::new();
    for row in &rows {
        stocks.insert(row.try_get("id")?, row.try_get("stock")?);
    }

    let mut short = Vec::new();
    for (id, quantity) in &needed {
        match stocks.get(id) {
            None => return Err(StoreError::BookNotFound(BookId::new(*id))),
            Some(stock) if stock < quantity => short.push(BookId::new(*id)),
            Some(_) => {}
        }
    }
    if !short.is_empty() {
        tracing::debug!(%order_id, ?short, "stock reservation rejected");
        return Err(StoreError::InsufficientStock { book_ids: short });
    }

    for (id, quantity) in &needed {
        let affected =
            sqlx::query("UPDATE books SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(id)
                .bind(quantity)
                .execute(&mut **tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return Err(StoreError::InsufficientStock {
                book_ids: vec![BookId::new(*id)],
            });
        }

        sqlx::query(
            "INSERT INTO stock_reservations (order_id, book_id, quantity) VALUES ($1, $2, $3)",
        )
        .bind(order_id.value())
        .bind(id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Consumes the order's active reservation, re-crediting each book.
/// Returns false if the reservation was already reversed.
async fn release_in_tx(tx: &mut Transaction<'_, Postgres>, order_id: OrderId) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE stock_reservations SET reversed_at = now() \
         WHERE order_id = $1 AND reversed_at IS NULL \
         RETURNING book_id, quantity",
    )
    .bind(order_id.value())
    .fetch_all(&mut **tx)
    .await?;

    if rows.is_empty() {
        return Ok(false);
    }
    for row in &rows {
        let book_id: i64 = row.try_get("book_id")?;
        let quantity: i64 = row.try_get("quantity")?;
        sqlx::query("UPDATE books SET stock = stock + $2 WHERE id = $1")
            .bind(book_id)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
    }
    Ok(true)
}

/// Loads the windows of promotions overlapping `range`, excluding one id.
/// Must run inside the same transaction as the write it validates.
async fn overlapping_windows_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    range: &DateRange,
    exclude: Option<PromotionId>,
) -> Result<Vec<PromotionWindow>> {
    let rows = sqlx::query(
        "SELECT p.id, p.start_date, p.end_date, pb.book_id \
         FROM promotions p \
         JOIN promotion_books pb ON pb.promotion_id = p.id \
         WHERE p.start_date <= $2 AND p.end_date >= $1 AND p.id <> COALESCE($3, -1) \
         ORDER BY p.id",
    )
    .bind(range.start())
    .bind(range.end())
    .bind(exclude.map(|id| id.value()))
    .fetch_all(&mut **tx)
    .await?;

    let mut windows: Vec<PromotionWindow> = Vec::new();
    for row in &rows {
        let id = PromotionId::new(row.try_get("id")?);
        let book_id = BookId::new(row.try_get("book_id")?);
        match windows.last_mut() {
            Some(last) if last.promotion_id == id => last.book_ids.push(book_id),
            _ => {
                let start: NaiveDate = row.try_get("start_date")?;
                let end: NaiveDate = row.try_get("end_date")?;
                windows.push(PromotionWindow {
                    promotion_id: id,
                    range: DateRange::new(start, end)
                        .map_err(|e| StoreError::Decode(e.to_string()))?,
                    book_ids: vec![book_id],
                });
            }
        }
    }
    Ok(windows)
}

/// Validates a draft against the committed state and writes it, all under
/// the promotion advisory lock.
async fn write_promotion_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: Option<PromotionId>,
    draft: &PromotionDraft,
) -> Result<PromotionId> {
    let range = draft.validate()?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(PROMOTION_WRITE_LOCK)
        .execute(&mut **tx)
        .await?;

    let windows = overlapping_windows_in_tx(tx, &range, id).await?;
    let hits = overlapping_windows(&range, &windows, id);
    let conflicts = conflicting_books(&draft.book_ids, &hits);
    if !conflicts.is_empty() {
        return Err(StoreError::PromotionConflict {
            book_ids: conflicts,
        });
    }

    let promotion_id = match id {
        Some(existing) => {
            let affected = sqlx::query(
                "UPDATE promotions SET name = $2, kind = $3, value = $4, \
                 start_date = $5, end_date = $6 WHERE id = $1",
            )
            .bind(existing.value())
            .bind(&draft.name)
            .bind(draft.kind.as_str())
            .bind(draft.value)
            .bind(draft.start_date)
            .bind(draft.end_date)
            .execute(&mut **tx)
            .await?
            .rows_affected();
            if affected == 0 {
                return Err(StoreError::PromotionNotFound(existing));
            }
            sqlx::query("DELETE FROM promotion_books WHERE promotion_id = $1")
                .bind(existing.value())
                .execute(&mut **tx)
                .await?;
            existing
        }
        None => {
            let new_id: i64 = sqlx::query_scalar(
                "INSERT INTO promotions (name, kind, value, start_date, end_date) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING id",
            )
            .bind(&draft.name)
            .bind(draft.kind.as_str())
            .bind(draft.value)
            .bind(draft.start_date)
            .bind(draft.end_date)
            .fetch_one(&mut **tx)
            .await?;
            PromotionId::new(new_id)
        }
    };

    for book_id in &draft.book_ids {
        sqlx::query("INSERT INTO promotion_books (promotion_id, book_id) VALUES ($1, $2)")
            .bind(promotion_id.value())
            .bind(book_id.value())
            .execute(&mut **tx)
            .await?;
    }
    Ok(promotion_id)
}

async fn fetch_status(pool: &PgPool, id: OrderId) -> Result<Option<OrderStatus>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(id.value())
        .fetch_optional(pool)
        .await?;
    match raw {
        Some(s) => Ok(Some(parse_status(&s)?)),
        None => Ok(None),
    }
}

#[async_trait]
impl BookStore for PostgresStore {
    async fn insert_book(&self, title: &str, price: Money, stock: u32) -> Result<Book> {
        let row = sqlx::query(
            "INSERT INTO books (title, price, stock) VALUES ($1, $2, $3) \
             RETURNING id, title, price, stock",
        )
        .bind(title)
        .bind(price.amount())
        .bind(i64::from(stock))
        .fetch_one(&self.pool)
        .await?;
        row_to_book(&row)
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT id, title, price, stock FROM books WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_book).transpose()
    }

    async fn list_books(&self) -> Result<Vec<Book>> {
        let rows = sqlx::query("SELECT id, title, price, stock FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_book).collect()
    }
}

#[async_trait]
impl StockLedger for PostgresStore {
    async fn reserve_stock(&self, order_id: OrderId, lines: &[(BookId, u32)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        reserve_in_tx(&mut tx, order_id, lines).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn release_stock(&self, order_id: OrderId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let released = release_in_tx(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(released)
    }
}

#[async_trait]
impl PromotionStore for PostgresStore {
    async fn insert_promotion(&self, draft: PromotionDraft) -> Result<Promotion> {
        let mut tx = self.pool.begin().await?;
        let id = write_promotion_in_tx(&mut tx, None, &draft).await?;
        tx.commit().await?;
        Ok(draft.into_promotion(id))
    }

    async fn update_promotion(&self, id: PromotionId, draft: PromotionDraft) -> Result<Promotion> {
        let mut tx = self.pool.begin().await?;
        write_promotion_in_tx(&mut tx, Some(id), &draft).await?;
        tx.commit().await?;
        Ok(draft.into_promotion(id))
    }

    async fn get_promotion(&self, id: PromotionId) -> Result<Option<Promotion>> {
        let row = sqlx::query(
            "SELECT id, name, kind, value, start_date, end_date FROM promotions WHERE id = $1",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };

        let book_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT book_id FROM promotion_books WHERE promotion_id = $1 ORDER BY book_id",
        )
        .bind(id.value())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(promotion_from_row(&row, book_ids)?))
    }

    async fn list_promotions(&self) -> Result<Vec<Promotion>> {
        let rows = sqlx::query(
            "SELECT id, name, kind, value, start_date, end_date FROM promotions ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let book_rows = sqlx::query(
            "SELECT promotion_id, book_id FROM promotion_books ORDER BY promotion_id, book_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut books_by_promotion: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in &book_rows {
            let promotion_id: i64 = row.try_get("promotion_id")?;
            let book_id: i64 = row.try_get("book_id")?;
            books_by_promotion.entry(promotion_id).or_default().push(book_id);
        }

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                promotion_from_row(row, books_by_promotion.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn promotion_windows(
        &self,
        exclude: Option<PromotionId>,
    ) -> Result<Vec<PromotionWindow>> {
        let promotions = self.list_promotions().await?;
        Ok(promotions
            .iter()
            .filter(|p| Some(p.id) != exclude)
            .map(Promotion::window)
            .collect())
    }
}

fn promotion_from_row(row: &PgRow, book_ids: Vec<i64>) -> Result<Promotion> {
    let kind: String = row.try_get("kind")?;
    let kind = match kind.as_str() {
        "percent" => domain::DiscountKind::Percent,
        "fixed" => domain::DiscountKind::Fixed,
        other => return Err(StoreError::Decode(format!("unknown discount kind: {other}"))),
    };
    Ok(Promotion {
        id: PromotionId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        kind,
        value: row.try_get("value")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        book_ids: book_ids.into_iter().map(BookId::new).collect(),
    })
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO orders (customer_name, customer_phone, shipping_address, \
             payment_method, status, total_amount, discount_amount, final_amount, promotion_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, customer_name, customer_phone, shipping_address, payment_method, \
             status, total_amount, discount_amount, final_amount, promotion_id, created_at",
        )
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.shipping_address)
        .bind(&order.payment_method)
        .bind(OrderStatus::Pending.as_str())
        .bind(order.total_amount.amount())
        .bind(order.discount_amount.amount())
        .bind(order.final_amount.amount())
        .bind(order.promotion_id.map(|id| id.value()))
        .fetch_one(&mut *tx)
        .await?;
        let id = OrderId::new(row.try_get("id")?);

        let line_quantities: Vec<(BookId, u32)> = order
            .lines
            .iter()
            .map(|line| (line.book_id, line.quantity))
            .collect();
        reserve_in_tx(&mut tx, id, &line_quantities).await?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, book_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (order_id, book_id) \
                 DO UPDATE SET quantity = order_lines.quantity + EXCLUDED.quantity",
            )
            .bind(id.value())
            .bind(line.book_id.value())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.amount())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        row_to_order(&row, order.lines)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, customer_name, customer_phone, shipping_address, payment_method, \
             status, total_amount, discount_amount, final_amount, promotion_id, created_at \
             FROM orders WHERE id = $1",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else { return Ok(None) };

        let line_rows = sqlx::query(
            "SELECT book_id, quantity, unit_price FROM order_lines \
             WHERE order_id = $1 ORDER BY book_id",
        )
        .bind(id.value())
        .fetch_all(&self.pool)
        .await?;
        let lines = line_rows.iter().map(row_to_line).collect::<Result<Vec<_>>>()?;

        Ok(Some(row_to_order(&row, lines)?))
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT id, customer_name, customer_phone, shipping_address, payment_method, \
             status, total_amount, discount_amount, final_amount, promotion_id, created_at \
             FROM orders ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let line_rows = sqlx::query(
            "SELECT order_id, book_id, quantity, unit_price FROM order_lines \
             ORDER BY order_id, book_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut lines_by_order: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let order_id: i64 = row.try_get("order_id")?;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(row_to_line(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: i64 = row.try_get("id")?;
                row_to_order(row, lines_by_order.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn transition_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool> {
        let affected = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id.value())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 1 {
            return Ok(true);
        }
        match fetch_status(&self.pool, id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::OrderNotFound(id)),
        }
    }

    async fn cancel_order(&self, id: OrderId, from: OrderStatus) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let affected =
            sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
                .bind(id.value())
                .bind(from.as_str())
                .bind(OrderStatus::Cancelled.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return match fetch_status(&self.pool, id).await? {
                Some(_) => Ok(false),
                None => Err(StoreError::OrderNotFound(id)),
            };
        }
        release_in_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl AssignmentStore for PostgresStore {
    async fn assign_shipper(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment> {
        let mut tx = self.pool.begin().await?;

        let affected =
            sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
                .bind(order_id.value())
                .bind(OrderStatus::Confirmed.as_str())
                .bind(OrderStatus::Delivering.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return match fetch_status(&self.pool, order_id).await? {
                Some(current) => Err(StoreError::StatusConflict { order_id, current }),
                None => Err(StoreError::OrderNotFound(order_id)),
            };
        }

        let busy: Option<i64> = sqlx::query_scalar(
            "SELECT order_id FROM shipper_assignments \
             WHERE shipper_id = $1 AND completed_at IS NULL",
        )
        .bind(shipper_id.value())
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(busy_with) = busy {
            return Err(StoreError::ShipperUnavailable {
                shipper_id,
                busy_with: OrderId::new(busy_with),
            });
        }

        let insert = sqlx::query(
            "INSERT INTO shipper_assignments (order_id, shipper_id) VALUES ($1, $2) \
             RETURNING order_id, shipper_id, assigned_at, completed_at",
        )
        .bind(order_id.value())
        .bind(shipper_id.value())
        .fetch_one(&mut *tx)
        .await;

        let row = match insert {
            Ok(row) => row,
            // A concurrent assignment won the partial unique index race.
            Err(sqlx::Error::Database(db))
                if db.constraint() == Some("active_assignment_per_shipper")
                    || db.constraint() == Some("active_assignment_per_order") =>
            {
                let busy: Option<i64> = sqlx::query_scalar(
                    "SELECT order_id FROM shipper_assignments \
                     WHERE shipper_id = $1 AND completed_at IS NULL",
                )
                .bind(shipper_id.value())
                .fetch_optional(&self.pool)
                .await?;
                return Err(StoreError::ShipperUnavailable {
                    shipper_id,
                    busy_with: busy.map(OrderId::new).unwrap_or(order_id),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        row_to_assignment(&row)
    }

    async fn unassign_shipper(&self, order_id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            "DELETE FROM shipper_assignments WHERE order_id = $1 AND completed_at IS NULL",
        )
        .bind(order_id.value())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if removed == 0 {
            return Err(StoreError::AssignmentNotFound(order_id));
        }

        let affected =
            sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
                .bind(order_id.value())
                .bind(OrderStatus::Delivering.as_str())
                .bind(OrderStatus::Confirmed.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return match fetch_status(&self.pool, order_id).await? {
                Some(current) => Err(StoreError::StatusConflict { order_id, current }),
                None => Err(StoreError::OrderNotFound(order_id)),
            };
        }

        tx.commit().await?;
        Ok(())
    }

    async fn complete_delivery(
        &self,
        order_id: OrderId,
        shipper_id: ShipperId,
    ) -> Result<ShipperAssignment> {
        let mut tx = self.pool.begin().await?;

        let active = sqlx::query(
            "SELECT id, shipper_id FROM shipper_assignments \
             WHERE order_id = $1 AND completed_at IS NULL FOR UPDATE",
        )
        .bind(order_id.value())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(active) = active else {
            return Err(StoreError::AssignmentNotFound(order_id));
        };
        let assignment_id: i64 = active.try_get("id")?;
        let assigned_to: i64 = active.try_get("shipper_id")?;
        if assigned_to != shipper_id.value() {
            return Err(StoreError::NotAssignedShipper {
                order_id,
                shipper_id,
            });
        }

        let row = sqlx::query(
            "UPDATE shipper_assignments SET completed_at = now() WHERE id = $1 \
             RETURNING order_id, shipper_id, assigned_at, completed_at",
        )
        .bind(assignment_id)
        .fetch_one(&mut *tx)
        .await?;

        let affected =
            sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
                .bind(order_id.value())
                .bind(OrderStatus::Delivering.as_str())
                .bind(OrderStatus::Delivered.as_str())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if affected == 0 {
            return match fetch_status(&self.pool, order_id).await? {
                Some(current) => Err(StoreError::StatusConflict { order_id, current }),
                None => Err(StoreError::OrderNotFound(order_id)),
            };
        }

        tx.commit().await?;
        row_to_assignment(&row)
    }

    async fn active_assignment(&self, order_id: OrderId) -> Result<Option<ShipperAssignment>> {
        let row = sqlx::query(
            "SELECT order_id, shipper_id, assigned_at, completed_at FROM shipper_assignments \
             WHERE order_id = $1 AND completed_at IS NULL",
        )
        .bind(order_id.value())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_assignment).transpose()
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, name: &str, role: Role, phone: &str) -> Result<User> {
        let row = sqlx::query(
            "INSERT INTO users (name, role, phone) VALUES ($1, $2, $3) \
             RETURNING id, name, role, phone",
        )
        .bind(name)
        .bind(role.as_str())
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        row_to_user(&row)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, role, phone FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn list_shippers(&self) -> Result<Vec<User>> {
        let rows = sqlx::query("SELECT id, name, role, phone FROM users WHERE role = $1 ORDER BY id")
            .bind(Role::Shipper.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_user).collect()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query("SELECT id, name, role, phone FROM users WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(&self, id: UserId, name: &str, role: Role, phone: &str) -> Result<User> {
        let row = sqlx::query(
            "UPDATE users SET name = $2, role = $3, phone = $4 WHERE id = $1 \
             RETURNING id, name, role, phone",
        )
        .bind(id.value())
        .bind(name)
        .bind(role.as_str())
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_user(&row),
            None => Err(StoreError::UserNotFound(id)),
        }
    }
}
