//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::LoanStatus,
        loan::{CreateLoan, Loan, LoanDetails, LoanQuery, LoanStats},
    },
};

/// Columns accepted by the list sort parameter
const SORT_COLUMNS: &[(&str, &str)] = &[
    ("loan_date", "l.loan_date"),
    ("expected_return_date", "l.expected_return_date"),
    ("borrower_name", "l.borrower_name"),
    ("status", "l.status"),
];

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Get loan by ID with a row lock
    pub async fn get_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Number of open loans referencing an equipment item.
    ///
    /// Used for the invariant check: an item marked available must have
    /// zero open loans, an item on loan exactly one.
    pub async fn count_open_for_equipment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        equipment_id: i32,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE equipment_id = $1 AND status IN (0, 1)",
        )
        .bind(equipment_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    /// Insert a new loan in Active state
    pub async fn insert(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        data: &CreateLoan,
        loan_date: DateTime<Utc>,
        created_by: i32,
    ) -> AppResult<Loan> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (equipment_id, borrower_name, borrower_phone, borrower_email,
                               borrower_address, loan_date, expected_return_date, status,
                               notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(data.equipment_id)
        .bind(&data.borrower.name)
        .bind(&data.borrower.phone)
        .bind(&data.borrower.email)
        .bind(&data.borrower.address)
        .bind(loan_date)
        .bind(data.expected_return_date)
        .bind(i16::from(LoanStatus::Active))
        .bind(&data.notes)
        .bind(created_by)
        .fetch_one(&mut **tx)
        .await?;
        Ok(loan)
    }

    /// Close a loan: move it to a terminal status, recording the return
    /// date or the cancellation reason.
    pub async fn close(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        status: LoanStatus,
        actual_return_date: Option<DateTime<Utc>>,
        cancel_reason: Option<&str>,
    ) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET status = $1, actual_return_date = $2, cancel_reason = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(i16::from(status))
        .bind(actual_return_date)
        .bind(cancel_reason)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    /// Delete a terminal loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan {} not found", id)));
        }
        Ok(())
    }

    /// Paginated, filtered loan list joined with equipment display fields
    pub async fn list(&self, query: &LoanQuery) -> AppResult<(Vec<LoanDetails>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let (where_clause, search) = Self::filter_clause(query)?;
        let order = Self::order_clause(query);

        let count_sql = format!(
            "SELECT COUNT(*) FROM loans l JOIN equipment e ON l.equipment_id = e.id {}",
            where_clause
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(ref pattern) = search {
            count_query = count_query.bind(pattern.clone());
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let limit_idx = if search.is_some() { 2 } else { 1 };
        let rows_sql = format!(
            r#"
            SELECT l.*, e.name AS equipment_name, e.serial_number AS equipment_serial
            FROM loans l
            JOIN equipment e ON l.equipment_id = e.id
            {}
            ORDER BY {}
            LIMIT ${} OFFSET ${}
            "#,
            where_clause,
            order,
            limit_idx,
            limit_idx + 1
        );
        let mut rows_query = sqlx::query(&rows_sql);
        if let Some(ref pattern) = search {
            rows_query = rows_query.bind(pattern.clone());
        }
        let rows = rows_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let now = Utc::now();
        let loans = rows.iter().map(|row| Self::row_to_details(row, now)).collect();

        Ok((loans, total))
    }

    /// Full filtered set for export, no pagination
    pub async fn list_for_export(&self, query: &LoanQuery) -> AppResult<Vec<LoanDetails>> {
        let (where_clause, search) = Self::filter_clause(query)?;
        let order = Self::order_clause(query);

        let rows_sql = format!(
            r#"
            SELECT l.*, e.name AS equipment_name, e.serial_number AS equipment_serial
            FROM loans l
            JOIN equipment e ON l.equipment_id = e.id
            {}
            ORDER BY {}
            "#,
            where_clause, order
        );
        let mut rows_query = sqlx::query(&rows_sql);
        if let Some(ref pattern) = search {
            rows_query = rows_query.bind(pattern.clone());
        }
        let rows = rows_query.fetch_all(&self.pool).await?;

        let now = Utc::now();
        Ok(rows.iter().map(|row| Self::row_to_details(row, now)).collect())
    }

    /// Aggregate counts per reported status
    pub async fn stats(&self) -> AppResult<LoanStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 0 AND expected_return_date >= NOW()) AS pending,
                   COUNT(*) FILTER (WHERE status = 1 AND expected_return_date >= NOW()) AS active,
                   COUNT(*) FILTER (WHERE status IN (0, 1) AND expected_return_date < NOW()) AS overdue,
                   COUNT(*) FILTER (WHERE status = 2) AS returned,
                   COUNT(*) FILTER (WHERE status = 3) AS cancelled
            FROM loans
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(LoanStats {
            total: row.get("total"),
            pending: row.get("pending"),
            active: row.get("active"),
            overdue: row.get("overdue"),
            returned: row.get("returned"),
            cancelled: row.get("cancelled"),
        })
    }

    /// WHERE clause plus the optional bound search pattern ($1).
    ///
    /// Status buckets follow the reported status: `overdue` matches open
    /// loans past their date, `active`/`pending` only those still in time.
    fn filter_clause(query: &LoanQuery) -> AppResult<(String, Option<String>)> {
        let mut conditions: Vec<String> = Vec::new();

        if let Some(ref status) = query.status {
            let status: LoanStatus = status
                .parse()
                .map_err(AppError::Validation)?;
            let condition = match status {
                LoanStatus::Pending => "l.status = 0 AND l.expected_return_date >= NOW()",
                LoanStatus::Active => "l.status = 1 AND l.expected_return_date >= NOW()",
                LoanStatus::Overdue => "l.status IN (0, 1) AND l.expected_return_date < NOW()",
                LoanStatus::Returned => "l.status = 2",
                LoanStatus::Cancelled => "l.status = 3",
            };
            conditions.push(condition.to_string());
        }

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        if search.is_some() {
            conditions.push(
                "(l.borrower_name ILIKE $1 OR l.borrower_phone ILIKE $1 \
                 OR e.name ILIKE $1 OR e.serial_number ILIKE $1)"
                    .to_string(),
            );
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        Ok((clause, search))
    }

    /// ORDER BY clause from whitelisted sort parameters
    fn order_clause(query: &LoanQuery) -> String {
        let column = query
            .sort_by
            .as_deref()
            .and_then(|name| {
                SORT_COLUMNS
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, col)| *col)
            })
            .unwrap_or("l.loan_date");
        let direction = match query.sort_order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        };
        format!("{} {}", column, direction)
    }

    fn row_to_details(row: &sqlx::postgres::PgRow, now: DateTime<Utc>) -> LoanDetails {
        let status = LoanStatus::from(row.get::<i16, _>("status"));
        let expected_return_date: DateTime<Utc> = row.get("expected_return_date");
        let reported = if status.is_open() && expected_return_date < now {
            LoanStatus::Overdue
        } else {
            status
        };
        LoanDetails {
            id: row.get("id"),
            equipment_id: row.get("equipment_id"),
            equipment_name: row.get("equipment_name"),
            equipment_serial: row.get("equipment_serial"),
            borrower_name: row.get("borrower_name"),
            borrower_phone: row.get("borrower_phone"),
            borrower_email: row.get("borrower_email"),
            loan_date: row.get("loan_date"),
            expected_return_date,
            actual_return_date: row.get("actual_return_date"),
            status: reported,
            cancel_reason: row.get("cancel_reason"),
            notes: row.get("notes"),
        }
    }
}
