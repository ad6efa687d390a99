use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    BookingFilter, BookingRepository, DatabaseError, DbResult, HealthCheckRepository, LeaseFilter,
    LeaseRepository, ListingRepository, UserRepository,
};
use crate::models::{
    Booking, BookingStatus, Lease, LeaseStatus, Listing, ListingStatus, Occupancy, PasswordReset, User,
};

const LISTING_COLUMNS: &str =
    "id, owner_id, title, address, description, price, amenities, images, status, created_at, updated_at";
const BOOKING_COLUMNS: &str =
    "id, tenant_id, listing_id, start_date, end_date, rent_amount, status, created_at, updated_at";
const LEASE_COLUMNS: &str =
    "id, tenant_id, listing_id, booking_id, start_date, end_date, rent_amount, status, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// PostgreSQL-backed repositories
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations onto domain-level conflicts
fn map_write_error(err: sqlx::Error, what: &str) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DatabaseError::Conflict(format!("{} already exists", what));
        }
        if db.is_foreign_key_violation() {
            return DatabaseError::Conflict(format!("{} is referenced by or references a missing record", what));
        }
    }
    DatabaseError::Sqlx(err)
}

fn parse_status<T: std::str::FromStr<Err = crate::models::UnknownStatus>>(value: &str) -> DbResult<T> {
    value.parse().map_err(|e: crate::models::UnknownStatus| DatabaseError::Decode(e.to_string()))
}

#[derive(FromRow)]
struct ListingRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    address: String,
    description: String,
    price: Decimal,
    amenities: Vec<String>,
    images: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = DatabaseError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Listing {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            address: row.address,
            description: row.description,
            price: row.price,
            amenities: row.amenities.into_iter().collect(),
            images: row.images,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    tenant_id: Uuid,
    listing_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    rent_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DatabaseError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            tenant_id: row.tenant_id,
            listing_id: row.listing_id,
            start_date: row.start_date,
            end_date: row.end_date,
            rent_amount: row.rent_amount,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct LeaseRow {
    id: Uuid,
    tenant_id: Uuid,
    listing_id: Uuid,
    booking_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    rent_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeaseRow> for Lease {
    type Error = DatabaseError;

    fn try_from(row: LeaseRow) -> Result<Self, Self::Error> {
        Ok(Lease {
            id: row.id,
            tenant_id: row.tenant_id,
            listing_id: row.listing_id,
            booking_id: row.booking_id,
            start_date: row.start_date,
            end_date: row.end_date,
            rent_amount: row.rent_amount,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_status(&row.role)?,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> DbResult<Vec<T>>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait]
impl HealthCheckRepository for PgStore {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl ListingRepository for PgStore {
    async fn insert(&self, listing: &Listing) -> DbResult<()> {
        let amenities: Vec<String> = listing.amenities.iter().cloned().collect();
        sqlx::query(
            r#"
            INSERT INTO listings
                (id, owner_id, title, address, description, price, amenities, images, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(listing.id)
        .bind(listing.owner_id)
        .bind(&listing.title)
        .bind(&listing.address)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&amenities)
        .bind(&listing.images)
        .bind(listing.status.as_str())
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "listing"))?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Listing>> {
        let sql = format!("SELECT {} FROM listings WHERE id = $1", LISTING_COLUMNS);
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Listing::try_from).transpose()
    }

    async fn list(&self, status: Option<ListingStatus>) -> DbResult<Vec<Listing>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM listings", LISTING_COLUMNS));
        if let Some(status) = status {
            qb.push(" WHERE status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at, id");
        let rows = qb.build_query_as::<ListingRow>().fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn update(&self, listing: &Listing) -> DbResult<()> {
        let amenities: Vec<String> = listing.amenities.iter().cloned().collect();
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET title = $2, address = $3, description = $4, price = $5,
                amenities = $6, images = $7, status = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(listing.id)
        .bind(&listing.title)
        .bind(&listing.address)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&amenities)
        .bind(&listing.images)
        .bind(listing.status.as_str())
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("listing {}", listing.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "listing"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert(&self, booking: &Booking) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, tenant_id, listing_id, start_date, end_date, rent_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(booking.id)
        .bind(booking.tenant_id)
        .bind(booking.listing_id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.rent_amount)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "booking"))?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn list(&self, filter: BookingFilter) -> DbResult<Vec<Booking>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bookings WHERE TRUE", BOOKING_COLUMNS));
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND tenant_id = ").push_bind(tenant_id);
        }
        if let Some(listing_id) = filter.listing_id {
            qb.push(" AND listing_id = ").push_bind(listing_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at, id");
        let rows = qb.build_query_as::<BookingRow>().fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn update(&self, booking: &Booking) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET start_date = $2, end_date = $3, rent_amount = $4, status = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.rent_amount)
        .bind(booking.status.as_str())
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("booking {}", booking.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "booking"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl LeaseRepository for PgStore {
    async fn create_from_booking(&self, lease: &Lease) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the booking row so two concurrent creations serialize here
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(lease.booking_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound(format!("booking {}", lease.booking_id)));
        }

        sqlx::query(
            r#"
            INSERT INTO leases
                (id, tenant_id, listing_id, booking_id, start_date, end_date, rent_amount, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(lease.id)
        .bind(lease.tenant_id)
        .bind(lease.listing_id)
        .bind(lease.booking_id)
        .bind(lease.start_date)
        .bind(lease.end_date)
        .bind(lease.rent_amount)
        .bind(lease.status.as_str())
        .bind(lease.created_at)
        .bind(lease.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "lease for this booking"))?;

        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(lease.booking_id)
            .bind(BookingStatus::Approved.as_str())
            .bind(lease.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<Lease>> {
        let sql = format!("SELECT {} FROM leases WHERE id = $1", LEASE_COLUMNS);
        let row = sqlx::query_as::<_, LeaseRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lease::try_from).transpose()
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DbResult<Option<Lease>> {
        let sql = format!("SELECT {} FROM leases WHERE booking_id = $1", LEASE_COLUMNS);
        let row = sqlx::query_as::<_, LeaseRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Lease::try_from).transpose()
    }

    async fn list(&self, filter: LeaseFilter) -> DbResult<Vec<Lease>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM leases WHERE TRUE", LEASE_COLUMNS));
        if let Some(tenant_id) = filter.tenant_id {
            qb.push(" AND tenant_id = ").push_bind(tenant_id);
        }
        if let Some(listing_id) = filter.listing_id {
            qb.push(" AND listing_id = ").push_bind(listing_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at, id");
        let rows = qb.build_query_as::<LeaseRow>().fetch_all(&self.pool).await?;
        convert_all(rows)
    }

    async fn save_if_status(&self, lease: &Lease, expected: LeaseStatus) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Writers that change occupancy serialize on the listing row
        let occupancy = Occupancy::between(expected, lease.status);
        let listing_status = if occupancy == Occupancy::Unchanged {
            None
        } else {
            let row: Option<(String,)> = sqlx::query_as("SELECT status FROM listings WHERE id = $1 FOR UPDATE")
                .bind(lease.listing_id)
                .fetch_optional(&mut *tx)
                .await?;
            match row {
                Some((status,)) => Some(parse_status::<ListingStatus>(&status)?),
                None => return Err(DatabaseError::NotFound(format!("listing {}", lease.listing_id))),
            }
        };

        let result = sqlx::query(
            r#"
            UPDATE leases
            SET start_date = $3, end_date = $4, rent_amount = $5, status = $6, updated_at = $7
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(lease.id)
        .bind(expected.as_str())
        .bind(lease.start_date)
        .bind(lease.end_date)
        .bind(lease.rent_amount)
        .bind(lease.status.as_str())
        .bind(lease.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "occupying lease for this listing"))?;

        if result.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM leases WHERE id = $1")
                .bind(lease.id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match exists {
                Some(_) => Ok(false),
                None => Err(DatabaseError::NotFound(format!("lease {}", lease.id))),
            };
        }

        if let Some(current) = listing_status {
            let (other_occupying,): (bool,) = sqlx::query_as(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM leases
                    WHERE listing_id = $1 AND id <> $2 AND status IN ('active', 'expiring_soon')
                )
                "#,
            )
            .bind(lease.listing_id)
            .bind(lease.id)
            .fetch_one(&mut *tx)
            .await?;

            if occupancy == Occupancy::Begins {
                let reason = if other_occupying {
                    Some("is already leased")
                } else if current == ListingStatus::Unavailable {
                    Some("is unavailable")
                } else {
                    None
                };
                if let Some(reason) = reason {
                    tx.rollback().await?;
                    return Err(DatabaseError::Conflict(format!("listing {} {}", lease.listing_id, reason)));
                }
            }

            if let Some(status) = occupancy.listing_status(current, other_occupying) {
                sqlx::query("UPDATE listings SET status = $2, updated_at = $3 WHERE id = $1")
                    .bind(lease.listing_id)
                    .bind(status.as_str())
                    .bind(lease.updated_at)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM leases WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "email"))?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn insert_password_reset(&self, reset: &PasswordReset) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO password_resets (token_hash, user_id, expires_at, used_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&reset.token_hash)
        .bind(reset.user_id)
        .bind(reset.expires_at)
        .bind(reset.used_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "password reset"))?;
        Ok(())
    }

    async fn consume_password_reset(&self, token_hash: &str, now: DateTime<Utc>) -> DbResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE password_resets
            SET used_at = $2
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(user_id,)| user_id))
    }
}
