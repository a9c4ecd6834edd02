use chrono::{DateTime, Duration, Utc};
use flight_ticketing_system::db::create_schema;
use flight_ticketing_system::models::user::{Role, UserRegistrationRequest};
use flight_ticketing_system::services::user_service::UserService;
use flight_ticketing_system::utils::error::AppError;
use once_cell::sync::OnceCell;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool as Pool, SqlitePoolOptions};
use sqlx::Error;
use std::path::Path;
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

static TEST_DB: OnceCell<Mutex<Option<TestDb>>> = OnceCell::new();

#[macro_export]
macro_rules! test_println {
    ($test:expr, $($arg:tt)*) => {
        println!("[{}] {}", $test, format!($($arg)*))
    };
}

#[derive(Debug)]
pub struct TestDb {
    pub pool: Pool,
    pub db_path: String,
}

impl TestDb {
    // Get the database instance - one fresh SQLite file per test binary,
    // shared by every test in the run.
    pub async fn get_instance(test_file: &str) -> Result<Pool, Error> {
        std::env::set_var("JWT_SECRET", "test-secret");

        let test_db = TEST_DB.get_or_init(|| Mutex::new(None));
        let mut guard = test_db.lock().await;

        if let Some(db) = guard.as_ref() {
            return Ok(db.pool.clone());
        }

        let db = Self::setup_database(test_file).await?;
        let pool = db.pool.clone();
        *guard = Some(db);
        Ok(pool)
    }

    async fn setup_database(test_file: &str) -> Result<Self, Error> {
        let stem = Path::new(test_file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("test");
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let db_path = std::env::temp_dir()
            .join(format!("flight_ticketing_{}_{}.db", stem, timestamp))
            .to_string_lossy()
            .into_owned();

        // Same options as the application pool: WAL plus a bounded
        // busy_timeout, so contention behaves like production.
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(StdDuration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        create_schema(&pool).await?;

        Ok(Self { pool, db_path })
    }

    // Teardown after the whole test run; best-effort since the runtime is
    // already gone when #[dtor] fires.
    pub fn cleanup_database_sync() -> std::io::Result<()> {
        if let Some(test_db) = TEST_DB.get() {
            if let Ok(guard) = test_db.try_lock() {
                if let Some(db) = guard.as_ref() {
                    for suffix in ["", "-wal", "-shm"] {
                        let _ = std::fs::remove_file(format!("{}{}", db.db_path, suffix));
                    }
                }
            }
        }
        Ok(())
    }
}

// Insert a flight directly; tests drive seat state through the services.
pub async fn seed_flight(
    pool: &Pool,
    flight_number: &str,
    total_seats: i32,
    price_cents: i64,
    departure_time: DateTime<Utc>,
) -> Result<i64, Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO flight
            (flight_number, origin, destination, departure_time, arrival_time,
             price_cents, total_seats, available_seats)
         VALUES (?, 'New York', 'London', ?, ?, ?, ?, ?)
         RETURNING id",
    )
    .bind(flight_number)
    .bind(departure_time)
    .bind(departure_time + Duration::hours(7))
    .bind(price_cents)
    .bind(total_seats)
    .bind(total_seats)
    .fetch_one(pool)
    .await
}

pub async fn register_test_user(
    user_service: &UserService,
    username: &str,
    role: Role,
) -> Result<i64, AppError> {
    user_service
        .register_user(UserRegistrationRequest {
            username: username.to_string(),
            password: "test_password".to_string(),
            role,
        })
        .await
}

pub async fn available_seats(pool: &Pool, flight_id: i64) -> Result<i32, Error> {
    sqlx::query_scalar("SELECT available_seats FROM flight WHERE id = ?")
        .bind(flight_id)
        .fetch_one(pool)
        .await
}

// Core accounting identity: booked tickets plus pending holds equal the
// seats taken out of inventory. (Does not hold after a late, no-refund
// cancellation, which consumes a seat without a booked ticket.)
pub async fn assert_seat_invariant(pool: &Pool, flight_id: i64) -> Result<(), Error> {
    let (total, available): (i32, i32) =
        sqlx::query_as("SELECT total_seats, available_seats FROM flight WHERE id = ?")
            .bind(flight_id)
            .fetch_one(pool)
            .await?;

    let booked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM ticket WHERE flight_id = ? AND status = 'booked'",
    )
    .bind(flight_id)
    .fetch_one(pool)
    .await?;

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM payment WHERE flight_id = ? AND status = 'pending'",
    )
    .bind(flight_id)
    .fetch_one(pool)
    .await?;

    assert!(available >= 0, "available_seats went negative");
    assert!(
        available <= total,
        "available_seats exceeded total_seats"
    );
    assert_eq!(
        booked + pending,
        (total - available) as i64,
        "booked tickets + pending holds must equal consumed seats"
    );

    Ok(())
}
