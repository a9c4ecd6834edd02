use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

// Database connection manager
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    // Create a new database connection pool and make sure the schema exists.
    // WAL keeps readers off the writer's back; busy_timeout bounds how long
    // a writer waits for the exclusive lock before the call errors out.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        create_schema(&pool).await?;

        Ok(Database { pool })
    }

    // Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// Bootstrap the schema. The CHECK constraints on flight back up the seat
// invariant; services must not rely on them for control flow.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let tables = vec![
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user'
        )",
        "CREATE TABLE IF NOT EXISTS flight (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            flight_number TEXT NOT NULL,
            origin TEXT NOT NULL,
            destination TEXT NOT NULL,
            departure_time TEXT NOT NULL,
            arrival_time TEXT NOT NULL,
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            total_seats INTEGER NOT NULL CHECK (total_seats >= 0),
            available_seats INTEGER NOT NULL,
            CHECK (available_seats >= 0),
            CHECK (available_seats <= total_seats)
        )",
        "CREATE TABLE IF NOT EXISTS ticket (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES user (id),
            flight_id INTEGER NOT NULL REFERENCES flight (id),
            confirmation_id TEXT NOT NULL UNIQUE,
            status TEXT NOT NULL DEFAULT 'booked',
            price_cents INTEGER NOT NULL,
            booked_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS payment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES user (id),
            flight_id INTEGER NOT NULL REFERENCES flight (id),
            ticket_id INTEGER UNIQUE REFERENCES ticket (id),
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL DEFAULT 'USD',
            provider TEXT NOT NULL DEFAULT 'mock',
            provider_intent_id TEXT NOT NULL UNIQUE,
            idempotency_key TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            UNIQUE (user_id, idempotency_key)
        )",
        "CREATE INDEX IF NOT EXISTS idx_ticket_flight ON ticket (flight_id)",
        "CREATE INDEX IF NOT EXISTS idx_ticket_user ON ticket (user_id)",
        "CREATE INDEX IF NOT EXISTS idx_ticket_status ON ticket (status)",
        "CREATE INDEX IF NOT EXISTS idx_payment_flight ON payment (flight_id)",
        "CREATE INDEX IF NOT EXISTS idx_payment_user ON payment (user_id)",
        "CREATE INDEX IF NOT EXISTS idx_payment_status ON payment (status)",
    ];

    for create_sql in tables {
        sqlx::query(create_sql).execute(pool).await?;
    }

    Ok(())
}
