#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use tessera_orm::{Database, DatabaseConfig, DatabaseValue};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL DEFAULT 'member',
        email_verified_at TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE plans (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        price REAL NOT NULL DEFAULT 0,
        credits INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        sort_order INTEGER NOT NULL DEFAULT 0,
        features TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
    "CREATE TABLE credit_transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        amount INTEGER NOT NULL,
        type TEXT NOT NULL,
        description TEXT,
        metadata TEXT,
        created_at TEXT,
        updated_at TEXT
    )",
];

/// Route `RUST_LOG`-filtered output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Formatted log output collected in memory
#[derive(Clone, Default)]
pub struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    /// SQL text of every statement the connection manager ran, in order
    pub fn statements(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter_map(|line| {
                ["Executing SQL: ", "Fetching SQL: "]
                    .iter()
                    .find_map(|marker| line.split_once(marker).map(|(_, sql)| sql.to_string()))
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().expect("log buffer").clear();
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture the crate's debug logs on this thread until the guard drops.
/// Tests using it must run on the current-thread runtime.
pub fn capture_sql() -> (CapturedLog, DefaultGuard) {
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("tessera_orm=debug"))
        .with_writer(log.clone())
        .with_ansi(false)
        .without_time()
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (log, guard)
}

/// Fresh in-memory database with the `users`, `plans` and
/// `credit_transactions` tables
pub async fn memory_db() -> Database {
    init_tracing();
    let db = Database::new(DatabaseConfig::in_memory()).expect("valid in-memory config");
    for statement in SCHEMA {
        db.execute(statement, &[]).await.expect("schema statement");
    }
    db
}

pub async fn insert_user(db: &Database, name: &str, email: &str, role: &str) -> i64 {
    db.execute(
        "INSERT INTO users (name, email, role) VALUES (?, ?, ?)",
        &[name.into(), email.into(), role.into()],
    )
    .await
    .expect("insert user")
    .last_insert_id
    .expect("generated id")
}

pub async fn insert_plan(db: &Database, slug: &str, active: bool, sort_order: i64) -> i64 {
    db.execute(
        "INSERT INTO plans (name, slug, price, is_active, sort_order) VALUES (?, ?, ?, ?, ?)",
        &[
            slug.to_uppercase().into(),
            slug.into(),
            DatabaseValue::Float64(9.5),
            active.into(),
            sort_order.into(),
        ],
    )
    .await
    .expect("insert plan")
    .last_insert_id
    .expect("generated id")
}

pub async fn insert_transaction(db: &Database, user_id: i64, amount: i64, kind: &str, created_at: &str) -> i64 {
    db.execute(
        "INSERT INTO credit_transactions (user_id, amount, type, created_at) VALUES (?, ?, ?, ?)",
        &[user_id.into(), amount.into(), kind.into(), created_at.into()],
    )
    .await
    .expect("insert transaction")
    .last_insert_id
    .expect("generated id")
}
