use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, SqlitePool};

/// Connect to `DATABASE_URL` and apply pending migrations.
pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
	let pool = connect(&database_url).await?;

	sqlx::migrate!()
		.run(&pool)
		.await
		.context("failed to run migrations")?;

	tracing::info!("database ready");
	Ok(pool)
}

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.with_context(|| format!("invalid database url {database_url}"))?
		.create_if_missing(true);
	connect_with(options).await
}

/// WAL, foreign keys and a busy timeout, so the request path and the
/// activity listener wait on each other instead of failing.
pub fn tuned(options: SqliteConnectOptions) -> SqliteConnectOptions {
	options
		.journal_mode(SqliteJournalMode::Wal)
		.foreign_keys(true)
		.busy_timeout(Duration::from_secs(5))
}

pub async fn connect_with(options: SqliteConnectOptions) -> anyhow::Result<SqlitePool> {
	let filename = options.clone().get_filename().display().to_string();
	SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect_with(tuned(options))
		.await
		.with_context(|| format!("failed to connect to {filename}"))
}

/// A write transaction opened with `BEGIN IMMEDIATE`.
///
/// The write lock is taken up front, so a transaction that reads before it
/// writes never has to upgrade its lock. Dropping without [`WriteTx::commit`]
/// rolls back before the connection is reused.
pub struct WriteTx {
	conn: Option<PoolConnection<Sqlite>>,
	open: bool,
}

pub async fn begin_write(pool: &SqlitePool) -> Result<WriteTx, sqlx::Error> {
	let mut conn = pool.acquire().await?;
	sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
	Ok(WriteTx {
		conn: Some(conn),
		open: true,
	})
}

impl WriteTx {
	pub async fn commit(mut self) -> Result<(), sqlx::Error> {
		sqlx::query("COMMIT").execute(&mut *self).await?;
		self.open = false;
		Ok(())
	}
}

impl Deref for WriteTx {
	type Target = SqliteConnection;

	fn deref(&self) -> &SqliteConnection {
		match &self.conn {
			Some(conn) => &**conn,
			// only taken in drop
			None => unreachable!("write transaction used after drop"),
		}
	}
}

impl DerefMut for WriteTx {
	fn deref_mut(&mut self) -> &mut SqliteConnection {
		match &mut self.conn {
			Some(conn) => &mut **conn,
			None => unreachable!("write transaction used after drop"),
		}
	}
}

impl Drop for WriteTx {
	fn drop(&mut self) {
		if !self.open {
			return;
		}
		let Some(mut conn) = self.conn.take() else { return; };

		match tokio::runtime::Handle::try_current() {
			Ok(handle) => {
				handle.spawn(async move {
					if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
						tracing::error!(error = %e, "rollback failed, closing connection");
						drop(conn.detach());
					}
				});
			}
			// closing the connection discards the transaction
			Err(_) => drop(conn.detach()),
		}
	}
}
