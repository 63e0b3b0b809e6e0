use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &agora_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		let lock_id: i64 = 9_204_173;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	/// The persisted derived views bootstrap off this check: a missing table
	/// means the view has never been computed.
	pub async fn table_exists(&self, name: &str) -> Result<bool> {
		let exists: bool = sqlx::query_scalar(
			"\
SELECT EXISTS (
	SELECT FROM information_schema.tables
	WHERE table_name = $1
)",
		)
		.bind(name)
		.fetch_one(&self.pool)
		.await?;

		Ok(exists)
	}
}
