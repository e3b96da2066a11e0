use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::card::Card;
use crate::models::license::{StoredLicense, LICENSE_SETTING_KEY};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Card Operations --

    /// Cards of one board in display order. `(stage, position)` is the sort
    /// the client renders; position ties within a stage cannot occur after a
    /// save since every save renumbers the whole stage.
    pub async fn list_cards(&self, board_id: Uuid) -> anyhow::Result<Vec<CardRow>> {
        let rows = sqlx::query_as::<_, CardRow>(
            "SELECT board_id, id, stage, lane, responsible, position, updated_at \
             FROM cards WHERE board_id = $1 ORDER BY stage ASC, position ASC",
        )
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Persists the outcome of a reorder: one upsert per card, keyed
    /// `(board_id, id)`, in a single transaction. Last writer wins — there
    /// is no version compare on write.
    pub async fn save_positions(&self, board_id: Uuid, cards: &[Card]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for card in cards {
            sqlx::query(
                r#"INSERT INTO cards (board_id, id, stage, lane, responsible, position)
                   VALUES ($1, $2, $3, $4, $5, $6)
                   ON CONFLICT (board_id, id) DO UPDATE
                   SET stage = EXCLUDED.stage,
                       lane = EXCLUDED.lane,
                       responsible = EXCLUDED.responsible,
                       position = EXCLUDED.position,
                       updated_at = NOW()"#,
            )
            .bind(board_id)
            .bind(card.id)
            .bind(&card.stage)
            .bind(&card.lane)
            .bind(&card.responsible)
            .bind(card.position)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    // -- License Operations --

    /// The single persisted license token, if one was ever installed.
    pub async fn get_license(&self) -> anyhow::Result<Option<String>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT value FROM settings WHERE key = $1")
                .bind(LICENSE_SETTING_KEY)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((value,)) => {
                let stored: StoredLicense = serde_json::from_value(value)?;
                Ok(Some(stored.token))
            }
            None => Ok(None),
        }
    }

    /// Replaces the license row wholesale. Tokens are never mutated in
    /// place.
    pub async fn set_license(&self, token: &str) -> anyhow::Result<()> {
        let value = serde_json::to_value(StoredLicense {
            token: token.to_string(),
        })?;
        sqlx::query(
            r#"INSERT INTO settings (key, value) VALUES ($1, $2)
               ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()"#,
        )
        .bind(LICENSE_SETTING_KEY)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ── Row Types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardRow {
    pub board_id: Uuid,
    pub id: Uuid,
    pub stage: String,
    pub lane: Option<String>,
    pub responsible: Option<String>,
    pub position: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<CardRow> for Card {
    fn from(row: CardRow) -> Self {
        Card {
            id: row.id,
            stage: row.stage,
            lane: row.lane,
            responsible: row.responsible,
            position: row.position,
        }
    }
}
