use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use crate::error::{AppError, AppResult};
use crate::models::{
    alert::AlertRow, Alert, AlertStatus, Explanation, FeatureVector, HistoryRecord, MerchantStats,
    ScoreResult, Transaction,
};

use super::HistoryStore;

/// Postgres-backed implementation of C1, mirroring four relations after
/// `transactions`, `features`, `scores`, `alerts`.
#[derive(Clone)]
pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        Ok(PostgresHistoryStore { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn alert_from_row(row: AlertRow) -> AppResult<Alert> {
    let status = match row.status.as_str() {
        "reviewing" => AlertStatus::Reviewing,
        "resolved" => AlertStatus::Resolved,
        "false_positive" => AlertStatus::FalsePositive,
        _ => AlertStatus::New,
    };
    let explanation: Explanation = serde_json::from_value(row.explanation)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("malformed alert explanation: {e}")))?;
    Ok(Alert {
        alert_id: row.alert_id,
        txn_id: row.txn_id,
        score: row.score,
        timestamp: row.timestamp,
        status,
        explanation,
        analyst_notes: row.analyst_notes,
        resolution: row.resolution,
    })
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn store(
        &self,
        transaction: &Transaction,
        features: &FeatureVector,
        score: &ScoreResult,
    ) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO transactions
                (txn_id, ts, amount, currency, merchant_id, merchant_cat, mcc, country, city,
                 lat, lon, channel, card_id, customer_id, device_id, ip, is_fraud)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
            ON CONFLICT (txn_id) DO NOTHING
            "#,
        )
        .bind(&transaction.txn_id)
        .bind(transaction.ts)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.merchant_id)
        .bind(&transaction.merchant_cat)
        .bind(&transaction.mcc)
        .bind(&transaction.country)
        .bind(&transaction.city)
        .bind(transaction.lat)
        .bind(transaction.lon)
        .bind(transaction.channel.as_str())
        .bind(&transaction.card_id)
        .bind(&transaction.customer_id)
        .bind(&transaction.device_id)
        .bind(&transaction.ip)
        .bind(transaction.is_fraud)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        let features_json = serde_json::to_value(features)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        sqlx::query(
            r#"
            INSERT INTO features (txn_id, features)
            VALUES ($1, $2)
            ON CONFLICT (txn_id) DO NOTHING
            "#,
        )
        .bind(&transaction.txn_id)
        .bind(&features_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        let explanation_json = serde_json::to_value(&score.explanation)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        sqlx::query(
            r#"
            INSERT INTO scores
                (txn_id, score, threshold, is_alert, model_used, confidence, explanation)
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            ON CONFLICT (txn_id) DO NOTHING
            "#,
        )
        .bind(&transaction.txn_id)
        .bind(score.score)
        .bind(score.threshold)
        .bind(score.is_alert)
        .bind(&score.model_used)
        .bind(score.confidence)
        .bind(&explanation_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.into()))?;
        Ok(())
    }

    async fn store_alert(&self, alert: &Alert) -> AppResult<()> {
        let explanation_json = serde_json::to_value(&alert.explanation)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        let status = match alert.status {
            AlertStatus::New => "new",
            AlertStatus::Reviewing => "reviewing",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        };
        sqlx::query(
            r#"
            INSERT INTO alerts
                (alert_id, txn_id, score, timestamp, status, explanation, analyst_notes, resolution)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            ON CONFLICT (alert_id) DO NOTHING
            "#,
        )
        .bind(&alert.alert_id)
        .bind(&alert.txn_id)
        .bind(alert.score)
        .bind(alert.timestamp)
        .bind(status)
        .bind(&explanation_json)
        .bind(&alert.analyst_notes)
        .bind(&alert.resolution)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;
        Ok(())
    }

    async fn get_customer_history(
        &self,
        customer_id: &str,
        hours: i64,
    ) -> AppResult<Vec<HistoryRecord>> {
        let since = Utc::now() - chrono::Duration::hours(hours);
        let rows = sqlx::query(
            r#"
            SELECT ts, amount, merchant_id, country, city, lat, lon, device_id, ip
            FROM transactions
            WHERE customer_id = $1 AND ts >= $2
            ORDER BY ts DESC
            "#,
        )
        .bind(customer_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryRecord {
                ts: row.get("ts"),
                amount: row.get("amount"),
                merchant_id: row.get("merchant_id"),
                country: row.get("country"),
                city: row.get("city"),
                lat: row.get("lat"),
                lon: row.get("lon"),
                device_id: row.get("device_id"),
                ip: row.get("ip"),
            })
            .collect())
    }

    async fn get_merchant_stats(&self, merchant_id: &str) -> AppResult<MerchantStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_transactions,
                COALESCE(AVG(amount), 0)::float8 AS avg_amount,
                COUNT(*) FILTER (WHERE is_fraud) AS fraud_count
            FROM transactions
            WHERE merchant_id = $1
            "#,
        )
        .bind(merchant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        let total: i64 = row.get("total_transactions");
        let fraud_count: i64 = row.get("fraud_count");
        let avg_amount: f64 = row.get("avg_amount");
        let fraud_rate = if total == 0 {
            0.0
        } else {
            fraud_count as f64 / total as f64
        };

        Ok(MerchantStats {
            total_transactions: total,
            avg_amount,
            fraud_count,
            fraud_rate,
        })
    }

    async fn get_alerts(&self, since: DateTime<Utc>, limit: i64, offset: i64) -> AppResult<Vec<Alert>> {
        let rows: Vec<AlertRow> = sqlx::query_as(
            r#"
            SELECT alert_id, txn_id, score, timestamp, status, explanation, analyst_notes, resolution
            FROM alerts
            WHERE timestamp >= $1
            ORDER BY timestamp DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(since)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        rows.into_iter().map(alert_from_row).collect()
    }

    async fn get_alert(&self, alert_id: &str) -> AppResult<Option<Alert>> {
        let row: Option<AlertRow> = sqlx::query_as(
            r#"
            SELECT alert_id, txn_id, score, timestamp, status, explanation, analyst_notes, resolution
            FROM alerts
            WHERE alert_id = $1
            "#,
        )
        .bind(alert_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(e.into()))?;

        row.map(alert_from_row).transpose()
    }

    async fn get_alert_count(&self, since: DateTime<Utc>) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM alerts WHERE timestamp >= $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.into()))?;
        Ok(row.get("count"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.into()))?;
        Ok(true)
    }
}
