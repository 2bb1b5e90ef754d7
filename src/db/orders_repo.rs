// src/db/orders_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::orders::{NewPaymentOrder, OrderFilter, OrderStatus, PaymentOrder, StatusTotal},
};

const ORDER_COLUMNS: &str = r#"
    id, numero, user_id, solicitante_email, proveedor, nit, concepto, descripcion,
    monto, iva, centro_costos, fecha_vencimiento, estado, aprobacion_automatica,
    motivo_aprobacion, revisado_por, comentario_revision, archivos, created_at, updated_at
"#;

// Repositório da tabela `ordenes_pago`
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: NewPaymentOrder) -> Result<PaymentOrder, AppError> {
        let sql = format!(
            r#"
            INSERT INTO ordenes_pago (
                user_id, solicitante_email, proveedor, nit, concepto, descripcion,
                monto, iva, centro_costos, fecha_vencimiento, estado,
                aprobacion_automatica, motivo_aprobacion, archivos
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(order.user_id)
            .bind(&order.solicitante_email)
            .bind(&order.proveedor)
            .bind(&order.nit)
            .bind(&order.concepto)
            .bind(&order.descripcion)
            .bind(order.monto)
            .bind(order.iva)
            .bind(&order.centro_costos)
            .bind(order.fecha_vencimiento)
            .bind(order.estado)
            .bind(order.aprobacion_automatica)
            .bind(&order.motivo_aprobacion)
            .bind(&order.archivos)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentOrder>, AppError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM ordenes_pago WHERE id = $1");
        let order = sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<PaymentOrder>, AppError> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM ordenes_pago
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::estado_orden IS NULL OR estado = $2)
            ORDER BY created_at DESC, numero DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let orders = sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(filter.user_id)
            .bind(filter.estado)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        reviewer: Uuid,
        comentario: Option<&str>,
    ) -> Result<Option<PaymentOrder>, AppError> {
        // O filtro por estado atual evita corrida entre dois aprovadores
        let sql = format!(
            r#"
            UPDATE ordenes_pago
            SET estado = $3,
                revisado_por = $4,
                comentario_revision = COALESCE($5, comentario_revision),
                updated_at = NOW()
            WHERE id = $1 AND estado = $2
            RETURNING {ORDER_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, PaymentOrder>(&sql)
            .bind(id)
            .bind(expected)
            .bind(next)
            .bind(reviewer)
            .bind(comentario)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM ordenes_pago WHERE id = $1 AND estado = $2")
            .bind(id)
            .bind(OrderStatus::Pendiente)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn totals_by_status(&self, user_id: Option<Uuid>) -> Result<Vec<StatusTotal>, AppError> {
        let totals = sqlx::query_as::<_, StatusTotal>(
            r#"
            SELECT
                estado,
                aprobacion_automatica,
                COUNT(*) AS cantidad,
                COALESCE(SUM(monto), 0) AS total
            FROM ordenes_pago
            WHERE ($1::uuid IS NULL OR user_id = $1)
            GROUP BY estado, aprobacion_automatica
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(totals)
    }
}
