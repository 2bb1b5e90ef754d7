// src/db/demo_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::orders::{NewPaymentOrder, OrderFilter, OrderStatus, PaymentOrder, StatusTotal},
    services::auth::DEMO_USER_ID,
};

#[derive(Default)]
struct DemoData {
    orders: Vec<PaymentOrder>,
    next_numero: i64,
}

/// Ordens em memória para o modo demo (sem Postgres).
#[derive(Default)]
pub struct DemoOrderRepository {
    data: RwLock<DemoData>,
}

impl DemoOrderRepository {
    /// Já vem com algumas ordens do usuário demo.
    pub fn seeded(demo_email: &str) -> Self {
        let now = Utc::now();
        let sample = |numero: i64, proveedor: &str, concepto: &str, monto: i64, estado: OrderStatus, auto: bool, motivo: &str, days_ago: i64| {
            let created = now - Duration::days(days_ago);
            PaymentOrder {
                id: Uuid::new_v4(),
                numero,
                user_id: DEMO_USER_ID,
                solicitante_email: demo_email.to_string(),
                proveedor: proveedor.to_string(),
                nit: None,
                concepto: concepto.to_string(),
                descripcion: None,
                monto: Decimal::from(monto),
                iva: Decimal::from(monto) * Decimal::new(19, 2),
                centro_costos: Some("ADMINISTRACIÓN".to_string()),
                fecha_vencimiento: None,
                estado,
                aprobacion_automatica: auto,
                motivo_aprobacion: motivo.to_string(),
                revisado_por: None,
                comentario_revision: None,
                archivos: Vec::new(),
                created_at: created,
                updated_at: created,
            }
        };

        let orders = vec![
            sample(1, "SERVICIOS XYZ", "MANTENIMIENTO", 850_000, OrderStatus::Aprobada, true,
                "Aprobación automática: monto inferior a $1.000.000", 6),
            sample(2, "EMPRESA ABC", "HONORARIOS", 3_200_000, OrderStatus::Pagada, true,
                "Aprobación automática: proveedor autorizado con monto inferior a $5.000.000", 4),
            sample(3, "AJUSTADORES DEL CARIBE", "AJUSTE DE SINIESTROS", 12_500_000, OrderStatus::Pendiente, false,
                "Requiere aprobación manual", 1),
        ];

        Self {
            data: RwLock::new(DemoData { next_numero: orders.len() as i64, orders }),
        }
    }
}

#[async_trait]
impl OrderStore for DemoOrderRepository {
    async fn insert(&self, order: NewPaymentOrder) -> Result<PaymentOrder, AppError> {
        let mut data = self.data.write().await;
        data.next_numero += 1;
        let now = Utc::now();

        let created = PaymentOrder {
            id: Uuid::new_v4(),
            numero: data.next_numero,
            user_id: order.user_id,
            solicitante_email: order.solicitante_email,
            proveedor: order.proveedor,
            nit: order.nit,
            concepto: order.concepto,
            descripcion: order.descripcion,
            monto: order.monto,
            iva: order.iva,
            centro_costos: order.centro_costos,
            fecha_vencimiento: order.fecha_vencimiento,
            estado: order.estado,
            aprobacion_automatica: order.aprobacion_automatica,
            motivo_aprobacion: order.motivo_aprobacion,
            revisado_por: None,
            comentario_revision: None,
            archivos: order.archivos,
            created_at: now,
            updated_at: now,
        };
        data.orders.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentOrder>, AppError> {
        Ok(self.data.read().await.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list(&self, filter: &OrderFilter) -> Result<Vec<PaymentOrder>, AppError> {
        let data = self.data.read().await;
        let mut orders: Vec<PaymentOrder> = data
            .orders
            .iter()
            .filter(|o| filter.user_id.is_none_or(|u| o.user_id == u))
            .filter(|o| filter.estado.is_none_or(|e| o.estado == e))
            .cloned()
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.numero.cmp(&a.numero)));

        Ok(orders
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        reviewer: Uuid,
        comentario: Option<&str>,
    ) -> Result<Option<PaymentOrder>, AppError> {
        let mut data = self.data.write().await;
        let Some(order) = data.orders.iter_mut().find(|o| o.id == id && o.estado == expected) else {
            return Ok(None);
        };

        order.estado = next;
        order.revisado_por = Some(reviewer);
        if let Some(c) = comentario {
            order.comentario_revision = Some(c.to_string());
        }
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn delete_pending(&self, id: Uuid) -> Result<bool, AppError> {
        let mut data = self.data.write().await;
        let before = data.orders.len();
        data.orders.retain(|o| !(o.id == id && o.estado == OrderStatus::Pendiente));
        Ok(data.orders.len() < before)
    }

    async fn totals_by_status(&self, user_id: Option<Uuid>) -> Result<Vec<StatusTotal>, AppError> {
        let data = self.data.read().await;
        let mut groups: HashMap<(OrderStatus, bool), (i64, Decimal)> = HashMap::new();

        for order in data.orders.iter().filter(|o| user_id.is_none_or(|u| o.user_id == u)) {
            let entry = groups
                .entry((order.estado, order.aprobacion_automatica))
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 = entry
                .1
                .checked_add(order.monto)
                .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("soma dos valores estourou")))?;
        }

        Ok(groups
            .into_iter()
            .map(|((estado, aprobacion_automatica), (cantidad, total))| StatusTotal {
                estado,
                aprobacion_automatica,
                cantidad,
                total,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(user_id: Option<Uuid>) -> OrderFilter {
        OrderFilter { user_id, estado: None, limit: 50, offset: 0 }
    }

    #[tokio::test]
    async fn seeded_store_belongs_to_demo_user() {
        let repo = DemoOrderRepository::seeded("demo@cop.local");

        let mine = repo.list(&filter(Some(DEMO_USER_ID))).await.unwrap();
        assert_eq!(mine.len(), 3);
        // mais recente primeiro
        assert_eq!(mine[0].numero, 3);

        let others = repo.list(&filter(Some(Uuid::new_v4()))).await.unwrap();
        assert!(others.is_empty());
    }

    #[tokio::test]
    async fn update_status_checks_expected_state() {
        let repo = DemoOrderRepository::seeded("demo@cop.local");
        let pending = repo
            .list(&OrderFilter { estado: Some(OrderStatus::Pendiente), ..filter(None) })
            .await
            .unwrap()
            .remove(0);

        let reviewer = Uuid::new_v4();
        let stale = repo
            .update_status(pending.id, OrderStatus::Aprobada, OrderStatus::Pagada, reviewer, None)
            .await
            .unwrap();
        assert!(stale.is_none());

        let approved = repo
            .update_status(pending.id, OrderStatus::Pendiente, OrderStatus::Aprobada, reviewer, Some("ok"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(approved.estado, OrderStatus::Aprobada);
        assert_eq!(approved.revisado_por, Some(reviewer));
        assert_eq!(approved.comentario_revision.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn only_pending_orders_are_deleted() {
        let repo = DemoOrderRepository::seeded("demo@cop.local");
        let all = repo.list(&filter(None)).await.unwrap();
        let paid = all.iter().find(|o| o.estado == OrderStatus::Pagada).unwrap();
        let pending = all.iter().find(|o| o.estado == OrderStatus::Pendiente).unwrap();

        assert!(!repo.delete_pending(paid.id).await.unwrap());
        assert!(repo.delete_pending(pending.id).await.unwrap());
        assert!(repo.find_by_id(pending.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pagination_applies_offset_and_limit() {
        let repo = DemoOrderRepository::seeded("demo@cop.local");
        let page = repo
            .list(&OrderFilter { user_id: None, estado: None, limit: 1, offset: 1 })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].numero, 2);
    }

    #[tokio::test]
    async fn totals_report_overflow_instead_of_panicking() {
        let repo = DemoOrderRepository::default();
        let user_id = Uuid::new_v4();
        for _ in 0..2 {
            repo.insert(NewPaymentOrder {
                user_id,
                solicitante_email: "analista@aseguradora.co".into(),
                proveedor: "X".into(),
                nit: None,
                concepto: "HONORARIOS".into(),
                descripcion: None,
                monto: Decimal::MAX,
                iva: Decimal::ZERO,
                centro_costos: None,
                fecha_vencimiento: None,
                estado: OrderStatus::Pendiente,
                aprobacion_automatica: false,
                motivo_aprobacion: "Requiere aprobación manual".into(),
                archivos: vec![],
            })
            .await
            .unwrap();
        }

        let result = repo.totals_by_status(Some(user_id)).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }
}
