// src/db/order_store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{NewPaymentOrder, OrderFilter, OrderStatus, PaymentOrder, StatusTotal},
};

/// Persistência das ordens de pagamento. Postgres em produção, memória no modo demo.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: NewPaymentOrder) -> Result<PaymentOrder, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentOrder>, AppError>;

    /// Mais recentes primeiro.
    async fn list(&self, filter: &OrderFilter) -> Result<Vec<PaymentOrder>, AppError>;

    /// Só altera se o estado atual ainda for `expected`; devolve None caso contrário.
    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        reviewer: Uuid,
        comentario: Option<&str>,
    ) -> Result<Option<PaymentOrder>, AppError>;

    /// Remove apenas ordens pendentes.
    async fn delete_pending(&self, id: Uuid) -> Result<bool, AppError>;

    async fn totals_by_status(&self, user_id: Option<Uuid>) -> Result<Vec<StatusTotal>, AppError>;
}
