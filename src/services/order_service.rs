// src/services/order_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::OrderStore,
    models::{
        auth::User,
        orders::{
            CreateOrderPayload, NewPaymentOrder, OrderFilter, OrderQuery, OrderStatus,
            OrdersSummary, PaymentOrder, ReviewOrderPayload,
        },
    },
    services::{approval::ApprovalRules, notifier::Notifier},
};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    rules: ApprovalRules,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, rules: ApprovalRules, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, rules, notifier }
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_order(
        &self,
        user: &User,
        mut payload: CreateOrderPayload,
    ) -> Result<PaymentOrder, AppError> {
        payload.normalize();
        payload.validate()?;

        let decision = self.rules.evaluate(&payload.proveedor, payload.monto);
        let estado = if decision.should_auto_approve {
            OrderStatus::Aprobada
        } else {
            OrderStatus::Pendiente
        };

        let new_order = NewPaymentOrder {
            user_id: user.id,
            solicitante_email: user.email.clone(),
            proveedor: payload.proveedor,
            nit: payload.nit,
            concepto: payload.concepto,
            descripcion: payload.descripcion,
            monto: payload.monto,
            iva: payload.iva,
            centro_costos: payload.centro_costos,
            fecha_vencimiento: payload.fecha_vencimiento,
            estado,
            aprobacion_automatica: decision.should_auto_approve,
            motivo_aprobacion: decision.reason.to_string(),
            archivos: payload.archivos,
        };

        let order = self.store.insert(new_order).await?;
        tracing::info!(
            numero = order.numero,
            user_id = %user.id,
            monto = %order.monto,
            estado = %order.estado,
            reason = ?decision.reason,
            "Ordem de pagamento criada"
        );

        if let Err(e) = self.notifier.order_created(&order).await {
            tracing::warn!(numero = order.numero, error = %e, "Falha ao enviar e-mail de confirmação");
        }

        Ok(order)
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn list_orders(&self, user: &User, query: OrderQuery) -> Result<Vec<PaymentOrder>, AppError> {
        let filter = OrderFilter {
            user_id: scope(user),
            estado: query.estado,
            limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: query.offset.unwrap_or(0).max(0),
        };
        self.store.list(&filter).await
    }

    pub async fn get_order(&self, user: &User, id: Uuid) -> Result<PaymentOrder, AppError> {
        let order = self.store.find_by_id(id).await?.ok_or(AppError::OrderNotFound)?;
        ensure_can_view(user, &order)?;
        Ok(order)
    }

    pub async fn summary(&self, user: &User) -> Result<OrdersSummary, AppError> {
        let totals = self.store.totals_by_status(scope(user)).await?;
        Ok(OrdersSummary::from_totals(&totals))
    }

    // =========================================================================
    //  WORKFLOW
    // =========================================================================

    pub async fn review_order(
        &self,
        user: &User,
        id: Uuid,
        payload: ReviewOrderPayload,
    ) -> Result<PaymentOrder, AppError> {
        if !user.is_approver {
            return Err(AppError::Forbidden);
        }

        let current = self.store.find_by_id(id).await?.ok_or(AppError::OrderNotFound)?;
        if !current.estado.can_transition_to(payload.estado) {
            return Err(AppError::InvalidStatusTransition {
                from: current.estado,
                to: payload.estado,
            });
        }

        let comentario = payload
            .comentario
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        if payload.estado == OrderStatus::Rechazada && comentario.is_none() {
            return Err(AppError::ReviewCommentRequired);
        }

        // None aqui = outro aprovador mudou o estado entre a leitura e o update
        let updated = self
            .store
            .update_status(id, current.estado, payload.estado, user.id, comentario)
            .await?
            .ok_or(AppError::OrderNotEditable)?;

        tracing::info!(
            numero = updated.numero,
            from = %current.estado,
            to = %updated.estado,
            reviewer = %user.id,
            "Estado da ordem alterado"
        );

        if let Err(e) = self.notifier.order_reviewed(&updated).await {
            tracing::warn!(numero = updated.numero, error = %e, "Falha ao enviar e-mail de revisão");
        }

        Ok(updated)
    }

    pub async fn delete_order(&self, user: &User, id: Uuid) -> Result<(), AppError> {
        let order = self.store.find_by_id(id).await?.ok_or(AppError::OrderNotFound)?;
        ensure_can_view(user, &order)?;

        if order.estado != OrderStatus::Pendiente || !self.store.delete_pending(id).await? {
            return Err(AppError::OrderNotEditable);
        }

        tracing::info!(numero = order.numero, user_id = %user.id, "Ordem excluída");
        Ok(())
    }
}

// Aprovadores enxergam todas as ordens
fn scope(user: &User) -> Option<Uuid> {
    if user.is_approver { None } else { Some(user.id) }
}

fn ensure_can_view(user: &User, order: &PaymentOrder) -> Result<(), AppError> {
    if user.is_approver || order.user_id == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DemoOrderRepository;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        created: Mutex<Vec<i64>>,
        reviewed: Mutex<Vec<(i64, OrderStatus)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn order_created(&self, order: &PaymentOrder) -> anyhow::Result<()> {
            self.created.lock().await.push(order.numero);
            if self.fail {
                anyhow::bail!("smtp fora do ar");
            }
            Ok(())
        }

        async fn order_reviewed(&self, order: &PaymentOrder) -> anyhow::Result<()> {
            self.reviewed.lock().await.push((order.numero, order.estado));
            Ok(())
        }
    }

    fn service_with(notifier: Arc<RecordingNotifier>) -> OrderService {
        let store: Arc<dyn OrderStore> = Arc::new(DemoOrderRepository::default());
        OrderService::new(store, ApprovalRules::default(), notifier)
    }

    fn analyst() -> User {
        User { id: Uuid::new_v4(), email: "analista@aseguradora.co".into(), is_approver: false }
    }

    fn approver() -> User {
        User { id: Uuid::new_v4(), email: "tesoreria@aseguradora.co".into(), is_approver: true }
    }

    fn payload(proveedor: &str, monto: i64) -> CreateOrderPayload {
        CreateOrderPayload {
            proveedor: proveedor.to_string(),
            nit: Some("  ".to_string()),
            concepto: "HONORARIOS".to_string(),
            descripcion: None,
            monto: Decimal::from(monto),
            iva: Decimal::ZERO,
            centro_costos: None,
            fecha_vencimiento: None,
            archivos: vec![],
        }
    }

    fn review(estado: OrderStatus, comentario: Option<&str>) -> ReviewOrderPayload {
        ReviewOrderPayload { estado, comentario: comentario.map(String::from) }
    }

    #[tokio::test]
    async fn small_orders_are_auto_approved_and_notified() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service_with(notifier.clone());

        let order = service.create_order(&analyst(), payload("Taller Los Andes", 800_000)).await.unwrap();

        assert_eq!(order.estado, OrderStatus::Aprobada);
        assert!(order.aprobacion_automatica);
        assert!(order.nit.is_none());
        assert_eq!(*notifier.created.lock().await, vec![order.numero]);
    }

    #[tokio::test]
    async fn large_orders_wait_for_review() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let order = service.create_order(&analyst(), payload("Taller Los Andes", 7_000_000)).await.unwrap();

        assert_eq!(order.estado, OrderStatus::Pendiente);
        assert!(!order.aprobacion_automatica);
        assert_eq!(order.motivo_aprobacion, "Requiere aprobación manual");
    }

    #[tokio::test]
    async fn whitelisted_provider_is_matched_after_trimming() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let order = service.create_order(&analyst(), payload("  empresa abc ", 3_000_000)).await.unwrap();

        assert_eq!(order.proveedor, "empresa abc");
        assert_eq!(order.estado, OrderStatus::Aprobada);
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_creation() {
        let notifier = Arc::new(RecordingNotifier { fail: true, ..Default::default() });
        let service = service_with(notifier);

        assert!(service.create_order(&analyst(), payload("X", 10_000)).await.is_ok());
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let result = service.create_order(&analyst(), payload("", 0)).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn whitespace_only_provider_and_concept_are_rejected() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let mut blank = payload("   ", 10);
        blank.concepto = "   ".to_string();

        match service.create_order(&analyst(), blank).await {
            Err(AppError::ValidationError(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("proveedor"));
                assert!(fields.contains_key("concepto"));
            }
            other => panic!("esperava erro de validação, veio {:?}", other.map(|o| o.id)),
        }
    }

    #[tokio::test]
    async fn oversized_amounts_are_rejected_and_summary_stays_sound() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let owner = analyst();

        let mut huge = payload("X", 1);
        huge.monto = Decimal::MAX;
        let result = service.create_order(&owner, huge).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let mut top = payload("X", 1);
        top.monto = crate::models::orders::max_amount();
        service.create_order(&owner, top.clone()).await.unwrap();
        service.create_order(&owner, top).await.unwrap();

        let summary = service.summary(&owner).await.unwrap();
        assert_eq!(summary.total_ordenes, 2);
        assert_eq!(summary.monto_total, crate::models::orders::max_amount() * Decimal::from(2));
    }

    #[tokio::test]
    async fn analysts_only_see_their_orders() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let alice = analyst();
        let bob = analyst();
        let mine = service.create_order(&alice, payload("A", 10_000)).await.unwrap();
        service.create_order(&bob, payload("B", 20_000)).await.unwrap();

        let listed = service.list_orders(&alice, OrderQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        let all = service.list_orders(&approver(), OrderQuery::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        assert!(matches!(service.get_order(&bob, mine.id).await, Err(AppError::Forbidden)));
        assert!(service.get_order(&approver(), mine.id).await.is_ok());
        assert!(matches!(service.get_order(&alice, Uuid::new_v4()).await, Err(AppError::OrderNotFound)));
    }

    #[tokio::test]
    async fn review_follows_the_workflow() {
        let notifier = Arc::new(RecordingNotifier::default());
        let service = service_with(notifier.clone());
        let order = service.create_order(&analyst(), payload("X", 9_000_000)).await.unwrap();

        let denied = service.review_order(&analyst(), order.id, review(OrderStatus::Aprobada, None)).await;
        assert!(matches!(denied, Err(AppError::Forbidden)));

        let skip = service.review_order(&approver(), order.id, review(OrderStatus::Pagada, None)).await;
        assert!(matches!(skip, Err(AppError::InvalidStatusTransition { .. })));

        let reviewer = approver();
        let approved = service
            .review_order(&reviewer, order.id, review(OrderStatus::Aprobada, None))
            .await
            .unwrap();
        assert_eq!(approved.estado, OrderStatus::Aprobada);
        assert_eq!(approved.revisado_por, Some(reviewer.id));

        let paid = service
            .review_order(&reviewer, order.id, review(OrderStatus::Pagada, Some("Transferencia 123")))
            .await
            .unwrap();
        assert_eq!(paid.estado, OrderStatus::Pagada);

        assert_eq!(
            *notifier.reviewed.lock().await,
            vec![(order.numero, OrderStatus::Aprobada), (order.numero, OrderStatus::Pagada)]
        );
    }

    #[tokio::test]
    async fn rejection_requires_a_comment() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let order = service.create_order(&analyst(), payload("X", 9_000_000)).await.unwrap();

        let blank = service.review_order(&approver(), order.id, review(OrderStatus::Rechazada, Some("  "))).await;
        assert!(matches!(blank, Err(AppError::ReviewCommentRequired)));

        let rejected = service
            .review_order(&approver(), order.id, review(OrderStatus::Rechazada, Some("Falta RUT")))
            .await
            .unwrap();
        assert_eq!(rejected.comentario_revision.as_deref(), Some("Falta RUT"));
    }

    #[tokio::test]
    async fn only_pending_orders_can_be_deleted() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let owner = analyst();
        let approved = service.create_order(&owner, payload("X", 10_000)).await.unwrap();
        let pending = service.create_order(&owner, payload("X", 9_000_000)).await.unwrap();

        assert!(matches!(service.delete_order(&owner, approved.id).await, Err(AppError::OrderNotEditable)));
        assert!(matches!(service.delete_order(&analyst(), pending.id).await, Err(AppError::Forbidden)));
        service.delete_order(&owner, pending.id).await.unwrap();
        assert!(matches!(service.get_order(&owner, pending.id).await, Err(AppError::OrderNotFound)));
    }

    #[tokio::test]
    async fn summary_is_scoped_to_the_user() {
        let service = service_with(Arc::new(RecordingNotifier::default()));
        let owner = analyst();
        service.create_order(&owner, payload("X", 10_000)).await.unwrap();
        service.create_order(&owner, payload("X", 9_000_000)).await.unwrap();
        service.create_order(&analyst(), payload("Y", 20_000)).await.unwrap();

        let mine = service.summary(&owner).await.unwrap();
        assert_eq!(mine.total_ordenes, 2);
        assert_eq!(mine.pendientes, 1);
        assert_eq!(mine.auto_aprobadas, 1);
        assert_eq!(mine.monto_total, Decimal::from(9_010_000));

        let global = service.summary(&approver()).await.unwrap();
        assert_eq!(global.total_ordenes, 3);
    }
}
