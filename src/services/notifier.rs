// src/services/notifier.rs

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::{
    config::SmtpSettings,
    models::orders::{OrderStatus, PaymentOrder},
};

/// Avisos por e-mail ao solicitante. Falhas aqui nunca derrubam a operação.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn order_created(&self, order: &PaymentOrder) -> anyhow::Result<()>;
    async fn order_reviewed(&self, order: &PaymentOrder) -> anyhow::Result<()>;
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(smtp: &SmtpSettings) -> anyhow::Result<Self> {
        let creds = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port)
            .credentials(creds)
            .build();

        Ok(Self { transport, from: smtp.from.parse()? })
    }

    async fn send(&self, to: &str, subject: &str, html: String, plain: String) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse()?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(plain))
                    .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html)),
            )?;

        self.transport.send(message).await?;
        info!(%to, %subject, "✅ E-mail enviado");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn order_created(&self, order: &PaymentOrder) -> anyhow::Result<()> {
        let subject = format!("Orden de pago #{} registrada", order.numero);
        self.send(&order.solicitante_email, &subject, render_html(order, Notice::Created), render_plain(order, Notice::Created))
            .await
    }

    async fn order_reviewed(&self, order: &PaymentOrder) -> anyhow::Result<()> {
        let subject = format!("Orden de pago #{}: {}", order.numero, status_label(order.estado));
        self.send(&order.solicitante_email, &subject, render_html(order, Notice::Reviewed), render_plain(order, Notice::Reviewed))
            .await
    }
}

/// Usado no modo demo ou sem SMTP configurado.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn order_created(&self, order: &PaymentOrder) -> anyhow::Result<()> {
        info!(numero = order.numero, to = %order.solicitante_email, "📧 (log) confirmação de ordem");
        Ok(())
    }

    async fn order_reviewed(&self, order: &PaymentOrder) -> anyhow::Result<()> {
        info!(numero = order.numero, estado = %order.estado, to = %order.solicitante_email, "📧 (log) revisão de ordem");
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Notice {
    Created,
    Reviewed,
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pendiente => "Pendiente de aprobación",
        OrderStatus::Aprobada => "Aprobada",
        OrderStatus::Rechazada => "Rechazada",
        OrderStatus::Pagada => "Pagada",
    }
}

/// 1234567.5 -> "$1.234.568"
pub fn format_cop(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn headline(order: &PaymentOrder, notice: Notice) -> String {
    match notice {
        Notice::Created if order.aprobacion_automatica => {
            "Su orden de pago fue registrada y aprobada automáticamente.".to_string()
        }
        Notice::Created => "Su orden de pago fue registrada y está pendiente de aprobación.".to_string(),
        Notice::Reviewed => format!("El estado de su orden de pago cambió a: {}.", status_label(order.estado)),
    }
}

fn render_html(order: &PaymentOrder, notice: Notice) -> String {
    let rows = [
        ("Número", format!("#{}", order.numero)),
        ("Proveedor", order.proveedor.clone()),
        ("Concepto", order.concepto.clone()),
        ("Valor", format_cop(order.monto)),
        ("IVA", format_cop(order.iva)),
        ("Total", format_cop(order.total())),
        ("Estado", status_label(order.estado).to_string()),
        ("Observación", order.motivo_aprobacion.clone()),
    ];

    let mut table = String::new();
    for (label, value) in rows.iter() {
        table.push_str(&format!(
            r#"<tr><td style="padding:6px 12px;color:#555;">{}</td><td style="padding:6px 12px;font-weight:bold;">{}</td></tr>"#,
            label,
            escape_html(value)
        ));
    }
    if let Some(comentario) = order.comentario_revision.as_deref().filter(|c| !c.is_empty()) {
        table.push_str(&format!(
            r#"<tr><td style="padding:6px 12px;color:#555;">Comentario</td><td style="padding:6px 12px;">{}</td></tr>"#,
            escape_html(comentario)
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; background:#f4f6f8; padding:24px;">
  <div style="max-width:600px;margin:0 auto;background:#fff;border-radius:8px;padding:24px;">
    <h2 style="color:#0b3d91;margin-top:0;">Centro de Órdenes de Pago</h2>
    <p>{}</p>
    <table style="border-collapse:collapse;width:100%;">{}</table>
    <p style="color:#888;font-size:12px;margin-top:24px;">Este es un mensaje automático, por favor no responda.</p>
  </div>
</body>
</html>"#,
        escape_html(&headline(order, notice)),
        table
    )
}

fn render_plain(order: &PaymentOrder, notice: Notice) -> String {
    let mut text = format!(
        "Centro de Órdenes de Pago\n\n{}\n\nNúmero: #{}\nProveedor: {}\nConcepto: {}\nValor: {}\nIVA: {}\nTotal: {}\nEstado: {}\nObservación: {}\n",
        headline(order, notice),
        order.numero,
        order.proveedor,
        order.concepto,
        format_cop(order.monto),
        format_cop(order.iva),
        format_cop(order.total()),
        status_label(order.estado),
        order.motivo_aprobacion,
    );
    if let Some(comentario) = order.comentario_revision.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(&format!("Comentario: {}\n", comentario));
    }
    text
}
