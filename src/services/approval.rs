// src/services/approval.rs

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Abaixo disso a ordem é aprovada sem olhar o fornecedor (COP).
pub const AUTO_APPROVE_THRESHOLD: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Teto para fornecedores da lista autorizada (COP).
pub const WHITELIST_THRESHOLD: Decimal = Decimal::from_parts(5_000_000, 0, 0, false, 0);

pub const DEFAULT_WHITELIST: &[&str] = &["EMPRESA ABC", "SERVICIOS XYZ", "PROVEEDOR 123"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalReason {
    BelowThreshold,
    WhitelistedProvider,
    ManualReview,
}

impl fmt::Display for ApprovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ApprovalReason::BelowThreshold => {
                "Aprobación automática: monto inferior a $1.000.000"
            }
            ApprovalReason::WhitelistedProvider => {
                "Aprobación automática: proveedor autorizado con monto inferior a $5.000.000"
            }
            ApprovalReason::ManualReview => "Requiere aprobación manual",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalDecision {
    pub should_auto_approve: bool,
    pub reason: ApprovalReason,
}

#[derive(Debug, Clone)]
pub struct ApprovalRules {
    // Sempre normalizados em maiúsculas
    whitelist: Vec<String>,
}

impl Default for ApprovalRules {
    fn default() -> Self {
        Self::with_providers::<&str>(&[])
    }
}

impl ApprovalRules {
    /// Lista vazia cai na lista padrão.
    pub fn with_providers<S: AsRef<str>>(providers: &[S]) -> Self {
        let mut whitelist: Vec<String> = providers
            .iter()
            .map(|p| normalize_provider(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();

        if whitelist.is_empty() {
            whitelist = DEFAULT_WHITELIST.iter().map(|p| normalize_provider(p)).collect();
        }

        Self { whitelist }
    }

    pub fn is_whitelisted(&self, proveedor: &str) -> bool {
        let proveedor = normalize_provider(proveedor);
        self.whitelist.iter().any(|p| *p == proveedor)
    }

    /// As regras são avaliadas em ordem; a primeira que casar decide.
    pub fn evaluate(&self, proveedor: &str, monto: Decimal) -> ApprovalDecision {
        if monto < AUTO_APPROVE_THRESHOLD {
            return ApprovalDecision {
                should_auto_approve: true,
                reason: ApprovalReason::BelowThreshold,
            };
        }

        if self.is_whitelisted(proveedor) && monto < WHITELIST_THRESHOLD {
            return ApprovalDecision {
                should_auto_approve: true,
                reason: ApprovalReason::WhitelistedProvider,
            };
        }

        ApprovalDecision {
            should_auto_approve: false,
            reason: ApprovalReason::ManualReview,
        }
    }
}

// "  servicios   xyz " -> "SERVICIOS XYZ"
fn normalize_provider(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cop(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn thresholds_are_the_expected_values() {
        assert_eq!(AUTO_APPROVE_THRESHOLD, cop(1_000_000));
        assert_eq!(WHITELIST_THRESHOLD, cop(5_000_000));
    }

    #[test]
    fn small_amounts_are_always_approved() {
        let rules = ApprovalRules::default();
        for monto in [1, 50_000, 999_999] {
            let decision = rules.evaluate("CUALQUIER PROVEEDOR", cop(monto));
            assert!(decision.should_auto_approve);
            assert_eq!(decision.reason, ApprovalReason::BelowThreshold);
        }
        let cents = rules.evaluate("X", Decimal::new(99_999_999, 2));
        assert!(cents.should_auto_approve);
    }

    #[test]
    fn whitelisted_providers_are_approved_up_to_five_million() {
        let rules = ApprovalRules::default();
        for proveedor in ["EMPRESA ABC", "servicios xyz", "  Proveedor   123 "] {
            for monto in [1_000_000, 2_500_000, 4_999_999] {
                let decision = rules.evaluate(proveedor, cop(monto));
                assert!(decision.should_auto_approve, "{proveedor} / {monto}");
                assert_eq!(decision.reason, ApprovalReason::WhitelistedProvider);
            }
        }
    }

    #[test]
    fn large_amounts_need_manual_review() {
        let rules = ApprovalRules::default();

        let decision = rules.evaluate("EMPRESA ABC", cop(5_000_000));
        assert!(!decision.should_auto_approve);
        assert_eq!(decision.reason, ApprovalReason::ManualReview);

        assert!(!rules.evaluate("OTRA EMPRESA", cop(5_000_000)).should_auto_approve);
        assert!(!rules.evaluate("OTRA EMPRESA", cop(1_000_000)).should_auto_approve);
        assert!(!rules.evaluate("OTRA EMPRESA", cop(80_000_000)).should_auto_approve);
    }

    #[test]
    fn configured_providers_replace_the_default_list() {
        let rules = ApprovalRules::with_providers(&["Ajustadores del Valle"]);

        assert!(rules.evaluate("AJUSTADORES DEL VALLE", cop(3_000_000)).should_auto_approve);
        assert!(!rules.evaluate("EMPRESA ABC", cop(3_000_000)).should_auto_approve);
    }

    #[test]
    fn blank_configuration_keeps_the_default_list() {
        let rules = ApprovalRules::with_providers(&["  ", ""]);
        assert!(rules.is_whitelisted("SERVICIOS XYZ"));
    }
}
