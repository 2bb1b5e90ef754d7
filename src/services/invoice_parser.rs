// src/services/invoice_parser.rs
//
// Heurísticas (regex) para preencher o formulário da ordem a partir do texto de
// uma "cuenta de cobro" em PDF. É best-effort: campos não encontrados ficam None.

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

/// Taxa padrão do IVA na Colômbia.
pub const VAT_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);
/// Margem aceita em volta de `total * VAT_RATE` na busca de fallback.
pub const VAT_TOLERANCE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

const MAX_DESCRIPTION_CHARS: usize = 500;

/// Conceitos conhecidos, na ordem em que são testados.
pub const KNOWN_CONCEPTS: &[&str] = &[
    "REEMBOLSO DE GASTOS",
    "AJUSTE DE SINIESTROS",
    "SERVICIOS PROFESIONALES",
    "SERVICIOS PÚBLICOS",
    "HONORARIOS",
    "PERITAJE",
    "ASESORÍA",
    "CONSULTORÍA",
    "ARRENDAMIENTO",
    "MANTENIMIENTO",
    "CAPACITACIÓN",
    "PUBLICIDAD",
    "TRANSPORTE",
    "SUMINISTROS",
    "COMISIONES",
    "VIÁTICOS",
];

static CREDITOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDEBE\s+A\s*:\s*([^\r\n]+)").expect("regex válida"));

static ID_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\bNIT\b|\bC\.\s?C\.)").expect("regex válida"));

static ID_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bNIT\b|\bC\.\s?C\.)\s*(?:No\.?)?\s*:?\s*(\d[\d.\- ]*\d)").expect("regex válida")
});

static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)CUENTA\s+DE\s+COBRO(.*?)^[ \t]*TOTAL\b").expect("regex válida")
});

static TOTAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*TOTAL\b([^\d\r\n]*)(\d[\d.,]*)").expect("regex válida")
});

// "IVA", "Iva", com taxa opcional ("19%", "(19 %)") antes do valor
static VAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:IVA|Iva)\b(?:\s*\(?\s*\d{1,2}(?:[.,]\d+)?\s*%\s*\)?)?[^\d\r\n]*?(\d[\d.,]*)")
        .expect("regex válida")
});

static LARGE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d{4,}(?:[.,]\d{1,2})?").expect("regex válida")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_fields(found: usize) -> Self {
        match found {
            n if n >= 5 => Confidence::High,
            n if n >= 3 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInvoice {
    pub acreedor: Option<String>,
    pub nit: Option<String>,
    pub concepto: Option<String>,
    pub descripcion: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub valor_solicitado: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub iva: Option<Decimal>,
    /// true quando o IVA veio da busca aproximada e não de um rótulo "IVA".
    pub iva_estimado: bool,
    pub confidence: Confidence,
    pub fields_found: usize,
}

/// Extrai os campos da ordem a partir do texto do PDF.
pub fn extract_data_from_text(text: &str) -> ExtractedInvoice {
    let (acreedor, nit) = match extract_creditor(text) {
        Some((name, nit)) => (Some(name), nit),
        None => (None, None),
    };
    let concepto = extract_concept(text);
    let descripcion = extract_description(text);
    let valor_solicitado = extract_total(text);

    let mut iva_estimado = false;
    let mut iva = extract_vat(text, valor_solicitado);
    if iva.is_none() {
        if let Some(base) = valor_solicitado {
            iva = find_vat_candidate(base, &collect_large_numbers(text));
            iva_estimado = iva.is_some();
        }
    }

    let fields_found = [
        acreedor.is_some(),
        concepto.is_some(),
        descripcion.is_some(),
        valor_solicitado.is_some(),
        iva.is_some(),
    ]
    .iter()
    .filter(|&&found| found)
    .count();

    ExtractedInvoice {
        acreedor,
        nit,
        concepto,
        descripcion,
        valor_solicitado,
        iva,
        iva_estimado,
        confidence: Confidence::from_fields(fields_found),
        fields_found,
    }
}

/// Normaliza valores no formato colombiano ("1.234.567,89") ou americano
/// ("1,234,567.89"). Um separador único seguido de exatamente 3 dígitos é
/// tratado como milhar ("24,585" -> 24585).
pub fn clean_numeric_value(raw: &str) -> Option<Decimal> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let kept = kept.trim_matches(|c| c == '.' || c == ',');

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if dot > comma => kept.replace(',', ""),
        (Some(_), Some(_)) => kept.replace('.', "").replace(',', "."),
        (Some(_), None) => resolve_single_separator(kept, '.'),
        (None, Some(_)) => resolve_single_separator(kept, ','),
        (None, None) => kept.to_string(),
    };

    Decimal::from_str(&normalized).ok()
}

fn resolve_single_separator(value: &str, sep: char) -> String {
    if value.matches(sep).count() > 1 {
        return value.replace(sep, "");
    }
    let decimals = value.rfind(sep).map(|pos| value.len() - pos - 1).unwrap_or(0);
    if decimals == 3 {
        value.replace(sep, "")
    } else {
        value.replace(sep, ".")
    }
}

/// Procura, entre os números do documento, um que seja ~19% da base.
pub fn find_vat_candidate(base: Decimal, candidates: &[Decimal]) -> Option<Decimal> {
    if base <= Decimal::ZERO {
        return None;
    }
    let expected = base * VAT_RATE;
    let tolerance = expected * VAT_TOLERANCE;

    candidates
        .iter()
        .copied()
        .filter(|c| *c != base && *c > Decimal::ZERO)
        .filter(|c| (*c - expected).abs() <= tolerance)
        .min_by_key(|c| (*c - expected).abs())
}

fn extract_creditor(text: &str) -> Option<(String, Option<String>)> {
    let caps = CREDITOR_RE.captures(text)?;
    let line = caps.get(1)?.as_str();

    // "JUAN PÉREZ C.C. 79.456.123" -> nome antes da identificação
    let name = match ID_MARKER_RE.find(line) {
        Some(marker) => &line[..marker.start()],
        None => line,
    };
    let name = collapse_whitespace(name.trim_matches(|c: char| c.is_whitespace() || ",;:-".contains(c)));

    // A identificação só vale na linha do credor ou na seguinte
    let start = caps.get(1).map(|m| m.start()).unwrap_or(0);
    let window: String = text[start..].lines().take(2).collect::<Vec<_>>().join("\n");
    let nit = ID_VALUE_RE
        .captures(&window)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string());

    if name.is_empty() { None } else { Some((name, nit)) }
}

fn extract_concept(text: &str) -> Option<String> {
    let haystack = fold_accents(&collapse_whitespace(text)).to_uppercase();
    KNOWN_CONCEPTS
        .iter()
        .find(|concept| haystack.contains(&fold_accents(concept)))
        .map(|concept| concept.to_string())
}

fn extract_description(text: &str) -> Option<String> {
    let body = DESCRIPTION_RE.captures(text)?.get(1)?.as_str();
    let body = collapse_whitespace(body);
    if body.is_empty() {
        return None;
    }
    Some(body.chars().take(MAX_DESCRIPTION_CHARS).collect())
}

// Usa o último "Total" de início de linha (o total geral fica no fim).
fn extract_total(text: &str) -> Option<Decimal> {
    TOTAL_RE
        .captures_iter(text)
        .filter(|caps| !caps[1].to_uppercase().contains("IVA"))
        .filter_map(|caps| clean_numeric_value(&caps[2]))
        .filter(|value| *value > Decimal::ZERO)
        .last()
}

fn extract_vat(text: &str, total: Option<Decimal>) -> Option<Decimal> {
    // Valores muito pequenos são a própria taxa ("IVA 19"), não o imposto.
    let min_vat = Decimal::from(100);
    VAT_RE
        .captures_iter(text)
        .filter_map(|caps| clean_numeric_value(&caps[1]))
        .find(|value| *value >= min_vat && total.is_none_or(|t| *value < t))
}

fn collect_large_numbers(text: &str) -> Vec<Decimal> {
    LARGE_NUMBER_RE
        .find_iter(text)
        .filter_map(|m| clean_numeric_value(m.as_str()))
        .collect()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accents(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'Á' | 'À' | 'Ä' => 'A',
            'É' | 'È' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}
