// src/services/pdf_text.rs

use tracing::{info, warn};

use crate::common::error::AppError;

/// Abaixo disso consideramos o PDF escaneado (só imagem).
const MIN_TEXT_CHARS: usize = 30;

pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// Extrai o texto do PDF numa thread bloqueante; o pdf-extract é síncrono e pode entrar em pânico
/// com arquivos malformados.
pub async fn extract_text_from_pdf(bytes: Vec<u8>) -> Result<String, AppError> {
    if !is_pdf(&bytes) {
        return Err(AppError::InvalidUpload("el archivo no es un PDF".to_string()));
    }

    let size = bytes.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!(error = %e, "pdf-extract entrou em pânico");
            AppError::PdfExtraction(e.to_string())
        })?
        .map_err(|e| {
            warn!(error = %e, "pdf-extract falhou");
            AppError::PdfExtraction(e.to_string())
        })?;

    let meaningful = text.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_TEXT_CHARS {
        info!(bytes = size, chars = meaningful, "Texto curto demais, PDF provavelmente escaneado");
        return Err(AppError::ScannedPdf);
    }

    info!(bytes = size, chars = meaningful, "Texto extraído do PDF");
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{INVOICE_LINES, pdf_with_lines};
    use super::*;

    #[test]
    fn detects_pdf_magic_bytes() {
        assert!(is_pdf(b"%PDF-1.7\n..."));
        assert!(!is_pdf(b"\x89PNG\r\n\x1a\n"));
        assert!(!is_pdf(b""));
    }

    #[tokio::test]
    async fn rejects_non_pdf_bytes() {
        let result = extract_text_from_pdf(b"this is not a pdf".to_vec()).await;
        assert!(matches!(result, Err(AppError::InvalidUpload(_))));
    }

    #[tokio::test]
    async fn garbage_after_header_is_an_extraction_error() {
        let result = extract_text_from_pdf(b"%PDF-1.4 garbage garbage".to_vec()).await;
        assert!(matches!(result, Err(AppError::PdfExtraction(_))));
    }

    #[tokio::test]
    async fn extracts_text_from_a_real_pdf() {
        let text = extract_text_from_pdf(pdf_with_lines(INVOICE_LINES)).await.unwrap();

        assert!(text.contains("CUENTA DE COBRO"));
        assert!(text.contains("SERVICIOS XYZ"));
        assert!(text.contains("153.981"));
        // cada Tj numa altura diferente vira uma linha
        assert!(text.lines().filter(|l| !l.trim().is_empty()).count() >= INVOICE_LINES.len());
    }

    #[tokio::test]
    async fn pdf_without_text_is_treated_as_scanned() {
        let result = extract_text_from_pdf(pdf_with_lines(&[])).await;
        assert!(matches!(result, Err(AppError::ScannedPdf)));
    }

    #[tokio::test]
    async fn too_little_text_is_treated_as_scanned() {
        let result = extract_text_from_pdf(pdf_with_lines(&["Pagina 1"])).await;
        assert!(matches!(result, Err(AppError::ScannedPdf)));
    }
}
