use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::extract::extract_text;
use crate::core::{Invoice, NotaError, classify_role, clean_tax_id, parse_brl_amount, to_iso_date};

/// Contract expected from an AI text-to-structured-data collaborator.
///
/// The request is an instruction template plus the raw document text; the
/// response is free text that should contain one JSON object matching the
/// canonical invoice schema. Implementations own their transport, timeouts,
/// and transient-failure retries; an `Err` here is terminal for the file.
pub trait TextStructurer {
    fn structure(&self, instruction: &str, text: &str) -> Result<String, NotaError>;
}

/// Fixed instruction sent with every structuring request. Demands a single
/// raw JSON object in the canonical wire shape; field semantics match the
/// serde renames on [`Invoice`].
pub const INSTRUCTION: &str = r#"Extraia os dados da Nota Fiscal Eletrônica do texto a seguir. Retorne APENAS um objeto JSON válido, sem markdown, sem blocos de código e sem explicações, com a estrutura exata:
{
  "numero": "número da NF",
  "data_emissao": "YYYY-MM-DD",
  "cnpj_emitente": "14 dígitos sem pontuação",
  "nome_emitente": "razão social",
  "ie_emitente": "IE sem pontuação",
  "endereco_emitente": "endereço completo",
  "cnpj_destinatario": "14 dígitos sem pontuação",
  "nome_destinatario": "nome",
  "ie_destinatario": "IE sem pontuação",
  "endereco_destinatario": "endereço completo",
  "chave_nfe": "44 dígitos",
  "natureza_operacao": "descrição",
  "valor_total_nota": "valor sem R$",
  "tipo_operacao": "Entrada/Saída",
  "versao": "versão do layout",
  "itens": [
    {
      "codigo_produto": "código",
      "descricao_produto": "nome do produto",
      "ncm": "8 dígitos",
      "cfop": "código",
      "unidade": "UN",
      "quantidade": "quantidade",
      "valor_unitario": "valor",
      "valor_total": "valor",
      "cst_icms": "código",
      "cst_pis": "código",
      "cst_cofins": "código",
      "cst_ipi": "código",
      "cest": "código",
      "icms_valor": 0.0,
      "ipi_valor": 0.0,
      "pis_valor": 0.0,
      "cofins_valor": 0.0
    }
  ]
}
Use null para dados ausentes."#;

/// Result of running the PDF adapter over one file.
#[derive(Debug)]
pub enum PdfOutcome {
    /// The AI response parsed into a full canonical record.
    Structured(Invoice),
    /// The AI response was unusable; a partial record was recovered from
    /// the raw text by fixed regular expressions. Carries no line items.
    Fallback(Invoice),
    /// No AI collaborator was available; only the extracted text is
    /// returned for manual handling.
    TextOnly(String),
}

/// Normalize an AI response against the enumerated set of accepted
/// malformations: a leading ```` ```json ````/```` ``` ```` fence, a
/// trailing fence, and one stray leading `{` / trailing `}`. The result is
/// always re-wrapped in braces; anything still unparsable after this is a
/// structural failure, not something to recover from.
pub fn sanitize_response(raw: &str) -> String {
    let mut s = raw.trim();

    if let Some(rest) = s.strip_prefix("```json") {
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim_end();
    }

    if let Some(rest) = s.strip_prefix('{') {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix('}') {
        s = rest;
    }

    format!("{{{}}}", s.trim())
}

static RE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Nº\s*(\d+)").unwrap());
static RE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"EMISSÃO:\s*(\d{2}/\d{2}/\d{4})").unwrap());
static RE_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"VALOR TOTAL:\s*R\$\s*([\d.,]+)").unwrap());
static RE_CNPJ: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CNPJ\s*:?\s*([\d./-]+)").unwrap());

/// Deterministic last resort: recover document number, issue date,
/// declared total, and issuer CNPJ from the raw text. Everything else is
/// left empty and no line items are produced.
pub fn fallback_from_text(text: &str, operator_id: &str) -> Invoice {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    let issuer_tax_id = clean_tax_id(&capture(&RE_CNPJ));
    let issue_date = to_iso_date(&capture(&RE_DATE)).unwrap_or_default();
    let declared_total = parse_brl_amount(&capture(&RE_TOTAL))
        .map(|v| format!("{v:.2}"))
        .unwrap_or_default();

    Invoice {
        number: capture(&RE_NUMBER),
        issue_date,
        declared_total,
        operation_role: classify_role(&issuer_tax_id, "", operator_id),
        issuer_tax_id,
        ..Invoice::default()
    }
}

/// Run the full PDF pipeline over one file.
///
/// Extracts text (terminal failure when the PDF is unreadable or empty),
/// then, if a collaborator is available, requests a structured guess and
/// parses it; an unusable response degrades to the regex fallback. The
/// operation role of any structured or fallback record is recomputed via
/// [`classify_role`] — the AI's guess never survives. Without a
/// collaborator only the raw text is returned.
pub fn process_pdf(
    bytes: &[u8],
    operator_id: &str,
    structurer: Option<&dyn TextStructurer>,
) -> Result<PdfOutcome, NotaError> {
    let text = extract_text(bytes)?;
    debug!(chars = text.len(), "extracted PDF text");

    let Some(structurer) = structurer else {
        return Ok(PdfOutcome::TextOnly(text));
    };

    let response = structurer.structure(INSTRUCTION, &text)?;
    let cleaned = sanitize_response(&response);

    match serde_json::from_str::<Invoice>(&cleaned) {
        Ok(mut invoice) => {
            invoice.issuer_tax_id = clean_tax_id(&invoice.issuer_tax_id);
            invoice.recipient_tax_id = clean_tax_id(&invoice.recipient_tax_id);
            invoice.operation_role = classify_role(
                &invoice.issuer_tax_id,
                &invoice.recipient_tax_id,
                operator_id,
            );
            debug!(number = %invoice.number, items = invoice.items.len(), "AI response parsed");
            Ok(PdfOutcome::Structured(invoice))
        }
        Err(e) => {
            warn!(error = %e, "AI response not parseable, using regex fallback");
            Ok(PdfOutcome::Fallback(fallback_from_text(&text, operator_id)))
        }
    }
}
