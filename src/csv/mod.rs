//! Tabular NF-e export parsing.
//!
//! The input is a semicolon-delimited table where every row repeats its
//! parent invoice's header fields and carries either one line item or a
//! synthetic `TOTAL` marker with the invoice's declared total. Rows are
//! regrouped into canonical invoices; one file can yield many.

use std::collections::HashMap;

use csv::ReaderBuilder;
use tracing::debug;

use crate::core::{Invoice, LineItem, NotaError, classify_role, clean_tax_id, to_float};

/// Parse a semicolon-delimited NF-e export into zero or more invoices.
///
/// Rows are grouped by `"{number}_{access key}"` (or the bare number when
/// no key is present); the first row of a group materializes the invoice
/// header, rows with a non-empty product code append line items, and a row
/// whose `item` column is the literal `TOTAL` overwrites the group's
/// declared total without contributing an item. Rows with an empty
/// document number are skipped. Groups are emitted in first-seen order.
pub fn parse_nfe_csv(data: &str, operator_id: &str) -> Result<Vec<Invoice>, NotaError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| NotaError::Csv(format!("failed to read CSV headers: {e}")))?
        .clone();
    let columns: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let mut invoices: Vec<Invoice> = Vec::new();
    let mut groups: HashMap<String, usize> = HashMap::new();

    for record in reader.records() {
        let record = record.map_err(|e| NotaError::Csv(format!("failed to read CSV row: {e}")))?;
        let field = |name: &str| -> &str {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .unwrap_or("")
                .trim()
        };

        let number = field("numero_nota").to_string();
        if number.is_empty() {
            continue;
        }
        let access_key = field("chave_acesso").to_string();
        let group_key = if access_key.is_empty() {
            number.clone()
        } else {
            format!("{number}_{access_key}")
        };

        if field("item") == "TOTAL" {
            // Synthetic totals row: not a line item, only the declared
            // total — resolved through the same composite key.
            if let Some(&idx) = groups.get(&group_key) {
                invoices[idx].declared_total = field("valor_total_nota").to_string();
            } else {
                debug!(number = %number, "TOTAL row before any item row, ignored");
            }
            continue;
        }

        let idx = *groups.entry(group_key).or_insert_with(|| {
            invoices.push(Invoice {
                number: number.clone(),
                issue_date: field("data_emissao").to_string(),
                issuer_tax_id: clean_tax_id(field("emitente_cnpj")),
                issuer_name: field("emitente_razao_social").to_string(),
                issuer_registration: field("emitente_ie").to_string(),
                issuer_address: field("emitente_endereco").to_string(),
                recipient_tax_id: clean_tax_id(field("destinatario_cnpj")),
                recipient_name: field("destinatario_razao_social").to_string(),
                recipient_registration: field("destinatario_ie").to_string(),
                recipient_address: field("destinatario_endereco").to_string(),
                access_key: access_key.clone(),
                operation_nature: {
                    let nature = field("natureza_operacao");
                    if nature.is_empty() {
                        field("tipo_operacao").to_string()
                    } else {
                        nature.to_string()
                    }
                },
                // Overwritten by the group's TOTAL row.
                declared_total: String::new(),
                schema_version: field("serie").to_string(),
                ..Invoice::default()
            });
            invoices.len() - 1
        });

        if !field("produto_codigo").is_empty() {
            invoices[idx].items.push(LineItem {
                product_code: field("produto_codigo").to_string(),
                description: field("produto_descricao").to_string(),
                ncm: field("produto_ncm").to_string(),
                cfop: field("produto_cfop").to_string(),
                unit: field("produto_unidade").to_string(),
                quantity: field("produto_quantidade").to_string(),
                unit_value: field("produto_valor_unitario").to_string(),
                line_total: field("produto_valor_total").to_string(),
                icms_status: field("icms_cst").to_string(),
                pis_status: field("pis_cst").to_string(),
                cofins_status: field("cofins_cst").to_string(),
                ipi_status: field("ipi_cst").to_string(),
                cest: field("cest").to_string(),
                icms_value: to_float(field("icms_valor"), 0.0),
                ipi_value: to_float(field("ipi_valor"), 0.0),
                pis_value: to_float(field("pis_valor"), 0.0),
                cofins_value: to_float(field("cofins_valor"), 0.0),
                ..LineItem::default()
            });
        }
    }

    for invoice in &mut invoices {
        invoice.operation_role = classify_role(
            &invoice.issuer_tax_id,
            &invoice.recipient_tax_id,
            operator_id,
        );
    }

    debug!(invoices = invoices.len(), "parsed NF-e CSV export");
    Ok(invoices)
}
