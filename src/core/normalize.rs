use chrono::NaiveDate;

use super::types::OperationRole;

/// Strip every non-digit character from a tax identifier.
///
/// `"11.222.333/0001-81"` becomes `"11222333000181"`; empty input stays
/// empty.
pub fn clean_tax_id(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True iff the cleaned value is exactly the 14 digits of a CNPJ.
pub fn is_valid_tax_id(raw: &str) -> bool {
    clean_tax_id(raw).len() == 14
}

/// Classify a document's directionality relative to the operating entity.
///
/// The operator issuing the document is a sale (`Outbound`); the operator
/// receiving it is a purchase (`Inbound`); anything else — including an
/// empty operator ID — is `Unknown`. This comparison is the single source
/// of truth for directionality; the free-text operation nature never
/// overrides it.
pub fn classify_role(issuer_id: &str, recipient_id: &str, operator_id: &str) -> OperationRole {
    let operator = clean_tax_id(operator_id);
    if operator.is_empty() {
        return OperationRole::Unknown;
    }
    if operator == clean_tax_id(issuer_id) {
        OperationRole::Outbound
    } else if operator == clean_tax_id(recipient_id) {
        OperationRole::Inbound
    } else {
        OperationRole::Unknown
    }
}

/// Compose a postal address from its NF-e sub-elements.
///
/// Fixed pattern `"{street} {number}, {district}, {city} - {state}"`;
/// missing components join as empty strings, the shape stays stable.
pub fn compose_address(
    street: &str,
    number: &str,
    district: &str,
    city: &str,
    state: &str,
) -> String {
    format!("{street} {number}, {district}, {city} - {state}")
}

/// Best-effort numeric coercion. Unparsable or empty input yields
/// `default`, never an error.
pub fn to_float(raw: &str, default: f64) -> f64 {
    raw.trim().parse().unwrap_or(default)
}

/// Parse a Brazilian-formatted money string (`"1.234,56"`).
///
/// Thousands periods are dropped and the decimal comma becomes a point.
/// Plain `"1234.56"` also parses.
pub fn parse_brl_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.contains(',') {
        let normalized = trimmed.replace('.', "").replace(',', ".");
        normalized.parse().ok()
    } else {
        trimmed.parse().ok()
    }
}

/// Convert a `dd/mm/yyyy` date to ISO `YYYY-MM-DD`. Dates already in ISO
/// form pass through unchanged; anything else is `None`.
pub fn to_iso_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(d.format("%Y-%m-%d").to_string());
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tax_id_strips_punctuation() {
        assert_eq!(clean_tax_id("11.222.333/0001-81"), "11222333000181");
        assert_eq!(clean_tax_id(""), "");
        assert_eq!(clean_tax_id("abc"), "");
    }

    #[test]
    fn tax_id_validity_is_14_digits() {
        assert!(is_valid_tax_id("11.222.333/0001-81"));
        assert!(!is_valid_tax_id("123"));
        assert!(!is_valid_tax_id(""));
    }

    #[test]
    fn role_classification() {
        let issuer = "11222333000181";
        let recipient = "99888777000100";
        assert_eq!(classify_role(issuer, recipient, issuer), OperationRole::Outbound);
        assert_eq!(classify_role(issuer, recipient, recipient), OperationRole::Inbound);
        assert_eq!(
            classify_role(issuer, recipient, "00000000000000"),
            OperationRole::Unknown
        );
        assert_eq!(classify_role(issuer, recipient, ""), OperationRole::Unknown);
    }

    #[test]
    fn role_classification_cleans_inputs() {
        assert_eq!(
            classify_role("11.222.333/0001-81", "", "11222333000181"),
            OperationRole::Outbound
        );
    }

    #[test]
    fn address_tolerates_missing_parts() {
        assert_eq!(
            compose_address("Rua A", "10", "Centro", "Recife", "PE"),
            "Rua A 10, Centro, Recife - PE"
        );
        assert_eq!(compose_address("", "", "", "", ""), " , , ,  - ");
    }

    #[test]
    fn to_float_never_errors() {
        assert_eq!(to_float("12.5", 0.0), 12.5);
        assert_eq!(to_float("  7 ", 0.0), 7.0);
        assert_eq!(to_float("n/a", 0.0), 0.0);
        assert_eq!(to_float("", 1.5), 1.5);
    }

    #[test]
    fn brl_amount_handles_both_locales() {
        assert_eq!(parse_brl_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_brl_amount("1234.56"), Some(1234.56));
        assert_eq!(parse_brl_amount("99,90"), Some(99.9));
        assert_eq!(parse_brl_amount(""), None);
        assert_eq!(parse_brl_amount("R$"), None);
    }

    #[test]
    fn iso_date_conversion() {
        assert_eq!(to_iso_date("25/12/2024").as_deref(), Some("2024-12-25"));
        assert_eq!(to_iso_date("2024-12-25").as_deref(), Some("2024-12-25"));
        assert_eq!(to_iso_date("13/13/2024"), None);
        assert_eq!(to_iso_date(""), None);
    }
}
