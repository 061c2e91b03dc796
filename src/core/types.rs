use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Directionality of a fiscal document relative to the operating entity.
///
/// Derived exclusively from CNPJ comparison (see
/// [`classify_role`](crate::core::classify_role)); the document's free-text
/// operation nature never overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationRole {
    /// The operator issued the document (a sale).
    Outbound,
    /// The operator is the recipient (a purchase).
    Inbound,
    /// Neither party matches the operator.
    #[default]
    Unknown,
}

impl OperationRole {
    /// Canonical wire label, as written by SEFAZ-facing exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Outbound => "Saída",
            Self::Inbound => "Entrada",
            Self::Unknown => "Desconhecida",
        }
    }

    /// Parse a wire label. Accent-stripped spellings are accepted;
    /// anything unrecognized is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Saída" | "Saida" => Self::Outbound,
            "Entrada" => Self::Inbound,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for OperationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for OperationRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for OperationRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // AI guesses and legacy exports are unreliable here; unknown or
        // missing labels collapse to Unknown and the role is recomputed
        // downstream anyway.
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Self::from_label).unwrap_or_default())
    }
}

/// Which ICMS regime sub-block a line item's tax values came from.
///
/// The NF-e schema nests the actual ICMS fields under one of many
/// regime-specific tags. The parser recognizes the common ones; a document
/// carrying a different variant is reported as `Unrecognized` rather than
/// silently looking like an untaxed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IcmsRegime {
    /// `ICMS00` — fully taxed.
    Full,
    /// `ICMS10` — taxed with ST (substituição tributária).
    PartialSt,
    /// An ICMS sub-block was present but its variant is not recognized.
    /// Amounts stay 0.0 and the status code empty.
    Unrecognized,
    /// No ICMS sub-block at all.
    #[default]
    Absent,
}

/// One product/service line within an [`Invoice`].
///
/// Quantities and monetary line values are kept as decimal strings exactly
/// as the source declared them; the four per-tax collected amounts are
/// numeric (defaulting to 0.0) because they are what the aggregator sums.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    /// Product code (`cProd`).
    #[serde(rename = "codigo_produto", default, deserialize_with = "stringly")]
    pub product_code: String,
    /// Product description (`xProd`).
    #[serde(rename = "descricao_produto", default, deserialize_with = "stringly")]
    pub description: String,
    /// Fiscal classification code, normally 8 digits.
    #[serde(default, deserialize_with = "stringly")]
    pub ncm: String,
    /// Operation code.
    #[serde(default, deserialize_with = "stringly")]
    pub cfop: String,
    /// Commercial unit (`uCom`).
    #[serde(rename = "unidade", default, deserialize_with = "stringly")]
    pub unit: String,
    /// Commercial quantity, decimal-as-string.
    #[serde(rename = "quantidade", default, deserialize_with = "stringly")]
    pub quantity: String,
    /// Unit value, decimal-as-string.
    #[serde(rename = "valor_unitario", default, deserialize_with = "stringly")]
    pub unit_value: String,
    /// Line total, decimal-as-string.
    #[serde(rename = "valor_total", default, deserialize_with = "stringly")]
    pub line_total: String,
    /// ICMS tax regime status code (CST), may be empty.
    #[serde(rename = "cst_icms", default, deserialize_with = "stringly")]
    pub icms_status: String,
    /// PIS status code, may be empty.
    #[serde(rename = "cst_pis", default, deserialize_with = "stringly")]
    pub pis_status: String,
    /// COFINS status code, may be empty.
    #[serde(rename = "cst_cofins", default, deserialize_with = "stringly")]
    pub cofins_status: String,
    /// IPI status code; the XML parser falls back to the ICMS status when
    /// the IPI block carries none.
    #[serde(rename = "cst_ipi", default, deserialize_with = "stringly")]
    pub ipi_status: String,
    /// CEST code, optional.
    #[serde(default, deserialize_with = "stringly")]
    pub cest: String,
    /// ICMS collected on this line.
    #[serde(rename = "icms_valor", default, deserialize_with = "lenient_f64")]
    pub icms_value: f64,
    /// IPI collected on this line.
    #[serde(rename = "ipi_valor", default, deserialize_with = "lenient_f64")]
    pub ipi_value: f64,
    /// PIS collected on this line.
    #[serde(rename = "pis_valor", default, deserialize_with = "lenient_f64")]
    pub pis_value: f64,
    /// COFINS collected on this line.
    #[serde(rename = "cofins_valor", default, deserialize_with = "lenient_f64")]
    pub cofins_value: f64,
    /// Which ICMS variant supplied the values above. Not on the wire.
    #[serde(skip)]
    pub icms_regime: IcmsRegime,
}

/// One fiscal document (NF-e) with its owned line items.
///
/// Wire names (serde renames) follow the canonical JSON contract used with
/// the AI text-structuring collaborator. Removing an `Invoice` removes its
/// items — ownership is the cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Document number.
    #[serde(rename = "numero", default, deserialize_with = "stringly")]
    pub number: String,
    /// Issue date, ISO `YYYY-MM-DD`.
    #[serde(rename = "data_emissao", default, deserialize_with = "stringly")]
    pub issue_date: String,
    /// Issuer CNPJ, 14 digits.
    #[serde(rename = "cnpj_emitente", default, deserialize_with = "stringly")]
    pub issuer_tax_id: String,
    /// Issuer legal name.
    #[serde(rename = "nome_emitente", default, deserialize_with = "stringly")]
    pub issuer_name: String,
    /// Issuer state registration number (IE).
    #[serde(rename = "ie_emitente", default, deserialize_with = "stringly")]
    pub issuer_registration: String,
    /// Composed issuer address.
    #[serde(rename = "endereco_emitente", default, deserialize_with = "stringly")]
    pub issuer_address: String,
    /// Recipient CNPJ; empty for flows without an identified recipient.
    #[serde(rename = "cnpj_destinatario", default, deserialize_with = "stringly")]
    pub recipient_tax_id: String,
    /// Recipient name.
    #[serde(rename = "nome_destinatario", default, deserialize_with = "stringly")]
    pub recipient_name: String,
    /// Recipient state registration number.
    #[serde(rename = "ie_destinatario", default, deserialize_with = "stringly")]
    pub recipient_registration: String,
    /// Composed recipient address.
    #[serde(rename = "endereco_destinatario", default, deserialize_with = "stringly")]
    pub recipient_address: String,
    /// 44-digit access key; empty when the source has none, in which case
    /// the (number, issuer, issue date) triple identifies the document.
    #[serde(rename = "chave_nfe", default, deserialize_with = "stringly")]
    pub access_key: String,
    /// Free-text nature of the operation. Informational only — never used
    /// for directionality.
    #[serde(rename = "natureza_operacao", default, deserialize_with = "stringly")]
    pub operation_nature: String,
    /// Declared total value, decimal-as-string.
    #[serde(rename = "valor_total_nota", default, deserialize_with = "stringly")]
    pub declared_total: String,
    /// Directionality relative to the operator.
    #[serde(rename = "tipo_operacao", default)]
    pub operation_role: OperationRole,
    /// Schema/layout version tag (e.g. "4.00").
    #[serde(rename = "versao", default, deserialize_with = "stringly")]
    pub schema_version: String,
    /// Document-level ICMS total (from `ICMSTot`), decimal-as-string.
    #[serde(rename = "v_icms", default = "zero_money", deserialize_with = "stringly")]
    pub total_icms: String,
    /// Document-level PIS total, decimal-as-string.
    #[serde(rename = "v_pis", default = "zero_money", deserialize_with = "stringly")]
    pub total_pis: String,
    /// Document-level COFINS total, decimal-as-string.
    #[serde(rename = "v_cofins", default = "zero_money", deserialize_with = "stringly")]
    pub total_cofins: String,
    /// Ordered line items, owned by this invoice.
    #[serde(rename = "itens", default)]
    pub items: Vec<LineItem>,
}

impl Default for Invoice {
    fn default() -> Self {
        Self {
            number: String::new(),
            issue_date: String::new(),
            issuer_tax_id: String::new(),
            issuer_name: String::new(),
            issuer_registration: String::new(),
            issuer_address: String::new(),
            recipient_tax_id: String::new(),
            recipient_name: String::new(),
            recipient_registration: String::new(),
            recipient_address: String::new(),
            access_key: String::new(),
            operation_nature: String::new(),
            declared_total: String::new(),
            operation_role: OperationRole::Unknown,
            schema_version: String::new(),
            total_icms: zero_money(),
            total_pis: zero_money(),
            total_cofins: zero_money(),
            items: Vec::new(),
        }
    }
}

impl Invoice {
    /// True when the document carries a (non-empty) access key.
    pub fn has_access_key(&self) -> bool {
        !self.access_key.is_empty()
    }

    /// Identity triple used when no access key is present.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.number, &self.issuer_tax_id, &self.issue_date)
    }
}

fn zero_money() -> String {
    "0.00".to_string()
}

/// Accept a string, number, or null where the canonical model wants a
/// string. AI guesses routinely send `"valor_total_nota": 1234.5` or
/// `"cest": null`; both must land without error.
fn stringly<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    struct StringlyVisitor;

    impl<'de> Visitor<'de> for StringlyVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number, or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_unit<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_none<E: de::Error>(self) -> Result<String, E> {
            Ok(String::new())
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<String, D2::Error> {
            d.deserialize_any(StringlyVisitor)
        }
    }

    deserializer.deserialize_any(StringlyVisitor)
}

/// Accept a number, numeric string, or null where the canonical model wants
/// an `f64`; anything unparsable collapses to 0.0 (tax amounts are never
/// absent).
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, numeric string, or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            Ok(v.trim().parse().unwrap_or(0.0))
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<f64, D2::Error> {
            d.deserialize_any(LenientVisitor)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}
