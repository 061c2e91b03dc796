use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::core::{
    Invoice, LineItem, IcmsRegime, NotaError, OperationRole, classify_role, clean_tax_id,
    compose_address, to_float,
};

/// Parse an NF-e 4.00 XML document into a canonical invoice.
///
/// `operator_id` is the CNPJ of the entity operating the system; when
/// non-empty the operation role is classified against it, otherwise the
/// document's own `tpNF` flag serves as a fallback hint ("1" = outbound).
///
/// # Errors
///
/// Returns [`NotaError::Parse`] when a required block (`ide`, `emit`,
/// `ICMSTot`) is absent and [`NotaError::Xml`] on reader-level failures.
pub fn parse_nfe_xml(xml: &str, operator_id: &str) -> Result<Invoice, NotaError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut nota = ParsedNota::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = std::str::from_utf8(e.local_name().as_ref())
                    .unwrap_or("")
                    .to_string();

                match name.as_str() {
                    "infNFe" => {
                        for attr in e.attributes().flatten() {
                            let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
                            let val = std::str::from_utf8(&attr.value).unwrap_or("");
                            match key {
                                // Id is "NFe" + the 44-digit access key.
                                "Id" => {
                                    nota.access_key =
                                        Some(val.strip_prefix("NFe").unwrap_or(val).to_string());
                                }
                                "versao" => nota.schema_version = Some(val.to_string()),
                                _ => {}
                            }
                        }
                    }
                    "ide" => nota.ide_seen = true,
                    "emit" => nota.emit_seen = true,
                    "dest" => nota.dest_seen = true,
                    "ICMSTot" => nota.icmstot_seen = true,
                    "det" => nota.current_item = Some(ParsedItem::default()),
                    _ => {
                        // Children of the ICMS group name the regime variant.
                        if path.last().map(String::as_str) == Some("ICMS") {
                            if let Some(item) = nota.current_item.as_mut() {
                                item.icms_regime = match name.as_str() {
                                    "ICMS00" => IcmsRegime::Full,
                                    "ICMS10" => IcmsRegime::PartialSt,
                                    _ => {
                                        warn!(variant = %name, "unrecognized ICMS variant");
                                        IcmsRegime::Unrecognized
                                    }
                                };
                            }
                        }
                    }
                }

                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if !text.is_empty() {
                    nota.handle_text(&path, &text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                if ended == "det" {
                    nota.finish_item();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(NotaError::Xml(format!("XML parse error: {e}"))),
            _ => {}
        }
    }

    nota.into_invoice(operator_id)
}

#[derive(Default)]
struct ParsedNota {
    ide_seen: bool,
    emit_seen: bool,
    dest_seen: bool,
    icmstot_seen: bool,

    number: Option<String>,
    issue_date: Option<String>,
    operation_nature: Option<String>,
    tp_nf: Option<String>,
    schema_version: Option<String>,
    access_key: Option<String>,

    issuer_tax_id: Option<String>,
    issuer_name: Option<String>,
    issuer_registration: Option<String>,
    issuer_addr: AddressParts,

    recipient_tax_id: Option<String>,
    recipient_name: Option<String>,
    recipient_registration: Option<String>,
    recipient_addr: AddressParts,

    declared_total: Option<String>,
    total_icms: Option<String>,
    total_pis: Option<String>,
    total_cofins: Option<String>,

    items: Vec<LineItem>,
    current_item: Option<ParsedItem>,
}

#[derive(Default)]
struct AddressParts {
    street: Option<String>,
    number: Option<String>,
    district: Option<String>,
    city: Option<String>,
    state: Option<String>,
}

impl AddressParts {
    fn compose(&self) -> String {
        compose_address(
            self.street.as_deref().unwrap_or(""),
            self.number.as_deref().unwrap_or(""),
            self.district.as_deref().unwrap_or(""),
            self.city.as_deref().unwrap_or(""),
            self.state.as_deref().unwrap_or(""),
        )
    }

    fn set(&mut self, leaf: &str, text: &str) {
        let slot = match leaf {
            "xLgr" => &mut self.street,
            "nro" => &mut self.number,
            "xBairro" => &mut self.district,
            "xMun" => &mut self.city,
            "UF" => &mut self.state,
            _ => return,
        };
        *slot = Some(text.to_string());
    }
}

#[derive(Default)]
struct ParsedItem {
    prod_seen: bool,
    product_code: Option<String>,
    description: Option<String>,
    ncm: Option<String>,
    cest: Option<String>,
    cfop: Option<String>,
    unit: Option<String>,
    quantity: Option<String>,
    unit_value: Option<String>,
    line_total: Option<String>,

    icms_regime: IcmsRegime,
    icms_status: Option<String>,
    icms_value: Option<f64>,
    pis_status: Option<String>,
    pis_value: Option<f64>,
    cofins_status: Option<String>,
    cofins_value: Option<f64>,
    ipi_status: Option<String>,
    ipi_value: Option<f64>,
}

fn under(path: &[String], ancestor: &str) -> bool {
    path.iter().any(|p| p == ancestor)
}

impl ParsedNota {
    fn handle_text(&mut self, path: &[String], text: &str) {
        let Some(leaf) = path.last().map(String::as_str) else {
            return;
        };

        // Line-item context first: `det` nests its own CNPJ-free subtree.
        if under(path, "det") {
            self.handle_item_text(path, leaf, text);
            return;
        }

        if under(path, "ide") {
            match leaf {
                "nNF" => self.number = Some(text.to_string()),
                // dhEmi is a full timestamp; only the date portion is kept.
                "dhEmi" => {
                    self.issue_date = Some(text.get(..10).unwrap_or(text).to_string());
                }
                "natOp" => self.operation_nature = Some(text.to_string()),
                "tpNF" => self.tp_nf = Some(text.to_string()),
                _ => {}
            }
            return;
        }

        if under(path, "emit") {
            if under(path, "enderEmit") {
                self.issuer_addr.set(leaf, text);
            } else {
                match leaf {
                    "CNPJ" => self.issuer_tax_id = Some(text.to_string()),
                    "xNome" => self.issuer_name = Some(text.to_string()),
                    "IE" => self.issuer_registration = Some(text.to_string()),
                    _ => {}
                }
            }
            return;
        }

        if under(path, "dest") {
            if under(path, "enderDest") {
                self.recipient_addr.set(leaf, text);
            } else {
                match leaf {
                    "CNPJ" => self.recipient_tax_id = Some(text.to_string()),
                    "xNome" => self.recipient_name = Some(text.to_string()),
                    "IE" => self.recipient_registration = Some(text.to_string()),
                    _ => {}
                }
            }
            return;
        }

        if under(path, "ICMSTot") {
            match leaf {
                "vNF" => self.declared_total = Some(text.to_string()),
                "vICMS" => self.total_icms = Some(text.to_string()),
                "vPIS" => self.total_pis = Some(text.to_string()),
                "vCOFINS" => self.total_cofins = Some(text.to_string()),
                _ => {}
            }
        }
    }

    fn handle_item_text(&mut self, path: &[String], leaf: &str, text: &str) {
        let Some(item) = self.current_item.as_mut() else {
            return;
        };

        if under(path, "prod") {
            item.prod_seen = true;
            let slot = match leaf {
                "cProd" => &mut item.product_code,
                "xProd" => &mut item.description,
                "NCM" => &mut item.ncm,
                "CEST" => &mut item.cest,
                "CFOP" => &mut item.cfop,
                "uCom" => &mut item.unit,
                "qCom" => &mut item.quantity,
                "vUnCom" => &mut item.unit_value,
                "vProd" => &mut item.line_total,
                _ => return,
            };
            *slot = Some(text.to_string());
            return;
        }

        // Only the recognized ICMS variants contribute values; an
        // unrecognized variant stays Unrecognized with zero amounts.
        if under(path, "ICMS00") || under(path, "ICMS10") {
            match leaf {
                "CST" => item.icms_status = Some(text.to_string()),
                "vICMS" => item.icms_value = Some(to_float(text, 0.0)),
                _ => {}
            }
            return;
        }

        if under(path, "PISAliq") {
            match leaf {
                "CST" => item.pis_status = Some(text.to_string()),
                "vPIS" => item.pis_value = Some(to_float(text, 0.0)),
                _ => {}
            }
            return;
        }

        if under(path, "COFINSAliq") {
            match leaf {
                "CST" => item.cofins_status = Some(text.to_string()),
                "vCOFINS" => item.cofins_value = Some(to_float(text, 0.0)),
                _ => {}
            }
            return;
        }

        if under(path, "IPI") {
            match leaf {
                "CST" => item.ipi_status = Some(text.to_string()),
                "vIPI" => item.ipi_value = Some(to_float(text, 0.0)),
                _ => {}
            }
        }
    }

    /// Close out the current `det` block. Entries without a `prod`
    /// sub-block are skipped entirely.
    fn finish_item(&mut self) {
        let Some(parsed) = self.current_item.take() else {
            return;
        };
        if !parsed.prod_seen {
            debug!("skipping det block without prod");
            return;
        }

        let icms_status = parsed.icms_status.unwrap_or_default();
        // IPI blocks frequently omit their own CST; the ICMS status code is
        // the best-effort substitute.
        let ipi_status = parsed
            .ipi_status
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| icms_status.clone());

        self.items.push(LineItem {
            product_code: parsed.product_code.unwrap_or_default(),
            description: parsed.description.unwrap_or_default(),
            ncm: parsed.ncm.unwrap_or_default(),
            cfop: parsed.cfop.unwrap_or_default(),
            unit: parsed.unit.unwrap_or_default(),
            quantity: parsed.quantity.unwrap_or_else(|| "0".to_string()),
            unit_value: parsed.unit_value.unwrap_or_else(|| "0.00".to_string()),
            line_total: parsed.line_total.unwrap_or_else(|| "0.00".to_string()),
            icms_status,
            pis_status: parsed.pis_status.unwrap_or_default(),
            cofins_status: parsed.cofins_status.unwrap_or_default(),
            ipi_status,
            cest: parsed.cest.unwrap_or_default(),
            icms_value: parsed.icms_value.unwrap_or(0.0),
            ipi_value: parsed.ipi_value.unwrap_or(0.0),
            pis_value: parsed.pis_value.unwrap_or(0.0),
            cofins_value: parsed.cofins_value.unwrap_or(0.0),
            icms_regime: parsed.icms_regime,
        });
    }

    fn into_invoice(self, operator_id: &str) -> Result<Invoice, NotaError> {
        if !self.ide_seen {
            return Err(NotaError::Parse("'ide' block not found".into()));
        }
        if !self.emit_seen {
            return Err(NotaError::Parse("'emit' block not found".into()));
        }
        if !self.icmstot_seen {
            return Err(NotaError::Parse("'ICMSTot' block not found".into()));
        }

        let issuer_tax_id = clean_tax_id(&self.issuer_tax_id.unwrap_or_default());
        let recipient_tax_id = clean_tax_id(&self.recipient_tax_id.unwrap_or_default());

        // The operator's CNPJ is authoritative for directionality; the
        // document's tpNF flag is only a hint when no operator is known.
        let operation_role = if operator_id.trim().is_empty() {
            match self.tp_nf.as_deref() {
                Some("1") => OperationRole::Outbound,
                _ => OperationRole::Inbound,
            }
        } else {
            classify_role(&issuer_tax_id, &recipient_tax_id, operator_id)
        };

        let recipient_address = if self.dest_seen {
            self.recipient_addr.compose()
        } else {
            String::new()
        };

        let invoice = Invoice {
            number: self.number.unwrap_or_default(),
            issue_date: self.issue_date.unwrap_or_default(),
            issuer_tax_id,
            issuer_name: self.issuer_name.unwrap_or_default(),
            issuer_registration: self.issuer_registration.unwrap_or_default(),
            issuer_address: self.issuer_addr.compose(),
            recipient_tax_id,
            recipient_name: self.recipient_name.unwrap_or_default(),
            recipient_registration: self.recipient_registration.unwrap_or_default(),
            recipient_address,
            access_key: self.access_key.unwrap_or_default(),
            operation_nature: self.operation_nature.unwrap_or_default(),
            declared_total: self.declared_total.unwrap_or_else(|| "0.00".to_string()),
            operation_role,
            schema_version: self.schema_version.unwrap_or_else(|| "4.00".to_string()),
            total_icms: self.total_icms.unwrap_or_else(|| "0.00".to_string()),
            total_pis: self.total_pis.unwrap_or_else(|| "0.00".to_string()),
            total_cofins: self.total_cofins.unwrap_or_else(|| "0.00".to_string()),
            items: self.items,
        };

        debug!(
            number = %invoice.number,
            role = %invoice.operation_role,
            items = invoice.items.len(),
            total = %invoice.declared_total,
            "parsed NF-e XML"
        );
        Ok(invoice)
    }
}
