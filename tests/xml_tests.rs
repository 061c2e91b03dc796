#![cfg(feature = "xml")]

use nota::xml::parse_nfe_xml;
use nota::{IcmsRegime, NotaError, OperationRole};

const OPERATOR: &str = "11222333000181";

fn sample_nfe() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00">
  <NFe>
    <infNFe Id="NFe{key}" versao="4.00">
      <ide>
        <nNF>4521</nNF>
        <dhEmi>2024-03-05T10:22:33-03:00</dhEmi>
        <natOp>VENDA DE MERCADORIA</natOp>
        <tpNF>1</tpNF>
      </ide>
      <emit>
        <CNPJ>11222333000181</CNPJ>
        <xNome>Distribuidora Alfa LTDA</xNome>
        <IE>123456789</IE>
        <enderEmit>
          <xLgr>Rua das Acacias</xLgr>
          <nro>120</nro>
          <xBairro>Centro</xBairro>
          <xMun>Sao Paulo</xMun>
          <UF>SP</UF>
        </enderEmit>
      </emit>
      <dest>
        <CNPJ>99888777000166</CNPJ>
        <xNome>Mercado Beta ME</xNome>
        <IE>987654321</IE>
        <enderDest>
          <xLgr>Av Brasil</xLgr>
          <nro>900</nro>
          <xBairro>Jardins</xBairro>
          <xMun>Campinas</xMun>
          <UF>SP</UF>
        </enderDest>
      </dest>
      <det nItem="1">
        <prod>
          <cProd>P001</cProd>
          <xProd>Cafe torrado 500g</xProd>
          <NCM>09012100</NCM>
          <CEST>1705200</CEST>
          <CFOP>5102</CFOP>
          <uCom>UN</uCom>
          <qCom>10.0000</qCom>
          <vUnCom>25.5000</vUnCom>
          <vProd>255.00</vProd>
        </prod>
        <imposto>
          <ICMS>
            <ICMS00>
              <CST>00</CST>
              <vICMS>30.60</vICMS>
            </ICMS00>
          </ICMS>
          <PIS>
            <PISAliq>
              <CST>01</CST>
              <vPIS>4.21</vPIS>
            </PISAliq>
          </PIS>
          <COFINS>
            <COFINSAliq>
              <CST>01</CST>
              <vCOFINS>19.38</vCOFINS>
            </COFINSAliq>
          </COFINS>
          <IPI>
            <IPITrib>
              <CST>50</CST>
              <vIPI>2.55</vIPI>
            </IPITrib>
          </IPI>
        </imposto>
      </det>
      <total>
        <ICMSTot>
          <vNF>255.00</vNF>
          <vICMS>30.60</vICMS>
          <vPIS>4.21</vPIS>
          <vCOFINS>19.38</vCOFINS>
        </ICMSTot>
      </total>
    </infNFe>
  </NFe>
</nfeProc>"#,
        key = "35240311222333000181550010000045211000045219"
    )
}

#[test]
fn parses_full_document() {
    let inv = parse_nfe_xml(&sample_nfe(), OPERATOR).unwrap();

    assert_eq!(inv.number, "4521");
    assert_eq!(inv.issue_date, "2024-03-05");
    assert_eq!(
        inv.access_key,
        "35240311222333000181550010000045211000045219"
    );
    assert_eq!(inv.schema_version, "4.00");
    assert_eq!(inv.operation_nature, "VENDA DE MERCADORIA");
    assert_eq!(inv.declared_total, "255.00");
    assert_eq!(inv.total_icms, "30.60");
    assert_eq!(inv.total_pis, "4.21");
    assert_eq!(inv.total_cofins, "19.38");

    assert_eq!(inv.issuer_tax_id, "11222333000181");
    assert_eq!(inv.issuer_name, "Distribuidora Alfa LTDA");
    assert_eq!(inv.issuer_registration, "123456789");
    assert_eq!(inv.issuer_address, "Rua das Acacias 120, Centro, Sao Paulo - SP");

    assert_eq!(inv.recipient_tax_id, "99888777000166");
    assert_eq!(inv.recipient_name, "Mercado Beta ME");
    assert_eq!(inv.recipient_address, "Av Brasil 900, Jardins, Campinas - SP");
}

#[test]
fn parses_line_item_with_taxes() {
    let inv = parse_nfe_xml(&sample_nfe(), OPERATOR).unwrap();
    assert_eq!(inv.items.len(), 1);

    let item = &inv.items[0];
    assert_eq!(item.product_code, "P001");
    assert_eq!(item.description, "Cafe torrado 500g");
    assert_eq!(item.ncm, "09012100");
    assert_eq!(item.cest, "1705200");
    assert_eq!(item.cfop, "5102");
    assert_eq!(item.unit, "UN");
    assert_eq!(item.quantity, "10.0000");
    assert_eq!(item.unit_value, "25.5000");
    assert_eq!(item.line_total, "255.00");

    assert_eq!(item.icms_regime, IcmsRegime::Full);
    assert_eq!(item.icms_status, "00");
    assert_eq!(item.icms_value, 30.60);
    assert_eq!(item.pis_status, "01");
    assert_eq!(item.pis_value, 4.21);
    assert_eq!(item.cofins_status, "01");
    assert_eq!(item.cofins_value, 19.38);
    // IPI declared its own CST, so no substitution happens.
    assert_eq!(item.ipi_status, "50");
    assert_eq!(item.ipi_value, 2.55);
}

#[test]
fn role_follows_operator_not_free_text() {
    // natOp says "VENDA" (a sale) regardless of who is asking; only the
    // operator's position in the document decides the role.
    let outbound = parse_nfe_xml(&sample_nfe(), "11222333000181").unwrap();
    assert_eq!(outbound.operation_role, OperationRole::Outbound);

    let inbound = parse_nfe_xml(&sample_nfe(), "99888777000166").unwrap();
    assert_eq!(inbound.operation_role, OperationRole::Inbound);

    let unrelated = parse_nfe_xml(&sample_nfe(), "00000000000191").unwrap();
    assert_eq!(unrelated.operation_role, OperationRole::Unknown);
}

#[test]
fn empty_operator_falls_back_to_tpnf_hint() {
    let inv = parse_nfe_xml(&sample_nfe(), "").unwrap();
    assert_eq!(inv.operation_role, OperationRole::Outbound);

    let inbound_doc = sample_nfe().replace("<tpNF>1</tpNF>", "<tpNF>0</tpNF>");
    let inv = parse_nfe_xml(&inbound_doc, "").unwrap();
    assert_eq!(inv.operation_role, OperationRole::Inbound);
}

#[test]
fn missing_dest_block_is_tolerated() {
    let xml = sample_nfe();
    let start = xml.find("<dest>").unwrap();
    let end = xml.find("</dest>").unwrap() + "</dest>".len();
    let without_dest = format!("{}{}", &xml[..start], &xml[end..]);

    let inv = parse_nfe_xml(&without_dest, OPERATOR).unwrap();
    assert_eq!(inv.recipient_tax_id, "");
    assert_eq!(inv.recipient_name, "");
    assert_eq!(inv.recipient_address, "");
    // Operator is the issuer, so the role is still decidable.
    assert_eq!(inv.operation_role, OperationRole::Outbound);
}

#[test]
fn missing_required_blocks_are_parse_errors() {
    for block in ["ide", "emit", "ICMSTot"] {
        let xml = sample_nfe();
        let start = xml.find(&format!("<{block}>")).unwrap();
        let end = xml.find(&format!("</{block}>")).unwrap() + block.len() + 3;
        let truncated = format!("{}{}", &xml[..start], &xml[end..]);

        match parse_nfe_xml(&truncated, OPERATOR) {
            Err(NotaError::Parse(msg)) => assert!(msg.contains(block), "{msg}"),
            other => panic!("expected parse error for missing {block}, got {other:?}"),
        }
    }
}

#[test]
fn unrecognized_icms_variant_is_flagged_with_zero_value() {
    let xml = sample_nfe()
        .replace("ICMS00>", "ICMS60>")
        .replace("<CST>00</CST>\n              <vICMS>30.60</vICMS>", "<CST>60</CST>");
    let inv = parse_nfe_xml(&xml, OPERATOR).unwrap();

    let item = &inv.items[0];
    assert_eq!(item.icms_regime, IcmsRegime::Unrecognized);
    assert_eq!(item.icms_status, "");
    assert_eq!(item.icms_value, 0.0);
    // Totals are unaffected: they come from ICMSTot.
    assert_eq!(inv.total_icms, "30.60");
}

#[test]
fn icms10_maps_to_partial_st_regime() {
    let xml = sample_nfe().replace("ICMS00>", "ICMS10>").replace(
        "<CST>00</CST>",
        "<CST>10</CST>",
    );
    let inv = parse_nfe_xml(&xml, OPERATOR).unwrap();
    assert_eq!(inv.items[0].icms_regime, IcmsRegime::PartialSt);
    assert_eq!(inv.items[0].icms_status, "10");
    assert_eq!(inv.items[0].icms_value, 30.60);
}

#[test]
fn ipi_without_cst_borrows_icms_status() {
    let xml = sample_nfe().replace("<CST>50</CST>\n", "");
    let inv = parse_nfe_xml(&xml, OPERATOR).unwrap();
    assert_eq!(inv.items[0].ipi_status, "00");
    assert_eq!(inv.items[0].ipi_value, 2.55);
}

#[test]
fn det_without_prod_is_skipped() {
    let xml = sample_nfe().replace(
        "</total>",
        "</total><det nItem=\"2\"><imposto><ICMS><ICMS00><CST>00</CST></ICMS00></ICMS></imposto></det>",
    );
    let inv = parse_nfe_xml(&xml, OPERATOR).unwrap();
    assert_eq!(inv.items.len(), 1);
}

#[test]
fn access_key_prefix_is_stripped_and_defaults_apply() {
    let minimal = r#"<NFe><infNFe Id="NFe12345678901234567890123456789012345678901234">
        <ide><nNF>7</nNF></ide>
        <emit><CNPJ>11222333000181</CNPJ></emit>
        <total><ICMSTot></ICMSTot></total>
    </infNFe></NFe>"#;
    let inv = parse_nfe_xml(minimal, OPERATOR).unwrap();
    assert_eq!(inv.access_key, "12345678901234567890123456789012345678901234");
    assert_eq!(inv.declared_total, "0.00");
    assert_eq!(inv.total_icms, "0.00");
    assert_eq!(inv.schema_version, "4.00");
}

#[test]
fn malformed_xml_is_an_error_not_a_panic() {
    let res = parse_nfe_xml("<NFe><ide></NFe>", OPERATOR);
    assert!(res.is_err());
}
