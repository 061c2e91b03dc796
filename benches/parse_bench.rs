use criterion::{Criterion, black_box, criterion_group, criterion_main};

use nota::csv::parse_nfe_csv;
use nota::xml::parse_nfe_xml;

const OPERATOR: &str = "11222333000181";

fn nfe_xml_with_items(n: usize) -> String {
    let mut items = String::new();
    for i in 1..=n {
        items.push_str(&format!(
            "<det nItem=\"{i}\"><prod><cProd>P{i:03}</cProd><xProd>Produto {i}</xProd>\
             <NCM>09012100</NCM><CFOP>5102</CFOP><uCom>UN</uCom><qCom>10</qCom>\
             <vUnCom>25.50</vUnCom><vProd>255.00</vProd></prod>\
             <imposto><ICMS><ICMS00><CST>00</CST><vICMS>30.60</vICMS></ICMS00></ICMS>\
             <PIS><PISAliq><CST>01</CST><vPIS>4.21</vPIS></PISAliq></PIS>\
             <COFINS><COFINSAliq><CST>01</CST><vCOFINS>19.38</vCOFINS></COFINSAliq></COFINS>\
             </imposto></det>"
        ));
    }
    format!(
        "<NFe><infNFe Id=\"NFe35240311222333000181550010000045211000045219\" versao=\"4.00\">\
         <ide><nNF>4521</nNF><dhEmi>2024-03-05T10:22:33-03:00</dhEmi>\
         <natOp>VENDA</natOp><tpNF>1</tpNF></ide>\
         <emit><CNPJ>11222333000181</CNPJ><xNome>Distribuidora Alfa LTDA</xNome>\
         <IE>123456789</IE><enderEmit><xLgr>Rua das Acacias</xLgr><nro>120</nro>\
         <xBairro>Centro</xBairro><xMun>Sao Paulo</xMun><UF>SP</UF></enderEmit></emit>\
         <dest><CNPJ>99888777000166</CNPJ><xNome>Mercado Beta ME</xNome></dest>\
         {items}\
         <total><ICMSTot><vNF>255.00</vNF><vICMS>30.60</vICMS>\
         <vPIS>4.21</vPIS><vCOFINS>19.38</vCOFINS></ICMSTot></total>\
         </infNFe></NFe>"
    )
}

fn csv_export_with_invoices(n: usize) -> String {
    let mut out = String::from(
        "numero_nota;chave_acesso;data_emissao;emitente_cnpj;destinatario_cnpj;item;\
         produto_codigo;produto_descricao;produto_quantidade;produto_valor_total;valor_total_nota\n",
    );
    for i in 1..=n {
        out.push_str(&format!(
            "{i};;2024-01-10;11.222.333/0001-81;99.888.777/0001-66;1;P001;Cafe;10;255.00;\n\
             {i};;2024-01-10;11.222.333/0001-81;99.888.777/0001-66;2;P002;Acucar;5;40.00;\n\
             {i};;;;;TOTAL;;;;;295.00\n"
        ));
    }
    out
}

fn bench_xml_parse(c: &mut Criterion) {
    let small = nfe_xml_with_items(1);
    let large = nfe_xml_with_items(50);

    c.bench_function("parse_nfe_xml_1_item", |b| {
        b.iter(|| parse_nfe_xml(black_box(&small), OPERATOR).unwrap())
    });
    c.bench_function("parse_nfe_xml_50_items", |b| {
        b.iter(|| parse_nfe_xml(black_box(&large), OPERATOR).unwrap())
    });
}

fn bench_csv_parse(c: &mut Criterion) {
    let export = csv_export_with_invoices(100);

    c.bench_function("parse_nfe_csv_100_invoices", |b| {
        b.iter(|| parse_nfe_csv(black_box(&export), OPERATOR).unwrap())
    });
}

criterion_group!(benches, bench_xml_parse, bench_csv_parse);
criterion_main!(benches);
