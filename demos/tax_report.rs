use nota::core::{invoice_tax_totals, revenue_metrics};
use nota::xml::parse_nfe_xml;

fn main() {
    // Usage: tax_report <nota.xml> [operator-cnpj]
    let mut args = std::env::args().skip(1);
    let path = args.next().expect("path to an NF-e XML file");
    let operator = args.next().unwrap_or_else(|| "11222333000181".into());

    let xml = std::fs::read_to_string(&path).expect("readable XML file");
    let invoice = parse_nfe_xml(&xml, &operator).expect("valid NF-e document");

    println!("NF {} ({})", invoice.number, invoice.operation_role);
    println!("  emitente:     {}", invoice.issuer_name);
    println!("  destinatário: {}", invoice.recipient_name);
    println!("  total:        R$ {}", invoice.declared_total);

    let report = invoice_tax_totals(&invoice).report();
    println!("\nImpostos (itens):");
    println!("  ICMS   {}", report.icms);
    println!("  IPI    {}", report.ipi);
    println!("  PIS    {}", report.pis);
    println!("  COFINS {}", report.cofins);

    let metrics = revenue_metrics([&invoice]);
    println!("\nReceita (se saída): R$ {}", metrics.total_revenue);
}
