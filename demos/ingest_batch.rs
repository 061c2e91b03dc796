use std::path::PathBuf;

use nota::core::{InvoiceStore, MemoryStore};
use nota::ingest::process_batch;

fn main() {
    // Usage: ingest_batch <operator-cnpj> <file>...
    // Note: processed files are removed, pass copies.
    let mut args = std::env::args().skip(1);
    let operator = args.next().unwrap_or_else(|| "11222333000181".into());
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let mut store = MemoryStore::new();
    let reports = process_batch(&files, &operator, None, &mut store);

    for report in &reports {
        match &report.invoice_number {
            Some(number) => println!("{}: {} (NF {})", report.file, report.status, number),
            None => println!("{}: {}", report.file, report.status),
        }
    }

    println!("\n{} invoice(s) stored:", store.len());
    for invoice in store.all() {
        println!(
            "  NF {} — {} — {} — R$ {}",
            invoice.number, invoice.issue_date, invoice.operation_role, invoice.declared_total
        );
    }
}
