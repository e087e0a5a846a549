//! Item, store and drill-down tables, written as `;`-separated CSV.

use crate::transaction::Transaction;

use rust_decimal::{Decimal, RoundingStrategy};
use std::io::Write;

const CURRENCY: &str = "R$\u{a0}";

/// Brazilian real in pt-BR notation, e.g. `R$ 1.234,56` (non-breaking space).
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let plain = format!("{:.2}", rounded.abs());
    let (units, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    format!("{}{}{},{}", sign, CURRENCY, group_thousands(units), cents)
}

/// Like [`format_price`], with missing amounts rendered as `NaN`.
pub fn format_amount(amount: Option<Decimal>) -> String {
    match amount {
        Some(amount) => format_price(amount),
        None => format!("{}NaN", CURRENCY),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    grouped
}

fn table_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().delimiter(b';').from_writer(writer)
}

fn timestamp(tx: &Transaction) -> String {
    format!("{} {}", tx.date, tx.hour)
}

/// One row per raw transaction.
pub fn write_items<W: Write>(transactions: &[Transaction], writer: W) -> Result<(), csv::Error> {
    let mut wtr = table_writer(writer);

    wtr.write_record([
        "Operação",
        "Nome da loja",
        "Dono",
        "Valor",
        "Data",
        "CPF",
        "Cartão",
    ])?;

    for tx in transactions {
        wtr.write_record([
            tx.label(),
            tx.name.as_str(),
            tx.owner.as_str(),
            format_amount(tx.value).as_str(),
            timestamp(tx).as_str(),
            tx.document.as_str(),
            tx.card_number.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// One row per store aggregate. Missing credit/debit totals show as zero.
pub fn write_stores<W: Write>(stores: &[Transaction], writer: W) -> Result<(), csv::Error> {
    let mut wtr = table_writer(writer);

    wtr.write_record(["Nome da loja", "Dono", "CPF", "Entradas", "Saídas", "Total"])?;

    for store in stores {
        wtr.write_record([
            store.name.as_str(),
            store.owner.as_str(),
            store.document.as_str(),
            format_price(store.credits.unwrap_or(Decimal::ZERO)).as_str(),
            format_price(store.debits.unwrap_or(Decimal::ZERO)).as_str(),
            format_amount(store.value).as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// The transactions behind a single store aggregate.
pub fn write_store_detail<W: Write>(store: &Transaction, writer: W) -> Result<(), csv::Error> {
    let mut wtr = table_writer(writer);

    wtr.write_record(["Operação", "Valor", "Data", "Cartão"])?;

    for tx in &store.transactions {
        wtr.write_record([
            tx.label(),
            format_amount(tx.value).as_str(),
            timestamp(tx).as_str(),
            tx.card_number.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
