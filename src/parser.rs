//! Fixed-width CNAB line parsing.
//!
//! Column layout (character offsets, half-open):
//!
//! | range      | field                   |
//! |------------|-------------------------|
//! | `[0, 1)`   | operation type          |
//! | `[1, 9)`   | date, `YYYYMMDD`        |
//! | `[9, 19)`  | value in cents          |
//! | `[19, 30)` | document                |
//! | `[30, 42)` | card number             |
//! | `[42, 48)` | hour, `HHMMSS`          |
//! | `[48, 62)` | store owner             |
//! | `[62, 81)` | store name              |
//!
//! Short lines are tolerated: missing columns come out empty.

use crate::transaction::Transaction;

use rust_decimal::Decimal;
use std::ops::Range;

const TYPE: Range<usize> = 0..1;
const DATE: Range<usize> = 1..9;
const VALUE: Range<usize> = 9..19;
const DOCUMENT: Range<usize> = 19..30;
const CARD_NUMBER: Range<usize> = 30..42;
const HOUR: Range<usize> = 42..48;
const OWNER: Range<usize> = 48..62;
const NAME: Range<usize> = 62..81;

/// Characters `range` of `s`, clamped to its length.
fn column(s: &str, range: Range<usize>) -> &str {
    let mut offsets = s
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()));

    let start = offsets.nth(range.start).unwrap_or(s.len());
    let end = if range.end > range.start {
        offsets
            .nth(range.end - range.start - 1)
            .unwrap_or(s.len())
    } else {
        start
    };

    &s[start..end]
}

/// `YYYYMMDD` to `DD/MM/YYYY`. Purely positional, no calendar validation.
pub fn format_date(raw: &str) -> String {
    let year = column(raw, 0..4);
    let month = column(raw, 4..6);
    let day = column(raw, 6..8);
    format!("{}/{}/{}", day, month, year)
}

/// `HHMMSS` to `HH:MM:SS`. Purely positional, no range validation.
pub fn format_hour(raw: &str) -> String {
    let hour = column(raw, 0..2);
    let minute = column(raw, 2..4);
    let second = column(raw, 4..6);
    format!("{}:{}:{}", hour, minute, second)
}

/// Leading integer of `raw` read as cents. Leading whitespace and a sign are
/// accepted and anything after the digits is ignored. `None` if there are no
/// digits to read.
pub fn parse_cents(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim_start();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = unsigned
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits_len == 0 {
        return None;
    }

    let cents: i64 = unsigned[..digits_len].parse().ok()?;
    let cents = if negative { -cents } else { cents };

    Some(Decimal::new(cents, 2))
}

/// Parses one line. Returns `None` only for an empty line; anything else
/// yields a record, however short.
pub fn parse_line(line: &str) -> Option<Transaction> {
    let kind = column(line, TYPE).chars().next()?;

    Some(Transaction {
        kind,
        date: format_date(column(line, DATE)),
        value: parse_cents(column(line, VALUE)),
        document: column(line, DOCUMENT).to_string(),
        card_number: column(line, CARD_NUMBER).trim().to_string(),
        hour: format_hour(column(line, HOUR)),
        owner: column(line, OWNER).trim().to_string(),
        name: column(line, NAME).trim().to_string(),
        debits: Some(Decimal::ZERO),
        credits: Some(Decimal::ZERO),
        transactions: Vec::new(),
    })
}

/// Splits `text` on `\n` and parses each line in order, dropping empty ones.
pub fn file_to_transactions(text: &str) -> impl Iterator<Item = Transaction> + '_ {
    text.split('\n').filter_map(parse_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const JOXX: &str =
        "3201903010000014200096206760174753****3153153453JOXX MACEDO   BAR DO JOXX";
    const ACME: &str =
        "A202504140001234500123456789012 3456 7890123456JOHN DOE       ACME STORE      ";
    const LOCAL: &str =
        "B202504150000987600987654321098 7654 3210987654JANE SMITH     LOCAL SHOP      ";

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("20250414"), "14/04/2025");
        assert_eq!(format_date("19991231"), "31/12/1999");
        assert_eq!(format_date("20000101"), "01/01/2000");
    }

    #[test]
    fn test_format_date_does_not_validate() {
        assert_eq!(format_date("20251399"), "99/13/2025");
        assert_eq!(format_date("2025"), "//2025");
        assert_eq!(format_date(""), "//");
    }

    #[test]
    fn test_format_hour() {
        assert_eq!(format_hour("170304"), "17:03:04");
        assert_eq!(format_hour("000000"), "00:00:00");
        assert_eq!(format_hour("235959"), "23:59:59");
        assert_eq!(format_hour("996161"), "99:61:61");
        assert_eq!(format_hour(""), "::");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("0000014200"), Some(Decimal::from(142)));
        assert_eq!(
            parse_cents("0000000001"),
            Some(Decimal::from_str("0.01").unwrap())
        );
        assert_eq!(parse_cents("00001234xx"), Some(Decimal::from_str("12.34").unwrap()));
        assert_eq!(parse_cents("  150"), Some(Decimal::from_str("1.50").unwrap()));
        assert_eq!(parse_cents("-0000000250"), Some(Decimal::from_str("-2.50").unwrap()));
        assert_eq!(parse_cents(""), None);
        assert_eq!(parse_cents("abc"), None);
        assert_eq!(parse_cents("-"), None);
    }

    #[test]
    fn test_parse_line() {
        let tx = parse_line(JOXX).unwrap();

        assert_eq!(
            tx,
            Transaction {
                kind: '3',
                date: "01/03/2019".to_string(),
                value: Some(Decimal::from(142)),
                document: "09620676017".to_string(),
                card_number: "4753****3153".to_string(),
                hour: "15:34:53".to_string(),
                owner: "JOXX MACEDO".to_string(),
                name: "BAR DO JOXX".to_string(),
                debits: Some(Decimal::ZERO),
                credits: Some(Decimal::ZERO),
                transactions: Vec::new(),
            }
        );
    }

    #[test]
    fn test_parse_empty_line_is_rejected() {
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_parse_line_with_minimal_data() {
        let tx = parse_line("B").unwrap();

        assert_eq!(tx.kind, 'B');
        assert_eq!(tx.date, "//");
        assert_eq!(tx.value, None);
        assert_eq!(tx.document, "");
        assert_eq!(tx.card_number, "");
        assert_eq!(tx.hour, "::");
        assert_eq!(tx.owner, "");
        assert_eq!(tx.name, "");
        assert_eq!(tx.debits, Some(Decimal::ZERO));
        assert_eq!(tx.credits, Some(Decimal::ZERO));
        assert!(tx.transactions.is_empty());
    }

    #[test]
    fn test_parse_line_cut_inside_document() {
        let tx = parse_line("12019030100000142000962").unwrap();

        assert_eq!(tx.date, "01/03/2019");
        assert_eq!(tx.value, Some(Decimal::from(142)));
        assert_eq!(tx.document, "0962");
        assert_eq!(tx.card_number, "");
        assert_eq!(tx.hour, "::");
    }

    #[test]
    fn test_parse_line_with_multibyte_names() {
        let line =
            "3201903010000014200096206760174753****3153153453JOÃO MACEDO   BAR DO JOÃO       ";
        let tx = parse_line(line).unwrap();

        assert_eq!(tx.owner, "JOÃO MACEDO");
        assert_eq!(tx.name, "BAR DO JOÃO");
    }

    #[test]
    fn test_parse_line_trims_carriage_return() {
        let line = format!("{}\r", ACME);
        let tx = parse_line(&line).unwrap();

        assert_eq!(tx.name, "ACME STORE");
    }

    #[test]
    fn test_file_to_transactions() {
        let text = format!("{}\n{}", ACME, LOCAL);
        let txs: Vec<_> = file_to_transactions(&text).collect();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, 'A');
        assert_eq!(txs[0].date, "14/04/2025");
        assert_eq!(txs[0].value, Some(Decimal::from(12345)));
        assert_eq!(txs[1].kind, 'B');
        assert_eq!(txs[1].date, "15/04/2025");
        assert_eq!(txs[1].value, Some(Decimal::from(9876)));
    }

    #[test]
    fn test_file_to_transactions_drops_blank_lines() {
        let text = format!("{}\n\n{}\n", ACME, LOCAL);
        let txs: Vec<_> = file_to_transactions(&text).collect();

        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, 'A');
        assert_eq!(txs[1].kind, 'B');
    }

    #[test]
    fn test_file_to_transactions_empty_input() {
        assert_eq!(file_to_transactions("").count(), 0);
    }

    #[test]
    fn test_file_to_transactions_is_restartable() {
        let text = format!("{}\n{}\n{}", JOXX, ACME, LOCAL);

        let first: Vec<_> = file_to_transactions(&text).collect();
        let second: Vec<_> = file_to_transactions(&text).collect();

        assert_eq!(first, second);
    }
}
