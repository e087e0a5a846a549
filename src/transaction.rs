use rust_decimal::Decimal;
use serde::Serialize;

/// One CNAB record. Raw transactions come straight from the parser; store
/// aggregates reuse the same shape with `debits`, `credits` and
/// `transactions` filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: char,
    pub date: String,
    /// `None` when the value column holds no leading digits.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub value: Option<Decimal>,
    pub document: String,
    pub card_number: String,
    pub hour: String,
    pub owner: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub debits: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub credits: Option<Decimal>,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    Debit,
    Boleto,
    Financing,
    Credit,
    LoanReceipt,
    Sales,
    TedReceipt,
    DocReceipt,
    Rent,
}

pub const UNKNOWN_LABEL: &str = "Desconhecido";

impl OperationType {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(Self::Debit),
            '2' => Some(Self::Boleto),
            '3' => Some(Self::Financing),
            '4' => Some(Self::Credit),
            '5' => Some(Self::LoanReceipt),
            '6' => Some(Self::Sales),
            '7' => Some(Self::TedReceipt),
            '8' => Some(Self::DocReceipt),
            '9' => Some(Self::Rent),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Debit => "Débito",
            Self::Boleto => "Boleto",
            Self::Financing => "Financiamento",
            Self::Credit => "Crédito",
            Self::LoanReceipt => "Recebimento Empréstimo",
            Self::Sales => "Vendas",
            Self::TedReceipt => "Recebimento TED",
            Self::DocReceipt => "Recebimento DOC",
            Self::Rent => "Aluguel",
        }
    }

    pub fn category(self) -> Category {
        match self {
            Self::Boleto | Self::Financing | Self::Rent => Category::Credit,
            Self::Debit
            | Self::Credit
            | Self::LoanReceipt
            | Self::Sales
            | Self::TedReceipt
            | Self::DocReceipt => Category::Debit,
        }
    }
}

impl Transaction {
    pub fn operation(&self) -> Option<OperationType> {
        OperationType::from_code(self.kind)
    }

    /// Display label of the operation code, `Desconhecido` for codes outside the table.
    pub fn label(&self) -> &'static str {
        self.operation().map_or(UNKNOWN_LABEL, OperationType::label)
    }

    pub fn category(&self) -> Option<Category> {
        self.operation().map(OperationType::category)
    }

    pub fn is_debit(&self) -> bool {
        self.category() == Some(Category::Debit)
    }

    pub fn is_credit(&self) -> bool {
        self.category() == Some(Category::Credit)
    }
}
