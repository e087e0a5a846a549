use crate::transaction::{Category, Transaction};

use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Groups raw transactions by `document`, keeping stores in first-seen order.
pub struct Aggregator {
    index: HashMap<String, usize>,
    stores: Vec<Transaction>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            stores: Vec::new(),
        }
    }

    pub fn apply_transaction(&mut self, tx: &Transaction) {
        match self.index.get(&tx.document) {
            Some(&position) => {
                let store = &mut self.stores[position];

                store.value = accumulate(store.value, tx.value);
                match tx.category() {
                    Some(Category::Debit) => debit(store, tx.value),
                    Some(Category::Credit) => credit(store, tx.value),
                    None => {}
                }
                store.transactions.push(tx.clone());
            }
            None => {
                self.index.insert(tx.document.clone(), self.stores.len());
                self.stores.push(open_store(tx));
            }
        }
    }

    pub fn stores(&self) -> &[Transaction] {
        &self.stores
    }

    pub fn into_stores(self) -> Vec<Transaction> {
        self.stores
    }
}

/// One aggregate per distinct document. The input is left untouched.
pub fn group_by_store<'a, I>(transactions: I) -> Vec<Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut aggregator = Aggregator::new();
    let mut count = 0usize;

    for tx in transactions {
        aggregator.apply_transaction(tx);
        count += 1;
    }

    debug!(
        "Grouped {} transactions into {} stores",
        count,
        aggregator.stores().len()
    );

    aggregator.into_stores()
}

pub fn find_store<'a>(stores: &'a [Transaction], document: &str) -> Option<&'a Transaction> {
    stores.iter().find(|store| store.document == document)
}

/// Copies `tx` into a fresh aggregate seeded with its own amount.
pub fn open_store(tx: &Transaction) -> Transaction {
    let seed = |category| {
        if tx.category() == Some(category) {
            tx.value
        } else {
            Some(Decimal::ZERO)
        }
    };

    Transaction {
        debits: seed(Category::Debit),
        credits: seed(Category::Credit),
        transactions: vec![tx.clone()],
        ..tx.clone()
    }
}

/// A debit bucket poisoned by a missing amount starts over from zero on the
/// next debit. The store total stays poisoned.
pub fn debit(store: &mut Transaction, amount: Option<Decimal>) {
    store.debits = accumulate(Some(store.debits.unwrap_or(Decimal::ZERO)), amount);
}

/// Same restart rule as [`debit`].
pub fn credit(store: &mut Transaction, amount: Option<Decimal>) {
    store.credits = accumulate(Some(store.credits.unwrap_or(Decimal::ZERO)), amount);
}

/// `None` on either side, or on overflow, poisons the total.
pub fn accumulate(total: Option<Decimal>, amount: Option<Decimal>) -> Option<Decimal> {
    total?.checked_add(amount?)
}
