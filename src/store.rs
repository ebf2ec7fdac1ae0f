use crate::error::{ForecastError, Result};
use crate::schema::Transaction;
use futures::future::{BoxFuture, FutureExt};
use log::debug;
use std::sync::Mutex;

/// Where transactions live. Reads return every record ordered by date.
pub trait TransactionStore: Send + Sync {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Transaction>>>;

    /// Returns the number of records written.
    fn insert_batch<'a>(&'a self, transactions: &'a [Transaction]) -> BoxFuture<'a, Result<usize>>;
}

#[derive(Debug, Default)]
struct Ledger {
    records: Vec<Transaction>,
    next_id: i64,
}

/// Process-local store, used by tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    ledger: Mutex<Ledger>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        let store = Self::new();
        if let Ok(mut ledger) = store.ledger.lock() {
            for tx in transactions {
                ledger.push(tx);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.ledger.lock().map(|l| l.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ledger {
    fn push(&mut self, mut tx: Transaction) {
        self.next_id += 1;
        tx.id = Some(tx.id.unwrap_or(self.next_id));
        self.records.push(tx);
    }
}

fn poisoned() -> ForecastError {
    ForecastError::UpstreamUnavailable("in-memory store lock poisoned".to_string())
}

impl TransactionStore for InMemoryStore {
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Transaction>>> {
        async move {
            let ledger = self.ledger.lock().map_err(|_| poisoned())?;
            let mut records = ledger.records.clone();
            records.sort_by_key(|t| t.date);
            Ok(records)
        }
        .boxed()
    }

    fn insert_batch<'a>(&'a self, transactions: &'a [Transaction]) -> BoxFuture<'a, Result<usize>> {
        async move {
            let mut ledger = self.ledger.lock().map_err(|_| poisoned())?;
            for tx in transactions {
                ledger.push(tx.clone());
            }
            debug!("Stored {} transactions in memory", transactions.len());
            Ok(transactions.len())
        }
        .boxed()
    }
}

#[cfg(feature = "supabase")]
pub use remote::{SupabaseStore, INSERT_BATCH_SIZE};

#[cfg(feature = "supabase")]
mod remote {
    use super::TransactionStore;
    use crate::config::StoreConfig;
    use crate::error::{ForecastError, Result};
    use crate::schema::{transactions_from_rows, Transaction, TransactionRow};
    use futures::future::{BoxFuture, FutureExt};
    use log::{debug, info};
    use reqwest::Client;

    pub const INSERT_BATCH_SIZE: usize = 100;

    /// PostgREST client for a hosted transactions table.
    #[derive(Clone)]
    pub struct SupabaseStore {
        client: Client,
        config: StoreConfig,
    }

    impl SupabaseStore {
        pub fn new(config: StoreConfig) -> Self {
            Self {
                client: Client::new(),
                config,
            }
        }

        pub fn from_env() -> Result<Self> {
            Ok(Self::new(StoreConfig::from_env()?))
        }

        fn table_url(&self) -> String {
            format!("{}/rest/v1/{}", self.config.url, self.config.table)
        }

        async fn fetch_rows(&self) -> Result<Vec<TransactionRow>> {
            let res = self
                .client
                .get(self.table_url())
                .query(&[("select", "*"), ("order", "date.asc")])
                .header("apikey", &self.config.api_key)
                .bearer_auth(&self.config.api_key)
                .send()
                .await?;

            let status = res.status();
            if !status.is_success() {
                let error_text = res.text().await?;
                return Err(ForecastError::UpstreamUnavailable(format!(
                    "Fetch from {} failed (status {}): {}",
                    self.config.table, status, error_text
                )));
            }

            Ok(res.json::<Vec<TransactionRow>>().await?)
        }

        async fn insert_rows(&self, transactions: &[Transaction]) -> Result<usize> {
            let mut written = 0;
            for chunk in transactions.chunks(INSERT_BATCH_SIZE) {
                let res = self
                    .client
                    .post(self.table_url())
                    .header("apikey", &self.config.api_key)
                    .bearer_auth(&self.config.api_key)
                    .header("Prefer", "return=minimal")
                    .json(chunk)
                    .send()
                    .await?;

                let status = res.status();
                if !status.is_success() {
                    let error_text = res.text().await?;
                    return Err(ForecastError::UpstreamUnavailable(format!(
                        "Insert into {} failed after {} records (status {}): {}",
                        self.config.table, written, status, error_text
                    )));
                }
                written += chunk.len();
                debug!("Inserted batch of {} records", chunk.len());
            }
            Ok(written)
        }
    }

    impl TransactionStore for SupabaseStore {
        fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Transaction>>> {
            async move {
                let rows = self.fetch_rows().await?;
                info!("Fetched {} records from {}", rows.len(), self.config.table);
                transactions_from_rows(rows)
            }
            .boxed()
        }

        fn insert_batch<'a>(
            &'a self,
            transactions: &'a [Transaction],
        ) -> BoxFuture<'a, Result<usize>> {
            self.insert_rows(transactions).boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Category;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_is_ordered_by_date() {
        let store = InMemoryStore::with_transactions(vec![
            Transaction::new(d(3), 10.0, Category::Other),
            Transaction::new(d(1), 20.0, Category::Other),
            Transaction::new(d(2), -5.0, Category::Supplies),
        ]);
        let records = store.fetch_all().await.unwrap();
        let dates: Vec<NaiveDate> = records.iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3)]);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());

        let batch = vec![
            Transaction::new(d(1), 100.0, Category::Other),
            Transaction::new(d(1), -30.0, Category::Ingredients),
        ];
        assert_eq!(store.insert_batch(&batch).await.unwrap(), 2);
        assert_eq!(store.len(), 2);

        let ids: Vec<Option<i64>> = store
            .fetch_all()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }
}
