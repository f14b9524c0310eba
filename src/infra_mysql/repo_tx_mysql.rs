use crate::domain_port::{StorageBackend, StorageTx, TxManager};
use crate::logger::*;
use anyhow::Context;
use sqlx::{MySql, MySqlConnection, MySqlPool, Transaction};

/// Opens one InnoDB transaction per friendship operation.
///
/// Every transaction bounds how long it waits on a row lock, so two writers
/// racing for the same pair fail with error 1205 instead of queueing forever.
pub struct MySqlTxManager {
    pool: MySqlPool,
    lock_wait_timeout_secs: u32,
}

impl MySqlTxManager {
    pub fn new(pool: MySqlPool, lock_wait_timeout_secs: u32) -> Self {
        MySqlTxManager {
            pool,
            lock_wait_timeout_secs,
        }
    }
}

#[async_trait::async_trait]
impl TxManager for MySqlTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin friendship transaction")?;

        // session scoped, reapplied on every checkout of the pooled connection
        sqlx::query("SET SESSION innodb_lock_wait_timeout = ?")
            .bind(self.lock_wait_timeout_secs)
            .execute(tx.as_mut())
            .await
            .context("set lock wait timeout")?;

        Ok(Box::new(MySqlTx { inner: tx }))
    }
}

pub struct MySqlTx<'t> {
    inner: Transaction<'t, MySql>,
}

impl MySqlTx<'_> {
    pub fn conn(&mut self) -> &mut MySqlConnection {
        self.inner.as_mut()
    }
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MySqlTx<'t> {
    fn backend(&self) -> StorageBackend {
        StorageBackend::MySql
    }

    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        self.inner
            .commit()
            .await
            .context("commit friendship transaction")?;
        trace!("mysql transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        self.inner
            .rollback()
            .await
            .context("roll back friendship transaction")?;
        debug!("mysql transaction rolled back");
        Ok(())
    }
}
