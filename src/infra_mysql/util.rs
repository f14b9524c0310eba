use super::repo_tx_mysql::MySqlTx;
use crate::application_port::FriendshipError;
use crate::domain_port::*;
use crate::logger::*;
use anyhow::bail;
use sqlx::mysql::MySqlDatabaseError;

pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> anyhow::Result<&'a mut MySqlTx<'t>> {
    if tx.backend() != StorageBackend::MySql {
        bail!("expected a mysql transaction, got {:?}", tx.backend());
    }
    // SAFETY: every `StorageTx` reporting `StorageBackend::MySql` is a `MySqlTx`.
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MySqlTx<'t>;
        Ok(&mut *p)
    }
}

fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return Some(mysql_err.number());
        }
    }

    None
}

pub fn is_dup_key(err: &sqlx::Error) -> bool {
    mysql_error_number(err) == Some(1062) // ER_DUP_ENTRY
}

pub fn is_lock_conflict(err: &sqlx::Error) -> bool {
    matches!(
        mysql_error_number(err),
        Some(1205) // ER_LOCK_WAIT_TIMEOUT
        | Some(1213) // ER_LOCK_DEADLOCK
    )
}

pub fn friendship_store_error(context: &str, err: sqlx::Error) -> FriendshipError {
    if is_lock_conflict(&err) {
        warn!("{context}: lock conflict: {err}");
        return FriendshipError::Conflict;
    }
    FriendshipError::Store(format!("{context}: {err}"))
}
