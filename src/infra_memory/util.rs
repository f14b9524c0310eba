use super::repo_tx_memory::MemoryTx;
use crate::domain_port::*;
use anyhow::bail;

pub fn downcast<'a, 't>(tx: &'a mut dyn StorageTx<'t>) -> anyhow::Result<&'a mut MemoryTx> {
    if tx.backend() != StorageBackend::Memory {
        bail!("expected a memory transaction, got {:?}", tx.backend());
    }
    // SAFETY: every `StorageTx` reporting `StorageBackend::Memory` is a `MemoryTx`.
    unsafe {
        let p = tx as *mut dyn StorageTx<'t>;
        let p = p as *mut MemoryTx;
        Ok(&mut *p)
    }
}
