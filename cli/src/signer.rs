//! A process-local key registry used as the `EditorSigner` for CLI-issued
//! commands. The CLI never persists human editor private keys; each
//! `create-genesis-editor` or `run-demo` invocation generates them in
//! memory, prints the public key, and discards the signing key on exit.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_core::traits::EditorSigner;
use ledger_crypto::Keypair;

pub struct KeyRegistrySigner {
    keys: Mutex<HashMap<Uuid, Keypair>>,
}

impl KeyRegistrySigner {
    pub fn new() -> Self {
        Self { keys: Mutex::new(HashMap::new()) }
    }

    pub fn register(&self, editor_id: Uuid, keypair: Keypair) {
        self.keys.lock().expect("key registry lock poisoned").insert(editor_id, keypair);
    }
}

impl Default for KeyRegistrySigner {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSigner for KeyRegistrySigner {
    fn sign_for_editor(&self, editor_id: Uuid, event_hash_hex: &str) -> LedgerResult<String> {
        let keys = self.keys.lock().map_err(|e| LedgerError::StorageUnavailable {
            reason: format!("key registry lock poisoned: {e}"),
        })?;
        let keypair = keys.get(&editor_id).ok_or_else(|| LedgerError::Unauthorized {
            reason: format!("no signing key held for editor {editor_id}"),
        })?;
        keypair.sign_hash(event_hash_hex)
    }
}
