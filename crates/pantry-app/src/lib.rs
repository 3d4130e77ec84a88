pub mod terminal;
pub mod wizard;

use pantry_core::storage::{FileStore, Persistence};
use pantry_core::store::Store;

/// Open the session store, backed by files under the data directory or by
/// memory when `ephemeral` is set.
pub fn open_store(ephemeral: bool) -> Store {
    let persistence = if ephemeral {
        Persistence::in_memory()
    } else {
        let files = FileStore::open_default();
        tracing::debug!(dir = %files.dir().display(), "using file store");
        Persistence::new(files)
    };
    Store::open(persistence)
}
