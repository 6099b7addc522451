//! Store creation and persistence for CLI sessions.

use std::path::PathBuf;
use std::sync::Arc;

use canopy::{
    Forest, ForestConfig, ScopeId,
    backend::{
        NodeStore,
        database::{InMemory, Sqlite},
    },
};

use crate::cli::{Backend, ScopeArgs, StoreArgs};

/// An opened forest plus what is needed to persist it afterwards.
pub struct Session {
    pub forest: Forest,
    memory: Option<(Arc<InMemory>, PathBuf)>,
}

impl Session {
    /// Resolves the scope named on the command line.
    pub fn scope(&self, args: &ScopeArgs) -> canopy::Result<ScopeId> {
        self.forest.resolve(&args.entity_type, &args.context)
    }

    /// Writes the in-memory store back to its file. SQL stores persist on
    /// every batch, so there is nothing to do for them.
    pub fn save(&self) -> canopy::Result<()> {
        if let Some((store, path)) = &self.memory {
            store.save_to_file(path)?;
            tracing::debug!("Saved store to {}", path.display());
        }
        Ok(())
    }
}

/// Opens the configured store and builds a forest over it.
pub fn open(args: &StoreArgs) -> Result<Session, Box<dyn std::error::Error>> {
    let data_dir = args.data_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&data_dir)?;

    let (store, memory): (Arc<dyn NodeStore>, _) = match args.backend {
        Backend::Sqlite => {
            let db_path = data_dir.join("canopy.db");
            tracing::info!("Using SQLite backend at {}", db_path.display());
            (Arc::new(Sqlite::open_sqlite(&db_path)?), None)
        }
        Backend::Inmemory => {
            let json_path = data_dir.join("canopy.json");
            tracing::info!(
                "Using in-memory backend with persistence at {}",
                json_path.display()
            );
            let store = Arc::new(InMemory::load_from_file(&json_path)?);
            (store.clone(), Some((store, json_path)))
        }
    };

    let mut forest = Forest::from_store(store);
    if let Some(path) = &args.config {
        forest = forest.configure(&ForestConfig::load(path)?)?;
    }
    Ok(Session { forest, memory })
}

/// Human-readable label for the configured backend.
pub fn backend_label(args: &StoreArgs) -> &'static str {
    match args.backend {
        Backend::Sqlite => "sqlite",
        Backend::Inmemory => "inmemory",
    }
}
