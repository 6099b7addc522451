//! CLI argument definitions for the Canopy binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Storage backend type
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Backend {
    /// In-memory with JSON persistence (default, for development and small trees)
    Inmemory,
    /// SQLite database
    Sqlite,
}

/// What a node becomes after `convert`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NodeKind {
    Group,
    Leaf,
}

/// Canopy nested-set tree maintenance
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(about = "Canopy: nested-set trees for hierarchical records")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the trees live and how the engine is configured
#[derive(clap::Args, Debug)]
pub struct StoreArgs {
    /// Storage backend to use
    #[arg(
        short,
        long,
        default_value = "inmemory",
        env = "CANOPY_BACKEND",
        global = true
    )]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For SQLite: stores canopy.db
    /// For InMemory: stores canopy.json
    #[arg(short = 'D', long, env = "CANOPY_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON configuration file declaring extra hierarchies
    #[arg(long, env = "CANOPY_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

/// Selects one tree
#[derive(clap::Args, Debug)]
pub struct ScopeArgs {
    /// Entity type of the hierarchy, e.g. "Account"
    #[arg(short = 't', long = "type")]
    pub entity_type: String,

    /// Owning context for per-context hierarchies, e.g. a company name
    #[arg(short, long, default_value = "")]
    pub context: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Insert a node
    Insert(InsertArgs),
    /// Move a node and its subtree under a new parent
    Move(MoveArgs),
    /// Delete a node
    Delete(DeleteArgs),
    /// Turn a node into a group or a leaf
    Convert(ConvertArgs),
    /// Print a tree
    Show(ScopeArgs),
    /// List the ancestors of a node, root first
    Ancestors(NodeArgs),
    /// List the descendants of a node
    Descendants(DescendantsArgs),
    /// Audit the nested-set invariants
    Check(CheckArgs),
    /// Renumber a tree from its parent pointers
    Rebuild(ScopeArgs),
    /// List the trees that hold rows
    Scopes,
}

/// Arguments for the insert command
#[derive(clap::Args, Debug)]
pub struct InsertArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Parent node; omit to insert a root
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Id of the new node; generated when omitted
    #[arg(long)]
    pub id: Option<String>,

    /// Create a group that may hold children
    #[arg(short, long)]
    pub group: bool,

    /// Sibling ordering key
    #[arg(long)]
    pub order_key: Option<String>,

    /// Entity data as a JSON document
    #[arg(long)]
    pub payload: Option<String>,
}

/// Arguments for the move command
#[derive(clap::Args, Debug)]
pub struct MoveArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Node to move
    pub node: String,

    /// New parent; omit to make the node a root
    #[arg(short, long)]
    pub parent: Option<String>,
}

/// Arguments for the delete command
#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Node to delete
    pub node: String,

    /// Delete the whole subtree. Without it the hierarchy's policy decides.
    #[arg(long)]
    pub cascade: bool,
}

/// Arguments for the convert command
#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Node to convert
    pub node: String,

    /// What the node becomes
    #[arg(long = "to", value_enum)]
    pub kind: NodeKind,
}

/// Arguments naming one node
#[derive(clap::Args, Debug)]
pub struct NodeArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    pub node: String,
}

/// Arguments for the descendants command
#[derive(clap::Args, Debug)]
pub struct DescendantsArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    pub node: String,

    /// Only list leaves
    #[arg(long)]
    pub leaves_only: bool,
}

/// Arguments for the check command
#[derive(clap::Args, Debug)]
pub struct CheckArgs {
    /// Entity type to check; every stored tree when omitted
    #[arg(short = 't', long = "type")]
    pub entity_type: Option<String>,

    /// Owning context of the tree to check
    #[arg(short, long, default_value = "")]
    pub context: String,
}
