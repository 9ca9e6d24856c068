//! Command-line argument definitions for the `ibspace` binary.

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI: global options plus one subcommand per mode.
#[derive(Parser)]
#[command(name = "ibspace")]
#[command(about = "Read-only InnoDB tablespace and redo log forensics")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Colored-output policy.
#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Detect from the terminal.
    Auto,
    /// Always emit color codes.
    Always,
    /// Never emit color codes.
    Never,
}

/// One subcommand per inspection mode.
#[derive(Subcommand)]
pub enum Commands {
    /// Space-level summary: header fields and page type regions
    Summary {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List every extent descriptor in the space
    Extents {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List every file segment inode in the space
    Inodes {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Enumerate the indexes stored in the space
    Indexes {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Walk one of the space-level extent lists
    List {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// List name: free, free_frag, or full_frag
        #[arg(short, long)]
        list: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Hex dump of one page with its FIL framing decoded
    Dump {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Page number to dump
        #[arg(short, long)]
        page: u64,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,
    },

    /// Account for one page: extent, segment, list membership, index
    Account {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Page number to account for
        #[arg(short, long)]
        page: u32,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Recurse through a B+Tree from its root page
    Recurse {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Root page number of the tree
        #[arg(short, long)]
        page: u32,

        /// Record describer: a SYS_* table name or an inline schema
        /// such as "id:int4/a:int4,name:varchar(40)?"
        #[arg(short, long)]
        describer: String,

        /// Emit a DOT graph instead of indented text
        #[arg(long)]
        dot: bool,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,
    },

    /// Walk every page at one level of a B+Tree
    Level {
        /// Path to the tablespace file
        #[arg(short, long)]
        file: String,

        /// Root page number of the tree
        #[arg(short, long)]
        page: u32,

        /// Tree level to walk (0 = leaves)
        #[arg(short, long)]
        level: u16,

        /// Record describer: a SYS_* table name or an inline schema
        #[arg(short, long)]
        describer: String,

        /// Override page size (default: auto-detect)
        #[arg(long = "page-size")]
        page_size: Option<u32>,
    },

    /// Decode redo log blocks
    Log {
        /// Path to the redo log file
        #[arg(short, long)]
        file: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}
