//! tinygit CLI - tinygit command

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;
use tinygit::cmd::cat_file::CatMode;
use tinygit::{cmd, system_config, util};
use tinygit_core::ObjectType;
use tracing_subscriber::EnvFilter;

/// tinygit - content-addressed object store and commit plumbing
#[derive(Parser)]
#[command(name = "tinygit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository directory (default: find .git from the current directory)
    #[arg(long, global = true, env = "TINYGIT_DIR")]
    git_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty repository
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
    },
    /// Compute an object name from a file, optionally storing it
    HashObject {
        /// Write the object into the object store
        #[arg(short = 'w')]
        write: bool,
        /// Object type
        #[arg(short = 't', default_value = "blob")]
        object_type: ObjectType,
        /// File to hash
        file: PathBuf,
    },
    /// Show an object's type, size or content
    #[command(group(ArgGroup::new("mode").required(true).args(["show_type", "size", "pretty"])))]
    CatFile {
        /// Show the object type
        #[arg(short = 't')]
        show_type: bool,
        /// Show the payload size
        #[arg(short = 's')]
        size: bool,
        /// Pretty-print the content
        #[arg(short = 'p')]
        pretty: bool,
        /// Full object name
        object: String,
    },
    /// List staged files
    LsFiles {
        /// Show mode, object name and stage
        #[arg(short, long)]
        stage: bool,
    },
    /// Store a tree object for the current index
    WriteTree,
    /// Record the index as a new commit on master
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
        /// Author identity (default: [user] from the config file)
        #[arg(long)]
        author: Option<String>,
    },
    /// Show commit history
    Log {
        /// Number of commits to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show the effective configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = system_config::load()?;
    let git_dir = cli.git_dir.as_deref();

    match cli.command {
        Commands::Init { path } => cmd::init::run(path.as_deref()),
        Commands::HashObject {
            write,
            object_type,
            file,
        } => {
            let repo = if write {
                Some(util::open_repo(git_dir, &config)?)
            } else {
                None
            };
            cmd::hash_object::run(repo.as_ref(), object_type, write, &file)
        }
        Commands::CatFile {
            show_type,
            size,
            pretty: _,
            object,
        } => {
            let mode = if show_type {
                CatMode::Type
            } else if size {
                CatMode::Size
            } else {
                CatMode::Pretty
            };
            let repo = util::open_repo(git_dir, &config)?;
            cmd::cat_file::run(&repo, mode, &object)
        }
        Commands::LsFiles { stage } => {
            let repo = util::open_repo(git_dir, &config)?;
            cmd::ls_files::run(&repo, stage)
        }
        Commands::WriteTree => {
            let repo = util::open_repo(git_dir, &config)?;
            cmd::write_tree::run(&repo)
        }
        Commands::Commit { message, author } => {
            let repo = util::open_repo(git_dir, &config)?;
            cmd::commit::run(&repo, &config, &message, author)
        }
        Commands::Log { limit } => {
            let repo = util::open_repo(git_dir, &config)?;
            cmd::log::run(&repo, limit)
        }
        Commands::Config { init } => cmd::config::run(&config, init),
    }
}
