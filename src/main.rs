//! paperrepo CLI - snapshot history for a paper working tree

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use paperrepo::ops::{
    commit_working_tree, diff, fsck, head_commit, history, resolve_commit, restore, CommitOptions,
    RestoreOptions,
};
use paperrepo::{read_blob_to, write_blob_file, Hash, Repo};

#[derive(Parser)]
#[command(name = "paperrepo")]
#[command(about = "linear content-addressed snapshots of a paper working tree")]
#[command(version)]
struct Cli {
    /// working-tree root
    #[arg(short = 'C', long, default_value = ".", env = "PAPERREPO_ROOT")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// create the .paperrepo metadata directory
    Init,

    /// snapshot the working tree
    Commit {
        /// commit message
        #[arg(short, long)]
        message: String,

        /// extra ignore pattern for this commit (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },

    /// show history, newest first
    Log {
        /// maximum number of commits to show
        #[arg(short = 'n', long)]
        max_count: Option<usize>,
    },

    /// show the current HEAD commit
    Head,

    /// check out a commit and move HEAD to it
    Restore {
        /// HEAD, a commit id, or an id prefix
        rev: String,

        /// delete files not in the commit (ignored paths are kept)
        #[arg(long)]
        clean: bool,
    },

    /// show paths that differ between two commits
    Diff {
        /// older revision
        from: String,

        /// newer revision
        to: String,
    },

    /// verify repository integrity
    Fsck,

    /// write a blob's content to stdout
    CatBlob {
        /// blob digest
        digest: String,
    },

    /// store a file as a blob and print its digest
    PutBlob {
        /// file to store
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_env("PAPERREPO_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> paperrepo::Result<ExitCode> {
    match cli.command {
        Commands::Init => {
            Repo::init(&cli.root)?;
            println!("initialized paperrepo in {}", cli.root.display());
        }

        Commands::Commit { message, ignore } => {
            let opts = CommitOptions {
                extra_ignores: ignore,
            };
            let commit = commit_working_tree(&cli.root, &message, &opts)?;
            println!("{}", commit.id);
        }

        Commands::Log { max_count } => {
            let repo = Repo::open(&cli.root)?;
            for commit in history(&repo, max_count)? {
                println!(
                    "{}  {:.0}  {:>4} files  {}",
                    commit.short_id(),
                    commit.timestamp,
                    commit.files.len(),
                    commit.title()
                );
            }
        }

        Commands::Head => {
            let repo = Repo::open(&cli.root)?;
            match head_commit(&repo)? {
                Some(commit) => print!("{}", commit),
                None => println!("no commits yet"),
            }
        }

        Commands::Restore { rev, clean } => {
            let repo = Repo::open(&cli.root)?;
            let id = resolve_commit(&repo, &rev)?;
            let written = restore(&repo, &id, RestoreOptions { clean })?;
            println!("restored {} files from {}", written, id.short());
        }

        Commands::Diff { from, to } => {
            let repo = Repo::open(&cli.root)?;
            let from = resolve_commit(&repo, &from)?;
            let to = resolve_commit(&repo, &to)?;

            for change in diff(&repo, &from, &to)? {
                println!("{}", change);
            }
        }

        Commands::Fsck => {
            let repo = Repo::open(&cli.root)?;
            let report = fsck(&repo)?;

            println!("commits checked: {}", report.commits_checked);
            println!("blobs checked: {}", report.blobs_checked);

            if !report.corrupt_commits.is_empty() {
                println!("\ncorrupt commits:");
                for c in &report.corrupt_commits {
                    println!("  {}: {}", c.id, c.message);
                }
            }

            if !report.missing_parents.is_empty() {
                println!("\nmissing parents:");
                for (child, parent) in &report.missing_parents {
                    println!("  {} (parent of {})", parent, child.short());
                }
            }

            if !report.missing_blobs.is_empty() {
                println!("\nmissing blobs:");
                for b in &report.missing_blobs {
                    println!("  {} {} in {}", b.hash, b.path, b.commit.short());
                }
            }

            if !report.corrupt_blobs.is_empty() {
                println!("\ncorrupt blobs:");
                for b in &report.corrupt_blobs {
                    println!("  {} {} in {}", b.hash, b.path, b.commit.short());
                }
            }

            if let Some(problem) = &report.head_problem {
                println!("\n{}", problem);
            }

            if !report.dangling_blobs.is_empty() {
                println!("\ndangling blobs: {}", report.dangling_blobs.len());
            }

            if report.is_ok() {
                println!("\nrepository is healthy");
            } else {
                println!("\nrepository has issues");
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::CatBlob { digest } => {
            let repo = Repo::open(&cli.root)?;
            let hash = Hash::from_hex(digest.trim())?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            read_blob_to(&repo, &hash, &mut out)?;
            out.flush().map_err(|e| paperrepo::Error::Io {
                path: "stdout".into(),
                source: e,
            })?;
        }

        Commands::PutBlob { file } => {
            let repo = Repo::open(&cli.root)?;
            let hash = write_blob_file(&repo, &file)?;
            println!("{}", hash);
        }
    }

    Ok(ExitCode::SUCCESS)
}
