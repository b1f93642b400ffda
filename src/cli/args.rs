//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--log-json`: Emit logs as JSON lines on stderr
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::policy::PolicyKey;
use crate::engine::RevertScope;

/// revkeep - Keep a git working tree and its data store in lockstep
#[derive(Parser, Debug)]
#[command(name = "rk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if rk was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines (overrides the configured log format)
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository in the working directory
    #[command(
        name = "init",
        long_about = "Create a git repository in the working directory.\n\n\
            If a repository already exists, nothing is changed and rk says so."
    )]
    Init,

    /// Switch branches, carrying the data store along when policy asks
    #[command(
        name = "checkout",
        long_about = "Switch to another branch.\n\n\
            Uncommitted changes are discarded first. With the \
            snapshot-on-checkout policy on, the data store is snapshotted at \
            the old tip and restored from the snapshot paired with the new \
            tip (or its nearest ancestor that has one).",
        after_help = "\
WORKFLOW EXAMPLES:
    # Switch branches
    rk checkout feature

    # Carry data across checkouts
    rk policy set snapshot-on-checkout true
    rk checkout main

    # Switch to a branch you just created (no data restore)
    rk checkout feature --new"
    )]
    Checkout {
        /// Branch to check out
        branch: String,

        /// The branch was just created; skip the data restore
        #[arg(long)]
        new: bool,
    },

    /// Commit files, or pair a data snapshot with the current revision
    #[command(
        name = "commit",
        long_about = "Record work.\n\n\
            With paths, the listed files are staged and committed and a \
            commit record is written. Without paths and with --snapshot, the \
            whole data store is snapshotted and paired with the current \
            revision instead; no git commit is made.\n\n\
            Paths are status lines as printed by `git status --porcelain` \
            (\"M  a.txt\") unless --quick is given, in which case they are \
            plain paths.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Commit two files by path
    rk commit -m \"Fix header\" --quick header.php style.css

    # Pair the current data with HEAD
    rk commit -m \"Seed content\" --snapshot"
    )]
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Files to commit
        paths: Vec<String>,

        /// Treat each entry as a plain path rather than a status line
        #[arg(long)]
        quick: bool,

        /// Snapshot the data store instead of committing files
        #[arg(long)]
        snapshot: bool,
    },

    /// Create or delete branches
    #[command(name = "branch")]
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Merge a branch into the current one
    #[command(
        name = "merge",
        long_about = "Merge a branch into the current branch.\n\n\
            A conflicting merge is aborted and the conflicted files are \
            listed. With --import-data, the data snapshot paired with the \
            merged state is restored afterwards."
    )]
    Merge {
        /// Branch to merge
        branch: String,

        /// Restore the data snapshot paired with the merged state
        #[arg(long)]
        import_data: bool,
    },

    /// Discard local edits, fetch, and merge the remote branch
    #[command(
        name = "pull",
        long_about = "Bring in commits from the remote.\n\n\
            Uncommitted changes are discarded before fetching. With the \
            snapshot-on-pull policy on, the data store is snapshotted before \
            the merge and the snapshot id is kept as the undo point."
    )]
    Pull,

    /// Push the current branch to the remote
    #[command(name = "push")]
    Push,

    /// Throw away every uncommitted change, untracked files included
    #[command(name = "discard")]
    Discard,

    /// Reset a branch's files and/or data to an earlier revision
    #[command(
        name = "revert",
        long_about = "Make a branch look like an earlier revision without rewriting history.\n\n\
            The file step checks out the branch, resets to the target, then \
            moves the branch pointer back to where it was and commits the \
            difference as one new commit. The data step restores the snapshot \
            taken at the target revision.\n\n\
            The file step relies on the reflog entry HEAD@{1}. In a fresh \
            clone with no reflog history it fails and the branch may be left \
            at the target revision; run `git reset --hard ORIG_HEAD` to go back.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Revert files only
    rk revert a1b2c3d

    # Revert files and data on another branch
    rk revert a1b2c3d --branch staging --scope both

    # Revert data only and print the details
    rk revert a1b2c3d --scope data --inline"
    )]
    Revert {
        /// Revision to revert to
        revision: String,

        /// Branch to revert (defaults to the current branch)
        #[arg(long)]
        branch: Option<String>,

        /// What to revert
        #[arg(long, default_value = "files", value_parser = parse_scope)]
        scope: RevertScope,

        /// Print the full result instead of a one-line summary
        #[arg(long)]
        inline: bool,

        /// Reference to the record that prompted the revert, kept in the audit trail
        #[arg(long, value_name = "REF")]
        record_ref: Option<String>,
    },

    /// Revert files only, without sending a notification
    #[command(name = "revert-files")]
    RevertFiles {
        /// Revision to revert to
        revision: String,

        /// Branch to revert (defaults to the current branch)
        #[arg(long)]
        branch: Option<String>,
    },

    /// Bring data units that only exist in snapshots back into the live store
    #[command(
        name = "import",
        long_about = "Import data units that exist in stored snapshots but not in the \
            live data store.\n\n\
            Each unit is copied from the newest snapshot that holds it. Units \
            already live are left alone. Run with --list to see candidates."
    )]
    Import {
        /// Units to import
        #[arg(required_unless_present = "list")]
        units: Vec<String>,

        /// List units available for import
        #[arg(long)]
        list: bool,
    },

    /// Read or change policy toggles
    #[command(
        name = "policy",
        long_about = "Read or change policy toggles.\n\n\
            Policies live in git config under `revkeep.<key>`. When a key is \
            unset there, the [policy] table of .git/revkeep/config.toml \
            decides, and otherwise the policy is off.",
        after_help = "\
KEYS:
    snapshot-on-checkout    snapshot before checkout, restore after
    snapshot-on-pull        snapshot before pull, keep it as the undo point
    auto-push               push after a revert commit"
    )]
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Show the audit trail, newest first
    #[command(name = "log")]
    Log {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell. Add the output \
            to your shell's configuration to enable tab-completion for rk commands.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    rk completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    rk completion zsh >> ~/.zshrc

    # Fish
    rk completion fish > ~/.config/fish/completions/rk.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum BranchAction {
    /// Create a branch at HEAD
    Create {
        /// Branch name; whitespace becomes '-'
        name: String,

        /// Switch to the new branch
        #[arg(long)]
        checkout: bool,
    },
    /// Delete a branch
    Delete {
        /// Branch to delete
        name: String,

        /// Also delete the branch on the remote
        #[arg(long)]
        remote: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PolicyAction {
    /// Show one policy, or all of them
    Get {
        /// Policy key
        #[arg(value_parser = parse_policy_key)]
        key: Option<PolicyKey>,
    },
    /// Turn a policy on or off
    Set {
        /// Policy key
        #[arg(value_parser = parse_policy_key)]
        key: PolicyKey,
        /// true / false (also yes / no, on / off, 1 / 0)
        value: String,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

fn parse_scope(s: &str) -> Result<RevertScope, String> {
    s.parse()
}

fn parse_policy_key(s: &str) -> Result<PolicyKey, String> {
    s.parse()
}
