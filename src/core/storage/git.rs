//! Git-backed storage.
//!
//! Blobs live in a plain directory tree (see [`Fs`]); history and sync are
//! driven through the `git` binary with `-C <root>`.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use super::{Fs, Storage};
use crate::core::context::Context;
use crate::core::types::Revision;
use crate::error::{RcsError, Result};

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';

/// Directory tree under git revision control.
#[derive(Debug, Clone)]
pub struct Git {
    fs: Fs,
}

impl Git {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { fs: Fs::new(root) }
    }

    /// True if the `git` binary is on PATH.
    pub fn available() -> bool {
        which::which("git").is_ok()
    }

    fn is_repo(&self) -> bool {
        self.fs.path().join(".git").exists()
    }

    fn command(&self, ctx: &Context) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(self.fs.path());
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(name) = ctx.username() {
            cmd.env("GIT_AUTHOR_NAME", name).env("GIT_COMMITTER_NAME", name);
        }
        if let Some(email) = ctx.email() {
            cmd.env("GIT_AUTHOR_EMAIL", email)
                .env("GIT_COMMITTER_EMAIL", email);
        }
        cmd
    }

    fn output(&self, ctx: &Context, args: &[&str]) -> Result<Output> {
        if !Self::available() {
            return Err(RcsError::GitMissing.into());
        }
        debug!(args = ?args, "git");
        let out = self
            .command(ctx)
            .args(args)
            .stdin(Stdio::null())
            .output()?;
        Ok(out)
    }

    /// Run git and fail on a non-zero exit.
    fn run(&self, ctx: &Context, args: &[&str]) -> Result<String> {
        let out = self.output(ctx, args)?;
        if !out.status.success() {
            return Err(RcsError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }

    fn require_repo(&self) -> Result<()> {
        if self.is_repo() {
            Ok(())
        } else {
            Err(RcsError::NotInitialized.into())
        }
    }

    fn has_remote(&self, ctx: &Context, remote: &str) -> Result<bool> {
        let key = format!("remote.{}.url", remote);
        Ok(self
            .output(ctx, &["config", "--get", &key])?
            .status
            .success())
    }
}

fn parse_log(text: &str) -> Vec<Revision> {
    text.split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(6, FIELD_SEP);
            let hash = fields.next()?.to_string();
            let author_name = fields.next()?.to_string();
            let author_email = fields.next()?.to_string();
            let ts: i64 = fields.next()?.parse().ok()?;
            let subject = fields.next()?.to_string();
            let body = fields.next().unwrap_or("").trim().to_string();
            let date: DateTime<Utc> = Utc.timestamp_opt(ts, 0).single()?;
            Some(Revision {
                hash,
                author_name,
                author_email,
                date,
                subject,
                body,
            })
        })
        .collect()
}

/// First path named in a `CONFLICT (...): Merge conflict in <path>` line.
fn conflict_path(stdout: &str) -> Option<&str> {
    stdout
        .lines()
        .find(|l| l.starts_with("CONFLICT"))
        .and_then(|l| l.rsplit(" in ").next())
        .map(str::trim)
}

impl Storage for Git {
    fn name(&self) -> &'static str {
        "gitfs"
    }

    fn path(&self) -> &Path {
        self.fs.path()
    }

    fn get(&self, ctx: &Context, name: &str) -> Result<Vec<u8>> {
        self.fs.get(ctx, name)
    }

    fn set(&self, ctx: &Context, name: &str, value: &[u8]) -> Result<()> {
        self.fs.set(ctx, name, value)
    }

    fn delete(&self, ctx: &Context, name: &str) -> Result<()> {
        self.fs.delete(ctx, name)
    }

    fn exists(&self, ctx: &Context, name: &str) -> bool {
        self.fs.exists(ctx, name)
    }

    fn is_dir(&self, ctx: &Context, name: &str) -> bool {
        self.fs.is_dir(ctx, name)
    }

    fn list(&self, ctx: &Context, prefix: &str) -> Result<Vec<String>> {
        self.fs.list(ctx, prefix)
    }

    fn prune(&self, ctx: &Context, prefix: &str) -> Result<()> {
        self.fs.prune(ctx, prefix)
    }

    fn link(&self, ctx: &Context, from: &str, to: &str) -> Result<()> {
        self.fs.link(ctx, from, to)
    }

    fn fsck(&self, ctx: &Context) -> Result<()> {
        self.fs.fsck(ctx)?;
        if !self.is_repo() {
            return Ok(());
        }
        match self.run(ctx, &["fsck", "--no-progress"]) {
            Ok(_) => debug!("git fsck clean"),
            Err(e) => warn!("git fsck reported problems: {}", e),
        }
        Ok(())
    }

    // --- Revision control ---

    fn init_rcs(&self, ctx: &Context, name: &str, email: &str) -> Result<()> {
        if self.is_repo() {
            debug!("git repository already present");
            return Ok(());
        }
        std::fs::create_dir_all(self.fs.path())?;
        self.run(ctx, &["init", "--quiet"])?;
        if !name.is_empty() {
            self.run(ctx, &["config", "--local", "user.name", name])?;
        }
        if !email.is_empty() {
            self.run(ctx, &["config", "--local", "user.email", email])?;
        }
        self.run(ctx, &["config", "--local", "commit.gpgsign", "false"])?;
        info!(path = %self.fs.path().display(), "initialized git repository");
        Ok(())
    }

    fn add(&self, ctx: &Context, paths: &[&str]) -> Result<()> {
        self.require_repo()?;
        let mut args = vec!["add", "--all", "--"];
        args.extend_from_slice(paths);
        self.run(ctx, &args)?;
        Ok(())
    }

    fn commit(&self, ctx: &Context, message: &str) -> Result<()> {
        self.require_repo()?;
        let staged = self.output(ctx, &["diff", "--cached", "--quiet"])?;
        if staged.status.success() {
            return Err(RcsError::NothingToCommit.into());
        }

        let date = format!("{} +0000", ctx.commit_timestamp().timestamp());
        let out = self
            .command(ctx)
            .args(["commit", "--quiet", "--no-verify", "-m", message])
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .stdin(Stdio::null())
            .output()?;
        if !out.status.success() {
            return Err(RcsError::CommandFailed {
                command: "git commit".into(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        debug!(message, "committed");
        Ok(())
    }

    fn push(&self, ctx: &Context, remote: &str, branch: &str) -> Result<()> {
        self.require_repo()?;
        if ctx.is_no_network() {
            debug!("network disabled, skipping push");
            return Ok(());
        }
        if !self.has_remote(ctx, remote)? {
            return Err(RcsError::NoRemote(remote.to_string()).into());
        }

        let status = self.run(ctx, &["status", "--porcelain"])?;
        let untracked = status.lines().filter(|l| l.starts_with("??")).count();
        if untracked > 0 {
            warn!(untracked, "store has untracked files, they will not be pushed");
        }

        self.pull(ctx, remote, branch)?;

        let out = self.output(ctx, &["push", remote, &format!("HEAD:{}", branch)])?;
        if !out.status.success() {
            return Err(RcsError::PushFailed(
                String::from_utf8_lossy(&out.stderr).trim().to_string(),
            )
            .into());
        }
        info!(remote, branch, "pushed");
        Ok(())
    }

    fn pull(&self, ctx: &Context, remote: &str, branch: &str) -> Result<()> {
        self.require_repo()?;
        if ctx.is_no_network() {
            return Ok(());
        }
        if !self.has_remote(ctx, remote)? {
            return Err(RcsError::NoRemote(remote.to_string()).into());
        }
        let out = self.output(ctx, &["pull", "--no-edit", "--no-rebase", remote, branch])?;
        if !out.status.success() {
            let stdout = String::from_utf8_lossy(&out.stdout);
            if let Some(path) = conflict_path(&stdout) {
                return Err(RcsError::Conflict(path.into()).into());
            }
            let stderr = String::from_utf8_lossy(&out.stderr);
            // an empty remote has nothing to merge
            if stderr.contains("couldn't find remote ref") {
                debug!(remote, branch, "remote branch missing, nothing to pull");
                return Ok(());
            }
            return Err(RcsError::CommandFailed {
                command: "git pull".into(),
                stderr: stderr.trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn add_remote(&self, ctx: &Context, remote: &str, url: &str) -> Result<()> {
        self.require_repo()?;
        self.run(ctx, &["remote", "add", remote, url])?;
        Ok(())
    }

    fn remove_remote(&self, ctx: &Context, remote: &str) -> Result<()> {
        self.require_repo()?;
        if !self.has_remote(ctx, remote)? {
            return Err(RcsError::NoRemote(remote.to_string()).into());
        }
        self.run(ctx, &["remote", "remove", remote])?;
        Ok(())
    }

    fn revisions(&self, ctx: &Context, name: &str) -> Result<Vec<Revision>> {
        self.require_repo()?;
        let out = self.output(
            ctx,
            &[
                "log",
                "--format=%H%x1f%an%x1f%ae%x1f%at%x1f%s%x1f%b%x1e",
                "--",
                name,
            ],
        )?;
        // a fresh repository without commits has no log
        if !out.status.success() {
            return Ok(Vec::new());
        }
        Ok(parse_log(&String::from_utf8_lossy(&out.stdout)))
    }

    fn get_revision(&self, ctx: &Context, name: &str, rev: &str) -> Result<Vec<u8>> {
        self.require_repo()?;
        let spec = format!("{}:{}", rev, name);
        let out = self.output(ctx, &["show", &spec])?;
        if !out.status.success() {
            return Err(RcsError::UnknownRevision {
                name: name.to_string(),
                rev: rev.to_string(),
            }
            .into());
        }
        Ok(out.stdout)
    }

    fn status(&self, ctx: &Context) -> Result<String> {
        self.require_repo()?;
        self.run(ctx, &["status", "--porcelain"])
    }

    fn compact(&self, ctx: &Context) -> Result<()> {
        self.require_repo()?;
        self.run(ctx, &["gc", "--aggressive", "--prune=now", "--quiet"])?;
        Ok(())
    }
}
