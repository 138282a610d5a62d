use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::repo::{short_branch, validate_ref_name, Repository};

/// [`Repository`] backed by the `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        command.current_dir(&self.root).args(args);
        command
    }

    fn spawn_error(args: &[&str]) -> String {
        if let Err(e) = which::which("git") {
            format!("git command not found. Please install git: {e}")
        } else {
            format!("Failed to execute git command: {args:?}")
        }
    }

    /// Run git and return its raw output regardless of exit status.
    fn run_git_status(&self, args: &[&str]) -> Result<Output> {
        self.command(args)
            .output()
            .with_context(|| Self::spawn_error(args))
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = self.run_git_status(args)?;
        Self::stdout_of(&output)
    }

    fn run_git_with_input(&self, args: &[&str], input: &str) -> Result<String> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| Self::spawn_error(args))?;

        child
            .stdin
            .take()
            .context("git stdin was not captured")?
            .write_all(input.as_bytes())
            .context("Failed to write to git stdin")?;

        let output = child
            .wait_with_output()
            .with_context(|| format!("Failed to wait for git command: {args:?}"))?;
        Self::stdout_of(&output)
    }

    fn stdout_of(output: &Output) -> Result<String> {
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git command failed with status {}: {}",
                output.status,
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout.clone()).context("git output was not valid UTF-8")
    }

    fn maybe_symbolic_ref_head(&self) -> Option<String> {
        let output = self
            .run_git_status(&["symbolic-ref", "--quiet", "HEAD"])
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let stdout = String::from_utf8(output.stdout).ok()?;
        let value = stdout.trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn note_object(&self, notes_ref: &str, revision: &str) -> Result<Option<String>> {
        let output = self.run_git_status(&["notes", "--ref", notes_ref, "list", revision])?;
        if !output.status.success() {
            return Ok(None);
        }
        let object = String::from_utf8(output.stdout)
            .context("git output was not valid UTF-8")?
            .trim()
            .to_string();
        Ok(if object.is_empty() { None } else { Some(object) })
    }
}

#[must_use]
pub fn detect_git_root(start_path: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .current_dir(start_path)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8(output.stdout).ok()?;
    let root = stdout.trim();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

impl Repository for GitRepo {
    fn current_branch(&self) -> Result<String> {
        self.maybe_symbolic_ref_head()
            .context("HEAD is detached; check out a branch first")
    }

    fn head_revision(&self) -> Result<String> {
        let output = self
            .run_git(&["rev-parse", "HEAD"])
            .context("Failed to get current commit")?;
        Ok(output.trim().to_string())
    }

    fn resolve_ref(&self, name: &str) -> Result<String> {
        validate_ref_name(name)?;
        let rev = format!("{name}^{{commit}}");
        let output = self
            .run_git(&["rev-parse", "--verify", "--end-of-options", &rev])
            .with_context(|| format!("Failed to resolve reference {name}"))?;
        Ok(output.trim().to_string())
    }

    fn ref_exists(&self, name: &str) -> Result<bool> {
        validate_ref_name(name)?;
        let rev = format!("{name}^{{commit}}");
        let output =
            self.run_git_status(&["rev-parse", "--verify", "--quiet", "--end-of-options", &rev])?;
        Ok(output.status.success())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        validate_ref_name(ancestor)?;
        validate_ref_name(descendant)?;
        let output =
            self.run_git_status(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => bail!(
                "Failed to check whether {ancestor} is an ancestor of {descendant}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    fn ancestors(&self, revision: &str) -> Result<Vec<String>> {
        validate_ref_name(revision)?;
        let output = self
            .run_git(&["rev-list", "--end-of-options", revision])
            .with_context(|| format!("Failed to list ancestors of {revision}"))?;
        Ok(output.lines().map(ToString::to_string).collect())
    }

    fn revisions_between(&self, from: &str, to: &str) -> Result<Vec<String>> {
        validate_ref_name(from)?;
        validate_ref_name(to)?;
        let range = format!("{from}..{to}");
        let output = self
            .run_git(&["rev-list", "--reverse", "--end-of-options", &range])
            .with_context(|| format!("Failed to list commits from {from} to {to}"))?;
        Ok(output.lines().map(ToString::to_string).collect())
    }

    fn switch_to_ref(&self, name: &str) -> Result<()> {
        validate_ref_name(name)?;
        self.run_git(&["checkout", short_branch(name), "--"])
            .with_context(|| format!("Failed to check out {name}"))?;
        Ok(())
    }

    fn merge_ref(&self, source: &str, fast_forward_only: bool, messages: &[String]) -> Result<()> {
        validate_ref_name(source)?;
        let mode = if fast_forward_only { "--ff-only" } else { "--no-ff" };
        let mut args = vec!["merge", mode, "--no-edit"];
        for message in messages {
            args.push("-m");
            args.push(message.as_str());
        }
        args.push(source);
        self.run_git(&args)
            .with_context(|| format!("Failed to merge {source}"))?;
        Ok(())
    }

    fn rebase_ref(&self, source: &str) -> Result<()> {
        validate_ref_name(source)?;
        let current = self.current_branch()?;
        let target = short_branch(&current);
        let branch = short_branch(source);

        self.run_git(&["rebase", target, branch])
            .with_context(|| format!("Failed to rebase {source} onto {current}"))?;
        self.run_git(&["checkout", target, "--"])
            .with_context(|| format!("Failed to check out {current}"))?;
        self.run_git(&["merge", "--ff-only", branch])
            .with_context(|| format!("Failed to advance {current} to {source}"))?;
        Ok(())
    }

    fn read_note(&self, notes_ref: &str, revision: &str) -> Result<Option<String>> {
        validate_ref_name(notes_ref)?;
        validate_ref_name(revision)?;
        let Some(object) = self.note_object(notes_ref, revision)? else {
            return Ok(None);
        };
        let contents = self
            .run_git(&["cat-file", "blob", &object])
            .with_context(|| format!("Failed to read note {object} on {revision}"))?;
        Ok(Some(contents))
    }

    fn write_note(&self, notes_ref: &str, revision: &str, contents: &str) -> Result<()> {
        validate_ref_name(notes_ref)?;
        validate_ref_name(revision)?;
        self.run_git_with_input(
            &["notes", "--ref", notes_ref, "add", "-f", "-F", "-", revision],
            contents,
        )
        .with_context(|| format!("Failed to write note under {notes_ref} on {revision}"))?;
        Ok(())
    }

    fn append_note(&self, notes_ref: &str, revision: &str, line: &str) -> Result<()> {
        validate_ref_name(notes_ref)?;
        validate_ref_name(revision)?;
        self.run_git(&["notes", "--ref", notes_ref, "append", "-m", line, revision])
            .with_context(|| format!("Failed to append note under {notes_ref} on {revision}"))?;
        Ok(())
    }

    fn annotated_revisions(&self, notes_ref: &str) -> Result<Vec<String>> {
        if !self.ref_exists(notes_ref)? {
            return Ok(Vec::new());
        }
        let output = self
            .run_git(&["notes", "--ref", notes_ref, "list"])
            .with_context(|| format!("Failed to list notes under {notes_ref}"))?;

        Ok(output
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(ToString::to_string)
            .collect())
    }

    fn user_email(&self) -> Result<String> {
        let output = self
            .run_git(&["config", "user.email"])
            .context("Failed to read user.email from git config")?;
        Ok(output.trim().to_string())
    }

    fn fetch_notes(&self, remote: &str, refspec: &str) -> Result<()> {
        validate_ref_name(remote)?;
        self.run_git(&["fetch", remote, refspec])
            .with_context(|| format!("Failed to fetch {refspec} from {remote}"))?;
        Ok(())
    }

    fn notes_tip(&self, notes_ref: &str) -> Result<Option<String>> {
        validate_ref_name(notes_ref)?;
        let output =
            self.run_git_status(&["rev-parse", "--verify", "--quiet", "--end-of-options", notes_ref])?;
        if output.status.success() {
            Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
        } else {
            Ok(None)
        }
    }

    fn push_notes(&self, remote: &str, notes_ref: &str, expected: Option<&str>) -> Result<()> {
        validate_ref_name(remote)?;
        validate_ref_name(notes_ref)?;
        let lease = format!("--force-with-lease={notes_ref}:{}", expected.unwrap_or_default());
        let refspec = format!("{notes_ref}:{notes_ref}");
        self.run_git(&["push", &lease, remote, &refspec])
            .with_context(|| format!("Failed to push {notes_ref} to {remote}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run_git_at(repo: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(repo)
            .args(args)
            .status()
            .expect("failed to run git command");
        assert!(status.success(), "git command failed: {args:?}");
    }

    fn commit_file(repo: &Path, name: &str, contents: &str) {
        std::fs::write(repo.join(name), contents).expect("write file");
        run_git_at(repo, &["add", name]);
        run_git_at(repo, &["commit", "-q", "-m", name]);
    }

    fn setup_git_repo() -> (TempDir, GitRepo) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().to_path_buf();
        run_git_at(&path, &["init", "-q"]);
        run_git_at(&path, &["symbolic-ref", "HEAD", "refs/heads/master"]);
        run_git_at(&path, &["config", "user.email", "test@example.com"]);
        run_git_at(&path, &["config", "user.name", "Test User"]);
        commit_file(&path, "file.txt", "line1\n");
        (dir, GitRepo::new(path))
    }

    #[test]
    fn test_detect_git_root() {
        let (dir, _repo) = setup_git_repo();
        let detected = detect_git_root(dir.path()).expect("detect root");
        assert_eq!(
            detected.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_current_branch_and_refs() {
        let (_dir, repo) = setup_git_repo();
        assert_eq!(repo.current_branch().unwrap(), "refs/heads/master");
        assert!(repo.ref_exists("master").unwrap());
        assert!(!repo.ref_exists("refs/heads/nope").unwrap());
        assert_eq!(
            repo.resolve_ref("refs/heads/master").unwrap(),
            repo.head_revision().unwrap()
        );
        assert_eq!(repo.user_email().unwrap(), "test@example.com");
    }

    #[test]
    fn test_ancestry_and_ranges() {
        let (dir, repo) = setup_git_repo();
        let base = repo.head_revision().unwrap();
        run_git_at(dir.path(), &["checkout", "-q", "-b", "feature"]);
        commit_file(dir.path(), "a.txt", "a\n");
        commit_file(dir.path(), "b.txt", "b\n");
        let tip = repo.head_revision().unwrap();

        assert!(repo.is_ancestor(&base, &tip).unwrap());
        assert!(!repo.is_ancestor(&tip, &base).unwrap());

        let between = repo.revisions_between(&base, &tip).unwrap();
        assert_eq!(between.len(), 2);
        assert_eq!(between[1], tip);

        let ancestors = repo.ancestors(&tip).unwrap();
        assert_eq!(ancestors.first(), Some(&tip));
        assert_eq!(ancestors.last(), Some(&base));
    }

    #[test]
    fn test_notes_roundtrip() {
        let (_dir, repo) = setup_git_repo();
        let head = repo.head_revision().unwrap();
        let notes_ref = "refs/notes/devtools/discuss";

        assert_eq!(repo.read_note(notes_ref, &head).unwrap(), None);
        assert!(repo.annotated_revisions(notes_ref).unwrap().is_empty());

        repo.append_note(notes_ref, &head, r#"{"description":"one"}"#)
            .unwrap();
        repo.append_note(notes_ref, &head, r#"{"description":"two"}"#)
            .unwrap();

        let blob = repo.read_note(notes_ref, &head).unwrap().unwrap();
        let lines: Vec<&str> = blob.lines().filter(|l| !l.trim().is_empty()).collect();
        assert_eq!(
            lines,
            vec![r#"{"description":"one"}"#, r#"{"description":"two"}"#]
        );
        assert_eq!(repo.annotated_revisions(notes_ref).unwrap(), vec![head.clone()]);

        repo.write_note(notes_ref, &head, "{\"description\":\"only\"}\n")
            .unwrap();
        let blob = repo.read_note(notes_ref, &head).unwrap().unwrap();
        assert_eq!(blob.trim(), r#"{"description":"only"}"#);
    }

    #[test]
    fn test_fast_forward_merge() {
        let (dir, repo) = setup_git_repo();
        run_git_at(dir.path(), &["checkout", "-q", "-b", "feature"]);
        commit_file(dir.path(), "a.txt", "a\n");
        let tip = repo.head_revision().unwrap();

        repo.switch_to_ref("refs/heads/master").unwrap();
        assert_eq!(repo.current_branch().unwrap(), "refs/heads/master");
        repo.merge_ref("refs/heads/feature", true, &[]).unwrap();
        assert_eq!(repo.resolve_ref("master").unwrap(), tip);
    }
}
