//! Review flows against real git repositories.

use std::path::Path;
use std::process::Command;

use appraise_core::core::reviews::RequestParams;
use appraise_core::core::CoreContext;
use appraise_core::notes::{Namespace, NotesLayout};
use appraise_core::repo::{GitRepo, Repository};
use appraise_core::review::Review;
use appraise_core::submit::{ReviewState, SubmitOptions};
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run git command");
    assert!(
        output.status.success(),
        "git command failed: {args:?}: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure(dir: &Path, email: &str) {
    git(dir, &["config", "user.email", email]);
    git(dir, &["config", "user.name", "Test User"]);
}

fn commit_file(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), format!("{name}\n")).expect("write file");
    git(dir, &["add", name]);
    git(dir, &["commit", "-q", "-m", name]);
}

/// master with one commit, feature with two more, feature checked out.
fn setup_repo(dir: &Path) -> GitRepo {
    std::fs::create_dir_all(dir).expect("create repo dir");
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    configure(dir, "alice@example.com");
    commit_file(dir, "base.txt");
    git(dir, &["checkout", "-q", "-b", "feature"]);
    commit_file(dir, "one.txt");
    commit_file(dir, "two.txt");
    GitRepo::new(dir.to_path_buf())
}

fn context(repo: &GitRepo) -> CoreContext<'_> {
    CoreContext::new(repo).with_layout(NotesLayout::default())
}

#[test]
fn request_accept_and_merge() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path().join("work");
    let repo = setup_repo(&dir);
    let ctx = context(&repo);

    let requested = ctx
        .services()
        .reviews()
        .request(RequestParams {
            description: "fix bug".to_string(),
            ..RequestParams::default()
        })
        .expect("request review");
    let first = git(&dir, &["rev-list", "--reverse", "master..feature"]);
    assert_eq!(requested.revision, first.lines().next().unwrap_or_default());
    assert_eq!(requested.request.requester, "alice@example.com");

    ctx.services()
        .comments()
        .accept(None, "LGTM")
        .expect("accept review");
    let review = ctx.review(None).expect("load review");
    assert_eq!(review.state(&repo).unwrap(), ReviewState::Accepted);

    ctx.services()
        .reviews()
        .submit(
            None,
            &SubmitOptions {
                merge: true,
                ..SubmitOptions::default()
            },
        )
        .expect("submit review");

    assert_eq!(repo.current_branch().unwrap(), "refs/heads/master");
    let message = git(&dir, &["log", "-1", "--format=%B", "master"]);
    assert_eq!(
        message,
        format!("Submitting review {}\n\nfix bug", &requested.revision[..12])
    );
    let parents = git(&dir, &["log", "-1", "--format=%P", "master"]);
    assert_eq!(parents.split_whitespace().count(), 2);

    let review = ctx.review(Some(&requested.revision)).expect("reload review");
    assert_eq!(review.state(&repo).unwrap(), ReviewState::Submitted);
}

#[test]
fn notes_travel_through_a_remote() {
    let tmp = TempDir::new().expect("tempdir");
    let work = tmp.path().join("work");
    let bare = tmp.path().join("remote.git");
    let clone = tmp.path().join("clone");

    let repo = setup_repo(&work);
    git(tmp.path(), &["init", "-q", "--bare", "remote.git"]);
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(&work, &["remote", "add", "origin", bare.to_str().unwrap()]);
    git(&work, &["push", "-q", "origin", "master", "feature"]);

    let ctx = context(&repo);
    let requested = ctx
        .services()
        .reviews()
        .request(RequestParams::default())
        .expect("request review");
    ctx.services().sync().push("origin").expect("push notes");

    git(tmp.path(), &["clone", "-q", bare.to_str().unwrap(), "clone"]);
    configure(&clone, "bob@example.com");
    let other = GitRepo::new(clone.clone());
    let other_ctx = context(&other);
    let report = other_ctx.services().sync().pull("origin").expect("pull notes");
    assert_eq!(report.merged["reviews"], 1);

    let reject = other_ctx
        .services()
        .comments()
        .reject(Some(&requested.revision), "needs tests")
        .expect("reject review");
    assert_eq!(reject.comment.author, "bob@example.com");
    other_ctx.services().sync().push("origin").expect("push notes");

    ctx.services().sync().pull("origin").expect("pull notes");
    let review = Review::get(&ctx.store(), &requested.revision).expect("load review");
    assert_eq!(review.resolved, Some(false));
    assert_eq!(review.comment_count(), 1);
    assert_eq!(review.comments[0].hash, reject.hash);
}

#[test]
fn stale_notes_push_is_refused() {
    let tmp = TempDir::new().expect("tempdir");
    let work = tmp.path().join("work");
    let bare = tmp.path().join("remote.git");
    let clone = tmp.path().join("clone");

    let repo = setup_repo(&work);
    git(tmp.path(), &["init", "-q", "--bare", "remote.git"]);
    git(&bare, &["symbolic-ref", "HEAD", "refs/heads/master"]);
    git(&work, &["remote", "add", "origin", bare.to_str().unwrap()]);
    git(&work, &["push", "-q", "origin", "master", "feature"]);

    let ctx = context(&repo);
    let requested = ctx
        .services()
        .reviews()
        .request(RequestParams::default())
        .expect("request review");
    ctx.services()
        .comments()
        .accept(None, "first")
        .expect("first comment");
    ctx.services().sync().push("origin").expect("push notes");

    git(tmp.path(), &["clone", "-q", bare.to_str().unwrap(), "clone"]);
    configure(&clone, "bob@example.com");
    let other = GitRepo::new(clone.clone());
    let other_ctx = context(&other);
    other_ctx.services().sync().pull("origin").expect("pull notes");

    ctx.services()
        .comments()
        .reject(Some(&requested.revision), "second")
        .expect("second comment");
    ctx.services().sync().push("origin").expect("push notes");

    other_ctx
        .services()
        .comments()
        .accept(Some(&requested.revision), "third")
        .expect("third comment");
    let layout = NotesLayout::default();
    let discuss = layout.notes_ref(Namespace::Discuss);
    let stale = other
        .notes_tip(&layout.remote_notes_ref("origin", Namespace::Discuss))
        .expect("tracking tip");
    assert!(other
        .push_notes("origin", &discuss, stale.as_deref())
        .is_err());

    other_ctx.services().sync().push("origin").expect("push notes");
    ctx.services().sync().pull("origin").expect("pull notes");
    let review = Review::get(&ctx.store(), &requested.revision).expect("load review");
    assert_eq!(review.comment_count(), 3);
}
