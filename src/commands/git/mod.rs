// src/commands/git/mod.rs
//! Simulated git porcelain backed by a single JSON document rather than a
//! real object database. Enough of `init`/`add`/`commit`/`log`/`status`/
//! `cat-file`/`branch`/`checkout` to drive scripted workflows; it does not
//! speak the real git wire protocol or write actual loose objects.

use async_trait::async_trait;
use std::collections::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use crate::commands::{Command, CommandContext, CommandResult};
use crate::fs::MkdirOptions;

const REPO_FILE: &str = ".git/repo.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommitRecord {
    hash: String,
    parent: Option<String>,
    message: String,
    author: String,
    email: String,
    timestamp_ms: i64,
    tree: IndexMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct RepoState {
    #[serde(rename = "HEAD")]
    head: String,
    branches: IndexMap<String, String>,
    commits: IndexMap<String, CommitRecord>,
    index: IndexMap<String, String>,
    objects: HashMap<String, String>,
    config: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remotes: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_branches: Option<HashMap<String, String>>,
}

impl RepoState {
    fn new() -> Self {
        let mut branches = IndexMap::new();
        branches.insert("main".to_string(), String::new());
        RepoState {
            head: "ref: refs/heads/main".to_string(),
            branches,
            commits: IndexMap::new(),
            index: IndexMap::new(),
            objects: HashMap::new(),
            config: HashMap::new(),
            remotes: None,
            remote_branches: None,
        }
    }

    fn current_branch(&self) -> Option<&str> {
        self.head.strip_prefix("ref: refs/heads/").map(|s| s.trim())
    }

    fn head_commit(&self) -> Option<&str> {
        match self.current_branch() {
            Some(branch) => self.branches.get(branch).map(|s| s.as_str()).filter(|s| !s.is_empty()),
            None => Some(self.head.trim()).filter(|s| !s.is_empty()),
        }
    }
}

/// Non-cryptographic content hash: an 8-hex FNV-1a digest of the bytes,
/// repeated to fill the familiar 40-hex git hash width.
fn content_hash(data: &[u8]) -> String {
    let mut hash: u32 = 0x811c9dc5;
    for &b in data {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    let digest = format!("{:08x}", hash);
    digest.repeat(5)
}

fn short(hash: &str) -> &str {
    &hash[..7.min(hash.len())]
}

async fn load_repo(ctx: &CommandContext) -> Result<RepoState, String> {
    let path = ctx.fs.resolve_path(&ctx.cwd, REPO_FILE);
    match ctx.fs.read_file(&path).await {
        Ok(content) => serde_json::from_str(&content).map_err(|e| format!("fatal: corrupt repository state: {}", e)),
        Err(_) => Err("fatal: not a git repository (or any of the parent directories): .git".to_string()),
    }
}

async fn save_repo(ctx: &CommandContext, repo: &RepoState) -> Result<(), String> {
    let path = ctx.fs.resolve_path(&ctx.cwd, REPO_FILE);
    let json = serde_json::to_string_pretty(repo).map_err(|e| e.to_string())?;
    ctx.fs.write_file(&path, json.as_bytes()).await.map_err(|e| e.to_string())
}

fn author_from_env(ctx: &CommandContext) -> (String, String) {
    let name = ctx.env.get("GIT_AUTHOR_NAME").or_else(|| ctx.env.get("USER")).cloned().unwrap_or_else(|| "user".to_string());
    let email = ctx.env.get("GIT_AUTHOR_EMAIL").cloned().unwrap_or_else(|| format!("{}@localhost", name));
    (name, email)
}

pub struct GitCommand;

#[async_trait]
impl Command for GitCommand {
    fn name(&self) -> &'static str { "git" }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let sub = ctx.args.first().cloned().unwrap_or_default();
        let rest = &ctx.args[1.min(ctx.args.len())..];

        match sub.as_str() {
            "init" => cmd_init(&ctx).await,
            "add" => cmd_add(&ctx, rest).await,
            "commit" => cmd_commit(&ctx, rest).await,
            "log" => cmd_log(&ctx, rest).await,
            "status" => cmd_status(&ctx).await,
            "cat-file" => cmd_cat_file(&ctx, rest).await,
            "branch" => cmd_branch(&ctx, rest).await,
            "checkout" => cmd_checkout(&ctx, rest).await,
            "" => CommandResult::error("usage: git <command> [<args>]\n".to_string()),
            other => CommandResult::with_exit_code(
                String::new(),
                format!("git: '{}' is not a git command. See 'git --help'.\n", other),
                1,
            ),
        }
    }
}

async fn cmd_init(ctx: &CommandContext) -> CommandResult {
    let git_dir = ctx.fs.resolve_path(&ctx.cwd, ".git");
    if ctx.fs.exists(&git_dir).await {
        return CommandResult::success(format!("Reinitialized existing Git repository in {}/\n", git_dir));
    }
    if let Err(e) = ctx.fs.mkdir(&git_dir, &MkdirOptions { recursive: true }).await {
        return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
    }
    let repo = RepoState::new();
    if let Err(e) = save_repo(ctx, &repo).await {
        return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
    }
    CommandResult::success(format!("Initialized empty Git repository in {}/\n", git_dir))
}

async fn cmd_add(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let mut repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    if args.is_empty() {
        return CommandResult::error("Nothing specified, nothing added.\n".to_string());
    }
    let paths: Vec<String> = if args.iter().any(|a| a == "-A" || a == "--all" || a == ".") {
        ctx.fs.get_all_paths().into_iter()
            .filter(|p| p.starts_with(&ctx.cwd) && !p.contains("/.git/"))
            .collect()
    } else {
        args.iter().filter(|a| !a.starts_with('-')).map(|a| ctx.fs.resolve_path(&ctx.cwd, a)).collect()
    };

    for path in paths {
        match ctx.fs.read_file(&path).await {
            Ok(content) => {
                let hash = content_hash(content.as_bytes());
                repo.objects.insert(hash.clone(), content);
                let rel = path.strip_prefix(&format!("{}/", ctx.cwd)).unwrap_or(&path).to_string();
                repo.index.insert(rel, hash);
            }
            Err(e) => return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128),
        }
    }

    if let Err(e) = save_repo(ctx, &repo).await {
        return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
    }
    CommandResult::success(String::new())
}

async fn cmd_commit(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let mut repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    if repo.index.is_empty() {
        return CommandResult::with_exit_code(
            String::new(),
            "nothing to commit, working tree clean\n".to_string(),
            1,
        );
    }

    let mut message = String::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "-m" && i + 1 < args.len() {
            message = args[i + 1].clone();
            i += 2;
        } else {
            i += 1;
        }
    }
    if message.is_empty() {
        return CommandResult::with_exit_code(String::new(), "Aborting commit due to empty commit message.\n".to_string(), 1);
    }

    let (author, email) = author_from_env(ctx);
    let parent = repo.head_commit().map(|s| s.to_string());
    let tree = repo.index.clone();

    let mut hasher_input = tree.iter().map(|(k, v)| format!("{}:{}", k, v)).collect::<Vec<_>>().join("\n");
    hasher_input.push_str(&message);
    let hash = content_hash(hasher_input.as_bytes());

    let record = CommitRecord {
        hash: hash.clone(),
        parent,
        message: message.clone(),
        author,
        email,
        timestamp_ms: ctx.env.get("SOURCE_DATE_EPOCH_MS").and_then(|v| v.parse().ok()).unwrap_or(0),
        tree,
    };
    repo.commits.insert(hash.clone(), record);

    if let Some(branch) = repo.current_branch().map(|s| s.to_string()) {
        repo.branches.insert(branch, hash.clone());
    } else {
        repo.head = hash.clone();
    }
    repo.index.clear();

    if let Err(e) = save_repo(ctx, &repo).await {
        return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
    }

    let branch_label = repo.current_branch().unwrap_or("HEAD");
    CommandResult::success(format!("[{} {}] {}\n", branch_label, short(&hash), message))
}

async fn cmd_log(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    let oneline = args.iter().any(|a| a == "--oneline");

    let mut out = String::new();
    let mut cursor = repo.head_commit().map(|s| s.to_string());
    while let Some(hash) = cursor {
        let Some(commit) = repo.commits.get(&hash) else { break };
        if oneline {
            out.push_str(&format!("{} {}\n", short(&commit.hash), commit.message));
        } else {
            out.push_str(&format!("commit {}\n", commit.hash));
            out.push_str(&format!("Author: {} <{}>\n", commit.author, commit.email));
            out.push_str("\n");
            out.push_str(&format!("    {}\n\n", commit.message));
        }
        cursor = commit.parent.clone();
    }

    if out.is_empty() {
        return CommandResult::with_exit_code(String::new(), "fatal: your current branch does not have any commits yet\n".to_string(), 128);
    }
    CommandResult::success(out)
}

async fn cmd_status(ctx: &CommandContext) -> CommandResult {
    let repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    let branch = repo.current_branch().unwrap_or("HEAD").to_string();
    let mut out = format!("On branch {}\n", branch);
    if repo.index.is_empty() {
        out.push_str("nothing to commit, working tree clean\n");
    } else {
        out.push_str("Changes to be committed:\n");
        for path in repo.index.keys() {
            out.push_str(&format!("\tnew file:   {}\n", path));
        }
    }
    CommandResult::success(out)
}

async fn cmd_cat_file(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    let pretty = args.iter().any(|a| a == "-p");
    let Some(target) = args.iter().find(|a| !a.starts_with('-')) else {
        return CommandResult::error("usage: git cat-file (-p) <object>\n".to_string());
    };

    let hash = if target == "HEAD" {
        match repo.head_commit() {
            Some(h) => h.to_string(),
            None => return CommandResult::with_exit_code(String::new(), "fatal: ambiguous argument 'HEAD'\n".to_string(), 128),
        }
    } else {
        target.clone()
    };

    if let Some(commit) = repo.commits.get(&hash) {
        if pretty {
            let tree_lines: String = commit.tree.iter().map(|(p, h)| format!("{} {}\n", h, p)).collect();
            return CommandResult::success(format!(
                "tree {}\n{}author {} <{}>\n\n{}\n",
                content_hash(tree_lines.as_bytes()),
                commit.parent.as_ref().map(|p| format!("parent {}\n", p)).unwrap_or_default(),
                commit.author,
                commit.email,
                commit.message,
            ));
        }
        return CommandResult::success(format!("commit {}\n", commit.hash.len()));
    }

    if let Some(content) = repo.objects.get(&hash) {
        return CommandResult::success(content.clone());
    }

    CommandResult::with_exit_code(String::new(), format!("fatal: Not a valid object name {}\n", hash), 128)
}

async fn cmd_branch(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let mut repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };

    if let Some(name) = args.iter().find(|a| !a.starts_with('-')) {
        let at = repo.head_commit().unwrap_or_default().to_string();
        repo.branches.insert(name.clone(), at);
        if let Err(e) = save_repo(ctx, &repo).await {
            return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
        }
        return CommandResult::success(String::new());
    }

    let current = repo.current_branch().unwrap_or("").to_string();
    let mut out = String::new();
    for name in repo.branches.keys() {
        if *name == current {
            out.push_str(&format!("* {}\n", name));
        } else {
            out.push_str(&format!("  {}\n", name));
        }
    }
    CommandResult::success(out)
}

async fn cmd_checkout(ctx: &CommandContext, args: &[String]) -> CommandResult {
    let mut repo = match load_repo(ctx).await {
        Ok(r) => r,
        Err(e) => return CommandResult::with_exit_code(String::new(), format!("{}\n", e), 128),
    };
    let create = args.iter().any(|a| a == "-b");
    let Some(name) = args.iter().find(|a| !a.starts_with('-')) else {
        return CommandResult::error("usage: git checkout [-b] <branch>\n".to_string());
    };

    if create {
        let at = repo.head_commit().unwrap_or_default().to_string();
        repo.branches.insert(name.clone(), at);
    } else if !repo.branches.contains_key(name) {
        return CommandResult::with_exit_code(String::new(), format!("error: pathspec '{}' did not match any file(s) known to git\n", name), 1);
    }

    repo.head = format!("ref: refs/heads/{}", name);
    if let Err(e) = save_repo(ctx, &repo).await {
        return CommandResult::with_exit_code(String::new(), format!("fatal: {}\n", e), 128);
    }

    let verb = if create { "Switched to a new branch" } else { "Switched to branch" };
    CommandResult::success(format!("{} '{}'\n", verb, name))
}
