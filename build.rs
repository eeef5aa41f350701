use std::{fs, path::Path, process::Command, time::SystemTime};

fn main() {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    println!("cargo:rustc-env=BUILD_TIME={}", now);

    println!("cargo:rerun-if-changed=.git/HEAD");
    if Path::new(".git/refs/heads").exists() {
        println!("cargo:rerun-if-changed=.git/refs/heads");
    }

    let git = GitInfo::collect();
    let short = git.commit.get(..7).unwrap_or(&git.commit).to_string();

    println!("cargo:rustc-env=GIT_BRANCH={}", git.branch);
    println!("cargo:rustc-env=GIT_COMMIT={}", git.commit);
    println!("cargo:rustc-env=GIT_COMMIT_SHORT={}", short);
    println!("cargo:rustc-env=GIT_COMMIT_TIME={}", git.commit_time);
    println!("cargo:rustc-env=GIT_DIRTY={}", git.dirty);
}

struct GitInfo {
    branch: String,
    commit: String,
    commit_time: u64,
    dirty: bool,
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl GitInfo {
    fn collect() -> Self {
        let mut info = Self {
            branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_else(|| "unknown".into()),
            commit: git(&["rev-parse", "HEAD"]).unwrap_or_else(|| "unknown".into()),
            commit_time: git(&["show", "-s", "--format=%ct", "HEAD"])
                .and_then(|s| s.parse::<u64>().ok())
                .map(|t| t * 1000)
                .unwrap_or(0),
            dirty: git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty()),
        };

        // No git binary: read HEAD directly.
        if info.commit == "unknown" {
            if let Ok(head) = fs::read_to_string(".git/HEAD") {
                match head.strip_prefix("ref: ") {
                    Some(reference) => {
                        let reference = reference.trim();
                        if let Some(branch) = reference.rsplit('/').next() {
                            info.branch = branch.to_string();
                        }
                        if let Ok(commit) = fs::read_to_string(format!(".git/{}", reference)) {
                            info.commit = commit.trim().to_string();
                        }
                    }
                    None => info.commit = head.trim().to_string(),
                }
            }
        }

        info
    }
}
