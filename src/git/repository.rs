use git2::Repository;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{AppError, Result};

/// `git log` pretty format: sentinel, hash, ISO date, author, subject (tab separated).
pub const PRETTY_FORMAT: &str = "+++%H%x09%ad%x09%an%x09%s";

pub struct GitRepository {
    pub workdir: PathBuf,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let repo = Repository::discover(&path).map_err(|_| AppError::RepoNotFound(path_str.clone()))?;

        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| AppError::RepoNotFound(format!("{} (bare repository)", path_str)))?;

        Ok(Self { workdir })
    }

    /// Run the log export over the full reachable history, with rename and copy
    /// detection, and return its stdout.
    pub fn export_log(&self) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(log_args())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::GitLogFailed(stderr.into_owned()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn log_args() -> Vec<String> {
    vec![
        "log".to_string(),
        "--all".to_string(),
        "-M".to_string(),
        "-C".to_string(),
        "--numstat".to_string(),
        "--date=iso".to_string(),
        format!("--pretty=format:{}", PRETTY_FORMAT),
    ]
}

const TIME_UNITS: &[(i64, &str)] = &[
    (31_536_000, "year"),
    (2_592_000, "month"),
    (86_400, "day"),
    (3_600, "hour"),
    (60, "minute"),
];

/// Age of a commit, e.g. "3 days ago".
pub fn format_relative_time(timestamp: i64) -> String {
    let diff = chrono::Utc::now().timestamp() - timestamp;

    for &(seconds, unit) in TIME_UNITS {
        let count = diff / seconds;
        if count >= 1 {
            return format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" });
        }
    }
    "just now".to_string()
}
