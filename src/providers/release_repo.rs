use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};
use regex::Regex;
use tokio::process::Command;

use super::JobSource;
use crate::config::JobsConfig;
use crate::error::{ReportError, Result};

/// Discovers job names from the job definition files of a git repository.
///
/// Keeps a local clone that is created on first use and fast-forwarded on
/// every later call.
pub struct ReleaseRepoJobSource {
    repo_url: String,
    branch: String,
    checkout_dir: PathBuf,
    jobs_path: String,
    file_suffix: String,
    name_pattern: Regex,
}

impl ReleaseRepoJobSource {
    /// # Errors
    ///
    /// Returns an error if the name pattern is invalid or no checkout
    /// directory is configured and the platform has no cache directory.
    pub fn from_config(config: &JobsConfig) -> Result<Self> {
        let checkout_dir = match &config.checkout_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .ok_or_else(|| ReportError::Config("No cache directory found".into()))?
                .join("periodics-report")
                .join("release"),
        };

        Ok(Self {
            repo_url: config.repo_url.clone(),
            branch: config.branch.clone(),
            checkout_dir,
            jobs_path: config.jobs_path.clone(),
            file_suffix: config.file_suffix.clone(),
            name_pattern: Regex::new(&config.name_pattern)?,
        })
    }

    async fn sync(&self) -> Result<()> {
        if self.checkout_dir.exists() {
            debug!("Updating {}", self.checkout_dir.display());
            self.git(&["fetch", "--all"]).await?;
            self.git(&["checkout", &self.branch]).await?;
            self.git(&["merge", "--ff-only", "@{u}"]).await?;
        } else {
            info!(
                "Cloning {} into {}",
                self.repo_url,
                self.checkout_dir.display()
            );
            if let Some(parent) = self.checkout_dir.parent() {
                fs::create_dir_all(parent)?;
            }
            let target = self.checkout_dir.to_string_lossy().into_owned();
            run_git(
                None,
                &["clone", "--branch", &self.branch, &self.repo_url, &target],
            )
            .await?;
        }

        Ok(())
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        run_git(Some(&self.checkout_dir), args).await
    }

    /// Reads job names from every matching file in `jobs_dir`, in file name order.
    fn names_in(&self, jobs_dir: &Path) -> Result<Vec<String>> {
        let mut files: Vec<PathBuf> = fs::read_dir(jobs_dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(&self.file_suffix))
            })
            .collect();
        files.sort();

        let mut names = Vec::new();
        for file in &files {
            let contents = fs::read_to_string(file)?;
            names.extend(
                contents
                    .lines()
                    .filter_map(|line| self.name_pattern.captures(line.trim()))
                    .filter_map(|caps| caps.get(1))
                    .map(|name| name.as_str().to_owned()),
            );
        }

        debug!("Found {} job names in {} files", names.len(), files.len());
        Ok(names)
    }
}

async fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<()> {
    let mut command = Command::new("git");
    if let Some(dir) = dir {
        command.arg("-C").arg(dir);
    }

    let output = command.args(args).output().await?;

    if !output.status.success() {
        return Err(ReportError::Git(format!(
            "git {} exited with {}: {}",
            args.join(" "),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(())
}

#[async_trait]
impl JobSource for ReleaseRepoJobSource {
    async fn list_job_names(&self) -> Result<Vec<String>> {
        self.sync().await?;
        self.names_in(&self.checkout_dir.join(&self.jobs_path))
    }
}

/// A fixed list of job names.
pub struct StaticJobSource(Vec<String>);

impl StaticJobSource {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }
}

#[async_trait]
impl JobSource for StaticJobSource {
    async fn list_job_names(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}
