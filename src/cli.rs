use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::path::PathBuf;

use crate::config::{Config, MessageStyle};
use crate::output::{self, PhaseProgress};
use crate::pipeline::{compose_blocks, deliver, PeriodicsReport, ReportPipeline};
use crate::providers::{
    JobSource, ProwArtifacts, ReleaseRepoJobSource, SlackWebhook, StaticJobSource,
};

#[derive(Parser)]
#[command(name = "periodics-report")]
#[command(author, version, about = "Periodic CI job digest", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./periodics-report.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the result as JSON to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect recent runs of every periodic job and post the summary
    Report {
        /// Only runs completed within this many hours are reported
        #[arg(short, long, env = "DELTA_TIME_HOURS")]
        window_hours: Option<u32>,

        #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
        webhook_url: Option<String>,

        #[arg(long, env = "SLACK_WEBHOOK_URL_PRIV", hide_env_values = true)]
        dev_webhook_url: Option<String>,

        /// Post to the development webhook instead
        #[arg(long, env = "DEVELOPMENT", default_value_t = false)]
        development: bool,

        #[arg(long, value_enum)]
        style: Option<MessageStyle>,

        /// Split the summary into sections of at most N lines
        /// (the configured size, or 5, when N is omitted)
        #[arg(long, value_name = "N")]
        chunk_lines: Option<Option<usize>>,

        /// Report on these jobs instead of discovering them
        #[arg(short, long = "job")]
        jobs: Vec<String>,

        /// Print the summary instead of posting it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// List the discovered periodic jobs and how their names classify
    Jobs {
        #[arg(short, long = "job")]
        jobs: Vec<String>,
    },
}

fn job_source(config: &Config, jobs: &[String]) -> Result<Box<dyn JobSource>> {
    if !jobs.is_empty() {
        return Ok(Box::new(StaticJobSource::new(jobs.to_vec())));
    }

    if !config.jobs.names.is_empty() {
        return Ok(Box::new(StaticJobSource::new(config.jobs.names.clone())));
    }

    Ok(Box::new(ReleaseRepoJobSource::from_config(&config.jobs)?))
}

impl Cli {
    fn write_output<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let Some(output_path) = &self.output else {
            return Ok(());
        };

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create {}", output_path.display()))?;
        output::export_json(value, self.pretty, &mut file)?;
        info!("Output written to: {}", output_path.display());

        Ok(())
    }

    async fn generate_report(
        &self,
        config: &Config,
        jobs: Box<dyn JobSource>,
    ) -> Result<PeriodicsReport> {
        let runs = ProwArtifacts::new(
            &config.artifacts.base_url,
            config.artifacts.max_concurrent_requests,
        )?;
        let pipeline = ReportPipeline::new(
            jobs,
            runs,
            config.report.classifier()?,
            config.report.window(),
            config.report.success_marker.as_str(),
        );
        let now = Utc::now();

        let progress = PhaseProgress::start_phase_1();
        let discovery = match pipeline.discover().await {
            Ok(discovery) => discovery,
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        let progress = progress
            .finish_phase_1_start_phase_2(discovery.aggregates.len(), config.report.window_hours);
        let aggregates = match pipeline.collect(discovery.aggregates, now).await {
            Ok(aggregates) => aggregates,
            Err(e) => {
                progress.abandon();
                return Err(e.into());
            }
        };

        let execution_count = aggregates.iter().map(|a| a.len()).sum();
        let progress = progress.finish_phase_2_start_phase_3(execution_count);
        let report = pipeline.build(aggregates, &discovery.versions, now);
        progress.finish_phase_3();

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_report(
        &self,
        window_hours: Option<u32>,
        webhook_url: Option<&str>,
        dev_webhook_url: Option<&str>,
        development: bool,
        style: Option<MessageStyle>,
        chunk_lines: Option<Option<usize>>,
        jobs: &[String],
        dry_run: bool,
    ) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(hours) = window_hours {
            config.report.window_hours = hours;
        }
        if let Some(url) = webhook_url {
            config.slack.webhook_url = Some(url.to_owned());
        }
        if let Some(url) = dev_webhook_url {
            config.slack.dev_webhook_url = Some(url.to_owned());
        }
        if let Some(style) = style {
            config.report.style = style;
        }
        match chunk_lines {
            Some(Some(lines)) => config.report.chunk_lines = Some(lines),
            Some(None) => config.report.chunk_lines = Some(config.report.chunk_lines_or_default()),
            None => {}
        }

        // Fail on a missing webhook before doing any network work
        let webhook = if dry_run {
            None
        } else {
            let Some(url) = config.slack.webhook(development) else {
                if development {
                    bail!("SLACK_WEBHOOK_URL_PRIV has not been provided");
                }
                bail!("SLACK_WEBHOOK_URL has not been provided");
            };
            Some(SlackWebhook::new(url)?)
        };

        info!(
            "Collecting periodic job results from the last {} hours",
            config.report.window_hours
        );
        let report = self
            .generate_report(&config, job_source(&config, jobs)?)
            .await?;
        self.write_output(&report)?;

        let Some(webhook) = webhook else {
            output::print_summary(&report);
            return Ok(());
        };

        let blocks = compose_blocks(
            &report,
            &config.report.title,
            config.report.style,
            config.report.chunk_lines,
        );
        deliver(&webhook, &report, &blocks).await?;
        info!("Summary posted: {}", report.headline);

        Ok(())
    }

    async fn execute_jobs(&self, jobs: &[String]) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let source = job_source(&config, jobs)?;

        let names = source.list_job_names().await?;
        let (identities, versions) = config.report.classifier()?.classify_all(&names)?;
        info!(
            "{} jobs across versions: {}",
            identities.len(),
            versions.iter().collect::<Vec<_>>().join(", ")
        );

        output::print_jobs(&identities);
        self.write_output(identities.as_slice())?;

        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Report {
                window_hours,
                webhook_url,
                dev_webhook_url,
                development,
                style,
                chunk_lines,
                jobs,
                dry_run,
            } => {
                self.execute_report(
                    *window_hours,
                    webhook_url.as_deref(),
                    dev_webhook_url.as_deref(),
                    *development,
                    *style,
                    *chunk_lines,
                    jobs,
                    *dry_run,
                )
                .await
            }
            Commands::Jobs { jobs } => self.execute_jobs(jobs).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_report_arguments() {
        let cli = Cli::try_parse_from([
            "periodics-report",
            "report",
            "--window-hours",
            "12",
            "--style",
            "rich-text",
            "--job",
            "periodic-4.19-kubevirt-aws-periodics-ovn",
            "--dry-run",
            "--chunk-lines",
        ])
        .unwrap();

        match cli.command {
            Commands::Report {
                window_hours,
                style,
                jobs,
                dry_run,
                chunk_lines,
                ..
            } => {
                assert_eq!(window_hours, Some(12));
                assert_eq!(chunk_lines, Some(None));
                assert_eq!(style, Some(MessageStyle::RichText));
                assert_eq!(jobs, vec!["periodic-4.19-kubevirt-aws-periodics-ovn"]);
                assert!(dry_run);
            }
            Commands::Jobs { .. } => panic!("expected report command"),
        }
    }

    #[test]
    fn test_explicit_jobs_take_precedence() {
        let config = Config::default();
        let jobs = vec!["periodic-4.19-kubevirt-aws-periodics-ovn".to_string()];

        assert!(job_source(&config, &jobs).is_ok());
    }

    #[tokio::test]
    async fn test_configured_names_are_used_without_repository() {
        let mut config = Config::default();
        config.jobs.names = vec!["periodic-4.20-kubevirt-metal-periodics-fips".to_string()];

        let source = job_source(&config, &[]).unwrap();

        assert_eq!(
            source.list_job_names().await.unwrap(),
            vec!["periodic-4.20-kubevirt-metal-periodics-fips"]
        );
    }
}
