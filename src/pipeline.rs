use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::MessageStyle;
use crate::error::Result;
use crate::periodics::{
    group, render_headline, render_rich_blocks, render_text_summary, shrink_text_summary,
    summarize, Block, Classifier, ExecutionWindow, JobAggregate, ReportTree, Step, SummaryTotals,
    VersionRegistry,
};
use crate::providers::{JobSource, Notifier, RunSource};

/// Classified jobs, before any run history is fetched.
#[derive(Debug)]
pub struct Discovery {
    pub aggregates: Vec<JobAggregate>,
    pub versions: VersionRegistry,
}

/// Everything produced by one reporting run.
#[derive(Debug, Serialize)]
pub struct PeriodicsReport {
    pub collected_at: DateTime<Utc>,
    pub window_hours: u32,
    pub total_jobs: usize,
    pub reported_jobs: usize,
    /// Versions with jobs but no execution inside the window
    pub idle_versions: Vec<String>,
    pub totals: SummaryTotals,
    pub headline: String,
    pub tree: ReportTree,
    pub text_summary: Vec<String>,
    pub rich_blocks: Vec<Block>,
}

/// Drives discovery, collection and rendering for one report.
pub struct ReportPipeline<J, R> {
    jobs: J,
    runs: R,
    classifier: Classifier,
    window: ExecutionWindow,
    success_marker: String,
}

impl<J: JobSource, R: RunSource> ReportPipeline<J, R> {
    pub fn new(
        jobs: J,
        runs: R,
        classifier: Classifier,
        window: ExecutionWindow,
        success_marker: impl Into<String>,
    ) -> Self {
        Self {
            jobs,
            runs,
            classifier,
            window,
            success_marker: success_marker.into(),
        }
    }

    /// Lists and classifies all jobs.
    ///
    /// # Errors
    ///
    /// Fails on the first job name that cannot be classified, before any
    /// run history is requested.
    pub async fn discover(&self) -> Result<Discovery> {
        let names = self.jobs.list_job_names().await?;
        let (identities, versions) = self.classifier.classify_all(&names)?;
        if versions.is_empty() {
            warn!("No periodic jobs found");
        }
        info!(
            "Discovered {} jobs across {} versions",
            identities.len(),
            versions.len()
        );

        Ok(Discovery {
            aggregates: identities.into_iter().map(JobAggregate::new).collect(),
            versions,
        })
    }

    /// Fills every aggregate with its in-window executions.
    ///
    /// Jobs are fetched concurrently; each future owns exactly one aggregate.
    pub async fn collect(
        &self,
        aggregates: Vec<JobAggregate>,
        now: DateTime<Utc>,
    ) -> Result<Vec<JobAggregate>> {
        let futures: Vec<_> = aggregates
            .into_iter()
            .map(|aggregate| self.collect_job(aggregate, now))
            .collect();

        futures::future::join_all(futures)
            .await
            .into_iter()
            .collect()
    }

    async fn collect_job(
        &self,
        mut aggregate: JobAggregate,
        now: DateTime<Utc>,
    ) -> Result<JobAggregate> {
        let name = aggregate.identity.full_name.clone();
        let run_ids = self.runs.list_run_ids(&name).await?;

        for run_id in &run_ids {
            let record = self.runs.get_run_status(&name, run_id).await?;

            match self
                .window
                .step(run_id, record.as_ref(), now, &self.success_marker)
            {
                Step::Take(execution) => {
                    debug!(
                        "{name} from {} parsed. Result: {}",
                        execution.completed_at,
                        execution.status.label()
                    );
                    aggregate.append(execution);
                }
                Step::Skip => {}
                Step::Stop => break,
            }
        }

        Ok(aggregate)
    }

    /// Groups, totals and renders the collected aggregates.
    pub fn build(
        &self,
        aggregates: Vec<JobAggregate>,
        versions: &VersionRegistry,
        now: DateTime<Utc>,
    ) -> PeriodicsReport {
        let total_jobs = aggregates.len();
        let reported_jobs = aggregates.iter().filter(|a| !a.is_empty()).count();

        let tree = group(aggregates);
        let totals = summarize(&tree);

        let idle_versions: Vec<String> = versions
            .iter()
            .filter(|version| !tree.contains_version(version))
            .map(ToString::to_string)
            .collect();
        for version in &idle_versions {
            warn!(
                "No executions of {version} jobs in the last {} hours",
                self.window.hours()
            );
        }

        PeriodicsReport {
            collected_at: now,
            window_hours: self.window.hours(),
            total_jobs,
            reported_jobs,
            idle_versions,
            headline: render_headline(&totals),
            text_summary: render_text_summary(&tree),
            rich_blocks: render_rich_blocks(&tree),
            totals,
            tree,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<PeriodicsReport> {
        let discovery = self.discover().await?;
        let aggregates = self.collect(discovery.aggregates, now).await?;
        Ok(self.build(aggregates, &discovery.versions, now))
    }
}

/// Builds the message blocks: title, headline, then the per-version summary.
///
/// `chunk_lines` re-chunks the mrkdwn summary; it does not apply to rich text.
pub fn compose_blocks(
    report: &PeriodicsReport,
    title: &str,
    style: MessageStyle,
    chunk_lines: Option<usize>,
) -> Vec<Block> {
    let mut blocks = vec![
        Block::mrkdwn(format!(
            "{title} of the last {} hours:",
            report.window_hours
        )),
        Block::mrkdwn(report.headline.clone()),
    ];

    match style {
        MessageStyle::Mrkdwn => {
            let sections = match chunk_lines {
                Some(max_lines) => shrink_text_summary(&report.text_summary, max_lines),
                None => report.text_summary.clone(),
            };
            blocks.extend(sections.into_iter().map(Block::mrkdwn));
        }
        MessageStyle::RichText => blocks.extend(report.rich_blocks.iter().cloned()),
    }

    blocks
}

pub async fn deliver(
    notifier: &impl Notifier,
    report: &PeriodicsReport,
    blocks: &[Block],
) -> Result<()> {
    notifier.post_message(&report.headline, Some(blocks)).await
}
