use std::iter;

use serde::Serialize;

use super::aggregate::{Execution, UNAVAILABLE_URL};
use super::grouping::{ReportTree, SummaryTotals};

pub const DEFAULT_CHUNK_LINES: usize = 5;

/// One node of a depth-first walk over a [`ReportTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEvent<'a> {
    Version(&'a str),
    Platform(&'a str),
    Variant {
        name: &'a str,
        executions: &'a [Execution],
    },
}

impl ReportEvent<'_> {
    /// Nesting depth: 0 for versions, 1 for platforms, 2 for variants.
    pub fn level(&self) -> u8 {
        match self {
            Self::Version(_) => 0,
            Self::Platform(_) => 1,
            Self::Variant { .. } => 2,
        }
    }
}

pub fn events(tree: &ReportTree) -> impl Iterator<Item = ReportEvent<'_>> {
    tree.versions().flat_map(|(version, platforms)| {
        iter::once(ReportEvent::Version(version)).chain(platforms.iter().flat_map(
            |(platform, variants)| {
                iter::once(ReportEvent::Platform(platform.as_str())).chain(variants.iter().map(
                    |(variant, executions)| ReportEvent::Variant {
                        name: variant.as_str(),
                        executions: executions.as_slice(),
                    },
                ))
            },
        ))
    })
}

/// Chat message block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: TextObject },
    RichText { elements: Vec<RichElement> },
}

impl Block {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Section {
            text: TextObject {
                kind: "mrkdwn",
                text: text.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    Bullet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStyle {
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RichElement {
    RichTextList {
        style: ListStyle,
        indent: u8,
        elements: Vec<RichElement>,
    },
    RichTextSection {
        elements: Vec<RichElement>,
    },
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
    },
    Link {
        url: String,
        text: String,
    },
    Emoji {
        name: String,
    },
}

impl RichElement {
    fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: None,
        }
    }

    fn bold(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            style: Some(TextStyle { bold: true }),
        }
    }
}

/// Renders one mrkdwn block per version.
///
/// ```text
/// • 4.20:
///     • *metal*:
///         - fips: <https://...|success :solid-success:>, <https://...|failure :failed:>
/// ```
#[allow(clippy::format_push_string)]
pub fn render_text_summary(tree: &ReportTree) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();

    for event in events(tree) {
        match event {
            ReportEvent::Version(version) => blocks.push(format!("• {version}:\n")),
            ReportEvent::Platform(platform) => {
                if let Some(block) = blocks.last_mut() {
                    block.push_str(&format!("    • *{platform}*:\n"));
                }
            }
            ReportEvent::Variant { name, executions } => {
                if let Some(block) = blocks.last_mut() {
                    let results: Vec<String> = executions.iter().map(text_result).collect();
                    block.push_str(&format!("        - {name}: {}\n", results.join(", ")));
                }
            }
        }
    }

    blocks
}

fn text_result(execution: &Execution) -> String {
    let status = &execution.status;
    let label = match status.icon() {
        Some(icon) => format!("{} :{icon}:", status.label()),
        None => status.label().to_owned(),
    };
    format!("<{}|{label}>", execution.url_or_placeholder())
}

/// Renders one `rich_text` block per version, as nested bullet lists.
///
/// Each execution becomes a link followed by its status emoji, for clients
/// that do not render mrkdwn links.
pub fn render_rich_blocks(tree: &ReportTree) -> Vec<Block> {
    let mut versions: Vec<Vec<RichElement>> = Vec::new();

    for event in events(tree) {
        let section = match event {
            ReportEvent::Version(version) => {
                versions.push(Vec::new());
                vec![RichElement::text(format!("{version}:"))]
            }
            ReportEvent::Platform(platform) => vec![RichElement::bold(format!("{platform}:"))],
            ReportEvent::Variant { name, executions } => variant_section(name, executions),
        };

        if let Some(elements) = versions.last_mut() {
            elements.push(RichElement::RichTextList {
                style: ListStyle::Bullet,
                indent: event.level(),
                elements: vec![RichElement::RichTextSection { elements: section }],
            });
        }
    }

    versions
        .into_iter()
        .map(|elements| Block::RichText { elements })
        .collect()
}

fn variant_section(name: &str, executions: &[Execution]) -> Vec<RichElement> {
    let mut elements = vec![RichElement::text(format!("{name}: "))];

    for (idx, execution) in executions.iter().enumerate() {
        if idx > 0 {
            elements.push(RichElement::text(", "));
        }

        let label = execution.status.label().to_owned();
        match &execution.url {
            Some(url) => elements.push(RichElement::Link {
                url: url.clone(),
                text: label,
            }),
            None => elements.push(RichElement::text(format!("{label} ({UNAVAILABLE_URL})"))),
        }

        if let Some(icon) = execution.status.icon() {
            elements.push(RichElement::Emoji {
                name: icon.to_owned(),
            });
        }
    }

    elements
}

pub fn render_headline(totals: &SummaryTotals) -> String {
    let details = totals
        .per_version
        .iter()
        .map(|(version, t)| format!("{version}: {}/{}", t.passed, t.total))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{} out of {} jobs passed in total. Details per version: {details}",
        totals.total_passed, totals.total
    )
}

/// Re-chunks text blocks into pieces of at most `max_lines` lines.
///
/// Chunk boundaries ignore the version/platform/variant structure.
pub fn shrink_text_summary(blocks: &[String], max_lines: usize) -> Vec<String> {
    let lines: Vec<&str> = blocks.iter().flat_map(|block| block.lines()).collect();

    lines
        .chunks(max_lines.max(1))
        .map(|chunk| {
            let mut text = chunk.join("\n");
            text.push('\n');
            text
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodics::aggregate::{JobAggregate, RunStatus};
    use crate::periodics::classifier::JobIdentity;
    use crate::periodics::grouping::{group, summarize};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn execution(id: &str, status: RunStatus, url: Option<&str>) -> Execution {
        Execution::new(
            id,
            Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            url.map(ToString::to_string),
            status,
        )
    }

    fn aggregate(version: &str, platform: &str, variant: &str, executions: Vec<Execution>) -> JobAggregate {
        JobAggregate {
            identity: JobIdentity {
                full_name: format!("periodic-{version}-kubevirt-{platform}-periodics-{variant}"),
                platform: Some(platform.to_string()),
                variant: variant.to_string(),
                version: version.to_string(),
            },
            executions,
        }
    }

    fn sample_tree() -> ReportTree {
        group(vec![
            aggregate(
                "4.19",
                "aws",
                "ovn",
                vec![execution("3", RunStatus::Failure, Some("https://prow/3"))],
            ),
            aggregate(
                "4.20",
                "metal",
                "fips",
                vec![
                    execution("2", RunStatus::Success("success".to_string()), Some("https://prow/2")),
                    execution("1", RunStatus::Other("aborted".to_string()), None),
                ],
            ),
            aggregate(
                "4.20",
                "metal",
                "ovn",
                vec![execution("4", RunStatus::Success("success".to_string()), Some("https://prow/4"))],
            ),
        ])
    }

    #[test]
    fn events_walk_depth_first() {
        let tree = sample_tree();
        let levels: Vec<u8> = events(&tree).map(|e| e.level()).collect();

        assert_eq!(levels, vec![0, 1, 2, 2, 0, 1, 2]);
        assert_eq!(events(&tree).next(), Some(ReportEvent::Version("4.20")));
    }

    #[test]
    fn text_summary_has_one_block_per_version() {
        let blocks = render_text_summary(&sample_tree());

        assert_eq!(
            blocks,
            vec![
                "• 4.20:\n    • *metal*:\n        - fips: <https://prow/2|success :solid-success:>, <N/A|aborted>\n        - ovn: <https://prow/4|success :solid-success:>\n".to_string(),
                "• 4.19:\n    • *aws*:\n        - ovn: <https://prow/3|failure :failed:>\n".to_string(),
            ]
        );
    }

    #[test]
    fn text_summary_of_empty_tree_is_empty() {
        assert!(render_text_summary(&ReportTree::default()).is_empty());
    }

    #[test]
    fn rich_blocks_mirror_text_summary() {
        let blocks = render_rich_blocks(&sample_tree());
        assert_eq!(blocks.len(), 2);

        let value = serde_json::to_value(&blocks[1]).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "rich_text",
                "elements": [
                    {
                        "type": "rich_text_list",
                        "style": "bullet",
                        "indent": 0,
                        "elements": [{"type": "rich_text_section", "elements": [{"type": "text", "text": "4.19:"}]}]
                    },
                    {
                        "type": "rich_text_list",
                        "style": "bullet",
                        "indent": 1,
                        "elements": [{"type": "rich_text_section", "elements": [{"type": "text", "text": "aws:", "style": {"bold": true}}]}]
                    },
                    {
                        "type": "rich_text_list",
                        "style": "bullet",
                        "indent": 2,
                        "elements": [{"type": "rich_text_section", "elements": [
                            {"type": "text", "text": "ovn: "},
                            {"type": "link", "url": "https://prow/3", "text": "failure"},
                            {"type": "emoji", "name": "failed"}
                        ]}]
                    }
                ]
            })
        );
    }

    #[test]
    fn rich_variant_separates_results_with_commas() {
        let section = variant_section(
            "fips",
            &[
                execution("2", RunStatus::Success("success".to_string()), Some("https://prow/2")),
                execution("1", RunStatus::Other("aborted".to_string()), None),
            ],
        );

        assert_eq!(
            section,
            vec![
                RichElement::text("fips: "),
                RichElement::Link {
                    url: "https://prow/2".to_string(),
                    text: "success".to_string()
                },
                RichElement::Emoji {
                    name: "solid-success".to_string()
                },
                RichElement::text(", "),
                RichElement::text("aborted (N/A)"),
            ]
        );
    }

    #[test]
    fn headline_lists_versions_in_tree_order() {
        let totals = summarize(&sample_tree());

        assert_eq!(
            render_headline(&totals),
            "2 out of 4 jobs passed in total. Details per version: 4.20: 2/3, 4.19: 0/1"
        );
    }

    #[test]
    fn headline_for_empty_report() {
        assert_eq!(
            render_headline(&SummaryTotals::default()),
            "0 out of 0 jobs passed in total. Details per version: "
        );
    }

    #[test]
    fn mrkdwn_section_serializes_as_block_kit() {
        let value = serde_json::to_value(Block::mrkdwn("hello")).unwrap();

        assert_eq!(
            value,
            json!({"type": "section", "text": {"type": "mrkdwn", "text": "hello"}})
        );
    }

    #[cfg(test)]
    mod shrink {
        use super::*;

        #[test]
        fn splits_on_line_count_only() {
            let blocks = render_text_summary(&sample_tree());
            let chunks = shrink_text_summary(&blocks, 5);

            assert_eq!(chunks.len(), 2);
            assert_eq!(chunks[0].lines().count(), 5);
            // The second version's header lands in the first chunk
            assert!(chunks[0].ends_with("• 4.19:\n"));
            assert_eq!(
                chunks[1],
                "    • *aws*:\n        - ovn: <https://prow/3|failure :failed:>\n"
            );
        }

        #[test]
        fn keeps_all_lines_in_order() {
            let blocks = render_text_summary(&sample_tree());
            let chunks = shrink_text_summary(&blocks, 2);

            assert_eq!(chunks.concat(), blocks.concat());
        }

        #[test]
        fn zero_limit_means_one_line_per_chunk() {
            let chunks = shrink_text_summary(&["a\nb\n".to_string()], 0);
            assert_eq!(chunks, vec!["a\n".to_string(), "b\n".to_string()]);
        }

        #[test]
        fn empty_summary_has_no_chunks() {
            assert!(shrink_text_summary(&[], DEFAULT_CHUNK_LINES).is_empty());
        }
    }
}
