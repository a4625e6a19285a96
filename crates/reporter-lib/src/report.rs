//! Report rendering
//!
//! A report always has the same four sections in the same order:
//! header, pod metrics, scaling status and pod count. Empty data renders as
//! a placeholder line, never as a blank section.

use chrono::SecondsFormat;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::models::{ScalingState, ScalingStatus, UsageSnapshot};

pub const NO_PODS_PLACEHOLDER: &str = "no pods found";
pub const NONE_PLACEHOLDER: &str = "none";

/// Output format of a rendered report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text sections (default)
    #[default]
    Text,
    /// The snapshot as pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Header,
    PodMetrics,
    ScalingStatus,
    PodCount,
}

/// One titled block of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: String,
    pub lines: Vec<String>,
}

impl Section {
    fn new(kind: SectionKind, title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            lines,
        }
    }

    fn render(&self) -> String {
        let mut out = format!("== {} ==\n", self.title);
        for line in &self.lines {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Row for the pod metrics table
#[derive(Tabled)]
struct UsageRow<'a> {
    #[tabled(rename = "POD")]
    pod: &'a str,
    #[tabled(rename = "CONTAINER")]
    container: &'a str,
    #[tabled(rename = "CPU")]
    cpu: &'a str,
    #[tabled(rename = "MEMORY")]
    memory: &'a str,
}

/// A rendered-ready report built from one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    sections: Vec<Section>,
}

impl Report {
    pub fn from_snapshot(snapshot: &UsageSnapshot) -> Self {
        let sections = vec![
            header_section(snapshot),
            pod_metrics_section(snapshot),
            scaling_section(snapshot),
            Section::new(
                SectionKind::PodCount,
                "Pod count",
                vec![snapshot.pod_count.to_string()],
            ),
        ];

        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Sections separated by blank lines, ending with a newline
    pub fn render_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Render a snapshot in the requested format
pub fn render(snapshot: &UsageSnapshot, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(Report::from_snapshot(snapshot).render_text()),
        ReportFormat::Json => {
            let mut json = serde_json::to_string_pretty(snapshot)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn header_section(snapshot: &UsageSnapshot) -> Section {
    Section::new(
        SectionKind::Header,
        "Usage report",
        vec![
            format!(
                "timestamp: {}",
                snapshot.taken_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            format!("namespace: {}", snapshot.namespace),
            format!("selector:  {}", snapshot.selector),
        ],
    )
}

fn pod_metrics_section(snapshot: &UsageSnapshot) -> Section {
    if snapshot.pods.is_empty() {
        return Section::new(
            SectionKind::PodMetrics,
            "Pod metrics",
            vec![NO_PODS_PLACEHOLDER.to_string()],
        );
    }

    let rows = snapshot.pods.iter().map(|usage| UsageRow {
        pod: &usage.pod_name,
        container: &usage.container_name,
        cpu: &usage.cpu,
        memory: &usage.memory,
    });

    let table = Table::new(rows).with(Style::blank()).to_string();
    Section::new(
        SectionKind::PodMetrics,
        "Pod metrics",
        table.lines().map(str::to_string).collect(),
    )
}

fn scaling_section(snapshot: &UsageSnapshot) -> Section {
    match &snapshot.scaling {
        ScalingState::Found(status) => Section::new(
            SectionKind::ScalingStatus,
            format!("Scaling status ({})", status.name),
            scaling_lines(status),
        ),
        ScalingState::NotFound { name } => Section::new(
            SectionKind::ScalingStatus,
            format!("Scaling status ({})", name),
            vec![format!("not found: {}/{}", snapshot.namespace, name)],
        ),
    }
}

fn scaling_lines(status: &ScalingStatus) -> Vec<String> {
    let mut lines = vec![
        format!("reference:        {}", status.target_ref),
        format!("current replicas: {}", status.current_replicas),
        format!("desired replicas: {}", status.desired_replicas),
        format!("min replicas:     {}", status.min_replicas),
        format!("max replicas:     {}", status.max_replicas),
    ];

    if status.metrics.is_empty() {
        lines.push(format!("targets:          {}", NONE_PLACEHOLDER));
    } else {
        let targets: Vec<String> = status
            .metrics
            .iter()
            .map(|m| {
                format!(
                    "{}: {}/{}",
                    m.name,
                    m.current.as_deref().unwrap_or("<unknown>"),
                    m.target
                )
            })
            .collect();
        lines.push(format!("targets:          {}", targets.join(", ")));
    }

    if status.conditions.is_empty() {
        lines.push(format!("conditions:       {}", NONE_PLACEHOLDER));
    } else {
        lines.push("conditions:".to_string());
        for condition in &status.conditions {
            let mut line = format!("  {}={}", condition.condition_type, condition.status);
            if let Some(reason) = &condition.reason {
                line.push_str(&format!(" ({})", reason));
            }
            if let Some(message) = &condition.message {
                line.push_str(&format!(": {}", message));
            }
            lines.push(line);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContainerUsage, MetricTarget, ScalerCondition};
    use chrono::{TimeZone, Utc};

    fn guestbook_status() -> ScalingStatus {
        ScalingStatus {
            name: "guestbook".to_string(),
            target_ref: "Deployment/guestbook".to_string(),
            current_replicas: 3,
            desired_replicas: 3,
            min_replicas: 1,
            max_replicas: 5,
            metrics: vec![MetricTarget {
                name: "cpu".to_string(),
                current: Some("12%".to_string()),
                target: "50%".to_string(),
            }],
            conditions: vec![ScalerCondition {
                condition_type: "AbleToScale".to_string(),
                status: "True".to_string(),
                reason: Some("ReadyForNewScale".to_string()),
                message: None,
            }],
        }
    }

    fn three_pod_snapshot() -> UsageSnapshot {
        UsageSnapshot::new(
            Utc.with_ymd_and_hms(2026, 10, 15, 10, 0, 0).unwrap(),
            "default",
            "app=guestbook",
            vec![
                ContainerUsage::new("guestbook-a", "guestbook", "10m", "50Mi"),
                ContainerUsage::new("guestbook-b", "guestbook", "20m", "60Mi"),
                ContainerUsage::new("guestbook-c", "guestbook", "5m", "40Mi"),
            ],
            ScalingState::Found(guestbook_status()),
            3,
        )
    }

    #[test]
    fn test_four_sections_in_fixed_order() {
        let report = Report::from_snapshot(&three_pod_snapshot());
        let kinds: Vec<SectionKind> = report.sections().iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SectionKind::Header,
                SectionKind::PodMetrics,
                SectionKind::ScalingStatus,
                SectionKind::PodCount,
            ]
        );

        let count = report.section(SectionKind::PodCount).unwrap();
        assert_eq!(count.lines, vec!["3".to_string()]);
    }

    #[test]
    fn test_pod_metrics_table_passes_values_through() {
        let report = Report::from_snapshot(&three_pod_snapshot());
        let metrics = report.section(SectionKind::PodMetrics).unwrap();

        // Header row plus one row per container
        assert_eq!(metrics.lines.len(), 4);
        assert!(metrics.lines[0].contains("POD"));
        assert!(metrics.lines[0].contains("MEMORY"));
        assert!(metrics.lines[1].contains("guestbook-a"));
        assert!(metrics.lines[1].contains("10m"));
        assert!(metrics.lines[1].contains("50Mi"));
        assert!(metrics.lines[3].contains("5m"));
        assert!(metrics.lines[3].contains("40Mi"));
    }

    #[test]
    fn test_empty_pods_render_placeholder() {
        let snapshot = UsageSnapshot::new(
            Utc::now(),
            "default",
            "app=nothing",
            Vec::new(),
            ScalingState::Found(guestbook_status()),
            0,
        );
        let report = Report::from_snapshot(&snapshot);

        let metrics = report.section(SectionKind::PodMetrics).unwrap();
        assert_eq!(metrics.lines, vec![NO_PODS_PLACEHOLDER.to_string()]);
        assert_eq!(report.section(SectionKind::PodCount).unwrap().lines, vec!["0"]);
    }

    #[test]
    fn test_missing_scaler_renders_not_found() {
        let mut snapshot = three_pod_snapshot();
        snapshot.scaling = ScalingState::NotFound {
            name: "guestbook".to_string(),
        };
        let report = Report::from_snapshot(&snapshot);

        let scaling = report.section(SectionKind::ScalingStatus).unwrap();
        assert_eq!(scaling.lines, vec!["not found: default/guestbook".to_string()]);
        assert_eq!(report.sections().len(), 4);
    }

    #[test]
    fn test_scaling_lines_with_no_conditions() {
        let mut status = guestbook_status();
        status.metrics.clear();
        status.conditions.clear();

        let lines = scaling_lines(&status);
        assert!(lines.contains(&"targets:          none".to_string()));
        assert!(lines.contains(&"conditions:       none".to_string()));
        assert!(lines.contains(&"max replicas:     5".to_string()));
    }

    #[test]
    fn test_render_text_layout() {
        let text = Report::from_snapshot(&three_pod_snapshot()).render_text();

        assert!(text.starts_with("== Usage report ==\ntimestamp: 2026-10-15T10:00:00Z\n"));
        assert!(text.contains("targets:          cpu: 12%/50%\n"));
        assert!(text.contains("  AbleToScale=True (ReadyForNewScale)\n"));
        assert!(text.ends_with("== Pod count ==\n3\n"));

        let headers: Vec<&str> = text.lines().filter(|l| l.starts_with("== ")).collect();
        assert_eq!(
            headers,
            vec![
                "== Usage report ==",
                "== Pod metrics ==",
                "== Scaling status (guestbook) ==",
                "== Pod count ==",
            ]
        );
    }

    #[test]
    fn test_render_differs_only_in_timestamp() {
        let first = three_pod_snapshot();
        let mut second = first.clone();
        second.taken_at = first.taken_at + chrono::Duration::seconds(1);

        let a = render(&first, ReportFormat::Text).unwrap();
        let b = render(&second, ReportFormat::Text).unwrap();
        assert_ne!(a, b);

        let differing: Vec<(&str, &str)> = a
            .lines()
            .zip(b.lines())
            .filter(|(x, y)| x != y)
            .collect();
        assert_eq!(a.lines().count(), b.lines().count());
        assert_eq!(differing.len(), 1);
        assert!(differing[0].0.starts_with("timestamp: "));
    }

    #[test]
    fn test_render_json() {
        let json = render(&three_pod_snapshot(), ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["pod_count"], 3);
        assert_eq!(value["pods"][0]["cpu"], "10m");
        assert_eq!(value["scaling"]["state"], "found");
        assert_eq!(value["scaling"]["max_replicas"], 5);
    }
}
