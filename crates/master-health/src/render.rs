//! Report rendering.
//!
//! A [`Renderer`] owns nothing but its output sink and a color switch; the
//! caller decides where the report goes (stdout, a buffer in tests).

use std::io::{self, Write};

use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::probes::ApiServerHealth;
use crate::report::{HealthReport, ProbeKind, ProbeOutcome, ProbeResult};
use crate::status::{EntityStatus, StatusLevel, SubsystemStatus};

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored tables for humans
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Exit code for a finished report: 1 if any probe is Unhealthy or Error.
pub fn exit_code(report: &HealthReport) -> u8 {
    u8::from(report.has_failures())
}

/// Table width used when the output is not a terminal.
const DEFAULT_TABLE_WIDTH: u16 = 120;

pub struct Renderer<W: Write> {
    out: W,
    palette: Palette,
}

impl<W: Write> Renderer<W> {
    /// Render into `out`, with ANSI colors only when `color` is set.
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            palette: Palette { enabled: color },
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, report: &HealthReport, format: OutputFormat) -> io::Result<()> {
        match format {
            OutputFormat::Text => self.render_text(report),
            OutputFormat::Json => self.render_json(report),
        }
    }

    pub fn render_json(&mut self, report: &HealthReport) -> io::Result<()> {
        let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
        writeln!(self.out, "{json}")
    }

    pub fn render_text(&mut self, report: &HealthReport) -> io::Result<()> {
        let title = self.palette.paint("OpenShift Master Health Report", Color::Cyan, true);
        writeln!(self.out, "{title}")?;
        writeln!(
            self.out,
            "Generated: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;

        for result in &report.probes {
            self.section(result.kind)?;
            self.probe(result)?;
        }

        writeln!(self.out)?;
        let overall = self.palette.level(report.overall_level());
        writeln!(self.out, "Overall: {overall}")?;
        self.out.flush()
    }

    fn probe(&mut self, result: &ProbeResult) -> io::Result<()> {
        match &result.outcome {
            ProbeOutcome::Entities(entities) => self.entities(result.kind, entities),
            ProbeOutcome::Subsystem(status) => self.subsystem(status),
            ProbeOutcome::ApiServer(health) => self.api_server(health),
        }
    }

    fn section(&mut self, kind: ProbeKind) -> io::Result<()> {
        let rule = self.palette.paint(&"=".repeat(60), Color::BrightBlack, false);
        let title = self.palette.paint(kind.title(), Color::Cyan, true);
        writeln!(self.out)?;
        writeln!(self.out, "{rule}")?;
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "{rule}")
    }

    fn entities(&mut self, kind: ProbeKind, entities: &[EntityStatus]) -> io::Result<()> {
        let namespaced = kind == ProbeKind::ControlPlanePods;
        let mut headers = vec![if namespaced { "Component" } else { "Name" }];
        if namespaced {
            headers.push("Namespace");
        }
        headers.extend(["Status", "Issues", "Warnings"]);

        let mut table = self.palette.table(&headers);
        for entity in entities {
            let mut row = vec![Cell::new(&entity.name)];
            if namespaced {
                row.push(Cell::new(entity.namespace.as_deref().unwrap_or("-")));
            }
            row.push(self.palette.status_cell(entity.level));
            row.push(Cell::new(join_or_none(&entity.issues)));
            row.push(Cell::new(join_or_none(&entity.warnings)));
            table.add_row(row);
        }

        writeln!(self.out, "{table}")
    }

    fn subsystem(&mut self, status: &SubsystemStatus) -> io::Result<()> {
        let level = self.palette.level(status.level);
        writeln!(self.out, "Status:   {level}")?;
        writeln!(self.out, "Summary:  {}", status.summary)?;
        writeln!(self.out, "Issues:   {}", join_or_none(&status.issues))?;
        writeln!(self.out, "Warnings: {}", join_or_none(&status.warnings))
    }

    fn api_server(&mut self, health: &ApiServerHealth) -> io::Result<()> {
        let level = self.palette.level(health.level());
        let endpoint = if health.endpoint_healthy {
            self.palette.paint("Healthy", Color::Green, false)
        } else {
            self.palette.paint("Unhealthy", Color::Red, false)
        };

        writeln!(self.out, "Status:   {level}")?;
        writeln!(
            self.out,
            "Ready:    {}/{}",
            health.ready_servers, health.total_servers
        )?;
        writeln!(self.out, "Endpoint: {endpoint}")?;
        if health.pods.is_empty() {
            return writeln!(self.out, "Pods:     None");
        }

        let mut table = self.palette.table(&["Pod", "Ready", "Restarts", "Phase"]);
        for (name, pod) in &health.pods {
            let (ready, color) = if pod.ready {
                ("Yes", TableColor::Green)
            } else {
                ("No", TableColor::Red)
            };
            table.add_row(vec![
                Cell::new(name),
                self.palette.cell(ready, color),
                Cell::new(pod.restarts),
                Cell::new(pod.phase.as_deref().unwrap_or("Unknown")),
            ]);
        }

        writeln!(self.out, "{table}")
    }
}

#[derive(Debug, Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn level(self, level: StatusLevel) -> String {
        let color = match level {
            StatusLevel::Healthy => Color::Green,
            StatusLevel::Warning => Color::Yellow,
            StatusLevel::Unhealthy => Color::Red,
            StatusLevel::Error => Color::Magenta,
        };
        self.paint(&level.to_string(), color, level != StatusLevel::Healthy)
    }

    fn paint(self, text: &str, color: Color, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let painted = text.color(color);
        if bold {
            painted.bold().to_string()
        } else {
            painted.to_string()
        }
    }

    /// Table with cyan headers. Styling is forced on or off so the output
    /// does not depend on whether stdout is a terminal.
    fn table(self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        if self.enabled {
            table.enforce_styling();
        } else {
            table.force_no_tty();
        }
        if table.width().is_none() {
            table.set_width(DEFAULT_TABLE_WIDTH);
        }
        table.set_header(
            headers
                .iter()
                .map(|header| self.cell(header, TableColor::Cyan))
                .collect::<Vec<_>>(),
        );
        table
    }

    fn cell(self, text: &str, color: TableColor) -> Cell {
        let cell = Cell::new(text);
        if self.enabled {
            cell.fg(color)
        } else {
            cell
        }
    }

    /// Green, yellow, red, and magenta for Error.
    fn status_cell(self, level: StatusLevel) -> Cell {
        let color = match level {
            StatusLevel::Healthy => TableColor::Green,
            StatusLevel::Warning => TableColor::Yellow,
            StatusLevel::Unhealthy => TableColor::Red,
            StatusLevel::Error => TableColor::Magenta,
        };
        self.cell(&level.to_string(), color)
    }
}

fn join_or_none(messages: &[String]) -> String {
    if messages.is_empty() {
        "None".to_string()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ApiServerPod;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn report(probes: Vec<ProbeResult>) -> HealthReport {
        HealthReport {
            generated_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap(),
            probes,
        }
    }

    fn render(report: &HealthReport, format: OutputFormat) -> String {
        let mut renderer = Renderer::new(Vec::new(), false);
        renderer.render(report, format).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn degraded_etcd() -> EntityStatus {
        let mut status = EntityStatus::healthy("etcd");
        status.issue(StatusLevel::Unhealthy, "raft instability");
        status
    }

    #[test]
    fn test_text_report_sections_in_order() {
        let report = report(vec![
            ProbeResult {
                kind: ProbeKind::MasterNodes,
                outcome: ProbeOutcome::Entities(vec![EntityStatus::healthy("master-0")]),
            },
            ProbeResult {
                kind: ProbeKind::Operators,
                outcome: ProbeOutcome::Entities(vec![degraded_etcd()]),
            },
            ProbeResult {
                kind: ProbeKind::Certificates,
                outcome: ProbeOutcome::Subsystem(SubsystemStatus::healthy(
                    "All certificates are valid",
                )),
            },
        ]);

        let text = render(&report, OutputFormat::Text);

        assert!(text.contains("Generated: 2026-03-01 12:30:00 UTC"));
        let nodes = text.find("Master Nodes Status").unwrap();
        let operators = text.find("Critical Operators Status").unwrap();
        let certs = text.find("Certificate Status").unwrap();
        assert!(nodes < operators && operators < certs);
        assert!(text.contains("raft instability"));
        assert!(text.contains("Issues:   None"));
        assert!(text.trim_end().ends_with("Overall: Unhealthy"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_entity_table_rows() {
        let mut long = EntityStatus::healthy("master-with-a-long-name");
        long.warning("DiskPressure: disk almost full");
        let report = report(vec![ProbeResult {
            kind: ProbeKind::MasterNodes,
            outcome: ProbeOutcome::Entities(vec![EntityStatus::healthy("m0"), long]),
        }]);

        let text = render(&report, OutputFormat::Text);
        let header = text.lines().find(|l| l.contains("Warnings")).unwrap();
        assert!(header.contains("Name") && header.contains("Status"));

        let row = text.lines().find(|l| l.contains(" m0 ")).unwrap();
        assert!(row.contains("Healthy"));
        assert!(row.contains("None"));
        assert!(text.contains("DiskPressure: disk almost full"));
    }

    #[test]
    fn test_long_issue_lists_wrap() {
        let mut noisy = EntityStatus::healthy("authentication");
        for i in 0..12 {
            noisy.issue(
                StatusLevel::Unhealthy,
                format!("route {i} to the oauth server is not reachable from the console"),
            );
        }
        let report = report(vec![ProbeResult {
            kind: ProbeKind::Operators,
            outcome: ProbeOutcome::Entities(vec![noisy]),
        }]);

        let text = render(&report, OutputFormat::Text);

        assert!(text
            .lines()
            .all(|line| line.chars().count() <= usize::from(DEFAULT_TABLE_WIDTH)));
        assert!(text.contains("authentication"));
    }

    #[test]
    fn test_control_plane_table_shows_namespace() {
        let report = report(vec![ProbeResult {
            kind: ProbeKind::ControlPlanePods,
            outcome: ProbeOutcome::Entities(vec![EntityStatus::placeholder(
                "no-pods-in-openshift-etcd",
                "No pods found in namespace openshift-etcd",
            )
            .in_namespace("openshift-etcd")]),
        }]);

        let text = render(&report, OutputFormat::Text);
        assert!(text.contains("Component"));
        assert!(text.contains("Namespace"));
        let row = text
            .lines()
            .find(|l| l.contains("no-pods-in-openshift-etcd"))
            .unwrap();
        assert!(row.contains("Warning"));
    }

    #[test]
    fn test_api_server_section() {
        let mut pods = BTreeMap::new();
        pods.insert(
            "kube-apiserver-master-0".to_string(),
            ApiServerPod {
                ready: true,
                restarts: 2,
                phase: Some("Running".to_string()),
            },
        );
        let report = report(vec![ProbeResult {
            kind: ProbeKind::ApiServer,
            outcome: ProbeOutcome::ApiServer(ApiServerHealth {
                ready_servers: 1,
                total_servers: 1,
                pods,
                endpoint_healthy: false,
            }),
        }]);

        let text = render(&report, OutputFormat::Text);
        assert!(text.contains("Ready:    1/1"));
        assert!(text.contains("Endpoint: Unhealthy"));
        assert!(text.contains("kube-apiserver-master-0"));
        assert!(text.contains("Status:   Warning"));
    }

    #[test]
    fn test_color_only_when_enabled() {
        let report = report(vec![
            ProbeResult {
                kind: ProbeKind::Etcd,
                outcome: ProbeOutcome::Subsystem(SubsystemStatus::error("No etcd pods found")),
            },
            ProbeResult {
                kind: ProbeKind::Operators,
                outcome: ProbeOutcome::Entities(vec![degraded_etcd()]),
            },
        ]);
        colored::control::set_override(true);

        let mut renderer = Renderer::new(Vec::new(), true);
        renderer.render_text(&report).unwrap();
        let text = String::from_utf8(renderer.into_inner()).unwrap();

        assert!(text.contains('\u{1b}'));
        assert!(!render(&report, OutputFormat::Text).contains('\u{1b}'));
    }

    #[test]
    fn test_json_report() {
        let report = report(vec![ProbeResult {
            kind: ProbeKind::Operators,
            outcome: ProbeOutcome::Entities(vec![degraded_etcd()]),
        }]);

        let json = render(&report, OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["probes"][0]["kind"], "operators");
        assert_eq!(value["probes"][0]["outcome"]["type"], "entities");
        assert_eq!(
            value["probes"][0]["outcome"]["result"][0]["issues"][0],
            "raft instability"
        );
        let parsed: HealthReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_exit_code() {
        let healthy = report(vec![ProbeResult {
            kind: ProbeKind::Certificates,
            outcome: ProbeOutcome::Subsystem(SubsystemStatus::with_issues(
                StatusLevel::Warning,
                "1 certificate(s) expiring or expired",
                vec!["Certificate ingress is expiring".to_string()],
            )),
        }]);
        assert_eq!(exit_code(&healthy), 0);

        let failing = report(vec![ProbeResult {
            kind: ProbeKind::Etcd,
            outcome: ProbeOutcome::Subsystem(SubsystemStatus::error("No etcd pods found")),
        }]);
        assert_eq!(exit_code(&failing), 1);
    }
}
