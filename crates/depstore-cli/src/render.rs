use anstyle::{AnsiColor, Effects, Style};
use depstore_installer::UninstallReport;
use std::io::IsTerminal;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputStyle {
    Plain,
    Rich,
}

pub fn resolve_output_style(stdout_is_tty: bool) -> OutputStyle {
    if stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

pub fn current_output_style() -> OutputStyle {
    resolve_output_style(std::io::stdout().is_terminal())
}

#[derive(Copy, Clone, Debug)]
pub struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub fn current() -> Self {
        Self {
            style: current_output_style(),
        }
    }

    pub fn style(self) -> OutputStyle {
        self.style
    }

    pub fn print_section(self, title: &str) {
        if let Some(line) = render_section_header(self.style, title) {
            println!("{}", colorize(section_style(), &line));
        }
    }

    pub fn print_lines(self, lines: &[String]) {
        for line in lines {
            println!("{line}");
        }
    }
}

/// Prefixes `message` with an ASCII badge in rich mode. Plain output stays
/// unadorned so scripts can match on it.
pub fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("[{}] {message}", status.to_ascii_uppercase()),
    }
}

fn render_section_header(style: OutputStyle, title: &str) -> Option<String> {
    match style {
        OutputStyle::Plain => None,
        OutputStyle::Rich => Some(format!("== {title} ==")),
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

pub fn format_uninstall_report_lines(report: &UninstallReport, style: OutputStyle) -> Vec<String> {
    let mut lines = Vec::new();

    for name in &report.skipped {
        lines.push(render_status_line(
            style,
            "skip",
            &format!("{name} is not a direct dependency"),
        ));
    }

    if report.removed.is_empty() {
        lines.push(render_status_line(style, "ok", "nothing to remove"));
    } else {
        lines.push(render_status_line(
            style,
            "ok",
            &format!("removed {} package(s)", report.removed.len()),
        ));
        for pkg_id in &report.removed {
            lines.push(render_status_line(style, "step", &format!("- {pkg_id}")));
        }
    }

    if report.manifest_updated {
        lines.push(render_status_line(style, "step", "package.json updated"));
    }
    if !report.lockfile_pruned.is_empty() {
        lines.push(render_status_line(
            style,
            "step",
            &format!("lockfile pruned: {}", report.lockfile_pruned.join(", ")),
        ));
    }

    for failure in &report.manifest_read_failures {
        lines.push(render_status_line(
            style,
            "warn",
            &format!(
                "executables of {} left in place: {}",
                failure.pkg_id, failure.reason
            ),
        ));
    }
    for failure in &report.deletion_failures {
        lines.push(render_status_line(
            style,
            "warn",
            &format!(
                "failed to delete {}: {}",
                failure.path.display(),
                failure.reason
            ),
        ));
    }

    lines
}
