//! Utilities to render and read back the Markdown of release pull requests.

use crate::types::PackageWithPrData;

const BODY_HEADER: &str = "Herald prepared the following releases.";
const BODY_FOOTER: &str = "This pull request is managed by Herald. Merge it to publish the releases above.";
const SUMMARY_OPEN: &str = "<details><summary>";
const SUMMARY_CLOSE: &str = "</summary>";
const DETAILS_CLOSE: &str = "</details>";

/// Format a Markdown list item.
///
/// Continuation lines are indented by two spaces so they stay part of the
/// same item; nested list markers in the message become nested items.
/// Always ends with a trailing newline.
pub fn format_markdown_list_item(message: &str) -> String {
    let mut out = String::new();
    let mut lines = message.lines();
    let Some(first) = lines.next() else {
        out.push_str("- \n");
        return out;
    };
    out.push_str("- ");
    out.push_str(first);
    out.push('\n');

    for line in lines {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// Release notes of one package as written in a pull request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNotes {
    pub component: String,
    pub version: String,
    pub notes: String,
}

/// Render the body of the aggregated release pull request: one collapsible
/// section per package, in the given order.
pub fn render_pull_request_body(packages: &[PackageWithPrData]) -> String {
    let mut out = String::new();
    out.push_str(BODY_HEADER);
    out.push_str("\n\n---\n\n");

    for package in packages {
        out.push_str(&format!(
            "{SUMMARY_OPEN}{}: {}{SUMMARY_CLOSE}\n\n",
            package.component, package.pr.version
        ));
        let notes = package.pr.notes.trim();
        if !notes.is_empty() {
            out.push_str(notes);
            out.push('\n');
        }
        out.push_str(DETAILS_CLOSE);
        out.push_str("\n\n");
    }

    out.push_str("---\n\n");
    out.push_str(BODY_FOOTER);
    out.push('\n');
    out
}

/// Read back the per-package sections of a body produced by
/// [`render_pull_request_body`]. Unrecognized content is ignored.
pub fn parse_pull_request_body(body: &str) -> Vec<PackageNotes> {
    let mut sections = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find(SUMMARY_OPEN) {
        rest = &rest[start + SUMMARY_OPEN.len()..];
        let Some(summary_end) = rest.find(SUMMARY_CLOSE) else {
            break;
        };
        let summary = rest[..summary_end].trim();
        rest = &rest[summary_end + SUMMARY_CLOSE.len()..];

        let details_end = rest.find(DETAILS_CLOSE).unwrap_or(rest.len());
        let notes = rest[..details_end].trim().to_string();
        rest = &rest[details_end..];

        if let Some((component, version)) = summary.rsplit_once(": ") {
            sections.push(PackageNotes {
                component: component.trim().to_string(),
                version: version.trim().to_string(),
                notes,
            });
        }
    }

    sections
}
