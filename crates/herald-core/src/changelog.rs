//! Changelog rendering for conventional commits.

use crate::config::ChangelogSection;
use crate::conventional::ConventionalCommit;
use crate::markdown::format_markdown_list_item;
use chrono::NaiveDate;
use semver::Version;

pub const CHANGELOG_HEADER: &str = "# Changelog";
const BREAKING_SECTION: &str = "⚠ BREAKING CHANGES";

fn section(commit_type: &str, title: &str, hidden: bool) -> ChangelogSection {
    ChangelogSection {
        commit_type: commit_type.to_string(),
        section: title.to_string(),
        hidden,
    }
}

/// Sections used when a package does not configure its own.
pub fn default_sections() -> Vec<ChangelogSection> {
    vec![
        section("feat", "Features", false),
        section("fix", "Bug Fixes", false),
        section("perf", "Performance Improvements", false),
        section("revert", "Reverts", false),
        section("deps", "Dependencies", false),
        section("docs", "Documentation", true),
        section("style", "Styles", true),
        section("chore", "Miscellaneous Chores", true),
        section("refactor", "Code Refactoring", true),
        section("test", "Tests", true),
        section("build", "Build System", true),
        section("ci", "Continuous Integration", true),
    ]
}

fn format_commit_line(commit: &ConventionalCommit, description: &str) -> String {
    let line = match &commit.scope {
        Some(scope) => format!("**{}:** {} ({})", scope, description, commit.short_sha()),
        None => format!("{} ({})", description, commit.short_sha()),
    };
    format_markdown_list_item(&line)
}

/// Render the release notes for `commits`, without a version heading.
///
/// Breaking changes come first, then one `###` section per visible configured
/// type, in configuration order. Commits of unlisted or hidden types are left out.
pub fn render_notes(commits: &[ConventionalCommit], sections: &[ChangelogSection]) -> String {
    let mut blocks: Vec<String> = Vec::new();

    let breaking: String = commits
        .iter()
        .filter(|commit| commit.breaking)
        .map(|commit| {
            let description = commit
                .breaking_description
                .as_deref()
                .unwrap_or(&commit.description);
            format_commit_line(commit, description)
        })
        .collect();
    if !breaking.is_empty() {
        blocks.push(format!("### {BREAKING_SECTION}\n\n{breaking}"));
    }

    let mut seen_types: Vec<&str> = Vec::new();
    for section in sections {
        if section.hidden || seen_types.contains(&section.commit_type.as_str()) {
            continue;
        }
        seen_types.push(section.commit_type.as_str());
        let items: String = commits
            .iter()
            .filter(|commit| commit.commit_type == section.commit_type)
            .map(|commit| format_commit_line(commit, &commit.description))
            .collect();
        if !items.is_empty() {
            blocks.push(format!("### {}\n\n{}", section.section, items));
        }
    }

    blocks.join("\n").trim_end().to_string()
}

pub fn release_heading(version: &Version, date: NaiveDate) -> String {
    format!("## {} ({})", version, date.format("%Y-%m-%d"))
}

/// A complete changelog entry: heading plus notes.
pub fn render_entry(version: &Version, date: NaiveDate, notes: &str) -> String {
    let heading = release_heading(version, date);
    let notes = notes.trim();
    if notes.is_empty() {
        format!("{heading}\n")
    } else {
        format!("{heading}\n\n{notes}\n")
    }
}

/// Insert `entry` at the top of an existing changelog, below its `# Changelog` header.
pub fn prepend_entry(existing: Option<&str>, entry: &str) -> String {
    let existing = existing.unwrap_or_default().trim_start_matches('\u{feff}');
    let body = match existing.strip_prefix(CHANGELOG_HEADER) {
        Some(rest) => rest.trim_start_matches(['\r', '\n']),
        None => existing.trim_start(),
    };

    let mut out = format!("{CHANGELOG_HEADER}\n\n{}", entry.trim_end());
    out.push('\n');
    if !body.trim().is_empty() {
        out.push('\n');
        out.push_str(body);
        if !body.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conventional::parse_commits;
    use crate::types::Commit;

    fn commits(messages: &[(&str, &str)]) -> Vec<ConventionalCommit> {
        let raw: Vec<Commit> = messages
            .iter()
            .map(|(sha, message)| Commit {
                sha: sha.to_string(),
                message: message.to_string(),
                files: Vec::new(),
            })
            .collect();
        parse_commits(&raw)
    }

    #[test]
    fn renders_sections_in_configured_order() {
        let parsed = commits(&[
            ("1111111aaa", "fix(core): handle empty input"),
            ("2222222bbb", "feat: add streaming"),
            ("3333333ccc", "chore: bump ci"),
        ]);
        let notes = render_notes(&parsed, &default_sections());
        assert_eq!(
            notes,
            "### Features\n\n- add streaming (2222222)\n\n### Bug Fixes\n\n- **core:** handle empty input (1111111)"
        );
    }

    #[test]
    fn breaking_changes_lead() {
        let parsed = commits(&[(
            "abcdef0123",
            "feat!: new api\n\nBREAKING CHANGE: removes the old api",
        )]);
        let notes = render_notes(&parsed, &default_sections());
        assert!(notes.starts_with("### ⚠ BREAKING CHANGES\n\n- removes the old api (abcdef0)"));
        assert!(notes.contains("### Features\n\n- new api (abcdef0)"));
    }

    #[test]
    fn hidden_sections_are_skipped() {
        let parsed = commits(&[("1", "docs: explain things")]);
        assert_eq!(render_notes(&parsed, &default_sections()), "");

        let sections = vec![ChangelogSection {
            commit_type: "docs".into(),
            section: "Docs".into(),
            hidden: false,
        }];
        assert_eq!(render_notes(&parsed, &sections), "### Docs\n\n- explain things (1)");
    }

    #[test]
    fn entries_carry_version_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let entry = render_entry(&Version::new(1, 2, 0), date, "### Features\n\n- x (1)\n");
        assert_eq!(entry, "## 1.2.0 (2024-03-09)\n\n### Features\n\n- x (1)\n");
        assert_eq!(
            render_entry(&Version::new(1, 2, 0), date, ""),
            "## 1.2.0 (2024-03-09)\n"
        );
    }

    #[test]
    fn prepend_creates_a_new_changelog() {
        let out = prepend_entry(None, "## 1.0.0 (2024-01-01)\n");
        assert_eq!(out, "# Changelog\n\n## 1.0.0 (2024-01-01)\n");
    }

    #[test]
    fn prepend_keeps_header_and_history() {
        let existing = "# Changelog\n\n## 1.0.0 (2024-01-01)\n\n- first\n";
        let out = prepend_entry(Some(existing), "## 1.1.0 (2024-02-01)\n\n- second\n");
        assert_eq!(
            out,
            "# Changelog\n\n## 1.1.0 (2024-02-01)\n\n- second\n\n## 1.0.0 (2024-01-01)\n\n- first\n"
        );
    }

    #[test]
    fn prepend_adds_header_to_headerless_files() {
        let out = prepend_entry(Some("## 0.1.0\n\n- old\n"), "## 0.2.0 (2024-02-01)\n");
        assert_eq!(out, "# Changelog\n\n## 0.2.0 (2024-02-01)\n\n## 0.1.0\n\n- old\n");
    }
}
