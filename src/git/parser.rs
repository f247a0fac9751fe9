//! Parsing of the `git log --numstat` export into commit and commit-file tables.
//!
//! Record layout (see `repository::PRETTY_FORMAT`):
//!
//! ```text
//! +++<hash>\t<iso date>\t<author>\t<subject>
//! <inserted>\t<deleted>\t<path>
//! ...
//! <blank line>
//! ```
//!
//! A subject containing tabs splits into extra header fields; they are joined
//! back with single spaces. Binary files report `-\t-` and count as 0/0.

use crate::error::{AppError, Result};
use crate::models::{Commit, CommitFile};

/// Marks the first line of every commit record.
pub const SENTINEL: &str = "+++";

const HEADER_FIELDS: usize = 4;

/// Parsed log tables, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLog {
    pub commits: Vec<Commit>,
    pub files: Vec<CommitFile>,
}

pub fn parse_log(log: &str) -> Result<ParsedLog> {
    let mut parsed = ParsedLog::default();
    let mut current: Option<String> = None;

    for (idx, line) in log.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(header) = line.strip_prefix(SENTINEL) {
            let commit = parse_header(header, line_no)?;
            current = Some(commit.id.clone());
            parsed.commits.push(commit);
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let commit_id = current.as_deref().ok_or_else(|| AppError::MalformedLog {
            line: line_no,
            reason: "file statistics before the first commit header".to_string(),
        })?;
        parsed.files.push(parse_stat_line(commit_id, line, line_no)?);
    }

    tracing::debug!(
        "Parsed {} commits and {} commit files",
        parsed.commits.len(),
        parsed.files.len()
    );

    Ok(parsed)
}

fn parse_header(header: &str, line_no: usize) -> Result<Commit> {
    let mut fields: Vec<&str> = header.split('\t').collect();

    if fields.len() < HEADER_FIELDS {
        return Err(AppError::MalformedLog {
            line: line_no,
            reason: format!(
                "commit header has {} fields, expected {}",
                fields.len(),
                HEADER_FIELDS
            ),
        });
    }

    let msg = if fields.len() > HEADER_FIELDS {
        fields.split_off(HEADER_FIELDS - 1).join(" ")
    } else {
        fields[HEADER_FIELDS - 1].to_string()
    };

    let id = fields[0];
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::MalformedLog {
            line: line_no,
            reason: format!("'{}' is not a commit hash", id),
        });
    }

    Ok(Commit {
        id: id.to_string(),
        creation_dt: fields[1].to_string(),
        author_nm: fields[2].to_string(),
        msg,
    })
}

fn parse_stat_line(commit_id: &str, line: &str, line_no: usize) -> Result<CommitFile> {
    let mut parts = line.splitn(3, '\t');
    let (inserted, deleted, path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(i), Some(d), Some(p)) => (i, d, p),
        _ => {
            return Err(AppError::MalformedLog {
                line: line_no,
                reason: format!("expected '<inserted>\\t<deleted>\\t<path>', got '{}'", line),
            });
        }
    };

    Ok(CommitFile::new(
        commit_id,
        path,
        parse_count(inserted, line_no)?,
        parse_count(deleted, line_no)?,
    ))
}

fn parse_count(value: &str, line_no: usize) -> Result<u32> {
    if value == "-" {
        return Ok(0);
    }
    value.parse().map_err(|_| AppError::MalformedLog {
        line: line_no,
        reason: format!("'{}' is not a line count", value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "+++a2452407107a0c5a64e76cf422f4d6f788dcc814\t2019-05-30 12:26:49 +0200\tPHPeter\tAdd README
1\t0\tREADME.md

+++a7a7d2e6067c97dd14be74b005909270e1858814\t2019-05-30 12:25:26 +0200\tPHPeter\tDebug not found Icons lib
7\t0\t.gitignore
673\t0\tcomposer.lock
5\t5\tconfig.php
1\t1\tovidentia/admin/addons.php

+++ac945860b3f5eaf21ce65308ad2b33b475831041\t2019-03-21 10:55:33 +0100\tlaucho\tReplace header('location:') by bab_redirect()
9\t16\tovidentia/admin/addons.php

+++47d8d655209ac82a4031d5000bc44223cea1cc8a\t2019-03-21 10:49:30 +0100\tlaucho\tAdd bab_redirect() function
11\t0\tovidentia/utilit/addonapi.php
";

    #[test]
    fn parses_commits_in_order() {
        let parsed = parse_log(LOG).unwrap();

        assert_eq!(parsed.commits.len(), 4);
        assert_eq!(
            parsed.commits[0],
            Commit {
                id: "a2452407107a0c5a64e76cf422f4d6f788dcc814".to_string(),
                creation_dt: "2019-05-30 12:26:49 +0200".to_string(),
                author_nm: "PHPeter".to_string(),
                msg: "Add README".to_string(),
            }
        );
        assert_eq!(parsed.commits[3].author_nm, "laucho");
    }

    #[test]
    fn parses_files_grouped_by_commit() {
        let parsed = parse_log(LOG).unwrap();

        assert_eq!(parsed.files.len(), 7);
        assert_eq!(
            parsed.files[1],
            CommitFile::new("a7a7d2e6067c97dd14be74b005909270e1858814", ".gitignore", 7, 0)
        );
        assert_eq!(
            parsed.files[5],
            CommitFile::new(
                "ac945860b3f5eaf21ce65308ad2b33b475831041",
                "ovidentia/admin/addons.php",
                9,
                16
            )
        );
    }

    #[test]
    fn commit_count_matches_sentinel_blocks() {
        let parsed = parse_log(LOG).unwrap();
        assert_eq!(parsed.commits.len(), LOG.matches("\n+++").count() + 1);
    }

    #[test]
    fn joins_tabs_in_message() {
        let log = "+++a2452407107a0c5a64e76cf422f4d6f788dcc814\t2019-05-30 12:26:49 +0200\tPHPeter\tAdd\tREADME\tovidentia\n1\t0\tREADME.md\n";

        let parsed = parse_log(log).unwrap();

        assert_eq!(parsed.commits.len(), 1);
        assert_eq!(parsed.commits[0].msg, "Add README ovidentia");
        assert_eq!(parsed.files.len(), 1);
    }

    #[test]
    fn binary_stats_count_as_zero() {
        let log = "+++abc123\t2021-09-30 15:12:01 +0200\tleopold\tAdd logo\n-\t-\tassets/logo.png\n";

        let parsed = parse_log(log).unwrap();

        assert_eq!(parsed.files[0].n_lines_inserted, 0);
        assert_eq!(parsed.files[0].n_lines_deleted, 0);
        assert_eq!(parsed.files[0].file_path, "assets/logo.png");
    }

    #[test]
    fn commit_without_files_is_kept() {
        let log = "+++abc123\t2021-09-30 15:12:01 +0200\tleopold\tMerge branch\n\n+++def456\t2021-09-30 15:13:01 +0200\tleopold\tFix\n2\t1\tsrc/app.py\n";

        let parsed = parse_log(log).unwrap();

        assert_eq!(parsed.commits.len(), 2);
        assert_eq!(parsed.files.len(), 1);
        assert_eq!(parsed.files[0].commit_id, "def456");
    }

    #[test]
    fn empty_message_is_allowed() {
        let parsed = parse_log("+++abc123\t2021-09-30 15:12:01 +0200\tleopold\t\n").unwrap();
        assert_eq!(parsed.commits[0].msg, "");
    }

    #[test]
    fn short_header_is_fatal() {
        let result = parse_log("+++abc123\t2021-09-30 15:12:01 +0200\tleopold\n1\t0\ta.py\n");
        assert!(matches!(result, Err(AppError::MalformedLog { line: 1, .. })));
    }

    #[test]
    fn non_hex_id_is_fatal() {
        let result = parse_log("+++not-a-hash\t2021-09-30 15:12:01 +0200\tleopold\tmsg\n");
        assert!(matches!(result, Err(AppError::MalformedLog { .. })));
    }

    #[test]
    fn bad_stat_line_is_fatal() {
        let result = parse_log("+++abc123\t2021-09-30 15:12:01 +0200\tleopold\tmsg\nten\t0\ta.py\n");
        assert!(matches!(result, Err(AppError::MalformedLog { line: 2, .. })));

        let result = parse_log("+++abc123\t2021-09-30 15:12:01 +0200\tleopold\tmsg\n10 a.py\n");
        assert!(matches!(result, Err(AppError::MalformedLog { line: 2, .. })));
    }

    #[test]
    fn empty_log_yields_empty_tables() {
        assert_eq!(parse_log("").unwrap(), ParsedLog::default());
    }
}
