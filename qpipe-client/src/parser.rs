//! Grid Engine output parsing
//!
//! The scheduler tools only speak plain text, so this is the one place that
//! knows what their output looks like.

use qpipe_core::JobId;
use std::collections::HashSet;

use crate::error::{ClientError, Result};

/// Extract the job id from `qsub` output
///
/// `qsub` reports `Your job 620848 ("qc_1") has been submitted`; the id is
/// the third whitespace-separated token of that line. When several lines
/// match the last one wins.
pub fn parse_submit_output(output: &str) -> Option<JobId> {
    output
        .lines()
        .filter(|line| line.starts_with("Your job"))
        .filter_map(|line| line.split_whitespace().nth(2))
        .last()
        .map(JobId::from)
}

/// Parse `qstat` output into the set of listed job ids
///
/// Typical output is two header lines followed by one line per job:
///
/// ```text
/// job-ID  prior   name       user         state submit/start at     queue
/// -----------------------------------------------------------------------
/// 620848 0.50000 qc_1       myname       r     05/12/2011 10:12:31 all.q@node1
/// ```
///
/// Empty output means the user has no jobs. Anything else that does not
/// open with the `job-ID` header is rejected rather than read as empty.
pub fn parse_queue_listing(output: &str) -> Result<HashSet<JobId>> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Ok(HashSet::new());
    };

    if !header.trim_start().starts_with("job-ID") {
        return Err(ClientError::QueryTransient(format!(
            "unexpected qstat header: '{}'",
            header.trim()
        )));
    }

    Ok(lines
        .filter_map(|line| line.split_whitespace().next())
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
        .map(JobId::from)
        .collect())
}
