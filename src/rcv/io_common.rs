use std::path::Path;

/// One `rank,name` record of a ballot file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankedEntry {
    /// The 1-based line (or row) of the record in its file.
    pub lineno: usize,
    pub rank: u32,
    pub name: String,
}

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Splits the records of a file into ballots.
///
/// A record of rank 1 opens a new ballot, any other rank appends a choice to the current
/// one. Records before the first rank 1 go to the first ballot.
pub fn group_ranked_entries(entries: Vec<RankedEntry>) -> Vec<Vec<RankedEntry>> {
    let mut ballots: Vec<Vec<RankedEntry>> = Vec::new();
    let mut current: Vec<RankedEntry> = Vec::new();
    for entry in entries {
        if entry.rank == 1 && !current.is_empty() {
            ballots.push(std::mem::take(&mut current));
        }
        current.push(entry);
    }
    if !current.is_empty() {
        ballots.push(current);
    }
    ballots
}

/// The rank and the name of a record, from its raw fields.
///
/// The name is everything after the first separator, so it may contain commas.
pub fn split_record<'a, I>(fields: I) -> Option<(&'a str, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = fields.into_iter();
    let rank = iter.next()?.trim();
    let rest: Vec<&str> = iter.collect();
    if rest.is_empty() {
        return None;
    }
    Some((rank, rest.join(",").trim().to_string()))
}
