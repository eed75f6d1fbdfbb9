// Primitives for reading CSV files.

use std::fs::File;

use crate::rcv::{
    io_common::{simplify_file_name, split_record, RankedEntry},
    *,
};

/// Reads the `rank,name` records of a CSV file.
pub fn read_csv_ranking(path: &str, cfs: &FileSource) -> RcvResult<Vec<RankedEntry>> {
    let first_row = cfs.first_vote_row_index()?;
    let file_name = simplify_file_name(path);

    let mut res: Vec<RankedEntry> = Vec::new();
    for (idx, line_r) in get_records(path)?.enumerate() {
        let line = line_r.context(CsvLineParseSnafu { path })?;
        let lineno = line
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 1);
        if lineno < first_row {
            debug!("read_csv_ranking: {}: skipping line {}", file_name, lineno);
            continue;
        }
        let (rank_s, name) = split_record(line.iter()).context(InvalidRecordSnafu {
            path,
            lineno,
            content: line.iter().collect::<Vec<_>>().join(","),
        })?;
        let rank = rank_s.parse::<u32>().ok().context(InvalidRecordSnafu {
            path,
            lineno,
            content: rank_s,
        })?;
        debug!(
            "read_csv_ranking: {}: lineno: {:?} rank: {:?} name: {:?}",
            file_name, lineno, rank, name
        );
        res.push(RankedEntry { lineno, rank, name });
    }
    info!("Read {} records from {}", res.len(), file_name);
    Ok(res)
}

fn get_records(path: &str) -> RcvResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_file(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn reads_records_after_the_header() {
        let path = data_file("four_candidates/four_candidates_ballots.csv");
        let cfs = FileSource::new(&path, "csv", Some(2), None);
        let entries = read_csv_ranking(&path, &cfs).unwrap();
        assert_eq!(entries.len(), 40);
        assert_eq!(
            entries[0],
            RankedEntry {
                lineno: 2,
                rank: 1,
                name: "Ollie".to_string()
            }
        );
        assert_eq!(entries[3].rank, 4);
    }

    #[test]
    fn names_with_commas() {
        let path = data_file("tied_lowest/tied_lowest_ballots.csv");
        let cfs = FileSource::new(&path, "csv", None, None);
        let entries = read_csv_ranking(&path, &cfs).unwrap();
        assert!(entries.iter().any(|e| e.name == "Smith, Robert"));
    }

    #[test]
    fn header_without_skipping_is_an_error() {
        let path = data_file("four_candidates/four_candidates_ballots.csv");
        let cfs = FileSource::new(&path, "csv", None, None);
        let err = read_csv_ranking(&path, &cfs).unwrap_err();
        assert!(matches!(err, RcvError::InvalidRecord { lineno: 1, .. }));
    }

    #[test]
    fn missing_file() {
        let path = data_file("does_not_exist.csv");
        let cfs = FileSource::new(&path, "csv", None, None);
        assert!(matches!(
            read_csv_ranking(&path, &cfs),
            Err(RcvError::CsvOpen { .. })
        ));
    }
}
