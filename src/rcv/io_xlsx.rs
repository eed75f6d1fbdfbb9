// Primitives for reading Excel files.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::rcv::{
    io_common::{simplify_file_name, RankedEntry},
    *,
};

/// Reads the records of a worksheet: the rank in the first column, the name in the second.
pub fn read_excel_ranking(path: &str, cfs: &FileSource) -> RcvResult<Vec<RankedEntry>> {
    let wrange = get_range(path, cfs)?;
    let first_row = cfs.first_vote_row_index()?;
    let row_offset = wrange.start().map(|(r, _)| r as usize).unwrap_or(0);
    let file_name = simplify_file_name(path);

    let mut res: Vec<RankedEntry> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let lineno = row_offset + idx + 1;
        if lineno < first_row || row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        debug!("read_excel_ranking: {}: row {}: {:?}", file_name, lineno, row);
        let rank_cell = row.first().unwrap_or(&DataType::Empty);
        let rank = read_rank(rank_cell).context(ExcelWrongCellTypeSnafu {
            path,
            lineno,
            content: format!("{:?}", rank_cell),
        })?;
        let name = row.get(1).map(cell_text).unwrap_or_default().trim().to_string();
        ensure!(
            !name.is_empty(),
            InvalidRecordSnafu {
                path,
                lineno,
                content: format!("{:?}", row),
            }
        );
        res.push(RankedEntry { lineno, rank, name });
    }
    info!("Read {} records from {}", res.len(), file_name);
    Ok(res)
}

fn get_range(path: &str, cfs: &FileSource) -> RcvResult<Range<DataType>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?,
    };
    wrange.context(OpeningExcelSnafu { path })
}

fn read_rank(cell: &DataType) -> Option<u32> {
    match cell {
        DataType::Int(i) => u32::try_from(*i).ok(),
        DataType::Float(f) if f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64 => {
            Some(*f as u32)
        }
        DataType::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn cell_text(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => String::new(),
        other => other.to_string(),
    }
}
