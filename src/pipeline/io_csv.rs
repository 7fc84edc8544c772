// Primitives for reading the tab-separated extracts and writing the CSV tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use voter_alignment::{assemble::ColumnUnion, AlignedTable, ColumnTemplate, ElectionMapRow};

use crate::pipeline::{
    config_reader::ElectionMapLayout,
    io_common::{read_latin1, simplify_file_name},
    *,
};

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Reads a header-less, tab-separated extract. Rows may have different lengths.
pub fn read_tsv_rows(path: &Path) -> BPResult<Vec<Vec<String>>> {
    let text = read_latin1(path)?;
    let rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut res: Vec<Vec<String>> = Vec::new();
    for line_r in rdr.into_records() {
        let line = line_r.context(CsvSnafu { path: display(path) })?;
        res.push(line.iter().map(|s| s.to_string()).collect());
    }
    debug!(
        "read_tsv_rows: {} rows in {}",
        res.len(),
        simplify_file_name(path)
    );
    Ok(res)
}

/// Reads the election map of one county. Unreadable rows are skipped.
pub fn read_election_map(path: &Path, layout: &ElectionMapLayout) -> BPResult<Vec<ElectionMapRow>> {
    let name = simplify_file_name(path);
    let mut res: Vec<ElectionMapRow> = Vec::new();
    for (idx, row) in read_tsv_rows(path)?.iter().enumerate() {
        let lineno = idx + 1;
        if row.len() < layout.min_width() {
            warn!(
                "read_election_map: {}:{}: expected at least {} cells, found {}",
                name,
                lineno,
                layout.min_width(),
                row.len()
            );
            continue;
        }
        let index = match row[layout.index_column].parse::<u32>() {
            Ok(i) => i,
            Err(_) => {
                warn!(
                    "read_election_map: {}:{}: election index {:?} is not a number",
                    name, lineno, row[layout.index_column]
                );
                continue;
            }
        };
        res.push(ElectionMapRow {
            index,
            description: row[layout.description_column].clone(),
            date: row[layout.date_column].clone(),
        });
    }
    Ok(res)
}

/// Reads the field descriptions of the column template, in order.
pub fn read_column_template(path: &Path, column: &str) -> BPResult<ColumnTemplate> {
    let text = read_latin1(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = rdr
        .headers()
        .context(CsvSnafu { path: display(path) })?
        .clone();
    let col_idx = headers
        .iter()
        .position(|h| h == column)
        .context(MissingTemplateColumnSnafu {
            path: display(path),
            column,
        })?;

    let mut fields: Vec<String> = Vec::new();
    for line_r in rdr.records() {
        let line = line_r.context(CsvSnafu { path: display(path) })?;
        fields.push(line.get(col_idx).unwrap_or("").to_string());
    }
    debug!("read_column_template: {} fields", fields.len());
    let template = ColumnTemplate::new(fields).context(InvalidTemplateSnafu { path: display(path) })?;
    Ok(template)
}

fn create_writer(path: &Path) -> BPResult<csv::Writer<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context(WritingFileSnafu { path: display(parent) })?;
    }
    let wtr = csv::Writer::from_path(path).context(CsvSnafu { path: display(path) })?;
    Ok(wtr)
}

/// Writes an aligned table with a header row. Nulls are empty cells.
pub fn write_aligned_table(path: &Path, table: &AlignedTable) -> BPResult<()> {
    let mut wtr = create_writer(path)?;
    wtr.write_record(&table.columns)
        .context(CsvSnafu { path: display(path) })?;
    for row in table.rows.iter() {
        wtr.write_record(row.iter().map(|c| c.to_string()))
            .context(CsvSnafu { path: display(path) })?;
    }
    wtr.flush().context(WritingFileSnafu { path: display(path) })?;
    Ok(())
}

/// Concatenates CSV tables under the union of their headers, one row at a time.
///
/// Returns the number of data rows written.
pub fn concat_tables(inputs: &[PathBuf], out: &Path) -> BPResult<usize> {
    let mut union = ColumnUnion::new();
    for p in inputs {
        let mut rdr = csv::Reader::from_path(p).context(CsvSnafu { path: display(p) })?;
        let header: Vec<String> = rdr
            .headers()
            .context(CsvSnafu { path: display(p) })?
            .iter()
            .map(|s| s.to_string())
            .collect();
        union.add_header(&header);
    }

    let mut wtr = create_writer(out)?;
    wtr.write_record(union.columns())
        .context(CsvSnafu { path: display(out) })?;

    let mut count = 0usize;
    for (input, p) in inputs.iter().enumerate() {
        let projection = union.projection(input);
        let mut rdr = csv::Reader::from_path(p).context(CsvSnafu { path: display(p) })?;
        for line_r in rdr.records() {
            let line = line_r.context(CsvSnafu { path: display(p) })?;
            let row: Vec<String> = line.iter().map(|s| s.to_string()).collect();
            wtr.write_record(union.project(&projection, &row))
                .context(CsvSnafu { path: display(out) })?;
            count += 1;
        }
        debug!("concat_tables: appended {}", simplify_file_name(p));
    }
    wtr.flush().context(WritingFileSnafu { path: display(out) })?;
    Ok(count)
}
