// src/config/loader.rs

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::config::model::{RawSettings, SampleDef, SampleTable, Settings, StepDef, StepTable};
use crate::config::validate::validate_tables;
use crate::errors::{BatchdagError, Result};
use crate::types::StepType;

/// Literal used in the `Parents` column for steps without parents.
pub const NO_PARENTS: &str = "None";

/// Column holding the sample identifier in the sample table.
pub const SAMPLE_ID_COLUMN: &str = "sampleID";

/// Load the optional TOML settings file.
///
/// `None` yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let raw = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            toml::from_str::<RawSettings>(&contents)?
        }
        None => RawSettings::default(),
    };
    Settings::try_from(raw)
}

/// Load a tab-separated step table from disk. See [`parse_step_table`].
pub fn load_step_table(path: impl AsRef<Path>) -> Result<StepTable> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        BatchdagError::ConfigError(format!("reading step table {:?}: {e}", path))
    })?;
    parse_step_table(&contents)
}

/// Load a tab-separated sample table from disk. See [`parse_sample_table`].
pub fn load_sample_table(path: impl AsRef<Path>) -> Result<SampleTable> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        BatchdagError::ConfigError(format!("reading sample table {:?}: {e}", path))
    })?;
    parse_sample_table(&contents)
}

/// Load both tables and run [`validate_tables`] on them.
///
/// This is the entry point used by the binary; nothing is written or
/// submitted before it succeeds.
pub fn load_and_validate(
    step_path: impl AsRef<Path>,
    sample_path: impl AsRef<Path>,
) -> Result<(StepTable, SampleTable)> {
    let steps = load_step_table(step_path)?;
    let samples = load_sample_table(sample_path)?;
    validate_tables(&steps, &samples)?;
    if samples.is_empty() {
        warn!("sample table has no rows; single-type steps expand to no jobs");
    }
    Ok((steps, samples))
}

/// Parse a step table with header columns `Name`, `Type`, `Parents` and
/// `Resources` (in any order; extra columns are ignored).
pub fn parse_step_table(contents: &str) -> Result<StepTable> {
    let mut rows = data_rows(contents);
    let (_, header) = rows
        .next()
        .ok_or_else(|| BatchdagError::ConfigError("step table is empty".to_string()))?;

    let name_col = column_index(&header, "Name", "step table")?;
    let type_col = column_index(&header, "Type", "step table")?;
    let parents_col = column_index(&header, "Parents", "step table")?;
    let resources_col = column_index(&header, "Resources", "step table")?;

    let mut table = StepTable::default();

    for (line_no, cells) in rows {
        let name = cell(&cells, name_col, line_no)?.trim().to_string();
        let step_type = cell(&cells, type_col, line_no)?
            .parse::<StepType>()
            .map_err(|e| BatchdagError::ConfigError(format!("step table line {line_no}: {e}")))?;
        let parents = parse_parents(cell(&cells, parents_col, line_no)?);
        let resources = cell(&cells, resources_col, line_no)?.trim().to_string();

        if table.steps.contains_key(&name) {
            return Err(BatchdagError::ConfigError(format!(
                "step table line {line_no}: duplicate step name '{name}'"
            )));
        }

        debug!(step = %name, %step_type, ?parents, "loaded step");
        table.steps.insert(
            name.clone(),
            StepDef {
                name,
                step_type,
                parents,
                resources,
            },
        );
    }

    Ok(table)
}

/// Parse a sample table. The header must contain `sampleID`; every other
/// column is kept, in order, as a sample field.
pub fn parse_sample_table(contents: &str) -> Result<SampleTable> {
    let mut rows = data_rows(contents);
    let (_, header) = rows
        .next()
        .ok_or_else(|| BatchdagError::ConfigError("sample table is empty".to_string()))?;

    let id_col = column_index(&header, SAMPLE_ID_COLUMN, "sample table")?;
    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let mut table = SampleTable::default();

    for (line_no, cells) in rows {
        if cells.len() != header.len() {
            return Err(BatchdagError::ConfigError(format!(
                "sample table line {line_no}: expected {} columns, got {}",
                header.len(),
                cells.len()
            )));
        }

        let id = cells[id_col].trim().to_string();
        let fields: IndexMap<String, String> = header
            .iter()
            .zip(cells.iter())
            .enumerate()
            .filter(|(idx, _)| *idx != id_col)
            .map(|(_, (column, value))| (column.clone(), value.trim().to_string()))
            .collect();

        if table.samples.contains_key(&id) {
            return Err(BatchdagError::ConfigError(format!(
                "sample table line {line_no}: duplicate sampleID '{id}'"
            )));
        }

        table.samples.insert(id.clone(), SampleDef { id, fields });
    }

    Ok(table)
}

/// Non-blank lines split on tabs, paired with their 1-based line number.
fn data_rows(contents: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    contents
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(no, line)| (no, line.split('\t').collect()))
}

fn cell<'a>(cells: &[&'a str], idx: usize, line_no: usize) -> Result<&'a str> {
    cells.get(idx).copied().ok_or_else(|| {
        BatchdagError::ConfigError(format!(
            "step table line {line_no}: expected at least {} columns, got {}",
            idx + 1,
            cells.len()
        ))
    })
}

fn column_index(header: &[&str], column: &str, table: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            BatchdagError::ConfigError(format!("{table} header is missing column '{column}'"))
        })
}

/// `None` or an empty cell means "no parents". Duplicates collapse.
fn parse_parents(cell: &str) -> Vec<String> {
    let mut parents: Vec<String> = Vec::new();
    for parent in cell.split(',').map(str::trim) {
        if parent.is_empty() || parent == NO_PARENTS {
            continue;
        }
        if !parents.iter().any(|p| p == parent) {
            parents.push(parent.to_string());
        }
    }
    parents
}
