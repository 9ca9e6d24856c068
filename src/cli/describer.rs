//! Describer resolution for the CLI.
//!
//! Record decoding needs a schema, so tree-walking modes take a
//! `--describer` argument: either the name of one of the bundled
//! data-dictionary describers (SYS_TABLES, SYS_COLUMNS, SYS_INDEXES,
//! SYS_FIELDS) or an inline schema of the form
//!
//! ```text
//! key columns / row columns
//! ```
//!
//! where each side is a comma-separated list of `name:type` pairs and a
//! trailing `?` marks a nullable column. Types: `intN` / `uintN` (N in
//! bytes), `char(N)`, `binary(N)`, `varchar(N)`, `varbinary(N)`.
//!
//! Example: `id:int4/a:int4,name:varchar(40)?`

use crate::innodb::record::{ColumnDef, ColumnType, TableDescriber};
use crate::innodb::sys::dictionary_describer;
use crate::IbsError;

fn parse_size(spec: &str, type_name: &str) -> Result<usize, IbsError> {
    let inner = spec
        .strip_prefix(type_name)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| IbsError::Usage(format!("malformed column type {:?}", spec)))?;
    inner
        .parse::<usize>()
        .map_err(|_| IbsError::Usage(format!("bad length in column type {:?}", spec)))
}

fn parse_column(spec: &str) -> Result<ColumnDef, IbsError> {
    let spec = spec.trim();
    let (spec, nullable) = match spec.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (spec, false),
    };
    let (name, type_spec) = spec.split_once(':').ok_or_else(|| {
        IbsError::Usage(format!("column {:?} is missing its \":type\" suffix", spec))
    })?;

    let col_type = if let Some(width) = type_spec.strip_prefix("uint") {
        let width = width
            .parse::<usize>()
            .map_err(|_| IbsError::Usage(format!("bad integer width in {:?}", type_spec)))?;
        ColumnType::Int {
            width,
            unsigned: true,
        }
    } else if let Some(width) = type_spec.strip_prefix("int") {
        let width = width
            .parse::<usize>()
            .map_err(|_| IbsError::Usage(format!("bad integer width in {:?}", type_spec)))?;
        ColumnType::Int {
            width,
            unsigned: false,
        }
    } else if type_spec.starts_with("varchar") {
        ColumnType::Varchar {
            max_length: parse_size(type_spec, "varchar")?,
        }
    } else if type_spec.starts_with("varbinary") {
        ColumnType::Varbinary {
            max_length: parse_size(type_spec, "varbinary")?,
        }
    } else if type_spec.starts_with("char") {
        ColumnType::Char {
            length: parse_size(type_spec, "char")?,
        }
    } else if type_spec.starts_with("binary") {
        ColumnType::Binary {
            length: parse_size(type_spec, "binary")?,
        }
    } else {
        return Err(IbsError::Usage(format!(
            "unknown column type {:?}",
            type_spec
        )));
    };

    if let ColumnType::Int { width, .. } = col_type {
        if !matches!(width, 1 | 2 | 3 | 4 | 6 | 7 | 8) {
            return Err(IbsError::Usage(format!(
                "unsupported integer width {} in {:?}",
                width, type_spec
            )));
        }
    }

    Ok(ColumnDef {
        name: name.trim().to_string(),
        col_type,
        nullable,
    })
}

fn parse_columns(spec: &str) -> Result<Vec<ColumnDef>, IbsError> {
    if spec.trim().is_empty() {
        return Ok(Vec::new());
    }
    spec.split(',').map(parse_column).collect()
}

/// Resolve a `--describer` argument to a describer value.
pub fn resolve(spec: &str) -> Result<TableDescriber, IbsError> {
    if let Some(describer) = dictionary_describer(spec) {
        return Ok(describer);
    }

    let (key_spec, row_spec) = spec.split_once('/').ok_or_else(|| {
        IbsError::Usage(format!(
            "describer {:?} is neither a SYS_* table nor a \"key/row\" schema",
            spec
        ))
    })?;

    let key = parse_columns(key_spec)?;
    if key.is_empty() {
        return Err(IbsError::Usage(
            "describer needs at least one key column".to_string(),
        ));
    }

    Ok(TableDescriber {
        index_id: None,
        key,
        row: parse_columns(row_spec)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_resolve() {
        assert!(resolve("SYS_TABLES").is_ok());
        assert!(resolve("SYS_INDEXES").is_ok());
    }

    #[test]
    fn test_inline_schema() {
        let d = resolve("id:int4/a:int4,name:varchar(40)?").unwrap();
        assert_eq!(d.key.len(), 1);
        assert_eq!(d.key[0].name, "id");
        assert_eq!(d.row.len(), 2);
        assert!(d.row[1].nullable);
        assert_eq!(
            d.row[1].col_type,
            ColumnType::Varchar { max_length: 40 }
        );
    }

    #[test]
    fn test_key_only_schema() {
        let d = resolve("id:uint8/").unwrap();
        assert_eq!(d.key.len(), 1);
        assert!(d.row.is_empty());
        assert_eq!(
            d.key[0].col_type,
            ColumnType::Int {
                width: 8,
                unsigned: true
            }
        );
    }

    #[test]
    fn test_rejects_bad_specs() {
        assert!(resolve("nonsense").is_err());
        assert!(resolve("id/").is_err());
        assert!(resolve("id:float/").is_err());
        assert!(resolve("id:int5/").is_err());
        assert!(resolve("/a:int4").is_err());
    }
}
