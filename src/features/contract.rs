use duckdb::Connection;

/// Logical column types the pipeline contracts are expressed in, mapped to
/// DuckDB catalog type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    UInt16,
    UInt32,
    Int64,
    Float64,
    Timestamp,
    Boolean,
}

impl ColumnType {
    const fn duckdb_name(self) -> &'static str {
        match self {
            Self::UInt16 => "USMALLINT",
            Self::UInt32 => "UINTEGER",
            Self::Int64 => "BIGINT",
            Self::Float64 => "DOUBLE",
            Self::Timestamp => "TIMESTAMP",
            Self::Boolean => "BOOLEAN",
        }
    }

    /// Whether a catalog `data_type` string satisfies this logical type.
    ///
    /// Timestamps match any resolution (TIMESTAMP, TIMESTAMP_MS, ...): the
    /// pipeline only requires that the global minimum be computable at
    /// millisecond resolution or finer.
    fn matches(self, data_type: &str) -> bool {
        match self {
            Self::Timestamp => data_type.starts_with("TIMESTAMP"),
            _ => data_type == self.duckdb_name(),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.duckdb_name())
    }
}

/// A single column requirement: name, type, and whether NULLs are tolerated.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// A named set of column requirements used as a precondition or
/// postcondition of a pipeline stage.
///
/// Validation is structural, not exhaustive: columns beyond the contract are
/// permitted, so a contract can describe just the columns a stage consumes
/// or produces while the working table carries everything else along.
#[derive(Debug, Clone, Copy)]
pub struct SchemaContract {
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl SchemaContract {
    /// Validate `table` against this contract.
    ///
    /// Presence and type are checked against `information_schema.columns`.
    /// Nullability is checked against the data itself: DuckDB declares every
    /// CTAS output column as nullable in the catalog regardless of content,
    /// so the catalog flag tells us nothing useful.
    pub fn validate(&self, conn: &Connection, table: &str) -> Result<(), SchemaViolation> {
        let mut stmt = conn
            .prepare(
                "SELECT column_name, data_type FROM information_schema.columns
                 WHERE table_name = ?",
            )
            .map_err(SchemaViolation::Catalog)?;

        let found: Vec<(String, String)> = stmt
            .query_map([table], |row| {
                let name: String = row.get(0)?;
                let data_type: String = row.get(1)?;
                Ok((name, data_type))
            })
            .map_err(SchemaViolation::Catalog)?
            .filter_map(Result::ok)
            .collect();

        for spec in self.columns {
            let Some((_, data_type)) = found.iter().find(|(name, _)| name.as_str() == spec.name)
            else {
                return Err(SchemaViolation::MissingColumn {
                    contract: self.name,
                    table: table.to_string(),
                    column: spec.name,
                });
            };

            if !spec.ty.matches(data_type) {
                return Err(SchemaViolation::TypeMismatch {
                    contract: self.name,
                    table: table.to_string(),
                    column: spec.name,
                    expected: spec.ty,
                    found: data_type.clone(),
                });
            }

            if !spec.nullable {
                let sql =
                    format!("SELECT COUNT(*) FROM {table} WHERE {} IS NULL", spec.name);
                let nulls: u64 = conn
                    .query_row(&sql, [], |row| row.get(0))
                    .map_err(SchemaViolation::Catalog)?;
                if nulls > 0 {
                    return Err(SchemaViolation::UnexpectedNulls {
                        contract: self.name,
                        table: table.to_string(),
                        column: spec.name,
                        count: nulls,
                    });
                }
            }
        }

        Ok(())
    }
}

/// A table failed contract validation, or the catalog could not be queried.
#[derive(Debug)]
pub enum SchemaViolation {
    MissingColumn {
        contract: &'static str,
        table: String,
        column: &'static str,
    },
    TypeMismatch {
        contract: &'static str,
        table: String,
        column: &'static str,
        expected: ColumnType,
        found: String,
    },
    UnexpectedNulls {
        contract: &'static str,
        table: String,
        column: &'static str,
        count: u64,
    },
    Catalog(duckdb::Error),
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn {
                contract,
                table,
                column,
            } => write!(f, "{contract}: table {table} is missing column {column}"),
            Self::TypeMismatch {
                contract,
                table,
                column,
                expected,
                found,
            } => write!(
                f,
                "{contract}: column {table}.{column} has type {found}, expected {expected}"
            ),
            Self::UnexpectedNulls {
                contract,
                table,
                column,
                count,
            } => write!(
                f,
                "{contract}: column {table}.{column} contains {count} NULLs"
            ),
            Self::Catalog(e) => write!(f, "catalog query failed: {e}"),
        }
    }
}

impl std::error::Error for SchemaViolation {}
