//! Query executor for moDB
//!
//! Tree-walking interpreter over logical plans. The executor owns the
//! catalog and is the only component that mutates storage. All reads are
//! full table scans; predicates are evaluated per row with type-directed
//! comparison against the textual literal from the query.

use tracing::debug;

use super::planner::Plan;
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::sql::ast::{ColumnDef, ColumnType, CompareOp, WhereClause};
use crate::storage::{Column, DataType, Pager, Row, Schema, Table, Value};

/// Query result: a tabular result set or a status message
#[derive(Debug, Default)]
pub struct ResultSet {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Row>,
    /// Status message for statements that return no rows
    pub message: Option<String>,
}

impl ResultSet {
    /// An empty result with no message
    pub fn empty() -> Self {
        Self::default()
    }

    /// A result carrying only a status message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Tree-walking plan executor
pub struct Executor {
    catalog: Catalog,
}

impl Executor {
    /// Create an executor over a catalog
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// The underlying catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute a logical plan
    pub fn execute(&mut self, plan: Plan) -> Result<ResultSet> {
        match plan {
            Plan::CreateDatabase { name } => {
                self.catalog.create_database(&name)?;
                Ok(ResultSet::empty())
            }
            Plan::UseDatabase { name } => {
                self.catalog.use_database(&name)?;
                Ok(ResultSet::empty())
            }
            Plan::CreateTable { table, columns } => self.execute_create_table(&table, columns),
            Plan::Scan { table } => {
                self.ensure_active()?;
                self.execute_scan(&table)
            }
            Plan::Filter { child, predicate } => {
                self.ensure_active()?;
                self.execute_filter(*child, &predicate)
            }
            Plan::Project { child, columns } => {
                self.ensure_active()?;
                self.execute_project(*child, &columns)
            }
            Plan::Join {
                left_table,
                right_table,
                left_key,
                right_key,
                columns,
                where_clause,
            } => {
                self.ensure_active()?;
                self.execute_join(
                    &left_table,
                    &right_table,
                    &left_key,
                    &right_key,
                    &columns,
                    where_clause.as_ref(),
                )
            }
            Plan::Insert {
                table,
                columns,
                values,
            } => {
                self.ensure_active()?;
                self.execute_insert(&table, columns, values)
            }
            Plan::Update {
                table,
                sets,
                where_clause,
            } => {
                self.ensure_active()?;
                self.execute_update(&table, &sets, where_clause.as_ref())
            }
            Plan::Delete {
                table,
                where_clause,
            } => {
                self.ensure_active()?;
                self.execute_delete(&table, where_clause.as_ref())
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.catalog.active_db().is_none() {
            return Err(Error::NoActiveDatabase);
        }
        Ok(())
    }

    // ========== SELECT pipeline ==========

    fn execute_scan(&mut self, table_name: &str) -> Result<ResultSet> {
        let table = self.catalog.table_mut(table_name)?;
        let columns = table.schema().column_names();
        let rows = table.select_all()?;
        Ok(ResultSet {
            columns,
            rows,
            message: None,
        })
    }

    fn execute_filter(&mut self, child: Plan, predicate: &WhereClause) -> Result<ResultSet> {
        let table_name = plan_table(&child)
            .ok_or_else(|| Error::Execution("could not determine table for filter".to_string()))?
            .to_string();
        let result = self.execute(child)?;

        let schema = self.catalog.table(&table_name)?.schema();
        let mut filtered = Vec::new();
        for row in result.rows {
            if evaluate_condition(&row, schema, predicate)? {
                filtered.push(row);
            }
        }

        Ok(ResultSet {
            columns: result.columns,
            rows: filtered,
            message: None,
        })
    }

    fn execute_project(&mut self, child: Plan, columns: &[String]) -> Result<ResultSet> {
        let table_name = plan_table(&child)
            .ok_or_else(|| {
                Error::Execution("could not determine table for projection".to_string())
            })?
            .to_string();
        let result = self.execute(child)?;

        let schema = self.catalog.table(&table_name)?.schema();
        let mut indices = Vec::with_capacity(columns.len());
        for name in columns {
            let idx = schema
                .column_index(name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            indices.push(idx);
        }

        let rows = result
            .rows
            .into_iter()
            .map(|row| {
                let values = indices.iter().map(|&i| row.values[i].clone()).collect();
                Row::new(values)
            })
            .collect();

        Ok(ResultSet {
            columns: columns.to_vec(),
            rows,
            message: None,
        })
    }

    // ========== DML ==========

    fn execute_insert(
        &mut self,
        table_name: &str,
        columns: Option<Vec<String>>,
        values: Vec<String>,
    ) -> Result<ResultSet> {
        let schema = self.catalog.table(table_name)?.schema().clone();

        let textual: Vec<String> = match columns {
            Some(cols) => {
                // Named columns: map values by name into a full-width row,
                // missing columns become NULL
                if cols.len() != values.len() {
                    return Err(Error::Execution(format!(
                        "column count ({}) does not match value count ({})",
                        cols.len(),
                        values.len()
                    )));
                }
                for name in &cols {
                    if schema.column_index(name).is_none() {
                        return Err(Error::ColumnNotFound(name.clone()));
                    }
                }
                schema
                    .columns
                    .iter()
                    .map(|col| {
                        cols.iter()
                            .position(|c| c == &col.name)
                            .map(|i| values[i].clone())
                            .unwrap_or_else(|| "NULL".to_string())
                    })
                    .collect()
            }
            None => values,
        };

        if textual.len() != schema.columns.len() {
            return Err(Error::ColumnCountMismatch {
                expected: schema.columns.len(),
                got: textual.len(),
            });
        }

        let converted: Vec<Value> = schema
            .columns
            .iter()
            .zip(&textual)
            .map(|(col, val)| convert_single_value(val, col))
            .collect::<Result<_>>()?;

        self.check_unique(table_name, &schema, &converted)?;

        self.catalog.table_mut(table_name)?.insert(&converted)?;
        debug!(table = table_name, "inserted row");
        Ok(ResultSet::empty())
    }

    /// UNIQUE/PRIMARY KEY enforcement: one full scan per constrained column
    fn check_unique(
        &mut self,
        table_name: &str,
        schema: &Schema,
        new_values: &[Value],
    ) -> Result<()> {
        let constrained: Vec<usize> = schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_unique || c.is_primary_key)
            .map(|(i, _)| i)
            .collect();
        if constrained.is_empty() {
            return Ok(());
        }

        let existing = self.catalog.table_mut(table_name)?.select_all()?;
        for idx in constrained {
            let new_val = &new_values[idx];
            if new_val.is_null() {
                continue;
            }
            for row in &existing {
                if &row.values[idx] == new_val {
                    return Err(Error::UniqueViolation {
                        column: schema.columns[idx].name.clone(),
                        value: new_val.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn execute_update(
        &mut self,
        table_name: &str,
        sets: &[(String, String)],
        where_clause: Option<&WhereClause>,
    ) -> Result<ResultSet> {
        let schema = self.catalog.table(table_name)?.schema().clone();

        // Resolve assignments up front so a bad column name fails before any
        // row has been touched
        let mut assignments = Vec::with_capacity(sets.len());
        for (col_name, val_str) in sets {
            let idx = schema
                .column_index(col_name)
                .ok_or_else(|| Error::ColumnNotFound(col_name.clone()))?;
            let converted = convert_single_value(val_str, &schema.columns[idx])?;
            assignments.push((idx, converted));
        }

        let rows = self.catalog.table_mut(table_name)?.select_all()?;
        let mut updated = 0;
        for row in rows {
            let matched = match where_clause {
                Some(clause) => evaluate_condition(&row, &schema, clause)?,
                None => true,
            };
            if !matched {
                continue;
            }

            let mut new_values = row.values.clone();
            for (idx, value) in &assignments {
                new_values[*idx] = value.clone();
            }

            self.catalog
                .table_mut(table_name)?
                .update(row.page_id, row.slot_id, &new_values)?;
            updated += 1;
        }

        Ok(ResultSet::with_message(format!("Updated {} rows", updated)))
    }

    fn execute_delete(
        &mut self,
        table_name: &str,
        where_clause: Option<&WhereClause>,
    ) -> Result<ResultSet> {
        let schema = self.catalog.table(table_name)?.schema().clone();
        let rows = self.catalog.table_mut(table_name)?.select_all()?;

        let mut deleted = 0;
        for row in rows {
            let matched = match where_clause {
                Some(clause) => evaluate_condition(&row, &schema, clause)?,
                None => true,
            };
            if !matched {
                continue;
            }

            self.check_referencing_children(table_name, &schema, &row)?;
            self.catalog
                .table_mut(table_name)?
                .delete(row.page_id, row.slot_id)?;
            deleted += 1;
        }

        Ok(ResultSet::with_message(format!("Deleted {} rows", deleted)))
    }

    /// Reject the delete if any other table holds a REFERENCES column whose
    /// value matches this row's primary key
    fn check_referencing_children(
        &mut self,
        parent_name: &str,
        parent_schema: &Schema,
        parent_row: &Row,
    ) -> Result<()> {
        let pk_idx = match parent_schema.primary_key_index() {
            Some(idx) => idx,
            // No PK defined, nothing to reference
            None => return Ok(()),
        };
        let parent_pk = parent_row.values[pk_idx].to_string();

        for child_name in self.catalog.table_names() {
            if child_name == parent_name {
                continue;
            }

            let referencing: Vec<(usize, String)> = {
                let child = self.catalog.table(&child_name)?;
                child
                    .schema()
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(_, col)| {
                        col.references
                            .as_ref()
                            .is_some_and(|fk| fk.table == parent_name)
                    })
                    .map(|(i, col)| (i, col.name.clone()))
                    .collect()
            };
            if referencing.is_empty() {
                continue;
            }

            let child_rows = self.catalog.table_mut(&child_name)?.select_all()?;
            for (col_idx, col_name) in referencing {
                for child_row in &child_rows {
                    if child_row.values[col_idx].to_string() == parent_pk {
                        return Err(Error::ForeignKeyViolation {
                            table: child_name,
                            column: col_name,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // ========== JOIN ==========

    #[allow(clippy::too_many_arguments)]
    fn execute_join(
        &mut self,
        left_table: &str,
        right_table: &str,
        left_key: &str,
        right_key: &str,
        columns: &[String],
        where_clause: Option<&WhereClause>,
    ) -> Result<ResultSet> {
        let left_rows = self.catalog.table_mut(left_table)?.select_all()?;
        let left_schema = self.catalog.table(left_table)?.schema().clone();
        let right_rows = self.catalog.table_mut(right_table)?.select_all()?;
        let right_schema = self.catalog.table(right_table)?.schema().clone();

        // Keys resolve by the unqualified suffix of the ON references
        let left_col = unqualified(left_key);
        let right_col = unqualified(right_key);

        let left_idx = left_schema.column_index(left_col).ok_or_else(|| {
            Error::Execution(format!(
                "join key column '{}' not found in table '{}'",
                left_col, left_table
            ))
        })?;
        let right_idx = right_schema.column_index(right_col).ok_or_else(|| {
            Error::Execution(format!(
                "join key column '{}' not found in table '{}'",
                right_col, right_table
            ))
        })?;

        // Output columns are table.col qualified
        let mut combined_cols = Vec::new();
        for col in &left_schema.columns {
            combined_cols.push(format!("{}.{}", left_table, col.name));
        }
        for col in &right_schema.columns {
            combined_cols.push(format!("{}.{}", right_table, col.name));
        }

        // Nested loop: emit the concatenation whenever the stringified keys
        // are equal
        let mut joined = Vec::new();
        for lr in &left_rows {
            for rr in &right_rows {
                if lr.values[left_idx].to_string() != rr.values[right_idx].to_string() {
                    continue;
                }
                let mut values = lr.values.clone();
                values.extend(rr.values.iter().cloned());
                joined.push(Row::new(values));
            }
        }

        // WHERE applies post-concatenation, resolving the column by combined
        // name or unqualified suffix
        if let Some(clause) = where_clause {
            let filter_idx = resolve_combined(&combined_cols, &clause.left).ok_or_else(|| {
                Error::Execution(format!(
                    "WHERE column '{}' not found in join result",
                    clause.left
                ))
            })?;

            let mut filtered = Vec::new();
            for row in joined {
                if compare_value(&row.values[filter_idx], clause.op, &clause.right)? {
                    filtered.push(row);
                }
            }
            joined = filtered;
        }

        // Projection resolves the same way
        if !columns.is_empty() && columns[0] != "*" {
            let mut indices = Vec::with_capacity(columns.len());
            for want in columns {
                let idx = resolve_combined(&combined_cols, want).ok_or_else(|| {
                    Error::Execution(format!("column '{}' not found in join result", want))
                })?;
                indices.push(idx);
            }

            let rows = joined
                .into_iter()
                .map(|row| {
                    let values = indices.iter().map(|&i| row.values[i].clone()).collect();
                    Row::new(values)
                })
                .collect();

            return Ok(ResultSet {
                columns: columns.to_vec(),
                rows,
                message: None,
            });
        }

        Ok(ResultSet {
            columns: combined_cols,
            rows: joined,
            message: None,
        })
    }

    // ========== DDL ==========

    fn execute_create_table(
        &mut self,
        table_name: &str,
        columns: Vec<ColumnDef>,
    ) -> Result<ResultSet> {
        self.ensure_active()?;

        if self.catalog.has_table(table_name) {
            return Err(Error::TableAlreadyExists(table_name.to_string()));
        }

        let storage_columns = columns.into_iter().map(build_column).collect();
        let schema = Schema::new(storage_columns);

        let pager = Pager::open(self.catalog.heap_path(table_name)?)?;
        let table = Table::new(pager, schema.clone());

        self.catalog.save_schema(table_name, &schema)?;
        self.catalog.register_table(table_name, table);
        debug!(table = table_name, "created table");

        Ok(ResultSet::empty())
    }
}

/// Map a parsed column definition onto the storage column layout
fn build_column(def: ColumnDef) -> Column {
    let (data_type, size) = match def.column_type {
        ColumnType::Int => (DataType::Int32, 4),
        // Text defaults to 32 bytes when no size is given
        ColumnType::Text => (DataType::FixedText, def.size.unwrap_or(32)),
    };

    Column {
        name: def.name,
        data_type,
        size,
        is_nullable: def.nullable,
        is_unique: def.unique,
        is_primary_key: def.primary_key,
        references: def.references,
    }
}

/// The table a Scan/Filter/Project chain bottoms out in
fn plan_table(plan: &Plan) -> Option<&str> {
    match plan {
        Plan::Scan { table } => Some(table),
        Plan::Filter { child, .. } | Plan::Project { child, .. } => plan_table(child),
        _ => None,
    }
}

/// The unqualified suffix of a possibly qualified column reference
fn unqualified(reference: &str) -> &str {
    match reference.split_once('.') {
        Some((_, col)) => col,
        None => reference,
    }
}

/// Resolve a column against combined `table.col` names, by full match or by
/// unqualified suffix
fn resolve_combined(combined: &[String], want: &str) -> Option<usize> {
    combined
        .iter()
        .position(|name| name == want || name.ends_with(&format!(".{}", want)))
}

/// Convert a textual query value into a typed cell for the given column
fn convert_single_value(val: &str, col: &Column) -> Result<Value> {
    if val.eq_ignore_ascii_case("NULL") {
        if !col.is_nullable {
            return Err(Error::NullNotAllowed(col.name.clone()));
        }
        return Ok(Value::Null);
    }

    match col.data_type {
        DataType::Int32 => val
            .parse::<i32>()
            .map(Value::Int32)
            .map_err(|_| Error::InvalidValue {
                column: col.name.clone(),
                data_type: "INT".to_string(),
                value: val.to_string(),
            }),
        DataType::Uint32 => val
            .parse::<u32>()
            .map(Value::Uint32)
            .map_err(|_| Error::InvalidValue {
                column: col.name.clone(),
                data_type: "UINT".to_string(),
                value: val.to_string(),
            }),
        DataType::FixedText => Ok(Value::Text(val.to_string())),
    }
}

/// Evaluate `column op literal` against a row using its schema
fn evaluate_condition(row: &Row, schema: &Schema, clause: &WhereClause) -> Result<bool> {
    let idx = schema
        .column_index(&clause.left)
        .ok_or_else(|| Error::ColumnNotFound(clause.left.clone()))?;
    compare_value(&row.values[idx], clause.op, &clause.right)
}

/// Type-directed comparison of a cell against a textual literal.
///
/// NULL semantics: a NULL cell matches `= NULL` and nothing else; a non-NULL
/// cell never matches a comparison against the literal NULL.
fn compare_value(value: &Value, op: CompareOp, right: &str) -> Result<bool> {
    if value.is_null() {
        if right.eq_ignore_ascii_case("NULL") {
            return Ok(op == CompareOp::Eq);
        }
        return Ok(false);
    }
    if right.eq_ignore_ascii_case("NULL") {
        return Ok(false);
    }

    match value {
        Value::Int32(v) => {
            let rhs = right.parse::<i32>().map_err(|_| Error::InvalidLiteral {
                data_type: "INT".to_string(),
                value: right.to_string(),
            })?;
            Ok(compare(v, &rhs, op))
        }
        Value::Uint32(v) => {
            let rhs = right.parse::<u32>().map_err(|_| Error::InvalidLiteral {
                data_type: "UINT".to_string(),
                value: right.to_string(),
            })?;
            Ok(compare(v, &rhs, op))
        }
        Value::Text(v) => Ok(compare(&v.as_str(), &right, op)),
        Value::Null => unreachable!(),
    }
}

fn compare<T: PartialOrd + ?Sized>(left: &T, right: &T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Lt => left < right,
        CompareOp::Lte => left <= right,
        CompareOp::Gt => left > right,
        CompareOp::Gte => left >= right,
    }
}
