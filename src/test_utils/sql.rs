//! A deliberately tiny SQL dialect for the fake client.
//!
//! Just enough statement shapes to drive the adapter tests: CREATE TABLE,
//! INSERT with `?` placeholders, single-table SELECT with an optional
//! equality WHERE, DELETE, and the liveness probe statement.

use std::collections::BTreeMap;

use crate::client::{ColumnInfo, UType};
use crate::result_set::MAX_CUBRID_CHAR_LEN;

/// One stored value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Null,
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A literal or a `?` placeholder, as parsed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Term {
    Placeholder,
    Literal(Cell),
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnDef {
    pub name: String,
    pub utype: UType,
    pub precision: i32,
    pub non_null: bool,
}

impl ColumnDef {
    fn info(&self) -> ColumnInfo {
        ColumnInfo {
            name: self.name.clone(),
            utype: self.utype,
            precision: self.precision,
            non_null: self.non_null,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Filter {
    pub column: String,
    pub value: Term,
}

/// A parsed statement.
#[derive(Debug, Clone)]
pub(crate) enum Command {
    /// The connection liveness probe.
    Ping,
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<Term>,
    },
    Select {
        table: String,
        columns: Option<Vec<String>>,
        filter: Option<Filter>,
    },
    Delete {
        table: String,
        filter: Option<Filter>,
    },
}

impl Command {
    pub(crate) fn parse(sql: &str) -> Result<Command, String> {
        let sql = sql.trim().trim_end_matches(';').trim();
        if sql.eq_ignore_ascii_case("SELECT 1+1 FROM db_root") {
            return Ok(Command::Ping);
        }
        if let Some(rest) = strip_prefix_ci(sql, "CREATE TABLE") {
            return parse_create(rest);
        }
        if let Some(rest) = strip_prefix_ci(sql, "INSERT INTO") {
            return parse_insert(rest);
        }
        if let Some(rest) = strip_prefix_ci(sql, "SELECT") {
            return parse_select(rest);
        }
        if let Some(rest) = strip_prefix_ci(sql, "DELETE FROM") {
            return parse_delete(rest);
        }
        Err(format!("unsupported statement: {sql}"))
    }

    /// Number of `?` placeholders, in textual order.
    pub(crate) fn placeholder_count(&self) -> usize {
        let term_holes = |terms: &[Term]| {
            terms
                .iter()
                .filter(|t| matches!(t, Term::Placeholder))
                .count()
        };
        let filter_holes = |filter: &Option<Filter>| match filter {
            Some(f) if matches!(f.value, Term::Placeholder) => 1,
            _ => 0,
        };
        match self {
            Command::Ping | Command::CreateTable { .. } => 0,
            Command::Insert { values, .. } => term_holes(values),
            Command::Select { filter, .. } | Command::Delete { filter, .. } => filter_holes(filter),
        }
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(s[prefix.len()..].trim_start())
    } else {
        None
    }
}

fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_str = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '\'' => in_str = !in_str,
            '(' if !in_str => depth += 1,
            ')' if !in_str => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !in_str => {
                parts.push(s[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(s[start..].trim());
    parts
}

fn parse_create(rest: &str) -> Result<Command, String> {
    let open = rest.find('(').ok_or("CREATE TABLE: missing column list")?;
    let close = rest.rfind(')').ok_or("CREATE TABLE: unterminated column list")?;
    let table = rest[..open].trim().to_ascii_lowercase();
    if table.is_empty() {
        return Err("CREATE TABLE: missing table name".into());
    }
    let mut columns = Vec::new();
    for def in split_top_level(&rest[open + 1..close], ',') {
        let (name, type_spec) = def
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("CREATE TABLE: bad column definition: {def}"))?;
        let mut spec = type_spec.trim().to_owned();
        let mut non_null = false;
        if let Some(stripped) = strip_suffix_ci(&spec, "NOT NULL") {
            non_null = true;
            spec = stripped.trim().to_owned();
        }
        let (utype, precision) = parse_type(&spec)?;
        columns.push(ColumnDef {
            name: name.trim().to_owned(),
            utype,
            precision,
            non_null,
        });
    }
    Ok(Command::CreateTable { table, columns })
}

fn strip_suffix_ci(s: &str, suffix: &str) -> Option<String> {
    if s.len() >= suffix.len() && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        Some(s[..s.len() - suffix.len()].to_owned())
    } else {
        None
    }
}

fn parse_type(spec: &str) -> Result<(UType, i32), String> {
    let (base, arg) = match spec.find('(') {
        Some(open) => {
            let close = spec.rfind(')').ok_or("unterminated type argument")?;
            let first = split_top_level(&spec[open + 1..close], ',')[0]
                .parse::<i32>()
                .map_err(|_| format!("bad type argument in {spec}"))?;
            (spec[..open].trim(), Some(first))
        }
        None => (spec.trim(), None),
    };
    let utype = match base.to_ascii_uppercase().as_str() {
        "INT" | "INTEGER" => UType::Int,
        "SMALLINT" | "SHORT" => UType::Short,
        "BIGINT" => UType::Bigint,
        "FLOAT" | "REAL" => UType::Float,
        "DOUBLE" => UType::Double,
        "MONETARY" => UType::Monetary,
        "NUMERIC" | "DECIMAL" => UType::Numeric,
        "CHAR" => UType::Char,
        "VARCHAR" | "STRING" => UType::String,
        "NCHAR" => UType::NChar,
        "BIT" => UType::Bit,
        "DATE" => UType::Date,
        "TIME" => UType::Time,
        "TIMESTAMP" => UType::Timestamp,
        "DATETIME" => UType::Datetime,
        "BLOB" => UType::Blob,
        "CLOB" => UType::Clob,
        "SET" => UType::Set,
        "MULTISET" => UType::Multiset,
        "LIST" | "SEQUENCE" => UType::Sequence,
        other => return Err(format!("unsupported column type: {other}")),
    };
    let precision = arg.unwrap_or(match utype {
        UType::Numeric => 15,
        UType::String => i32::try_from(MAX_CUBRID_CHAR_LEN).unwrap_or(i32::MAX),
        _ => 0,
    });
    Ok((utype, precision))
}

fn parse_insert(rest: &str) -> Result<Command, String> {
    let values_at = find_keyword(rest, "VALUES").ok_or("INSERT: missing VALUES")?;
    let head = rest[..values_at].trim();
    let tail = rest[values_at + "VALUES".len()..].trim();

    let (table, columns) = match head.find('(') {
        Some(open) => {
            let close = head.rfind(')').ok_or("INSERT: unterminated column list")?;
            let cols = split_top_level(&head[open + 1..close], ',')
                .into_iter()
                .map(str::to_owned)
                .collect();
            (head[..open].trim().to_ascii_lowercase(), Some(cols))
        }
        None => (head.to_ascii_lowercase(), None),
    };
    let open = tail.find('(').ok_or("INSERT: missing value list")?;
    let close = tail.rfind(')').ok_or("INSERT: unterminated value list")?;
    let values = split_top_level(&tail[open + 1..close], ',')
        .into_iter()
        .map(parse_term)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::Insert {
        table,
        columns,
        values,
    })
}

fn parse_select(rest: &str) -> Result<Command, String> {
    let from_at = find_keyword(rest, "FROM").ok_or("SELECT: missing FROM")?;
    let cols_part = rest[..from_at].trim();
    let columns = if cols_part == "*" {
        None
    } else {
        Some(
            split_top_level(cols_part, ',')
                .into_iter()
                .map(str::to_owned)
                .collect(),
        )
    };
    let after = rest[from_at + "FROM".len()..].trim();
    let (table, filter) = parse_table_and_filter(after)?;
    Ok(Command::Select {
        table,
        columns,
        filter,
    })
}

fn parse_delete(rest: &str) -> Result<Command, String> {
    let (table, filter) = parse_table_and_filter(rest)?;
    Ok(Command::Delete { table, filter })
}

fn parse_table_and_filter(s: &str) -> Result<(String, Option<Filter>), String> {
    match find_keyword(s, "WHERE") {
        Some(at) => {
            let table = s[..at].trim().to_ascii_lowercase();
            let cond = s[at + "WHERE".len()..].trim();
            let (column, value) = cond
                .split_once('=')
                .ok_or_else(|| format!("unsupported WHERE clause: {cond}"))?;
            Ok((
                table,
                Some(Filter {
                    column: column.trim().to_owned(),
                    value: parse_term(value.trim())?,
                }),
            ))
        }
        None => Ok((s.trim().to_ascii_lowercase(), None)),
    }
}

fn find_keyword(s: &str, kw: &str) -> Option<usize> {
    let upper = s.to_ascii_uppercase();
    let mut from = 0;
    while let Some(rel) = upper[from..].find(kw) {
        let at = from + rel;
        let before_ok = at == 0 || !upper.as_bytes()[at - 1].is_ascii_alphanumeric();
        let end = at + kw.len();
        let after_ok = end >= upper.len() || !upper.as_bytes()[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return Some(at);
        }
        from = end;
    }
    None
}

fn parse_term(s: &str) -> Result<Term, String> {
    let s = s.trim();
    if s == "?" {
        return Ok(Term::Placeholder);
    }
    if s.eq_ignore_ascii_case("NULL") {
        return Ok(Term::Literal(Cell::Null));
    }
    if s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2 {
        return Ok(Term::Literal(Cell::Text(s[1..s.len() - 1].to_owned())));
    }
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Term::Literal(Cell::Int(v)));
    }
    if let Ok(v) = s.parse::<f64>() {
        return Ok(Term::Literal(Cell::Double(v)));
    }
    Err(format!("unsupported literal: {s}"))
}

#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Cell>>,
}

/// The fake backend's storage.
#[derive(Debug, Clone, Default)]
pub(crate) struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    pub(crate) fn create_table(
        &mut self,
        table: &str,
        columns: Vec<ColumnDef>,
    ) -> Result<(), String> {
        if self.tables.contains_key(table) {
            return Err(format!("table already exists: {table}"));
        }
        self.tables.insert(
            table.to_owned(),
            Table {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    pub(crate) fn insert(
        &mut self,
        table: &str,
        columns: Option<&[String]>,
        cells: Vec<Cell>,
    ) -> Result<i64, String> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| format!("no such table: {table}"))?;
        let row = match columns {
            None => {
                if cells.len() != t.columns.len() {
                    return Err(format!(
                        "value count {got} does not match column count {want}",
                        got = cells.len(),
                        want = t.columns.len()
                    ));
                }
                cells
            }
            Some(names) => {
                if cells.len() != names.len() {
                    return Err("value count does not match column list".into());
                }
                let mut row = vec![Cell::Null; t.columns.len()];
                for (name, cell) in names.iter().zip(cells) {
                    let at = column_index(&t.columns, name)?;
                    row[at] = cell;
                }
                row
            }
        };
        t.rows.push(row);
        Ok(1)
    }

    pub(crate) fn select(
        &self,
        table: &str,
        columns: Option<&[String]>,
        filter: Option<(&str, &Cell)>,
    ) -> Result<(Vec<ColumnInfo>, Vec<Vec<Cell>>), String> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| format!("no such table: {table}"))?;
        let picked: Vec<usize> = match columns {
            None => (0..t.columns.len()).collect(),
            Some(names) => names
                .iter()
                .map(|n| column_index(&t.columns, n))
                .collect::<Result<_, _>>()?,
        };
        let filter_at = match filter {
            Some((name, cell)) => Some((column_index(&t.columns, name)?, cell)),
            None => None,
        };
        let infos = picked.iter().map(|&i| t.columns[i].info()).collect();
        let rows = t
            .rows
            .iter()
            .filter(|row| match filter_at {
                Some((at, want)) => cell_matches(&row[at], want),
                None => true,
            })
            .map(|row| picked.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok((infos, rows))
    }

    pub(crate) fn delete(
        &mut self,
        table: &str,
        filter: Option<(&str, &Cell)>,
    ) -> Result<i64, String> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| format!("no such table: {table}"))?;
        let before = t.rows.len();
        match filter {
            None => t.rows.clear(),
            Some((name, want)) => {
                let at = column_index(&t.columns, name)?;
                t.rows.retain(|row| !cell_matches(&row[at], want));
            }
        }
        Ok((before - t.rows.len()) as i64)
    }

    pub(crate) fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.rows.len())
    }
}

fn column_index(columns: &[ColumnDef], name: &str) -> Result<usize, String> {
    columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| format!("no such column: {name}"))
}

fn cell_matches(have: &Cell, want: &Cell) -> bool {
    match (have, want) {
        (Cell::Int(a), Cell::Int(b)) => a == b,
        (Cell::Double(a), Cell::Double(b)) => a == b,
        (Cell::Int(a), Cell::Double(b)) | (Cell::Double(b), Cell::Int(a)) => *a as f64 == *b,
        (Cell::Text(a), Cell::Text(b)) => a == b,
        (Cell::Bytes(a), Cell::Bytes(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_ping_probe() {
        assert!(matches!(
            Command::parse("SELECT 1+1 FROM db_root").unwrap(),
            Command::Ping
        ));
    }

    #[test]
    fn counts_placeholders_in_textual_order() {
        let cmd = Command::parse("INSERT INTO t (a, b, c) VALUES (?, 5, ?)").unwrap();
        assert_eq!(cmd.placeholder_count(), 2);
        let cmd = Command::parse("SELECT * FROM t WHERE a = ?").unwrap();
        assert_eq!(cmd.placeholder_count(), 1);
    }

    #[test]
    fn create_table_captures_types_and_constraints() {
        let cmd =
            Command::parse("CREATE TABLE t (a INT NOT NULL, b VARCHAR(32), c NUMERIC(10, 2))")
                .unwrap();
        let Command::CreateTable { table, columns } = cmd else {
            panic!("expected CreateTable");
        };
        assert_eq!(table, "t");
        assert_eq!(columns.len(), 3);
        assert!(columns[0].non_null);
        assert_eq!(columns[0].utype, UType::Int);
        assert_eq!(columns[1].utype, UType::String);
        assert_eq!(columns[1].precision, 32);
        assert_eq!(columns[2].utype, UType::Numeric);
        assert_eq!(columns[2].precision, 10);
    }

    #[test]
    fn insert_select_delete_round_trip() {
        let mut db = Database::default();
        let Command::CreateTable { table, columns } =
            Command::parse("CREATE TABLE t (a INT, b STRING)").unwrap()
        else {
            panic!();
        };
        db.create_table(&table, columns).unwrap();
        db.insert("t", None, vec![Cell::Int(1), Cell::Text("x".into())])
            .unwrap();
        db.insert("t", None, vec![Cell::Int(2), Cell::Text("y".into())])
            .unwrap();
        let (infos, rows) = db.select("t", None, Some(("a", &Cell::Int(2)))).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(rows, vec![vec![Cell::Int(2), Cell::Text("y".into())]]);
        assert_eq!(db.delete("t", Some(("a", &Cell::Int(1)))).unwrap(), 1);
        assert_eq!(db.row_count("t"), Some(1));
    }
}
