use rusqlite::types::Value;
use rusqlite::{params, Connection};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EtlError, EtlResult};
use crate::model::{BankRow, COL_MC_EUR, COL_MC_GBP, COL_MC_INR, COL_MC_USD, COL_NAME};

// ============================================================================
// STORE
// ============================================================================

/// Open (or create) the file-backed store
pub fn open_store(db_path: &Path) -> EtlResult<Connection> {
    let conn = Connection::open(db_path)?;
    debug!(path = %db_path.display(), "store opened");
    Ok(conn)
}

/// Quote an SQL identifier so any table name is safe to splice into a statement
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace `table` with the given rows.
///
/// Drop, create and insert run in one transaction. The table has no primary
/// key and no index; rows are stored in the order given.
pub fn load_table(conn: &Connection, rows: &[BankRow], table: &str) -> EtlResult<usize> {
    let table_ident = quote_ident(table);
    let tx = conn.unchecked_transaction()?;

    tx.execute(&format!("DROP TABLE IF EXISTS {}", table_ident), [])?;
    tx.execute(
        &format!(
            "CREATE TABLE {} (
                {} TEXT,
                {} REAL,
                {} REAL,
                {} REAL,
                {} REAL
            )",
            table_ident,
            quote_ident(COL_NAME),
            quote_ident(COL_MC_USD),
            quote_ident(COL_MC_GBP),
            quote_ident(COL_MC_EUR),
            quote_ident(COL_MC_INR),
        ),
        [],
    )?;

    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5)",
            table_ident
        ))?;
        for row in rows {
            inserted += stmt.execute(params![
                row.name,
                row.mc_usd_billions,
                row.mc_gbp_billion,
                row.mc_eur_billion,
                row.mc_inr_billion,
            ])?;
        }
    }

    tx.commit()?;
    info!(table, rows = inserted, "table replaced");
    Ok(inserted)
}

/// Read the table back in storage order
pub fn get_all_banks(conn: &Connection, table: &str) -> EtlResult<Vec<BankRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, {}, {}, {}, {} FROM {}",
        quote_ident(COL_NAME),
        quote_ident(COL_MC_USD),
        quote_ident(COL_MC_GBP),
        quote_ident(COL_MC_EUR),
        quote_ident(COL_MC_INR),
        quote_ident(table),
    ))?;

    let banks = stmt
        .query_map([], |row| {
            Ok(BankRow {
                name: row.get(0)?,
                mc_usd_billions: row.get(1)?,
                mc_gbp_billion: row.get(2)?,
                mc_eur_billion: row.get(3)?,
                mc_inr_billion: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(banks)
}

pub fn count_rows(conn: &Connection, table: &str) -> EtlResult<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;

    Ok(count)
}

// ============================================================================
// QUERY RUNNER
// ============================================================================

/// Full result set of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    /// First column of the first row, for single-value queries like AVG
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|r| r.first())
    }
}

impl fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.iter().map(render_value).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = *w))
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        };

        writeln!(f, "{}", line(self.columns.as_slice()))?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rendered {
            writeln!(f, "{}", line(row.as_slice()))?;
        }
        write!(f, "({} rows)", self.rows.len())
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => format!("{:?}", r),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Run a read-only statement and collect every row.
///
/// Statements that would modify the store are rejected before they execute.
///
/// # Errors
/// * `QueryError` - malformed SQL, a writing statement, or a store failure
pub fn run_query(conn: &Connection, sql: &str) -> EtlResult<QueryOutput> {
    let mut stmt = conn.prepare(sql).map_err(|e| EtlError::query(sql, e))?;
    if !stmt.readonly() {
        return Err(EtlError::query(sql, "statement is not read-only"));
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| EtlError::query(sql, e))?;
    while let Some(row) = cursor.next().map_err(|e| EtlError::query(sql, e))? {
        let values = (0..width)
            .map(|i| row.get::<_, Value>(i))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EtlError::query(sql, e))?;
        rows.push(values);
    }

    debug!(%sql, rows = rows.len(), "query complete");
    Ok(QueryOutput {
        sql: sql.to_string(),
        columns,
        rows,
    })
}

/// The three reports run after every load:
/// all rows, average GBP market cap, and the first five names.
/// The last one has no ORDER BY, so which five come back is up to SQLite.
pub fn standard_queries(table: &str) -> [String; 3] {
    let table = quote_ident(table);
    [
        format!("SELECT * FROM {}", table),
        format!("SELECT AVG({}) FROM {}", COL_MC_GBP, table),
        format!("SELECT {} FROM {} LIMIT 5", COL_NAME, table),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(name: &str, usd: Option<f64>, gbp: Option<f64>) -> BankRow {
        BankRow {
            name: name.to_string(),
            mc_usd_billions: usd,
            mc_gbp_billion: gbp,
            mc_eur_billion: usd.map(|v| v * 0.93),
            mc_inr_billion: usd.map(|v| v * 82.1),
        }
    }

    #[test]
    fn test_load_and_read_back_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = vec![
            bank("Bank A", Some(100.0), Some(80.0)),
            bank("Bank B", None, None),
            bank("Bank C", Some(25.0), Some(20.0)),
        ];

        let inserted = load_table(&conn, &rows, "Largest_banks").unwrap();

        assert_eq!(inserted, 3);
        assert_eq!(count_rows(&conn, "Largest_banks").unwrap(), 3);
        assert_eq!(get_all_banks(&conn, "Largest_banks").unwrap(), rows);
    }

    #[test]
    fn test_load_replaces_existing_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE Largest_banks (legacy INTEGER PRIMARY KEY)", [])
            .unwrap();
        conn.execute("INSERT INTO Largest_banks VALUES (1)", []).unwrap();

        let rows = vec![bank("Bank A", Some(100.0), Some(80.0))];
        load_table(&conn, &rows, "Largest_banks").unwrap();
        load_table(&conn, &rows, "Largest_banks").unwrap();

        assert_eq!(count_rows(&conn, "Largest_banks").unwrap(), 1);
        let output = run_query(&conn, "SELECT * FROM Largest_banks").unwrap();
        assert_eq!(
            output.columns,
            vec!["Name", "MC_USD_Billions", "MC_GBP_Billion", "MC_EUR_Billion", "MC_INR_Billion"]
        );
    }

    #[test]
    fn test_average_gbp_query() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = vec![
            bank("Bank A", Some(100.0), Some(80.0)),
            bank("Bank B", Some(25.0), Some(20.0)),
        ];
        load_table(&conn, &rows, "Largest_banks").unwrap();

        let queries = standard_queries("Largest_banks");
        let output = run_query(&conn, &queries[1]).unwrap();

        assert_eq!(output.rows.len(), 1);
        assert_eq!(output.scalar(), Some(&Value::Real(50.0)));
    }

    #[test]
    fn test_name_query_limits_to_five() {
        let conn = Connection::open_in_memory().unwrap();
        let rows: Vec<BankRow> = (0..8)
            .map(|i| bank(&format!("Bank {}", i), Some(10.0), Some(8.0)))
            .collect();
        load_table(&conn, &rows, "Largest_banks").unwrap();

        let queries = standard_queries("Largest_banks");
        let output = run_query(&conn, &queries[2]).unwrap();

        assert_eq!(output.columns, vec!["Name"]);
        assert_eq!(output.rows.len(), 5);
        for row in &output.rows {
            assert!(matches!(&row[0], Value::Text(name) if name.starts_with("Bank ")));
        }
    }

    #[test]
    fn test_null_amounts_stay_null() {
        let conn = Connection::open_in_memory().unwrap();
        load_table(&conn, &[bank("Bank B", None, None)], "Largest_banks").unwrap();

        let output = run_query(&conn, "SELECT MC_GBP_Billion FROM Largest_banks").unwrap();
        assert_eq!(output.rows, vec![vec![Value::Null]]);
    }

    #[test]
    fn test_malformed_sql_is_query_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = run_query(&conn, "SELEC nothing FROM").unwrap_err();
        assert!(matches!(err, EtlError::QueryError { .. }), "got {:?}", err);

        let err = run_query(&conn, "SELECT * FROM no_such_table").unwrap_err();
        assert!(matches!(err, EtlError::QueryError { .. }), "got {:?}", err);
    }

    #[test]
    fn test_writing_statement_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        load_table(&conn, &[bank("Bank A", Some(1.0), Some(0.8))], "Largest_banks").unwrap();

        let err = run_query(&conn, "DELETE FROM Largest_banks").unwrap_err();
        assert!(matches!(err, EtlError::QueryError { .. }), "got {:?}", err);
        assert_eq!(count_rows(&conn, "Largest_banks").unwrap(), 1);
    }

    #[test]
    fn test_table_name_is_quoted() {
        let conn = Connection::open_in_memory().unwrap();
        let table = "Largest \"banks\"";
        load_table(&conn, &[bank("Bank A", Some(1.0), Some(0.8))], table).unwrap();
        assert_eq!(count_rows(&conn, table).unwrap(), 1);
    }

    #[test]
    fn test_display_grid() {
        let output = QueryOutput {
            sql: "SELECT AVG(MC_GBP_Billion) FROM Largest_banks".to_string(),
            columns: vec!["AVG(MC_GBP_Billion)".to_string()],
            rows: vec![vec![Value::Real(50.0)]],
        };

        let text = output.to_string();
        assert!(text.starts_with("AVG(MC_GBP_Billion)\n"));
        assert!(text.contains("\n50.0\n"));
        assert!(text.ends_with("(1 rows)"));
    }
}
