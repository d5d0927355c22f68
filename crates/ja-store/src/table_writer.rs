//! Appending chunks to a table, one transaction per chunk.

use std::sync::Arc;

use ja_sas7bdat::{Chunk, Schema};
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::inspect::table_schema;
use crate::sql::{create_table_sql, insert_sql};

/// Writes chunks with a fixed schema into one table.
pub struct TableWriter<'c> {
    conn: &'c mut Connection,
    table: String,
    schema: Arc<Schema>,
    insert: String,
    rows_written: u64,
    chunks_written: usize,
}

impl<'c> TableWriter<'c> {
    /// Create the table, or reuse an existing one with the same schema.
    pub fn create(conn: &'c mut Connection, table: &str, schema: Arc<Schema>) -> Result<Self> {
        match table_schema(conn, table)? {
            Some(existing) if existing == *schema => {
                warn!(table, "table already exists, appending");
            }
            Some(existing) => {
                return Err(StoreError::SchemaMismatch {
                    table: table.to_string(),
                    expected: existing.to_string(),
                    found: schema.to_string(),
                });
            }
            None => {
                conn.execute(&create_table_sql(table, &schema), [])?;
                debug!(table, schema = %schema, "created table");
            }
        }
        Ok(Self {
            conn,
            table: table.to_string(),
            insert: insert_sql(table, &schema),
            schema,
            rows_written: 0,
            chunks_written: 0,
        })
    }

    /// Append a chunk and commit it.
    pub fn append(&mut self, chunk: &Chunk) -> Result<usize> {
        if *chunk.schema != *self.schema {
            return Err(StoreError::SchemaMismatch {
                table: self.table.clone(),
                expected: self.schema.to_string(),
                found: chunk.schema.to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert)?;
            for row in &chunk.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        self.rows_written += chunk.len() as u64;
        self.chunks_written += 1;
        Ok(chunk.len())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn chunks_written(&self) -> usize {
        self.chunks_written
    }
}
