//! Streams query results into a single spreadsheet: one row per document
//! summary, fixed 29-column schema, frozen header, alternating row
//! banding, buffered writes flushed every 1000 rows.

pub mod row;

use crate::error::PipelineError;
use crate::types::QueryResult;
use rust_xlsxwriter::{Table, TableColumn, Workbook, Worksheet};
use std::path::Path;

pub use row::HEADERS;

const BUFFER_SIZE: usize = 1000;
const SHEET_NAME: &str = "ClinVar Results";

/// Buffered writer over one worksheet. `write_result` is called once per
/// `QueryResult` as results arrive from the executor; `save` flushes
/// anything left in the buffer, applies the table styling, and writes the
/// file to disk.
pub struct SpreadsheetWriter {
    workbook: Workbook,
    current_row: u32,
    buffer: Vec<[String; row::COLUMN_COUNT]>,
}

impl SpreadsheetWriter {
    /// # Errors
    ///
    /// Returns an error if the worksheet cannot be created or the header
    /// row cannot be written.
    pub fn new() -> Result<Self, PipelineError> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME).map_err(|e| PipelineError::save_result(e.to_string()))?;

        for (col, header) in HEADERS.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *header)
                .map_err(|e| PipelineError::save_result(e.to_string()))?;
        }
        worksheet.set_freeze_panes(1, 0).map_err(|e| PipelineError::save_result(e.to_string()))?;

        Ok(Self { workbook, current_row: 1, buffer: Vec::with_capacity(BUFFER_SIZE) })
    }

    /// Expands every document summary in `result` into one row and buffers
    /// it, flushing once the buffer reaches [`BUFFER_SIZE`]. A result with
    /// no summary (a fully failed query) contributes no rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a buffered flush fails to write to the sheet.
    pub fn write_result(&mut self, result: &QueryResult) -> Result<(), PipelineError> {
        let Some(summary) = &result.result else { return Ok(()) };

        for doc in &summary.document_summary_set.document_summary {
            self.buffer.push(row::build_row(doc));
            if self.buffer.len() >= BUFFER_SIZE {
                self.flush()?;
            }
        }

        Ok(())
    }

    fn worksheet(&mut self) -> Result<&mut Worksheet, PipelineError> {
        self.workbook.worksheet_from_index(0).map_err(|e| PipelineError::save_result(e.to_string()))
    }

    fn flush(&mut self) -> Result<(), PipelineError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let rows: Vec<_> = self.buffer.drain(..).collect();
        let start_row = self.current_row;
        let worksheet = self.worksheet()?;

        for (offset, cells) in rows.iter().enumerate() {
            let row = start_row + offset as u32;
            for (col, value) in cells.iter().enumerate() {
                worksheet
                    .write_string(row, col as u16, value)
                    .map_err(|e| PipelineError::save_result(e.to_string()))?;
            }
        }

        self.current_row = start_row + rows.len() as u32;
        Ok(())
    }

    /// Flushes remaining buffered rows, applies banded table styling over
    /// `A1:AC<lastRow>`, and saves the workbook to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush, table styling, or final save fails.
    pub fn save(mut self, path: &Path) -> Result<(), PipelineError> {
        self.flush()?;
        let last_row = self.current_row.saturating_sub(1);

        if last_row >= 1 {
            let columns: Vec<TableColumn> =
                HEADERS.iter().map(|h| TableColumn::new().set_header(*h)).collect();
            let table = Table::new().set_columns(&columns).set_autofilter(true);
            let worksheet = self.worksheet()?;
            worksheet
                .add_table(0, 0, last_row, (row::COLUMN_COUNT - 1) as u16, &table)
                .map_err(|e| PipelineError::save_result(e.to_string()))?;
        }

        self.workbook.save(path).map_err(|e| PipelineError::save_result(e.to_string()))
    }
}
