//! CSV import pipeline.
//!
//! Hard errors (bad header, oversize upload, row cap, stream failure, empty
//! file) abort the import with nothing written. Per-row problems land in
//! the bounded summary lists instead. Metadata enrichment runs before the
//! write transaction opens, so no network call ever happens inside it;
//! every insert then commits atomically.

pub mod dedup;
pub mod header;
pub mod row;

use std::io::Read;

use anthology_common::{Error, ItemDraft, ItemType, Result, UserId};
use anthology_config::ImportConfig;
use anthology_metadata::{Category, Metadata, MetadataLookup};
use anthology_store::{db, items, Db};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::item::validate::{apply_status_rules, validate_draft};
use dedup::DuplicateTracker;
use header::HeaderIndex;

/// A row skipped as a duplicate of existing or just-imported data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRow {
    /// 1-based file row (the header is row 1).
    pub row: u64,
    /// `"duplicate <field>"` where field is title, isbn13, or isbn10.
    pub reason: String,
}

/// A row that failed parsing, validation, enrichment, or insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRow {
    pub row: u64,
    pub message: String,
}

/// Bounded import report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total_rows: u64,
    pub imported: u64,
    pub skipped_duplicates: Vec<SkippedRow>,
    pub failed: Vec<FailedRow>,
    /// Set when the skip/fail caps clipped further entries.
    pub truncated_records: bool,
}

pub struct CsvImporter<'a> {
    config: &'a ImportConfig,
    metadata: Option<&'a dyn MetadataLookup>,
}

enum BuiltRow {
    Draft(ItemDraft),
    Failed(String),
}

impl<'a> CsvImporter<'a> {
    pub fn new(config: &'a ImportConfig, metadata: Option<&'a dyn MetadataLookup>) -> Self {
        CsvImporter { config, metadata }
    }

    pub fn import<R: Read>(&self, db: &mut Db, owner: UserId, reader: R) -> Result<ImportSummary> {
        // Enforce the byte cap before parsing anything.
        let mut raw = Vec::new();
        reader
            .take(self.config.max_upload_bytes + 1)
            .read_to_end(&mut raw)?;
        if raw.len() as u64 > self.config.max_upload_bytes {
            return Err(Error::validation(format!(
                "upload exceeds the {} byte cap",
                self.config.max_upload_bytes
            )));
        }
        if raw.is_empty() {
            return Err(Error::validation("file is empty"));
        }

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(raw.as_slice());
        let mut records = csv_reader.records();

        let header_record = records
            .next()
            .ok_or_else(|| Error::validation("file is empty"))?
            .map_err(stream_err)?;
        let header = HeaderIndex::parse(&header_record)?;

        // Collect data rows under the row cap. Blank rows are skipped but
        // still advance the file row number.
        let mut data_rows: Vec<(u64, csv::StringRecord)> = Vec::new();
        let mut file_row: u64 = 1;
        for result in records {
            let record = result.map_err(stream_err)?;
            file_row += 1;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if data_rows.len() as u32 >= self.config.max_rows {
                return Err(Error::validation(format!(
                    "import exceeds the {} row cap",
                    self.config.max_rows
                )));
            }
            data_rows.push((file_row, record));
        }

        // Build drafts, enriching where needed, before any write.
        let now = Utc::now();
        let built: Vec<(u64, BuiltRow)> = data_rows
            .iter()
            .map(|(row_number, record)| (*row_number, self.build_row(&header, record, now)))
            .collect();

        // Single owner-scoped transaction for the whole upload.
        let tx = db.immediate_tx()?;

        let mut tracker = DuplicateTracker::new();
        tracker.seed(items::dedup_sources(&tx, owner)?.iter());

        let cap = self.config.max_report_entries;
        let mut summary = ImportSummary {
            total_rows: built.len() as u64,
            ..Default::default()
        };
        for (row_number, outcome) in built {
            match outcome {
                BuiltRow::Failed(message) => {
                    push_capped(
                        &mut summary.failed,
                        cap,
                        &mut summary.truncated_records,
                        FailedRow {
                            row: row_number,
                            message,
                        },
                    );
                }
                BuiltRow::Draft(draft) => {
                    if let Some(field) = tracker.probe(&draft.title, &draft.isbn13, &draft.isbn10)
                    {
                        push_capped(
                            &mut summary.skipped_duplicates,
                            cap,
                            &mut summary.truncated_records,
                            SkippedRow {
                                row: row_number,
                                reason: format!("duplicate {field}"),
                            },
                        );
                        continue;
                    }
                    match items::insert(&tx, owner, &draft, now) {
                        Ok(_) => {
                            summary.imported += 1;
                            tracker.insert(&draft.title, &draft.isbn13, &draft.isbn10);
                        }
                        Err(err) => {
                            push_capped(
                                &mut summary.failed,
                                cap,
                                &mut summary.truncated_records,
                                FailedRow {
                                    row: row_number,
                                    message: err.to_string(),
                                },
                            );
                        }
                    }
                }
            }
        }
        db::commit(tx)?;

        tracing::info!(
            total = summary.total_rows,
            imported = summary.imported,
            skipped = summary.skipped_duplicates.len(),
            failed = summary.failed.len(),
            "import finished"
        );
        Ok(summary)
    }

    fn build_row(
        &self,
        header: &HeaderIndex,
        record: &csv::StringRecord,
        now: chrono::DateTime<Utc>,
    ) -> BuiltRow {
        let mut draft = match row::build_draft(header, record) {
            Ok(draft) => draft,
            Err(message) => return BuiltRow::Failed(message),
        };

        if draft.item_type == ItemType::Book && draft.title.trim().is_empty() {
            match self.enrich(&draft) {
                Ok(metadata) => merge_metadata(&mut draft, &metadata),
                Err(message) => return BuiltRow::Failed(message),
            }
        }

        draft.title = draft.title.trim().to_string();
        draft.creator = draft.creator.trim().to_string();
        if let Err(err) = validate_draft(&draft) {
            return BuiltRow::Failed(err.to_string());
        }
        if let Err(err) = apply_status_rules(&mut draft, now) {
            return BuiltRow::Failed(err.to_string());
        }
        BuiltRow::Draft(draft)
    }

    /// Look a titleless book row up by its identifier. Every failure here is
    /// a row failure; not-found and invalid-query come from the query
    /// itself, anything else is a transient upstream problem surfaced to the
    /// row.
    fn enrich(&self, draft: &ItemDraft) -> std::result::Result<Metadata, String> {
        let identifier = [&draft.isbn13, &draft.isbn10]
            .into_iter()
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| "row has neither a title nor an ISBN to look up".to_string())?;
        let client = self
            .metadata
            .ok_or_else(|| "metadata enrichment is not configured".to_string())?;
        match client.lookup(identifier, Category::Book) {
            Ok(results) => results
                .into_iter()
                .next()
                .ok_or_else(|| format!("no metadata match for {identifier:?}")),
            Err(err) if err.is_per_row() => Err(format!("no metadata match for {identifier:?}")),
            Err(err) => Err(format!("metadata upstream failure: {err}")),
        }
    }
}

/// Fill the draft's empty fields from a metadata record; row-provided
/// values always win.
fn merge_metadata(draft: &mut ItemDraft, metadata: &Metadata) {
    if draft.title.trim().is_empty() {
        draft.title = metadata.title.clone();
    }
    if draft.creator.trim().is_empty() {
        draft.creator = metadata.creator.clone();
    }
    if draft.isbn13.trim().is_empty() {
        draft.isbn13 = metadata.isbn13.clone();
    }
    if draft.isbn10.trim().is_empty() {
        draft.isbn10 = metadata.isbn10.clone();
    }
    if draft.description.is_empty() {
        draft.description = metadata.description.clone();
    }
    if draft.cover_image.is_empty() {
        draft.cover_image = metadata.cover_image.clone();
    }
    if draft.genre.is_empty() {
        draft.genre = metadata.genre.clone();
    }
    if draft.release_year.is_none() {
        draft.release_year = metadata.release_year;
    }
    if draft.page_count.is_none() {
        draft.page_count = metadata.page_count;
    }
    if draft.retail_price.is_none() {
        draft.retail_price = metadata.retail_price;
    }
    if draft.volume_id.is_empty() {
        draft.volume_id = metadata.volume_id.clone();
    }
}

fn push_capped<T>(list: &mut Vec<T>, cap: usize, truncated: &mut bool, entry: T) {
    if list.len() < cap {
        list.push(entry);
    } else {
        *truncated = true;
    }
}

fn stream_err(err: csv::Error) -> Error {
    Error::validation(format!("malformed CSV: {err}"))
}
