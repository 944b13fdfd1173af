//! External sorting of delimited records
//!
//! Records are gathered into fixed-size runs. Each run is sorted in memory and
//! spilled to a temporary file, then the runs are k-way merged to the output.

use crate::column::resolve_columns;
use crate::compare::RecordComparator;
use crate::config::{FileConfig, HeaderMode, SortConfig};
use crate::error::{TablContext, TablError, TablResult};
use crate::parser::RecordParser;
use crate::record::Record;
use crate::writer::RecordWriter;
use log::{debug, info};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Counters reported after a sort
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Data rows sorted
    pub records: u64,
    /// Temporary runs written
    pub runs: usize,
}

/// External sorter for record streams larger than memory
pub struct ExternalSorter {
    config: SortConfig,
}

impl ExternalSorter {
    pub fn new(config: SortConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sort every data row of `parser` and write the result to `out`.
    ///
    /// Comments are copied through as they are read (with `show_comments`),
    /// followed by the header line and the sorted rows. Temporary runs live in a
    /// private directory that is removed when this call returns, on success or
    /// failure alike.
    pub fn sort<W: Write>(&self, mut parser: RecordParser, out: W) -> TablResult<SortStats> {
        self.config.validate()?;

        let file_config = parser.config().clone();
        let mut writer = RecordWriter::new(out, &file_config);
        let mut workspace = RunWorkspace::new(self.config.temp_dir.as_ref())?;

        info!(
            "Phase 1: reading and spilling runs of up to {} records",
            self.config.sort_buffer_size
        );

        let mut comparator: Option<RecordComparator> = None;
        let mut buffer: Vec<Record> = Vec::with_capacity(self.config.sort_buffer_size);
        let mut runs: Vec<PathBuf> = Vec::new();
        let mut stats = SortStats::default();

        while let Some(record) = parser.next_record()? {
            if record.is_comment() {
                if self.config.show_comments {
                    writer.write_raw(record.raw())?;
                }
                continue;
            }

            let cmp = match &comparator {
                Some(cmp) => cmp,
                None => {
                    let header = parser
                        .header()
                        .ok_or_else(|| TablError::missing_column("", &[]))?;
                    let columns = resolve_columns(&self.config.keys, header)?;
                    debug!("sort columns: {columns:?}");

                    if file_config.header_mode == HeaderMode::FirstRow {
                        if let Some(raw) = parser.raw_header_line() {
                            writer.write_line(raw)?;
                        }
                    }
                    comparator.insert(RecordComparator::new(columns, self.config.unparsable))
                }
            };

            cmp.check_numeric(&record)?;
            buffer.push(record);
            stats.records += 1;

            if buffer.len() >= self.config.sort_buffer_size {
                runs.push(workspace.spill(&mut buffer, cmp, &file_config)?);
            }
        }

        if let Some(cmp) = &comparator {
            if !buffer.is_empty() {
                runs.push(workspace.spill(&mut buffer, cmp, &file_config)?);
            }
        }
        drop(parser);

        stats.runs = runs.len();
        info!("Read {} records into {} runs", stats.records, stats.runs);

        match (&comparator, runs.len()) {
            (None, _) | (_, 0) => {}
            (Some(_), 1) => {
                // Single run, just copy it
                copy_run(&runs[0], &mut writer)?;
            }
            (Some(cmp), _) => {
                info!("Phase 2: merging {} runs", runs.len());
                merge_runs(&runs, cmp, &file_config, &mut writer)?;
            }
        }

        writer.flush()?;
        info!("Sort complete: {} records processed", stats.records);
        Ok(stats)
    }
}

/// Private directory holding the runs of one sort; removed on drop.
struct RunWorkspace {
    temp_dir: TempDir,
    next_run: usize,
}

impl RunWorkspace {
    fn new(parent: Option<&PathBuf>) -> TablResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("tabl_sort");

        let temp_dir = match parent {
            Some(path) => builder.tempdir_in(path),
            None => builder.tempdir(),
        }
        .map_err(|source| TablError::TempFile { source })?;

        debug!("temporary runs in {}", temp_dir.path().display());
        Ok(Self {
            temp_dir,
            next_run: 0,
        })
    }

    /// Sort `buffer`, write it as a new run and empty it
    fn spill(
        &mut self,
        buffer: &mut Vec<Record>,
        cmp: &RecordComparator,
        file_config: &FileConfig,
    ) -> TablResult<PathBuf> {
        buffer.sort_by(|a, b| cmp.compare(a, b));

        let run_number = self.next_run;
        self.next_run += 1;
        let run_path = self
            .temp_dir
            .path()
            .join(format!("chunk_{run_number:06}.txt"));

        let file = File::create(&run_path).map_err(|source| TablError::TempFile { source })?;
        let mut writer = RecordWriter::new(file, file_config);
        for record in buffer.iter() {
            writer.write_record(record)?;
        }
        writer.flush()?;

        debug!(
            "spilled run {} with {} records to {}",
            run_number,
            buffer.len(),
            run_path.display()
        );
        buffer.clear();
        Ok(run_path)
    }
}

fn copy_run<W: Write>(run: &PathBuf, writer: &mut RecordWriter<W>) -> TablResult<()> {
    let mut input = File::open(run).with_context(|| format!("reopening run {}", run.display()))?;
    writer.copy_from(&mut input)?;
    Ok(())
}

/// Head record of one run during the merge
struct MergeItem<'a> {
    record: Record,
    run_index: usize,
    cmp: &'a RecordComparator,
}

impl PartialEq for MergeItem<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeItem<'_> {}

impl PartialOrd for MergeItem<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeItem<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap pops the greatest, we want the smallest head
        // and, among equal heads, the lowest run
        self.cmp
            .compare(&self.record, &other.record)
            .then(self.run_index.cmp(&other.run_index))
            .reverse()
    }
}

/// Merge sorted runs using k-way merge
fn merge_runs<W: Write>(
    runs: &[PathBuf],
    cmp: &RecordComparator,
    file_config: &FileConfig,
    writer: &mut RecordWriter<W>,
) -> TablResult<()> {
    let run_config = file_config.headerless();

    let mut readers: Vec<RecordParser> = runs
        .iter()
        .map(|path| {
            let name = path.to_string_lossy();
            RecordParser::open(&name, run_config.clone())
        })
        .collect::<TablResult<Vec<_>>>()?;

    let mut heap: BinaryHeap<MergeItem> = BinaryHeap::with_capacity(readers.len());

    // Initialize heap with first record from each run
    for (run_index, reader) in readers.iter_mut().enumerate() {
        if let Some(record) = next_data(reader)? {
            heap.push(MergeItem {
                record,
                run_index,
                cmp,
            });
        }
    }

    while let Some(item) = heap.pop() {
        writer.write_record(&item.record)?;

        // Read next record from the same run
        match next_data(&mut readers[item.run_index])? {
            Some(record) => heap.push(MergeItem {
                record,
                run_index: item.run_index,
                cmp,
            }),
            None => debug!("run {} exhausted", item.run_index),
        }
    }

    Ok(())
}

fn next_data(reader: &mut RecordParser) -> TablResult<Option<Record>> {
    while let Some(record) = reader.next_record()? {
        if !record.is_comment() {
            return Ok(Some(record));
        }
    }
    Ok(None)
}
