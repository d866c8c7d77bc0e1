//! CSV dataset loading.
//!
//! The loader resolves columns by header name (so column order and extra
//! columns do not matter), decodes each row into a [`RawMovie`] and keeps a
//! [`LoadReport`] of everything it had to degrade along the way.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::RawMovie;
use csv::StringRecord;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name looked up when the dataset path is a directory
pub const DEFAULT_DATASET_FILE: &str = "TMDB_movie_dataset_v11.csv";

/// Counters collected while decoding a dataset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Data rows seen (header excluded)
    pub rows_read: usize,
    /// Rows the CSV layer could not decode at all
    pub rows_skipped: usize,
    /// Individual cells that fell back to empty/absent
    pub field_fallbacks: usize,
}

/// Resolve a dataset path: either the CSV itself or a directory holding it.
pub fn resolve_dataset_path(path: &Path) -> Result<PathBuf> {
    let candidate = if path.is_dir() {
        path.join(DEFAULT_DATASET_FILE)
    } else {
        path.to_path_buf()
    };
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(DataLoadError::FileNotFound {
            path: candidate.display().to_string(),
        })
    }
}

/// Load every row of the dataset found at `path`.
pub fn load_dataset(path: &Path) -> Result<(Vec<RawMovie>, LoadReport)> {
    let csv_path = resolve_dataset_path(path)?;
    info!("Loading movie dataset from {:?}", csv_path);
    let file = File::open(&csv_path)?;
    read_movies(file)
}

/// Decode movies from any CSV source with a header row.
pub fn read_movies<R: Read>(source: R) -> Result<(Vec<RawMovie>, LoadReport)> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(source);

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut report = LoadReport::default();
    let mut movies = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        report.rows_read += 1;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping undecodable row {}: {}", idx + 1, e);
                report.rows_skipped += 1;
                continue;
            }
        };

        let mut decoder = RowDecoder {
            record: &record,
            columns: &columns,
            line: idx + 1,
            fallbacks: 0,
        };
        movies.push(decoder.decode());
        report.field_fallbacks += decoder.fallbacks;
    }

    info!(
        "Loaded {} movies ({} rows skipped, {} field fallbacks)",
        movies.len(),
        report.rows_skipped,
        report.field_fallbacks
    );
    Ok((movies, report))
}

/// Header name -> column position
struct ColumnMap {
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let positions: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();

        if !positions.contains_key("title") {
            return Err(DataLoadError::MissingColumn {
                column: "title".to_string(),
            });
        }
        for optional in ["vote_count", "status", "genres", "keywords", "overview"] {
            if !positions.contains_key(optional) {
                warn!("Dataset has no '{}' column; the field will be empty", optional);
            }
        }
        Ok(Self { positions })
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }
}

/// Decodes one CSV record, counting every cell that had to fall back.
struct RowDecoder<'a> {
    record: &'a StringRecord,
    columns: &'a ColumnMap,
    line: usize,
    fallbacks: usize,
}

impl<'a> RowDecoder<'a> {
    fn decode(&mut self) -> RawMovie {
        // The IMDB id comes from `imdb_id`, or from `tconst` in the merged exports
        let imdb_id = self.text("imdb_id").or_else(|| self.text("tconst"));

        RawMovie {
            id: self.number("id", parser::parse_id),
            title: self.text("title"),
            release_date: self.text("release_date"),
            vote_average: self.number("vote_average", parser::parse_float),
            vote_count: self.number("vote_count", parser::parse_count),
            popularity: self.number("popularity", parser::parse_float),
            overview: self.text("overview"),
            tagline: self.text("tagline"),
            genres: self.list("genres"),
            keywords: self.list("keywords"),
            production_companies: self.list("production_companies"),
            production_countries: self.list("production_countries"),
            status: self.text("status"),
            poster_path: self.text("poster_path"),
            imdb_id,
        }
    }

    fn cell(&self, name: &str) -> Option<&'a str> {
        self.columns.get(name).and_then(|idx| self.record.get(idx))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.cell(name).and_then(parser::parse_text)
    }

    fn number<T>(&mut self, name: &str, parse: fn(&str, &str) -> Result<Option<T>>) -> Option<T> {
        let raw = self.cell(name)?;
        match parse(name, raw) {
            Ok(value) => value,
            Err(e) => {
                debug!("Row {}: {}; treating as missing", self.line, e);
                self.fallbacks += 1;
                None
            }
        }
    }

    fn list(&mut self, name: &str) -> Vec<String> {
        let Some(raw) = self.cell(name) else {
            return Vec::new();
        };
        match parser::parse_list_field(name, raw) {
            Ok(items) => items,
            Err(e) => {
                debug!("Row {}: {}; using an empty list", self.line, e);
                self.fallbacks += 1;
                Vec::new()
            }
        }
    }
}
