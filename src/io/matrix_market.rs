//! Matrix Market text format reader and writer.
//!
//! Supported: `coordinate` format; `real`, `double`, `integer` and
//! `pattern` fields; `general`, `symmetric` and `skew-symmetric`
//! symmetries. Indices are 1-based in the file and 0-based in memory. The
//! lenient single-percent banner `%MatrixMarket` is accepted alongside the
//! standard `%%MatrixMarket`.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::config::Config;
use crate::matrix::{Matrix, matrix_from_tuples};
use crate::types::{Index, Shape};

#[derive(Debug, Error)]
pub enum MatrixMarketError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Receives reader diagnostics and decides whether they are fatal.
///
/// Out-of-range indices and truncation arrive as warnings; malformed
/// banners, unsupported headers and unopenable files arrive as errors. The
/// reader aborts after any error regardless of the consumer's verdict; the
/// consumer only chooses between failing the call and a quiet empty result.
pub trait ErrorConsumer {
    fn error(&mut self, msg: String) -> Result<(), MatrixMarketError>;

    fn warning(&mut self, msg: String) -> Result<(), MatrixMarketError>;
}

/// Fails the load on both errors and warnings. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictConsumer;

impl ErrorConsumer for StrictConsumer {
    fn error(&mut self, msg: String) -> Result<(), MatrixMarketError> {
        Err(MatrixMarketError::Invalid(msg))
    }

    fn warning(&mut self, msg: String) -> Result<(), MatrixMarketError> {
        self.error(msg)
    }
}

/// Discards every diagnostic; failed loads come back as empty matrices with
/// the success flag down.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoringConsumer;

impl ErrorConsumer for IgnoringConsumer {
    fn error(&mut self, _msg: String) -> Result<(), MatrixMarketError> {
        Ok(())
    }

    fn warning(&mut self, _msg: String) -> Result<(), MatrixMarketError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MmField {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MmSymmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

/// Loads Matrix Market text into a matrix.
pub struct MatrixMarketLoader<C> {
    consumer: C,
    load_successful: bool,
}

impl Default for MatrixMarketLoader<StrictConsumer> {
    fn default() -> Self {
        Self::new(StrictConsumer)
    }
}

impl<C: ErrorConsumer> MatrixMarketLoader<C> {
    pub fn new(consumer: C) -> Self {
        Self { consumer, load_successful: false }
    }

    /// True iff the previous `load` saw no errors and no warnings.
    pub fn load_successful(&self) -> bool {
        self.load_successful
    }

    /// Load from a buffered reader. `pattern_value` fills in the value of
    /// every tuple when the field is `pattern`.
    pub fn load(
        &mut self,
        reader: impl BufRead,
        pattern_value: f64,
        config: &Config,
    ) -> crate::error::Result<Matrix<f64>> {
        self.load_successful = false;
        match self.load_tuples(reader, pattern_value)? {
            Some((shape, tuples, clean)) => {
                self.load_successful = clean;
                debug!("loaded {} matrix market tuples into {shape}", tuples.len());
                matrix_from_tuples(shape, tuples, config)
            }
            None => Ok(Matrix::new(Shape::default())),
        }
    }

    /// Load from a file path.
    pub fn load_path(
        &mut self,
        path: impl AsRef<Path>,
        pattern_value: f64,
        config: &Config,
    ) -> crate::error::Result<Matrix<f64>> {
        self.load_successful = false;
        match File::open(path.as_ref()) {
            Ok(file) => self.load(BufReader::new(file), pattern_value, config),
            Err(err) => {
                self.consumer
                    .error(format!("cannot open {}: {err}", path.as_ref().display()))
                    .map_err(crate::error::Error::from)?;
                Ok(Matrix::new(Shape::default()))
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn load_tuples(
        &mut self,
        reader: impl BufRead,
        pattern_value: f64,
    ) -> Result<Option<(Shape, Vec<(Index, Index, f64)>, bool)>, MatrixMarketError> {
        let mut lines = reader.lines();

        // banner
        let Some(banner) = lines.next().transpose()? else {
            self.consumer.error("not a Matrix Market file: empty input".into())?;
            return Ok(None);
        };
        let tokens: Vec<&str> = banner.split_whitespace().collect();
        if tokens.first().is_none_or(|t| *t != "%%MatrixMarket" && *t != "%MatrixMarket") {
            self.consumer.error("not a Matrix Market file: missing banner".into())?;
            return Ok(None);
        }
        if tokens.len() != 5 {
            self.consumer.error(format!("malformed banner: {banner}"))?;
            return Ok(None);
        }

        if tokens[1].to_ascii_lowercase() != "matrix" {
            self.consumer.error(format!("unsupported object type: {}", tokens[1]))?;
            return Ok(None);
        }
        if tokens[2].to_ascii_lowercase() != "coordinate" {
            self.consumer.error(format!("unsupported format: {}", tokens[2]))?;
            return Ok(None);
        }
        let field = match tokens[3].to_ascii_lowercase().as_str() {
            "real" | "double" => MmField::Real,
            "integer" => MmField::Integer,
            "pattern" => MmField::Pattern,
            other => {
                self.consumer.error(format!("unsupported field: {other}"))?;
                return Ok(None);
            }
        };
        let symmetry = match tokens[4].to_ascii_lowercase().as_str() {
            "general" => MmSymmetry::General,
            "symmetric" => MmSymmetry::Symmetric,
            "skew-symmetric" => MmSymmetry::SkewSymmetric,
            other => {
                self.consumer.error(format!("unsupported symmetry: {other}"))?;
                return Ok(None);
            }
        };

        // dimension line, possibly preceded by comments
        let dimension_line = loop {
            match lines.next().transpose()? {
                None => {
                    self.consumer.error("premature end of file before dimensions".into())?;
                    return Ok(None);
                }
                Some(line) => {
                    let trimmed = line.trim().to_string();
                    if trimmed.is_empty() || trimmed.starts_with('%') {
                        continue;
                    }
                    break trimmed;
                }
            }
        };
        let dims: Vec<&str> = dimension_line.split_whitespace().collect();
        let parsed: Option<(Index, Index, usize)> = match dims.as_slice() {
            [nrows, ncols, nnz] => nrows
                .parse()
                .ok()
                .zip(ncols.parse().ok())
                .zip(nnz.parse().ok())
                .map(|((r, c), n)| (r, c, n)),
            _ => None,
        };
        let Some((nrows, ncols, nnz)) = parsed else {
            self.consumer.error(format!("malformed dimension line: {dimension_line}"))?;
            return Ok(None);
        };
        let shape = Shape { nrows, ncols };

        // entries
        let mut has_warnings = false;
        let mut tuples: Vec<(Index, Index, f64)> = Vec::with_capacity(nnz);
        let mut line_number = 0usize;
        for line in lines {
            let line = line?;
            line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('%') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let coords = match parts.as_slice() {
                [row, col, ..] => row.parse::<Index>().ok().zip(col.parse::<Index>().ok()),
                _ => None,
            };
            let Some((row, col)) = coords else {
                self.consumer.warning(format!("entry {line_number}: malformed line"))?;
                has_warnings = true;
                continue;
            };
            if row < 1 || row > shape.nrows {
                self.consumer.warning(format!("entry {line_number}: row index out of range"))?;
                has_warnings = true;
                continue;
            }
            if col < 1 || col > shape.ncols {
                self.consumer
                    .warning(format!("entry {line_number}: column index out of range"))?;
                has_warnings = true;
                continue;
            }

            let value = if field == MmField::Pattern {
                Some(pattern_value)
            } else {
                parts.get(2).and_then(|v| v.parse::<f64>().ok())
            };
            let Some(value) = value else {
                self.consumer.warning(format!("entry {line_number}: malformed value"))?;
                has_warnings = true;
                continue;
            };

            tuples.push((row - 1, col - 1, value));
        }

        if tuples.len() != nnz {
            self.consumer.warning(format!(
                "file is truncated: expected {nnz} entries but loaded {}",
                tuples.len()
            ))?;
            has_warnings = true;
        }

        expand_symmetry(&mut tuples, symmetry);

        Ok(Some((shape, tuples, !has_warnings)))
    }
}

fn expand_symmetry(tuples: &mut Vec<(Index, Index, f64)>, symmetry: MmSymmetry) {
    let stored = tuples.len();
    match symmetry {
        MmSymmetry::General => {}
        MmSymmetry::Symmetric => {
            for i in 0..stored {
                let (row, col, value) = tuples[i];
                if row != col {
                    tuples.push((col, row, value));
                }
            }
        }
        MmSymmetry::SkewSymmetric => {
            for i in 0..stored {
                let (row, col, value) = tuples[i];
                tuples.push((col, row, -value));
            }
        }
    }
}

/// Write a matrix as `coordinate real general` with 1-based indices.
pub fn save(matrix: &Matrix<f64>, mut writer: impl Write) -> crate::error::Result<()> {
    let write_all = |writer: &mut dyn Write| -> std::io::Result<()> {
        writeln!(writer, "%%MatrixMarket matrix coordinate real general")?;
        let shape = matrix.shape();
        writeln!(writer, "{} {} {}", shape.nrows, shape.ncols, matrix.nnn())?;

        let mut result = Ok(());
        matrix.for_each_leaf(|leaf, offsets, _| {
            if result.is_err() {
                return;
            }
            for (row, col, value) in leaf.tuples() {
                if let Err(err) = writeln!(
                    writer,
                    "{} {} {}",
                    1 + offsets.row_offset + row,
                    1 + offsets.col_offset + col,
                    value
                ) {
                    result = Err(err);
                    return;
                }
            }
        });
        result
    };
    write_all(&mut writer).map_err(MatrixMarketError::from)?;
    Ok(())
}
