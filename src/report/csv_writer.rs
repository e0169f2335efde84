//! Headerless CSV files for the fitness and parent/offspring logs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::schema::{FitnessRow, ParentOffspringRow, StatisticsLog};

/// File name of the per-iteration fitness log.
pub const FITNESS_FILE: &str = "fitnesses.csv";
/// File name of the parent/offspring log.
pub const PARENT_OFFSPRING_FILE: &str = "parentToOffspring.csv";

/// Report write failure.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report I/O failed for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV encoding failed for {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Create the report directory and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes statistics logs into one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `iteration,bestFitness,worstFitness,populationSize` per row.
    pub fn write_fitness(&self, rows: &[FitnessRow]) -> Result<PathBuf, ReportError> {
        self.write_rows(FITNESS_FILE, rows)
    }

    /// `iteration,wasOperatorApplied,parentFitness,offspringFitness` per row.
    pub fn write_parent_offspring(
        &self,
        rows: &[ParentOffspringRow],
    ) -> Result<PathBuf, ReportError> {
        self.write_rows(PARENT_OFFSPRING_FILE, rows)
    }

    /// Create the directory and write both files.
    pub fn write_all(&self, log: &StatisticsLog) -> Result<(), ReportError> {
        ensure_dir(&self.dir)?;
        self.write_fitness(log.fitness_rows())?;
        self.write_parent_offspring(log.parent_offspring_rows())?;
        Ok(())
    }

    fn write_rows<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<PathBuf, ReportError> {
        let path = self.dir.join(name);
        let csv_error = |source: csv::Error| ReportError::Csv {
            path: path.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(csv_error)?;
        for row in rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| ReportError::Io {
            path: path.clone(),
            source,
        })?;

        log::debug!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(path)
    }
}
