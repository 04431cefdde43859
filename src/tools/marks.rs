//! Marks predictor: linear regression of exam marks on study hours
//!
//! Trained from `marks.csv` (`hrs,marks`) in the data directory. A seed
//! dataset is written the first time the file is missing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::ToolError;

pub const MARKS_FILE: &str = "marks.csv";
pub const MAX_HOURS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Sample {
    hrs: f64,
    marks: f64,
}

/// Fitted `marks = slope * hours + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarksModel {
    pub slope: f64,
    pub intercept: f64,
}

impl MarksModel {
    fn fit(samples: &[Sample]) -> Result<Self, ToolError> {
        let invalid = |reason: &str| ToolError::Data {
            what: MARKS_FILE.to_string(),
            reason: reason.to_string(),
        };

        if samples.len() < 2 {
            return Err(invalid("at least two rows are needed"));
        }

        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|s| s.hrs).sum::<f64>() / n;
        let mean_y = samples.iter().map(|s| s.marks).sum::<f64>() / n;

        let (sxy, sxx) = samples.iter().fold((0.0, 0.0), |(sxy, sxx), s| {
            let dx = s.hrs - mean_x;
            (sxy + dx * (s.marks - mean_y), sxx + dx * dx)
        });
        if sxx == 0.0 {
            return Err(invalid("all rows have the same hours"));
        }

        let slope = sxy / sxx;
        Ok(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn predict(&self, hours: f64) -> f64 {
        self.slope * hours + self.intercept
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub hours: f64,
    pub marks: f64,
    pub message: String,
}

pub struct MarksPredictor {
    path: PathBuf,
}

impl MarksPredictor {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(MARKS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_dataset(&self) -> Result<(), ToolError> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for hrs in 1..=10 {
            writer
                .serialize(Sample {
                    hrs: hrs as f64,
                    marks: (hrs * 10) as f64,
                })
                .map_err(|e| self.data_error(e))?;
        }
        let bytes = writer.into_inner().map_err(|e| self.data_error(e))?;
        tokio::fs::write(&self.path, bytes).await?;

        info!("Created seed dataset at {:?}", self.path);
        Ok(())
    }

    fn data_error(&self, err: impl std::fmt::Display) -> ToolError {
        ToolError::Data {
            what: MARKS_FILE.to_string(),
            reason: err.to_string(),
        }
    }

    /// Fit a model to the current contents of the dataset
    pub async fn train(&self) -> Result<MarksModel, ToolError> {
        self.ensure_dataset().await?;

        let bytes = tokio::fs::read(&self.path).await?;
        let mut reader = csv::Reader::from_reader(bytes.as_slice());
        let samples = reader
            .deserialize::<Sample>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.data_error(e))?;

        MarksModel::fit(&samples)
    }

    pub async fn predict(&self, hours: f64) -> Result<Prediction, ToolError> {
        if !(0.0..=MAX_HOURS).contains(&hours) {
            return Err(ToolError::validation(format!(
                "Hours of study must be between 0 and {}.",
                MAX_HOURS
            )));
        }

        let marks = self.train().await?.predict(hours);
        Ok(Prediction {
            hours,
            marks,
            message: format!("Predicted Marks for {:?} hours: {:.2}%", hours, marks),
        })
    }
}
