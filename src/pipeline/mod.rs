//! Long-running pipeline operations.
//!
//! The dashboard talks to the tournament API and the model pipeline only
//! through the two collaborator traits below. Collaborators report progress
//! through a [`ProgressSink`] and call [`ProgressSink::checkpoint`] between
//! logical steps so pause and shutdown take effect.

pub mod command;
mod control;
mod runner;
pub mod simulated;
mod sink;

use std::path::Path;

use async_trait::async_trait;

pub use control::RunControl;
pub use runner::{Job, OperationRunner};
pub use sink::ProgressSink;

/// Dataset download and prediction upload.
#[async_trait]
pub trait TournamentApi: Send + Sync {
    async fn download_dataset(
        &self,
        name: &str,
        dest: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()>;

    async fn upload_predictions(
        &self,
        predictions: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()>;
}

/// Model training and inference.
#[async_trait]
pub trait ModelPipeline: Send + Sync {
    async fn train(
        &self,
        data_dir: &Path,
        model_dir: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()>;

    async fn predict(
        &self,
        data_dir: &Path,
        model_dir: &Path,
        output: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()>;
}
