//! Built-in demo backend.
//!
//! Fakes the tournament API and the model pipeline with timed progress so
//! the dashboard can be exercised without network access or a model.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;

use crate::models::{Details, Phase, ProgressFields};

use super::{ModelPipeline, ProgressSink, TournamentApi};

/// Approximate dataset sizes (MB) so the demo looks plausible.
fn dataset_size_mb(name: &str) -> f64 {
    match name {
        "train" => 2300.0,
        "validation" => 1800.0,
        "live" => 6.5,
        _ => 250.0,
    }
}

/// Fake dataset download / prediction upload.
#[derive(Debug, Clone)]
pub struct SimulatedTournament {
    step: Duration,
    steps: u32,
}

impl SimulatedTournament {
    pub fn new(step: Duration, steps: u32) -> Self {
        Self {
            step,
            steps: steps.max(1),
        }
    }

    async fn transfer(&self, total_mb: f64, progress: &ProgressSink) -> anyhow::Result<()> {
        let secs_per_step = self.step.as_secs_f64().max(0.001);
        for i in 1..=self.steps {
            progress.checkpoint().await?;
            tokio::time::sleep(self.step).await;
            let fraction = i as f64 / self.steps as f64;
            let remaining_steps = (self.steps - i) as f64;
            let speed = total_mb / self.steps as f64 / secs_per_step;
            progress.update(ProgressFields::percent(fraction * 100.0).with_details(Details {
                current_mb: Some(total_mb * fraction),
                total_mb: Some(total_mb),
                speed_mb_s: Some(speed),
                eta_seconds: Some(remaining_steps * secs_per_step),
                ..Details::default()
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl TournamentApi for SimulatedTournament {
    async fn download_dataset(
        &self,
        name: &str,
        _dest: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        progress.start();
        self.transfer(dataset_size_mb(name), progress).await?;
        progress.complete();
        Ok(())
    }

    async fn upload_predictions(
        &self,
        predictions: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        let size_mb = std::fs::metadata(predictions)
            .map(|m| m.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0)
            .max(0.01);
        progress.report(
            Phase::Start,
            ProgressFields::message(format!("Uploading {}", predictions.display())),
        );
        self.transfer(size_mb, progress).await?;
        progress.report(Phase::Complete, ProgressFields::message("Predictions submitted"));
        Ok(())
    }
}

/// Fake training (epochs with a decaying loss) and prediction (row batches).
#[derive(Debug, Clone)]
pub struct SimulatedPipeline {
    step: Duration,
    epochs: u32,
    rows: u64,
}

impl SimulatedPipeline {
    pub fn new(step: Duration, epochs: u32, rows: u64) -> Self {
        Self {
            step,
            epochs: epochs.max(1),
            rows: rows.max(1),
        }
    }
}

#[async_trait]
impl ModelPipeline for SimulatedPipeline {
    async fn train(
        &self,
        _data_dir: &Path,
        _model_dir: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        progress.report(Phase::Start, ProgressFields::message("Training model"));
        for epoch in 1..=self.epochs {
            progress.checkpoint().await?;
            tokio::time::sleep(self.step).await;
            let loss = 0.25 / (1.0 + epoch as f64 * 0.3);
            progress.update(
                ProgressFields::percent(epoch as f64 / self.epochs as f64 * 100.0).with_details(
                    Details {
                        epoch: Some(epoch),
                        total_epochs: Some(self.epochs),
                        loss: Some(loss),
                        val_score: Some(0.01 + epoch as f64 * 0.002),
                        ..Details::default()
                    },
                ),
            );
        }
        progress.complete();
        Ok(())
    }

    async fn predict(
        &self,
        _data_dir: &Path,
        _model_dir: &Path,
        output: &Path,
        progress: &ProgressSink,
    ) -> anyhow::Result<()> {
        progress.report(Phase::Start, ProgressFields::message("Generating predictions"));
        let batches = 10u64;
        let batch = (self.rows / batches).max(1);
        let mut csv = String::from("id,prediction\n");
        let mut done = 0u64;
        while done < self.rows {
            progress.checkpoint().await?;
            tokio::time::sleep(self.step).await;
            let upto = (done + batch).min(self.rows);
            for row in done..upto {
                csv.push_str(&format!("id_{},{:.4}\n", row, (row % 100) as f64 / 100.0));
            }
            done = upto;
            progress.update(
                ProgressFields::percent(done as f64 / self.rows as f64 * 100.0).with_details(
                    Details {
                        rows_processed: Some(done),
                        total_rows: Some(self.rows),
                        ..Details::default()
                    },
                ),
            );
        }
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(output, csv).with_context(|| format!("writing {}", output.display()))?;
        progress.complete();
        Ok(())
    }
}
