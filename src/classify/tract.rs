#![cfg(feature = "backend-tract")]

//! ONNX classification via tract.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::{Classifier, Prediction};
use crate::frame::{Frame, FRAME_CHANNELS};

/// Tract-based classifier for local ONNX models.
///
/// Loads the model once at startup, runs RGB frames through it as NCHW
/// float input, and maps the argmax score to a label.
pub struct TractClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    labels: Vec<String>,
    width: u32,
    height: u32,
}

impl TractClassifier {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if labels.is_empty() {
            return Err(anyhow!("classifier needs at least one label"));
        }
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            labels,
            width,
            height,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        let pixels = frame.data();
        let width = self.width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, self.height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * FRAME_CHANNELS + channel;
                pixels[idx] as f32 / 255.0
            },
        );
        Ok(input.into_tensor())
    }

    fn best_class(&self, outputs: TVec<TValue>) -> Result<(usize, f32)> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let mut best = (0usize, f32::NEG_INFINITY);
        for (index, &score) in scores.iter().enumerate() {
            if score > best.1 {
                best = (index, score);
            }
        }
        if !best.1.is_finite() {
            return Err(anyhow!("model produced no finite scores"));
        }
        Ok(best)
    }
}

impl Classifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn is_ready(&self) -> bool {
        !self.labels.is_empty()
    }

    fn predict(&mut self, frame: &Frame) -> Result<Prediction> {
        let input = self.build_input(frame)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let (index, score) = self.best_class(outputs)?;
        let label = self
            .labels
            .get(index)
            .map(String::as_str)
            .unwrap_or("Unknown")
            .to_string();
        Ok(Prediction {
            label,
            confidence: score.clamp(0.0, 1.0),
        })
    }
}
