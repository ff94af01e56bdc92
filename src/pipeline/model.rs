use anyhow::{Error, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::Path;
use tracing::debug;

pub use ort::session::Session;

pub fn initialize_model(models_dir: &Path, model_file: &str, threads: usize) -> Result<Session> {
    let path = models_dir.join(model_file);
    if !path.exists() {
        return Err(Error::msg(format!(
            "model file not found: {}",
            path.display()
        )));
    }

    let model = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(threads)?
        .commit_from_file(&path)?;

    debug!(
        "Loaded {model_file} inputs={:?} outputs={:?}",
        model.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
        model.outputs.iter().map(|o| &o.name).collect::<Vec<_>>(),
    );

    Ok(model)
}

/// Run a single-input model, returning every output flattened, in the order
/// the model declares them.
pub fn run(model: &Session, input: Array4<f32>) -> Result<Vec<Vec<f32>>> {
    let input_name = match model.inputs.first() {
        Some(i) => i.name.as_str(),
        None => return Err(Error::msg("model declares no inputs")),
    };

    let input = Tensor::from_array(input)?;
    let outputs = model.run(ort::inputs![input_name => input]?)?;

    model
        .outputs
        .iter()
        .map(|o| -> Result<Vec<f32>> {
            let tensor = outputs[o.name.as_str()].try_extract_tensor::<f32>()?;
            Ok(tensor.iter().copied().collect())
        })
        .collect()
}
