//! LSTM forward pass over exported Keras weights
//!
//! Layout follows Keras: `kernel` is `[input, 4 * units]`,
//! `recurrent_kernel` is `[units, 4 * units]`, gates ordered i, f, c, o.
//! An optional entity embedding is concatenated to the final hidden state
//! before the dense head.

use super::{InferenceModel, ModelInput};
use crate::error::{ForecastError, Result};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, Axis};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(&self, x: Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.mapv(|v| v.max(0.0)),
            Activation::Tanh => x.mapv(f64::tanh),
            Activation::Sigmoid => x.mapv(sigmoid),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Deserialize)]
struct LstmWeights {
    kernel: Vec<Vec<f64>>,
    recurrent_kernel: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct DenseWeights {
    kernel: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct ModelExport {
    lstm: Vec<LstmWeights>,
    #[serde(default)]
    embedding: Option<Vec<Vec<f64>>>,
    dense: Vec<DenseWeights>,
}

#[derive(Debug, Clone)]
struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    /// Run the layer over a sequence, returning every hidden state
    fn forward(&self, inputs: &Array2<f64>) -> Array2<f64> {
        let u = self.units;
        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut out = Array2::<f64>::zeros((inputs.nrows(), u));

        for (t, x) in inputs.rows().into_iter().enumerate() {
            let z = x.dot(&self.kernel) + h.dot(&self.recurrent) + &self.bias;
            let i = z.slice(s![0..u]).mapv(sigmoid);
            let f = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o = z.slice(s![3 * u..4 * u]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
            out.row_mut(t).assign(&h);
        }
        out
    }
}

#[derive(Debug, Clone)]
struct DenseLayer {
    kernel: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Stacked LSTM with a dense head
#[derive(Debug, Clone)]
pub struct LstmModel {
    layers: Vec<LstmLayer>,
    embedding: Option<Array2<f64>>,
    head: Vec<DenseLayer>,
}

fn matrix(rows: Vec<Vec<f64>>, what: &str) -> Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(ForecastError::Shape(format!("{} has ragged rows", what)));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| ForecastError::Shape(format!("{}: {}", what, e)))
}

fn expect_shape(what: &str, got: (usize, usize), want: (usize, usize)) -> Result<()> {
    if got != want {
        return Err(ForecastError::Shape(format!(
            "{} is {:?}, expected {:?}",
            what, got, want
        )));
    }
    Ok(())
}

impl LstmModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let export: ModelExport = serde_json::from_slice(bytes)?;
        Self::from_export(export)
    }

    fn from_export(export: ModelExport) -> Result<Self> {
        if export.lstm.is_empty() || export.dense.is_empty() {
            return Err(ForecastError::Shape(
                "model needs at least one LSTM and one dense layer".into(),
            ));
        }

        let mut layers = Vec::with_capacity(export.lstm.len());
        let mut prev_units: Option<usize> = None;
        for (idx, layer) in export.lstm.into_iter().enumerate() {
            let kernel = matrix(layer.kernel, "lstm kernel")?;
            let recurrent = matrix(layer.recurrent_kernel, "lstm recurrent_kernel")?;
            let units = recurrent.nrows();
            let input = prev_units.unwrap_or(kernel.nrows());

            expect_shape(&format!("lstm[{}] kernel", idx), kernel.dim(), (input, 4 * units))?;
            expect_shape(&format!("lstm[{}] recurrent_kernel", idx), recurrent.dim(), (units, 4 * units))?;
            if layer.bias.len() != 4 * units {
                return Err(ForecastError::Shape(format!(
                    "lstm[{}] bias has {} values, expected {}",
                    idx,
                    layer.bias.len(),
                    4 * units
                )));
            }

            layers.push(LstmLayer {
                units,
                kernel,
                recurrent,
                bias: Array1::from(layer.bias),
            });
            prev_units = Some(units);
        }

        let embedding = export
            .embedding
            .map(|rows| matrix(rows, "embedding"))
            .transpose()?;

        let mut width = prev_units.unwrap_or(0) + embedding.as_ref().map_or(0, |e| e.ncols());
        let mut head = Vec::with_capacity(export.dense.len());
        for (idx, layer) in export.dense.into_iter().enumerate() {
            let kernel = matrix(layer.kernel, "dense kernel")?;
            expect_shape(&format!("dense[{}] kernel", idx), kernel.dim(), (width, layer.bias.len()))?;
            width = kernel.ncols();
            head.push(DenseLayer {
                kernel,
                bias: Array1::from(layer.bias),
                activation: layer.activation,
            });
        }

        Ok(Self { layers, embedding, head })
    }

    /// Features per timestep the first layer expects
    pub fn input_features(&self) -> usize {
        self.layers[0].kernel.nrows()
    }

    /// Number of values one prediction yields
    pub fn output_len(&self) -> usize {
        self.head.last().map_or(0, |d| d.bias.len())
    }

    fn embed(&self, entity_id: Option<i64>) -> Result<Option<ArrayView1<'_, f64>>> {
        let Some(table) = &self.embedding else {
            return Ok(None);
        };
        let id = entity_id.ok_or_else(|| {
            ForecastError::Shape("model is entity-conditioned but no entity id was given".into())
        })?;
        let row = usize::try_from(id)
            .ok()
            .filter(|r| *r < table.nrows())
            .ok_or_else(|| {
                ForecastError::Shape(format!(
                    "entity id {} outside embedding table of {}",
                    id,
                    table.nrows()
                ))
            })?;
        Ok(Some(table.row(row)))
    }
}

impl InferenceModel for LstmModel {
    fn predict(&self, input: &ModelInput) -> Result<Vec<f64>> {
        let (batch, _, features) = input.window.dim();
        if batch != 1 || features != self.input_features() {
            return Err(ForecastError::Shape(format!(
                "window is {:?}, model expects (1, _, {})",
                input.window.dim(),
                self.input_features()
            )));
        }

        let mut seq = input.window.index_axis(Axis(0), 0).to_owned();
        for layer in &self.layers {
            seq = layer.forward(&seq);
        }
        let last = seq
            .rows()
            .into_iter()
            .last()
            .ok_or_else(|| ForecastError::Shape("empty input window".into()))?
            .to_owned();

        let mut x = match self.embed(input.entity_id)? {
            Some(emb) => concatenate(Axis(0), &[last.view(), emb])
                .map_err(|e| ForecastError::Shape(e.to_string()))?,
            None => last,
        };
        for dense in &self.head {
            x = dense.activation.apply(x.dot(&dense.kernel) + &dense.bias);
        }
        Ok(x.to_vec())
    }
}
