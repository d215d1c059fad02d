use rand::rngs::StdRng;

use super::{DenseLayer, Layer, ParamLayout};
use crate::nn::conf::{LayerKind, LayerSettings};
use crate::nn::{Gradient, GraphError, LossFunction};
use crate::tensor::Tensor;

/// 输出层：全连接 + 损失函数。有标签时反向用标签计算误差，忽略下游传来的 epsilon；
/// 没有标签时退化为普通全连接层，使用传入的 epsilon
#[derive(Debug, Clone)]
pub struct OutputLayer {
    dense: DenseLayer,
    loss: LossFunction,
    labels: Option<Tensor>,
}

impl OutputLayer {
    pub fn new(settings: LayerSettings) -> Self {
        let loss = match settings.kind {
            LayerKind::Output { loss, .. } => loss,
            _ => LossFunction::default(),
        };
        Self {
            dense: DenseLayer::new(settings),
            loss,
            labels: None,
        }
    }

    pub const fn loss(&self) -> LossFunction {
        self.loss
    }

    pub const fn labels(&self) -> Option<&Tensor> {
        self.labels.as_ref()
    }

    pub(crate) fn clear_labels(&mut self) {
        self.labels = None;
    }

    fn pre_output_and_labels(&self) -> Result<(&Tensor, &Tensor), GraphError> {
        let z = self.dense.last_pre_output().ok_or_else(|| {
            GraphError::InvalidState("无法计算损失：Output层尚未执行前向计算".to_string())
        })?;
        let labels = self
            .labels
            .as_ref()
            .ok_or_else(|| GraphError::InvalidState("无法计算损失：Output层的标签未设置".to_string()))?;
        Ok((z, labels))
    }
}

impl Layer for OutputLayer {
    fn layer_type(&self) -> &'static str {
        "Output"
    }

    fn settings(&self) -> &LayerSettings {
        self.dense.settings()
    }

    fn param_layout(&self) -> &ParamLayout {
        self.dense.param_layout()
    }

    fn init_params(&self, view: &mut [f32], rng: &mut StdRng) -> Result<(), GraphError> {
        self.dense.init_params(view, rng)
    }

    fn activate(&mut self, input: &Tensor, params: &[f32], training: bool) -> Result<Tensor, GraphError> {
        self.dense.activate(input, params, training)
    }

    fn backprop_gradient(
        &mut self,
        epsilon: Option<&Tensor>,
        params: &[f32],
    ) -> Result<(Gradient, Tensor), GraphError> {
        if self.labels.is_none() && epsilon.is_some() {
            return self.dense.backprop_gradient(epsilon, params);
        }
        let (z, labels) = self.pre_output_and_labels()?;
        let delta = self
            .loss
            .compute_gradient(labels, z, &self.settings().activation)?;
        self.dense.gradients_from_delta(&delta, params)
    }

    fn is_output_layer(&self) -> bool {
        true
    }

    fn set_labels(&mut self, labels: Tensor) -> Result<(), GraphError> {
        let n_out = self.dense.n_out();
        if labels.dimension() != 2 || labels.shape()[1] != n_out {
            return Err(GraphError::ShapeMismatch {
                expected: vec![labels.shape().first().copied().unwrap_or(0), n_out],
                got: labels.shape().to_vec(),
                message: "标签宽度须等于输出层的n_out".to_string(),
            });
        }
        self.labels = Some(labels);
        Ok(())
    }

    fn compute_score(&self, l1: f32, l2: f32, _training: bool) -> Result<f32, GraphError> {
        let (z, labels) = self.pre_output_and_labels()?;
        let batch = z.shape().first().copied().unwrap_or(1).max(1) as f32;
        let loss = self
            .loss
            .compute_score(labels, z, &self.settings().activation)?;
        Ok((loss + l1 + l2) / batch)
    }

    fn clear(&mut self) {
        self.dense.clear();
        self.labels = None;
    }
}
