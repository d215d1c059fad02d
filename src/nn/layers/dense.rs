use rand::rngs::StdRng;

use super::{Layer, ParamLayout, init_weights_and_bias, not_activated};
use crate::nn::conf::LayerSettings;
use crate::nn::{Gradient, GraphError};
use crate::tensor::{Order, Tensor};

/// 全连接层：a = f(x·W + b)，W 形状`[n_in, n_out]`按列优先存放，b 形状`[1, n_out]`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    settings: LayerSettings,
    layout: ParamLayout,
    n_in: usize,
    n_out: usize,
    input: Option<Tensor>,
    pre_output: Option<Tensor>,
}

impl DenseLayer {
    pub fn new(settings: LayerSettings) -> Self {
        let (n_in, n_out) = (settings.kind.n_in(), settings.kind.n_out());
        let layout = ParamLayout::new()
            .with_slot("W", &[n_in, n_out], Order::F, true)
            .with_slot("b", &[1, n_out], Order::C, false);
        Self {
            settings,
            layout,
            n_in,
            n_out,
            input: None,
            pre_output: None,
        }
    }

    /// 预激活值 z = x·W + b，并记住输入与 z
    pub(crate) fn pre_output(&mut self, input: &Tensor, params: &[f32]) -> Result<Tensor, GraphError> {
        if input.dimension() != 2 || input.shape()[1] != self.n_in {
            return Err(GraphError::ShapeMismatch {
                expected: vec![input.shape().first().copied().unwrap_or(0), self.n_in],
                got: input.shape().to_vec(),
                message: format!("{}层的输入宽度须为n_in", self.layer_type()),
            });
        }
        let w = self.layout.tensor("W", params)?;
        let b = self.layout.tensor("b", params)?;
        let z = input.mat_mul(&w)?.add_row_broadcast(&b)?;
        self.input = Some(input.clone());
        self.pre_output = Some(z.clone());
        Ok(z)
    }

    pub(crate) fn last_pre_output(&self) -> Option<&Tensor> {
        self.pre_output.as_ref()
    }

    pub(crate) const fn n_out(&self) -> usize {
        self.n_out
    }

    /// 由 dL/dz 求参数梯度与 dL/dx
    pub(crate) fn gradients_from_delta(
        &self,
        delta: &Tensor,
        params: &[f32],
    ) -> Result<(Gradient, Tensor), GraphError> {
        let input = self.input.as_ref().ok_or_else(|| not_activated(self.layer_type()))?;
        let w = self.layout.tensor("W", params)?;

        let mut gradient = Gradient::new();
        gradient.set_gradient_for("W", input.transpose().mat_mul(delta)?, Some(Order::F));
        gradient.set_gradient_for("b", delta.sum_rows(), Some(Order::C));
        let epsilon_out = delta.mat_mul(&w.transpose())?;
        Ok((gradient, epsilon_out))
    }
}

impl Layer for DenseLayer {
    fn layer_type(&self) -> &'static str {
        "Dense"
    }

    fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    fn param_layout(&self) -> &ParamLayout {
        &self.layout
    }

    fn init_params(&self, view: &mut [f32], rng: &mut StdRng) -> Result<(), GraphError> {
        init_weights_and_bias(&self.layout, &self.settings, self.n_in, self.n_out, view, rng)
    }

    fn activate(&mut self, input: &Tensor, params: &[f32], _training: bool) -> Result<Tensor, GraphError> {
        let z = self.pre_output(input, params)?;
        Ok(self.settings.activation.activate(&z))
    }

    fn backprop_gradient(
        &mut self,
        epsilon: Option<&Tensor>,
        params: &[f32],
    ) -> Result<(Gradient, Tensor), GraphError> {
        let z = self.pre_output.as_ref().ok_or_else(|| not_activated("Dense"))?;
        let epsilon = epsilon.ok_or_else(|| {
            GraphError::InvalidState("无法反向传播：Dense层的误差未设置".to_string())
        })?;
        if !epsilon.is_same_shape(z) {
            return Err(GraphError::ShapeMismatch {
                expected: z.shape().to_vec(),
                got: epsilon.shape().to_vec(),
                message: "误差须与层输出形状一致".to_string(),
            });
        }
        let delta = self.settings.activation.backprop(z, epsilon);
        self.gradients_from_delta(&delta, params)
    }

    fn clear(&mut self) {
        self.input = None;
        self.pre_output = None;
    }
}
