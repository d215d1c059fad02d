/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 输出层使用的损失函数。compute_score 返回整个批次的损失之和（未取平均），
 *                 compute_gradient 返回 dL/dz（对预激活值的梯度）
 */

use serde::{Deserialize, Serialize};

use super::Activation;
use super::graph::GraphError;
use crate::tensor::Tensor;

const LOG_EPS: f32 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LossFunction {
    /// 均方误差，按输出宽度取平均
    #[default]
    Mse,
    /// 平方误差之和
    L2,
    /// 多类交叉熵（通常配合 softmax）
    McXent,
    /// 负对数似然，数值上与 McXent 相同
    NegativeLogLikelihood,
    /// 二元交叉熵（通常配合 sigmoid）
    XEnt,
}

impl LossFunction {
    fn check_shape(labels: &Tensor, pre_out: &Tensor) -> Result<(), GraphError> {
        if labels.is_same_shape(pre_out) {
            Ok(())
        } else {
            Err(GraphError::ShapeMismatch {
                expected: pre_out.shape().to_vec(),
                got: labels.shape().to_vec(),
                message: "标签须与输出层的输出形状一致".to_string(),
            })
        }
    }

    /// 整个批次的损失之和
    pub fn compute_score(
        &self,
        labels: &Tensor,
        pre_out: &Tensor,
        activation: &Activation,
    ) -> Result<f32, GraphError> {
        Self::check_shape(labels, pre_out)?;
        let out = activation.activate(pre_out);
        let n_out = pre_out.shape().last().copied().unwrap_or(1).max(1) as f32;
        let score = match self {
            Self::Mse => out.zip_map(labels, |a, y| (a - y) * (a - y)).sum() / n_out,
            Self::L2 => out.zip_map(labels, |a, y| (a - y) * (a - y)).sum(),
            Self::McXent | Self::NegativeLogLikelihood => -out
                .zip_map(labels, |a, y| y * a.max(LOG_EPS).ln())
                .sum(),
            Self::XEnt => -out
                .zip_map(labels, |a, y| {
                    let a = a.clamp(LOG_EPS, 1.0 - LOG_EPS);
                    y * a.ln() + (1.0 - y) * (1.0 - a).ln()
                })
                .sum(),
        };
        Ok(score)
    }

    /// 损失对预激活值的梯度 dL/dz
    pub fn compute_gradient(
        &self,
        labels: &Tensor,
        pre_out: &Tensor,
        activation: &Activation,
    ) -> Result<Tensor, GraphError> {
        Self::check_shape(labels, pre_out)?;
        let out = activation.activate(pre_out);
        let n_out = pre_out.shape().last().copied().unwrap_or(1).max(1) as f32;

        // softmax + 多类交叉熵、sigmoid + 二元交叉熵时有化简形式
        match (self, activation) {
            (Self::McXent | Self::NegativeLogLikelihood, Activation::Softmax)
            | (Self::XEnt, Activation::Sigmoid) => return Ok(&out - labels),
            _ => {}
        }

        let d_out = match self {
            Self::Mse => out.zip_map(labels, |a, y| 2.0 * (a - y) / n_out),
            Self::L2 => out.zip_map(labels, |a, y| 2.0 * (a - y)),
            Self::McXent | Self::NegativeLogLikelihood => {
                out.zip_map(labels, |a, y| -y / a.max(LOG_EPS))
            }
            Self::XEnt => out.zip_map(labels, |a, y| {
                let a = a.clamp(LOG_EPS, 1.0 - LOG_EPS);
                (a - y) / (a * (1.0 - a))
            }),
        };
        Ok(activation.backprop(pre_out, &d_out))
    }
}
