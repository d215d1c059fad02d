/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 输入预处理器：在张量布局之间变形（展平 <-> 图像），不含参数。
 *                 前向与反向互为逆操作，均按行优先（'c'）顺序进行
 */

use serde::{Deserialize, Serialize};

use super::InputType;
use crate::nn::GraphError;
use crate::tensor::{Order, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputPreProcessor {
    /// `[b, c*h*w]` -> `[b, c, h, w]`
    FeedForwardToCnn {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// `[b, c, h, w]` -> `[b, c*h*w]`
    CnnToFeedForward {
        height: usize,
        width: usize,
        channels: usize,
    },
}

impl InputPreProcessor {
    const fn dims(&self) -> (usize, usize, usize) {
        match *self {
            Self::FeedForwardToCnn {
                height,
                width,
                channels,
            }
            | Self::CnnToFeedForward {
                height,
                width,
                channels,
            } => (height, width, channels),
        }
    }

    fn flat_shape(&self, batch: usize) -> Vec<usize> {
        let (h, w, c) = self.dims();
        vec![batch, c * h * w]
    }

    fn image_shape(&self, batch: usize) -> Vec<usize> {
        let (h, w, c) = self.dims();
        vec![batch, c, h, w]
    }

    fn reshape(input: &Tensor, shape: &[usize]) -> Result<Tensor, GraphError> {
        if input.size() != shape.iter().product::<usize>() {
            return Err(GraphError::ShapeMismatch {
                expected: shape.to_vec(),
                got: input.shape().to_vec(),
                message: "预处理器无法变形该输入".to_string(),
            });
        }
        Ok(input.reshape_with_order(Order::C, shape)?)
    }

    pub fn pre_process(&self, input: &Tensor) -> Result<Tensor, GraphError> {
        let batch = input.shape().first().copied().unwrap_or(0);
        match self {
            Self::FeedForwardToCnn { .. } => Self::reshape(input, &self.image_shape(batch)),
            Self::CnnToFeedForward { .. } => Self::reshape(input, &self.flat_shape(batch)),
        }
    }

    /// 把下游的误差变回预处理之前的布局
    pub fn backprop(&self, epsilon: &Tensor) -> Result<Tensor, GraphError> {
        let batch = epsilon.shape().first().copied().unwrap_or(0);
        match self {
            Self::FeedForwardToCnn { .. } => Self::reshape(epsilon, &self.flat_shape(batch)),
            Self::CnnToFeedForward { .. } => Self::reshape(epsilon, &self.image_shape(batch)),
        }
    }

    /// 输入类型经过预处理后的类型；元素个数对不上时返回描述信息
    pub fn output_type(&self, input: &InputType) -> Result<InputType, String> {
        let (height, width, channels) = self.dims();
        if input.feature_count() != height * width * channels {
            return Err(format!(
                "预处理器期望每个样本{}个元素，实际输入类型为{:?}",
                height * width * channels,
                input
            ));
        }
        match self {
            Self::FeedForwardToCnn { .. } => Ok(InputType::convolutional(height, width, channels)),
            Self::CnnToFeedForward { .. } => Ok(InputType::feed_forward(height * width * channels)),
        }
    }
}
