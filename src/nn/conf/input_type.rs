use serde::{Deserialize, Serialize};

/// 顶点输入/输出的逻辑类型，用于构建时的形状推断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    /// `[batch, size]`
    FeedForward { size: usize },
    /// `[batch, channels, height, width]`
    Convolutional {
        height: usize,
        width: usize,
        channels: usize,
    },
    /// 逻辑上是图像，但以展平的`[batch, channels*height*width]`形式给出
    ConvolutionalFlat {
        height: usize,
        width: usize,
        channels: usize,
    },
}

impl InputType {
    pub const fn feed_forward(size: usize) -> Self {
        Self::FeedForward { size }
    }

    pub const fn convolutional(height: usize, width: usize, channels: usize) -> Self {
        Self::Convolutional {
            height,
            width,
            channels,
        }
    }

    pub const fn convolutional_flat(height: usize, width: usize, channels: usize) -> Self {
        Self::ConvolutionalFlat {
            height,
            width,
            channels,
        }
    }

    /// 单个样本的元素个数
    pub const fn feature_count(&self) -> usize {
        match *self {
            Self::FeedForward { size } => size,
            Self::Convolutional {
                height,
                width,
                channels,
            }
            | Self::ConvolutionalFlat {
                height,
                width,
                channels,
            } => height * width * channels,
        }
    }
}
