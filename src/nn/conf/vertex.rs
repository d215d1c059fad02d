/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 顶点配置。只是蓝图，不含任何运行期状态：
 *                 参数个数与输出类型都是配置本身的纯函数
 */

use serde::{Deserialize, Serialize};

use super::{InputPreProcessor, InputType, LayerConfig, LayerKind};
use crate::nn::ConfigError;

/// 逐元素组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementWiseOp {
    #[default]
    Add,
    /// 恰好两个输入：第一个减第二个
    Subtract,
    Product,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphVertexConfig {
    Input,
    Layer {
        conf: LayerConfig,
        preprocessor: Option<InputPreProcessor>,
    },
    ElementWise {
        op: ElementWiseOp,
    },
    /// 沿特征/通道维拼接
    Merge,
    /// 取特征/通道维的闭区间`[from, to]`
    Subset {
        from: usize,
        to: usize,
    },
    Preprocessor(InputPreProcessor),
}

/// 允许的输入个数
pub(crate) enum InputArity {
    Exactly(usize),
    AtLeast(usize),
}

impl InputArity {
    pub(crate) const fn accepts(&self, n: usize) -> bool {
        match *self {
            Self::Exactly(k) => n == k,
            Self::AtLeast(k) => n >= k,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match *self {
            Self::Exactly(k) => format!("恰好{k}个"),
            Self::AtLeast(k) => format!("至少{k}个"),
        }
    }
}

impl GraphVertexConfig {
    pub const fn layer(conf: LayerConfig) -> Self {
        Self::Layer {
            conf,
            preprocessor: None,
        }
    }

    pub const fn element_wise(op: ElementWiseOp) -> Self {
        Self::ElementWise { op }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Layer { .. } => "Layer",
            Self::ElementWise { .. } => "ElementWise",
            Self::Merge => "Merge",
            Self::Subset { .. } => "Subset",
            Self::Preprocessor(_) => "Preprocessor",
        }
    }

    pub const fn num_params(&self) -> usize {
        match self {
            Self::Layer { conf, .. } => conf.num_params(),
            _ => 0,
        }
    }

    pub const fn is_output_layer(&self) -> bool {
        matches!(self, Self::Layer { conf, .. } if conf.kind.is_output())
    }

    pub(crate) const fn arity(&self) -> InputArity {
        match self {
            Self::Input => InputArity::Exactly(0),
            Self::Layer { .. } | Self::Subset { .. } | Self::Preprocessor(_) => {
                InputArity::Exactly(1)
            }
            Self::ElementWise {
                op: ElementWiseOp::Subtract,
            } => InputArity::Exactly(2),
            Self::ElementWise { .. } | Self::Merge => InputArity::AtLeast(1),
        }
    }

    /// 给定各输入类型，推断本顶点的输出类型
    pub fn output_type(&self, vertex: &str, inputs: &[InputType]) -> Result<InputType, ConfigError> {
        let mismatch = |message: String| ConfigError::InputTypeMismatch {
            vertex: vertex.to_string(),
            message,
        };
        let arity = self.arity();
        if !arity.accepts(inputs.len()) {
            return Err(ConfigError::InvalidInputCount {
                vertex: vertex.to_string(),
                expected: arity.describe(),
                got: inputs.len(),
            });
        }

        match self {
            Self::Input => Err(mismatch("输入顶点没有上游类型".to_string())),
            Self::Layer { conf, preprocessor } => {
                let input = match preprocessor {
                    Some(pp) => pp.output_type(&inputs[0]).map_err(mismatch)?,
                    None => inputs[0],
                };
                layer_output_type(&conf.kind, &input).map_err(mismatch)
            }
            Self::ElementWise { .. } => {
                let first = inputs[0];
                match inputs.iter().find(|t| **t != first) {
                    Some(other) => Err(mismatch(format!(
                        "逐元素组合要求所有输入类型相同：{first:?}与{other:?}"
                    ))),
                    None => Ok(first),
                }
            }
            Self::Merge => merge_output_type(inputs).map_err(mismatch),
            Self::Subset { from, to } => {
                if from > to {
                    return Err(mismatch(format!("子集范围[{from}, {to}]非法")));
                }
                let width = to - from + 1;
                match inputs[0] {
                    InputType::FeedForward { size } if *to < size => {
                        Ok(InputType::feed_forward(width))
                    }
                    InputType::Convolutional {
                        height,
                        width: w,
                        channels,
                    } if *to < channels => Ok(InputType::convolutional(height, w, width)),
                    other => Err(mismatch(format!("子集范围[{from}, {to}]超出输入{other:?}"))),
                }
            }
            Self::Preprocessor(pp) => pp.output_type(&inputs[0]).map_err(mismatch),
        }
    }
}

fn layer_output_type(kind: &LayerKind, input: &InputType) -> Result<InputType, String> {
    match kind {
        LayerKind::Dense { n_out, .. } | LayerKind::Output { n_out, .. } => match input {
            InputType::FeedForward { .. } | InputType::ConvolutionalFlat { .. } => {
                Ok(InputType::feed_forward(*n_out))
            }
            InputType::Convolutional { .. } => {
                Err(format!("{}层需要展平的输入，实际为{input:?}", kind.name()))
            }
        },
        LayerKind::Convolution {
            n_out,
            kernel,
            stride,
            padding,
            ..
        } => match *input {
            InputType::Convolutional { height, width, .. } => {
                let (oh, ow) = conv_output_size(height, width, *kernel, *stride, *padding)?;
                Ok(InputType::convolutional(oh, ow, *n_out))
            }
            _ => Err(format!("卷积层需要图像输入，实际为{input:?}")),
        },
    }
}

/// 卷积输出的空间尺寸：(h + 2p - k) / s + 1
pub(crate) fn conv_output_size(
    height: usize,
    width: usize,
    kernel: [usize; 2],
    stride: [usize; 2],
    padding: [usize; 2],
) -> Result<(usize, usize), String> {
    if stride[0] == 0 || stride[1] == 0 {
        return Err("卷积步长不能为0".to_string());
    }
    let padded = (height + 2 * padding[0], width + 2 * padding[1]);
    if kernel[0] == 0 || kernel[1] == 0 || kernel[0] > padded.0 || kernel[1] > padded.1 {
        return Err(format!(
            "卷积核{kernel:?}与输入尺寸{:?}（含填充）不兼容",
            padded
        ));
    }
    Ok((
        (padded.0 - kernel[0]) / stride[0] + 1,
        (padded.1 - kernel[1]) / stride[1] + 1,
    ))
}

fn merge_output_type(inputs: &[InputType]) -> Result<InputType, String> {
    match inputs[0] {
        InputType::Convolutional { height, width, .. } => {
            let mut channels = 0;
            for t in inputs {
                match *t {
                    InputType::Convolutional {
                        height: h,
                        width: w,
                        channels: c,
                    } if h == height && w == width => channels += c,
                    other => {
                        return Err(format!(
                            "合并卷积输入要求空间尺寸一致：期望{height}x{width}，实际为{other:?}"
                        ));
                    }
                }
            }
            Ok(InputType::convolutional(height, width, channels))
        }
        _ => {
            let mut size = 0;
            for t in inputs {
                if let InputType::Convolutional { .. } = t {
                    return Err(format!("不能把卷积输入{t:?}与展平输入合并"));
                }
                size += t.feature_count();
            }
            Ok(InputType::feed_forward(size))
        }
    }
}
