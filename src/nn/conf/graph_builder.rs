/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 计算图配置（不可变蓝图）及其构建器。
 *                 构建时依次校验：输入/输出非空 → 名称唯一 → 引用存在 → 输入个数 → 无环 →
 *                 形状推断（必要时自动插入预处理器、补齐 n_in）→ 特征数非零
 */

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{GraphVertexConfig, InputPreProcessor, InputType, LayerConfig, LayerKind, NeuralNetConfig};
use crate::nn::graph::topo::topological_sort;
use crate::nn::{ConfigError, GraphError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationGraphConfiguration {
    pub defaults: NeuralNetConfig,
    /// 按插入顺序排列，网络输入在最前
    pub vertices: Vec<(String, GraphVertexConfig)>,
    /// 顶点名 -> 有序的输入顶点名（位置有意义）
    pub vertex_inputs: HashMap<String, Vec<String>>,
    pub network_inputs: Vec<String>,
    pub network_outputs: Vec<String>,
    pub input_types: Option<Vec<InputType>>,
}

impl ComputationGraphConfiguration {
    pub fn vertex(&self, name: &str) -> Option<&GraphVertexConfig> {
        self.vertices.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.vertices.iter().position(|(n, _)| n == name)
    }

    pub fn inputs_of(&self, name: &str) -> &[String] {
        self.vertex_inputs.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn vertex_names(&self) -> Vec<String> {
        self.vertices.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn num_params(&self) -> usize {
        self.vertices.iter().map(|(_, v)| v.num_params()).sum()
    }

    /// 每个顶点的输入顶点下标（按插入顺序）
    pub(crate) fn input_indices(&self) -> Result<Vec<Vec<usize>>, ConfigError> {
        let index: HashMap<&str, usize> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, (n, _))| (n.as_str(), i))
            .collect();
        self.vertices
            .iter()
            .map(|(name, _)| {
                self.inputs_of(name)
                    .iter()
                    .map(|input| {
                        index
                            .get(input.as_str())
                            .copied()
                            .ok_or_else(|| ConfigError::UnknownInput {
                                vertex: name.clone(),
                                input: input.clone(),
                            })
                    })
                    .collect()
            })
            .collect()
    }

    pub fn topological_order(&self) -> Result<Vec<usize>, ConfigError> {
        topological_sort(&self.vertex_names(), &self.input_indices()?)
    }

    /// 结构校验（不做形状推断）
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        if self.network_outputs.is_empty() {
            return Err(ConfigError::NoOutputs);
        }

        let mut seen = HashSet::new();
        for (name, _) in &self.vertices {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::DuplicateName(name.clone()));
            }
        }
        for input in &self.network_inputs {
            if !matches!(self.vertex(input), Some(GraphVertexConfig::Input)) {
                return Err(ConfigError::UnknownInput {
                    vertex: input.clone(),
                    input: input.clone(),
                });
            }
        }
        for output in &self.network_outputs {
            if self.vertex(output).is_none() {
                return Err(ConfigError::UnknownOutput(output.clone()));
            }
        }

        for (name, vertex) in &self.vertices {
            let inputs = self.inputs_of(name);
            for input in inputs {
                if !seen.contains(input.as_str()) {
                    return Err(ConfigError::UnknownInput {
                        vertex: name.clone(),
                        input: input.clone(),
                    });
                }
            }
            let arity = vertex.arity();
            if !arity.accepts(inputs.len()) {
                return Err(ConfigError::InvalidInputCount {
                    vertex: name.clone(),
                    expected: arity.describe(),
                    got: inputs.len(),
                });
            }
            // 不依赖输入类型也能判定的非法子集范围
            if let GraphVertexConfig::Subset { from, to } = vertex {
                if from > to || *to == usize::MAX {
                    return Err(ConfigError::InputTypeMismatch {
                        vertex: name.clone(),
                        message: format!("子集范围[{from}, {to}]非法"),
                    });
                }
            }
        }

        self.topological_order()?;

        match &self.input_types {
            Some(types) if types.len() != self.network_inputs.len() => {
                Err(ConfigError::InputTypeCount {
                    expected: self.network_inputs.len(),
                    got: types.len(),
                })
            }
            _ => Ok(()),
        }
    }

    /// 层的`n_in`/`n_out`必须非零
    fn check_feature_counts(&self) -> Result<(), ConfigError> {
        for (name, vertex) in &self.vertices {
            if let GraphVertexConfig::Layer { conf, .. } = vertex {
                let field = if conf.kind.n_in() == 0 {
                    "n_in"
                } else if conf.kind.n_out() == 0 {
                    "n_out"
                } else {
                    continue;
                };
                return Err(ConfigError::MissingFeatureCount {
                    vertex: name.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 按拓扑顺序推断每个顶点的输出类型，同时补齐层的`n_in`并自动插入预处理器
    fn infer_types(&mut self) -> Result<(), ConfigError> {
        let Some(input_types) = self.input_types.clone() else {
            return Ok(());
        };
        let order = self.topological_order()?;
        let inputs = self.input_indices()?;
        let mut types: Vec<Option<InputType>> = vec![None; self.vertices.len()];

        for idx in order {
            let name = self.vertices[idx].0.clone();
            let in_types = inputs[idx]
                .iter()
                .filter_map(|&i| types[i])
                .collect::<Vec<_>>();

            let out = match &mut self.vertices[idx].1 {
                GraphVertexConfig::Input => {
                    let pos = self
                        .network_inputs
                        .iter()
                        .position(|n| *n == name)
                        .ok_or_else(|| ConfigError::UnknownInput {
                            vertex: name.clone(),
                            input: name.clone(),
                        })?;
                    input_types[pos]
                }
                GraphVertexConfig::Layer { conf, preprocessor } => {
                    if in_types.len() != 1 {
                        return Err(ConfigError::InvalidInputCount {
                            vertex: name,
                            expected: "恰好1个".to_string(),
                            got: in_types.len(),
                        });
                    }
                    if preprocessor.is_none() {
                        *preprocessor = auto_preprocessor(&name, &conf.kind, &in_types[0])?;
                    }
                    let effective = match preprocessor {
                        Some(pp) => pp.output_type(&in_types[0]).map_err(|message| {
                            ConfigError::InputTypeMismatch {
                                vertex: name.clone(),
                                message,
                            }
                        })?,
                        None => in_types[0],
                    };
                    fill_n_in(&name, conf, &effective)?;
                    GraphVertexConfig::Layer {
                        conf: conf.clone(),
                        preprocessor: *preprocessor,
                    }
                    .output_type(&name, &in_types)?
                }
                other => other.output_type(&name, &in_types)?,
            };
            types[idx] = Some(out);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    /// 从 JSON 还原并做结构校验
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let conf: Self =
            serde_json::from_str(json).map_err(|e| GraphError::Serialization(e.to_string()))?;
        conf.validate()?;
        conf.check_feature_counts()?;
        Ok(conf)
    }
}

/// 展平输入接卷积层、图像输入接全连接层时需要的预处理器
fn auto_preprocessor(
    vertex: &str,
    kind: &LayerKind,
    input: &InputType,
) -> Result<Option<InputPreProcessor>, ConfigError> {
    match (kind.is_convolution(), *input) {
        (
            false,
            InputType::Convolutional {
                height,
                width,
                channels,
            },
        ) => Ok(Some(InputPreProcessor::CnnToFeedForward {
            height,
            width,
            channels,
        })),
        (
            true,
            InputType::ConvolutionalFlat {
                height,
                width,
                channels,
            },
        ) => Ok(Some(InputPreProcessor::FeedForwardToCnn {
            height,
            width,
            channels,
        })),
        (true, InputType::FeedForward { size }) => Err(ConfigError::InputTypeMismatch {
            vertex: vertex.to_string(),
            message: format!("卷积层不能直接接收宽度为{size}的展平输入（缺少图像尺寸）"),
        }),
        _ => Ok(None),
    }
}

fn fill_n_in(vertex: &str, conf: &mut LayerConfig, input: &InputType) -> Result<(), ConfigError> {
    let actual = match (conf.kind.is_convolution(), *input) {
        (true, InputType::Convolutional { channels, .. }) => channels,
        (false, InputType::FeedForward { .. } | InputType::ConvolutionalFlat { .. }) => {
            input.feature_count()
        }
        _ => {
            return Err(ConfigError::InputTypeMismatch {
                vertex: vertex.to_string(),
                message: format!("{}层不接受输入类型{input:?}", conf.kind.name()),
            });
        }
    };
    match conf.kind.n_in() {
        0 => {
            conf.kind.set_n_in(actual);
            Ok(())
        }
        n if n == actual => Ok(()),
        n => Err(ConfigError::InputTypeMismatch {
            vertex: vertex.to_string(),
            message: format!("n_in为{n}，但输入每个样本有{actual}个特征"),
        }),
    }
}

/// 计算图构建器
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    conf: ComputationGraphConfiguration,
}

impl GraphBuilder {
    pub fn new(defaults: NeuralNetConfig) -> Self {
        Self {
            conf: ComputationGraphConfiguration {
                defaults,
                vertices: Vec::new(),
                vertex_inputs: HashMap::new(),
                network_inputs: Vec::new(),
                network_outputs: Vec::new(),
                input_types: None,
            },
        }
    }

    pub fn add_inputs(mut self, names: &[&str]) -> Self {
        for name in names {
            self.conf.network_inputs.push((*name).to_string());
            self.conf
                .vertices
                .push(((*name).to_string(), GraphVertexConfig::Input));
        }
        self
    }

    pub fn add_layer(self, name: &str, conf: LayerConfig, inputs: &[&str]) -> Self {
        self.add_vertex(name, GraphVertexConfig::layer(conf), inputs)
    }

    pub fn add_layer_with_preprocessor(
        self,
        name: &str,
        conf: LayerConfig,
        preprocessor: InputPreProcessor,
        inputs: &[&str],
    ) -> Self {
        self.add_vertex(
            name,
            GraphVertexConfig::Layer {
                conf,
                preprocessor: Some(preprocessor),
            },
            inputs,
        )
    }

    pub fn add_vertex(mut self, name: &str, vertex: GraphVertexConfig, inputs: &[&str]) -> Self {
        if vertex == GraphVertexConfig::Input {
            self.conf.network_inputs.push(name.to_string());
        }
        self.conf.vertices.push((name.to_string(), vertex));
        self.conf.vertex_inputs.insert(
            name.to_string(),
            inputs.iter().map(|s| (*s).to_string()).collect(),
        );
        self
    }

    pub fn set_outputs(mut self, names: &[&str]) -> Self {
        self.conf.network_outputs = names.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// 声明各网络输入的类型，开启形状推断与预处理器自动插入
    pub fn set_input_types(mut self, types: &[InputType]) -> Self {
        self.conf.input_types = Some(types.to_vec());
        self
    }

    pub fn build(self) -> Result<ComputationGraphConfiguration, ConfigError> {
        let mut conf = self.conf;
        conf.validate()?;
        conf.infer_types()?;
        conf.check_feature_counts()?;
        Ok(conf)
    }
}
