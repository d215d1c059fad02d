/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 计算图的保存/加载
 *
 * - save_params/load_params：扁平参数缓冲区的二进制读写（bincode）
 * - save_model/load_model：配置 JSON + 参数 bin 两个文件
 */

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::{ComputationGraph, GraphError};
use crate::nn::ComputationGraphConfiguration;

impl ComputationGraph {
    /// 把扁平参数缓冲区写入二进制文件
    pub fn save_params<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        self.ensure_initialized()?;
        let file = File::create(path).map_err(|e| GraphError::io(path, e))?;
        bincode::serialize_into(BufWriter::new(file), self.params())
            .map_err(|e| GraphError::Serialization(format!("写入参数文件{}失败: {e}", path.display())))
    }

    /// 从二进制文件读取参数并覆盖扁平参数缓冲区（长度须一致）
    pub fn load_params<P: AsRef<Path>>(&mut self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        self.init()?;
        let file = File::open(path).map_err(|e| GraphError::io(path, e))?;
        let params: Vec<f32> = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| GraphError::Serialization(format!("解析参数文件{}失败: {e}", path.display())))?;
        self.set_params(&params)
    }

    /// 保存完整模型：自动生成两个文件
    /// - `{path}.json`: 网络配置（可读）
    /// - `{path}.bin`: 参数数据（紧凑）
    ///
    /// # 示例
    /// ```ignore
    /// graph.save_model("models/xor")?;
    /// // 生成：models/xor.json + models/xor.bin
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        let json_path = path.with_extension("json");
        self.save_params(path.with_extension("bin"))?;
        std::fs::write(&json_path, self.conf.to_json()?).map_err(|e| GraphError::io(&json_path, e))
    }

    /// 从`save_model`生成的两个文件重建网络
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let json_path = path.with_extension("json");
        let json = std::fs::read_to_string(&json_path).map_err(|e| GraphError::io(&json_path, e))?;
        let conf = ComputationGraphConfiguration::from_json(&json)?;

        let mut graph = Self::new(conf);
        graph.init()?;
        graph.load_params(path.with_extension("bin"))?;
        Ok(graph)
    }
}
