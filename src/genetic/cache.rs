/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 分区键值缓存。节点之间的一切数据交换都经由这里：
 *                 写入的是序列化后的快照，读出的是一份拷贝，远端永远不会原地修改对方的数据。
 *                 单个键的读写是原子的，这也是遗传训练器唯一依赖的同步手段。
 */

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::GaError;

/// 缓存节点编号
pub type NodeId = usize;

/// 网格缓存的最小接口：按键读写字节快照，以及键到节点的亲和映射
pub trait GridCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, value: Vec<u8>);
    /// 批量写入；每个键各自原子，整批不保证原子
    fn put_all(&self, entries: Vec<(String, Vec<u8>)>);
    fn remove(&self, key: &str) -> Option<Vec<u8>>;
    /// 键所在（主）节点
    fn affinity(&self, key: &str) -> NodeId;
    /// 集群中的节点个数
    fn nodes(&self) -> usize;
}

/// 进程内的网格缓存：每个节点一个分区，每个分区一把读写锁
pub struct LocalGrid {
    partitions: Vec<RwLock<HashMap<String, Vec<u8>>>>,
}

impl LocalGrid {
    /// 节点数至少为1
    pub fn new(nodes: usize) -> Self {
        let nodes = nodes.max(1);
        Self {
            partitions: (0..nodes).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn partition(&self, key: &str) -> &RwLock<HashMap<String, Vec<u8>>> {
        &self.partitions[self.affinity(key)]
    }

    /// 所有分区中键的总数
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl GridCache for LocalGrid {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.partition(key).read().get(key).cloned()
    }

    fn put(&self, key: &str, value: Vec<u8>) {
        self.partition(key).write().insert(key.to_owned(), value);
    }

    fn put_all(&self, entries: Vec<(String, Vec<u8>)>) {
        let mut grouped: Vec<Vec<(String, Vec<u8>)>> = vec![Vec::new(); self.partitions.len()];
        for (key, value) in entries {
            grouped[self.affinity(&key)].push((key, value));
        }
        for (partition, group) in self.partitions.iter().zip(grouped) {
            if group.is_empty() {
                continue;
            }
            partition.write().extend(group);
        }
    }

    fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.partition(key).write().remove(key)
    }

    fn affinity(&self, key: &str) -> NodeId {
        (key_hash(key) % self.partitions.len() as u64) as NodeId
    }

    fn nodes(&self) -> usize {
        self.partitions.len()
    }
}

// DefaultHasher::new() 的密钥固定，同一个键在所有实例上落到同一节点
fn key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// 读取并用 bincode 解码；键不存在时返回`MissingKey`
pub fn get_typed<T: DeserializeOwned>(cache: &dyn GridCache, key: &str) -> Result<T, GaError> {
    let bytes = cache.get(key).ok_or_else(|| GaError::MissingKey(key.to_owned()))?;
    Ok(bincode::deserialize(&bytes)?)
}

pub fn put_typed<T: Serialize + ?Sized>(cache: &dyn GridCache, key: &str, value: &T) -> Result<(), GaError> {
    cache.put(key, bincode::serialize(value)?);
    Ok(())
}

/*  缓存键的命名约定  */

pub fn context_key(training_id: &str) -> String {
    format!("{training_id}/context")
}

pub fn population_key(training_id: &str, slot: usize) -> String {
    format!("{training_id}/population/{slot}")
}

pub fn best_key(training_id: &str) -> String {
    format!("{training_id}/best")
}

pub fn batch_key(training_id: &str, index: usize) -> String {
    format!("{training_id}/batch/{index}")
}
