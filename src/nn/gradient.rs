/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 梯度：参数变量名 -> 梯度张量的有序映射，附带可选的扁平梯度与每个变量的展平顺序。
 *                 从扁平缓冲区还原时必须用写入时的顺序，否则反向传播会被悄悄写坏
 */

use std::collections::HashMap;

use crate::tensor::{Order, Tensor};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gradient {
    /// 保持插入顺序
    entries: Vec<(String, Tensor)>,
    orders: HashMap<String, Order>,
    flattened: Option<Vec<f32>>,
}

impl Gradient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置（或覆盖）一个变量的梯度；`order`为`None`时沿用已有标记（默认'c'）
    pub fn set_gradient_for(&mut self, key: &str, gradient: Tensor, order: Option<Order>) {
        if let Some(order) = order {
            self.orders.insert(key.to_string(), order);
        }
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, g)) => *g = gradient,
            None => self.entries.push((key.to_string(), gradient)),
        }
    }

    pub fn get_gradient_for(&self, key: &str) -> Option<&Tensor> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, g)| g)
    }

    /// 变量的展平顺序，未标记时为行优先
    pub fn flattening_order_for(&self, key: &str) -> Order {
        self.orders.get(key).copied().unwrap_or_default()
    }

    /// 按插入顺序遍历
    pub fn gradient_for_variable(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(k, g)| (k.as_str(), g))
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_flattened(&mut self, flattened: Vec<f32>) {
        self.flattened = Some(flattened);
    }

    pub fn flattened(&self) -> Option<&[f32]> {
        self.flattened.as_deref()
    }

    /// 把另一个（单个顶点的）梯度并入，键名加上顶点名前缀：`<vertex>_<key>`
    pub fn merge_qualified(&mut self, vertex: &str, other: Self) {
        for (key, gradient) in other.entries {
            let order = other.orders.get(&key).copied();
            self.set_gradient_for(&format!("{vertex}_{key}"), gradient, order);
        }
    }
}
