/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 顶点的拓扑排序（Kahn 算法）。
 *                 就绪队列先进先出，初始就绪的顶点按插入顺序入队，保证参数缓冲区布局可复现
 */

use std::collections::VecDeque;

use super::error::ConfigError;

/// `inputs[i]`是顶点`i`的上游顶点下标（可重复，如同一顶点两次接入）。
/// 返回的顺序中每个顶点都排在其所有上游顶点之后；存在环时报错并给出环上的一个顶点
pub(crate) fn topological_sort(
    names: &[String],
    inputs: &[Vec<usize>],
) -> Result<Vec<usize>, ConfigError> {
    let n = names.len();
    let mut in_degree = vec![0usize; n];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (vertex, ins) in inputs.iter().enumerate() {
        for &input in ins {
            in_degree[vertex] += 1;
            consumers[input].push(vertex);
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(current) = ready.pop_front() {
        order.push(current);
        for &consumer in &consumers[current] {
            in_degree[consumer] -= 1;
            if in_degree[consumer] == 0 {
                ready.push_back(consumer);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    // 从任一未解析的顶点出发，沿未解析的上游一直回溯，第一次重复访问到的顶点必在环上
    let start = (0..n).find(|&i| in_degree[i] > 0).unwrap_or(0);
    let mut visited = vec![false; n];
    let mut current = start;
    while !visited[current] {
        visited[current] = true;
        match inputs[current].iter().find(|&&i| in_degree[i] > 0) {
            Some(&next) => current = next,
            None => break,
        }
    }
    Err(ConfigError::CycleDetected {
        vertex: names[current].clone(),
    })
}
