/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 扁平缓冲区：一块连续的 f32 存储 + 每个顶点的下标区间。
 *                 顶点的“视图”只是区间，从不另行分配；缓冲区是参数/梯度的唯一所有者
 */

use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FlatArena {
    buffer: Vec<f32>,
    /// 按顶点下标索引
    ranges: Vec<Range<usize>>,
}

impl FlatArena {
    /// 按拓扑顺序依次排布各顶点：偏移是前面顶点参数个数的累加
    pub(crate) fn layout(order: &[usize], counts: &[usize]) -> Vec<Range<usize>> {
        let mut ranges = vec![0..0; counts.len()];
        let mut offset = 0;
        for &idx in order {
            ranges[idx] = offset..offset + counts[idx];
            offset += counts[idx];
        }
        ranges
    }

    pub(crate) fn new(buffer: Vec<f32>, ranges: Vec<Range<usize>>) -> Self {
        debug_assert_eq!(
            buffer.len(),
            ranges.iter().map(|r| r.len()).sum::<usize>(),
            "扁平缓冲区长度须等于各视图长度之和"
        );
        Self { buffer, ranges }
    }

    pub(crate) fn zeros(ranges: Vec<Range<usize>>) -> Self {
        let len = ranges.iter().map(|r| r.len()).sum();
        Self::new(vec![0.0; len], ranges)
    }

    pub(crate) fn range(&self, vertex: usize) -> Range<usize> {
        self.ranges[vertex].clone()
    }

    pub(crate) fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub(crate) fn view(&self, vertex: usize) -> &[f32] {
        &self.buffer[self.range(vertex)]
    }

    pub(crate) fn view_mut(&mut self, vertex: usize) -> &mut [f32] {
        let range = self.range(vertex);
        &mut self.buffer[range]
    }

    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut [f32] {
        &mut self.buffer
    }

    pub(crate) fn fill(&mut self, value: f32) {
        self.buffer.iter_mut().for_each(|v| *v = value);
    }
}
