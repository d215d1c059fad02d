/*
 * @Author       : 老董
 * @Date         : 2025-07-24 16:30:00
 * @LastEditors  : 老董
 * @LastEditTime : 2026-03-02
 * @Description  : 更新器：在步进函数使用梯度之前，对每个参数变量的原始梯度做变换。
 *                 顺序固定为：注入 L1/L2 惩罚 → 按批大小平均 → 学习率/动量等规则
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ParamSpec;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Updater {
    /// 梯度乘以学习率
    #[default]
    Sgd,
    Nesterovs {
        momentum: f32,
    },
    AdaGrad {
        epsilon: f32,
    },
    RmsProp {
        decay: f32,
        epsilon: f32,
    },
    Adam {
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    /// 原样使用梯度（不乘学习率）
    NoOp,
}

impl Updater {
    pub const fn nesterovs() -> Self {
        Self::Nesterovs { momentum: 0.9 }
    }

    pub const fn adagrad() -> Self {
        Self::AdaGrad { epsilon: 1e-6 }
    }

    pub const fn adam() -> Self {
        Self::Adam {
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// 单个参数变量的历史状态
#[derive(Debug, Clone)]
enum UpdaterState {
    /// Nesterov 速度
    Velocity(Vec<f32>),
    /// AdaGrad 的梯度平方累计 / RMSProp 的滑动平均
    History(Vec<f32>),
    /// Adam 的一阶、二阶矩估计与时间步
    Moments { m: Vec<f32>, v: Vec<f32>, t: i32 },
}

/// 按参数变量（键）保存状态的梯度更新器
#[derive(Debug, Clone, Default)]
pub struct GradientUpdater {
    state: HashMap<String, UpdaterState>,
}

impl GradientUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清空所有历史状态
    pub fn reset(&mut self) {
        self.state.clear();
    }

    /// 原地把`gradient`变换为更新量（之后由步进函数从参数中减去）
    pub fn update(
        &mut self,
        spec: &ParamSpec,
        params: &[f32],
        gradient: &mut [f32],
        batch_size: usize,
        minibatch: bool,
    ) {
        if spec.regularized && (spec.l1 != 0.0 || spec.l2 != 0.0) {
            for (g, &w) in gradient.iter_mut().zip(params) {
                *g += spec.l2 * w + spec.l1 * w.signum() * f32::from(w != 0.0);
            }
        }
        if minibatch && batch_size > 1 {
            let scale = 1.0 / batch_size as f32;
            gradient.iter_mut().for_each(|g| *g *= scale);
        }

        let lr = spec.learning_rate;
        let n = gradient.len();
        match spec.updater {
            Updater::Sgd => gradient.iter_mut().for_each(|g| *g *= lr),
            Updater::NoOp => {}
            Updater::Nesterovs { momentum } => {
                let state = self
                    .state
                    .entry(spec.key.clone())
                    .or_insert_with(|| UpdaterState::Velocity(vec![0.0; n]));
                if let UpdaterState::Velocity(v) = state {
                    for (g, v) in gradient.iter_mut().zip(v.iter_mut()) {
                        let v_prev = *v;
                        *v = momentum * *v - lr * *g;
                        *g = momentum * v_prev - (1.0 + momentum) * *v;
                    }
                }
            }
            Updater::AdaGrad { epsilon } => {
                let state = self
                    .state
                    .entry(spec.key.clone())
                    .or_insert_with(|| UpdaterState::History(vec![0.0; n]));
                if let UpdaterState::History(h) = state {
                    for (g, h) in gradient.iter_mut().zip(h.iter_mut()) {
                        *h += *g * *g;
                        *g = lr * *g / (h.sqrt() + epsilon);
                    }
                }
            }
            Updater::RmsProp { decay, epsilon } => {
                let state = self
                    .state
                    .entry(spec.key.clone())
                    .or_insert_with(|| UpdaterState::History(vec![0.0; n]));
                if let UpdaterState::History(c) = state {
                    for (g, c) in gradient.iter_mut().zip(c.iter_mut()) {
                        *c = decay * *c + (1.0 - decay) * *g * *g;
                        *g = lr * *g / (*c + epsilon).sqrt();
                    }
                }
            }
            Updater::Adam {
                beta1,
                beta2,
                epsilon,
            } => {
                let state = self
                    .state
                    .entry(spec.key.clone())
                    .or_insert_with(|| UpdaterState::Moments {
                        m: vec![0.0; n],
                        v: vec![0.0; n],
                        t: 0,
                    });
                if let UpdaterState::Moments { m, v, t } = state {
                    *t += 1;
                    // 偏差修正
                    let bias1 = 1.0 - beta1.powi(*t);
                    let bias2 = 1.0 - beta2.powi(*t);
                    for ((g, m), v) in gradient.iter_mut().zip(m.iter_mut()).zip(v.iter_mut()) {
                        *m = beta1 * *m + (1.0 - beta1) * *g;
                        *v = beta2 * *v + (1.0 - beta2) * *g * *g;
                        let m_hat = *m / bias1;
                        let v_hat = *v / bias2;
                        *g = lr * m_hat / (v_hat.sqrt() + epsilon);
                    }
                }
            }
        }
    }
}
