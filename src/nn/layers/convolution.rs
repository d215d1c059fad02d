/*
 * @Author       : 老董
 * @Date         : 2026-03-02
 * @Description  : 二维卷积层（NCHW），朴素循环实现。
 *                 W 形状`[n_out, n_in, kh, kw]`按行优先存放，b 形状`[1, n_out]`
 */

use rand::rngs::StdRng;

use super::{Layer, ParamLayout, init_weights_and_bias, not_activated};
use crate::nn::conf::{LayerKind, LayerSettings, conv_output_size};
use crate::nn::{Gradient, GraphError};
use crate::tensor::{Order, Tensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConvGeometry {
    batch: usize,
    in_h: usize,
    in_w: usize,
    out_h: usize,
    out_w: usize,
}

#[derive(Debug, Clone)]
pub struct ConvolutionLayer {
    settings: LayerSettings,
    layout: ParamLayout,
    n_in: usize,
    n_out: usize,
    kernel: [usize; 2],
    stride: [usize; 2],
    padding: [usize; 2],
    input: Option<Tensor>,
    pre_output: Option<Tensor>,
}

impl ConvolutionLayer {
    pub fn new(settings: LayerSettings) -> Self {
        let (n_in, n_out, kernel, stride, padding) = match settings.kind {
            LayerKind::Convolution {
                n_in,
                n_out,
                kernel,
                stride,
                padding,
            } => (n_in, n_out, kernel, stride, padding),
            ref other => (other.n_in(), other.n_out(), [1, 1], [1, 1], [0, 0]),
        };
        let layout = ParamLayout::new()
            .with_slot("W", &[n_out, n_in, kernel[0], kernel[1]], Order::C, true)
            .with_slot("b", &[1, n_out], Order::C, false);
        Self {
            settings,
            layout,
            n_in,
            n_out,
            kernel,
            stride,
            padding,
            input: None,
            pre_output: None,
        }
    }

    fn geometry(&self, input: &Tensor) -> Result<ConvGeometry, GraphError> {
        let shape = input.shape();
        if shape.len() != 4 || shape[1] != self.n_in {
            return Err(GraphError::ShapeMismatch {
                expected: vec![shape.first().copied().unwrap_or(0), self.n_in, 0, 0],
                got: shape.to_vec(),
                message: "卷积层的输入须为[batch, n_in, height, width]".to_string(),
            });
        }
        let (out_h, out_w) =
            conv_output_size(shape[2], shape[3], self.kernel, self.stride, self.padding)
                .map_err(GraphError::InvalidArgument)?;
        Ok(ConvGeometry {
            batch: shape[0],
            in_h: shape[2],
            in_w: shape[3],
            out_h,
            out_w,
        })
    }

    /// 输出位置(oy, ox)与核位置(ky, kx)对应的输入坐标；落在填充区时返回 None
    fn input_coord(&self, g: &ConvGeometry, oy: usize, ox: usize, ky: usize, kx: usize) -> Option<(usize, usize)> {
        let iy = (oy * self.stride[0] + ky).checked_sub(self.padding[0])?;
        let ix = (ox * self.stride[1] + kx).checked_sub(self.padding[1])?;
        (iy < g.in_h && ix < g.in_w).then_some((iy, ix))
    }
}

impl Layer for ConvolutionLayer {
    fn layer_type(&self) -> &'static str {
        "Convolution"
    }

    fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    fn param_layout(&self) -> &ParamLayout {
        &self.layout
    }

    fn init_params(&self, view: &mut [f32], rng: &mut StdRng) -> Result<(), GraphError> {
        let area = self.kernel[0] * self.kernel[1];
        init_weights_and_bias(
            &self.layout,
            &self.settings,
            self.n_in * area,
            self.n_out * area,
            view,
            rng,
        )
    }

    fn activate(&mut self, input: &Tensor, params: &[f32], _training: bool) -> Result<Tensor, GraphError> {
        let g = self.geometry(input)?;
        let x = input.to_vec();
        let w = self.layout.view("W", params)?;
        let b = self.layout.view("b", params)?;
        let [kh, kw] = self.kernel;

        let mut z = vec![0.0; g.batch * self.n_out * g.out_h * g.out_w];
        for n in 0..g.batch {
            for o in 0..self.n_out {
                for oy in 0..g.out_h {
                    for ox in 0..g.out_w {
                        let mut acc = b[o];
                        for c in 0..self.n_in {
                            for ky in 0..kh {
                                for kx in 0..kw {
                                    if let Some((iy, ix)) = self.input_coord(&g, oy, ox, ky, kx) {
                                        let xi = ((n * self.n_in + c) * g.in_h + iy) * g.in_w + ix;
                                        let wi = ((o * self.n_in + c) * kh + ky) * kw + kx;
                                        acc += x[xi] * w[wi];
                                    }
                                }
                            }
                        }
                        z[((n * self.n_out + o) * g.out_h + oy) * g.out_w + ox] = acc;
                    }
                }
            }
        }

        let z = Tensor::new(&z, &[g.batch, self.n_out, g.out_h, g.out_w]);
        self.input = Some(input.clone());
        self.pre_output = Some(z.clone());
        Ok(self.settings.activation.activate(&z))
    }

    fn backprop_gradient(
        &mut self,
        epsilon: Option<&Tensor>,
        params: &[f32],
    ) -> Result<(Gradient, Tensor), GraphError> {
        let input = self.input.as_ref().ok_or_else(|| not_activated("Convolution"))?;
        let z = self.pre_output.as_ref().ok_or_else(|| not_activated("Convolution"))?;
        let epsilon = epsilon.ok_or_else(|| {
            GraphError::InvalidState("无法反向传播：Convolution层的误差未设置".to_string())
        })?;
        if !epsilon.is_same_shape(z) {
            return Err(GraphError::ShapeMismatch {
                expected: z.shape().to_vec(),
                got: epsilon.shape().to_vec(),
                message: "误差须与层输出形状一致".to_string(),
            });
        }

        let g = self.geometry(input)?;
        let delta = self.settings.activation.backprop(z, epsilon).to_vec();
        let x = input.to_vec();
        let w = self.layout.view("W", params)?;
        let [kh, kw] = self.kernel;

        let mut dw = vec![0.0; w.len()];
        let mut db = vec![0.0; self.n_out];
        let mut dx = vec![0.0; x.len()];
        for n in 0..g.batch {
            for o in 0..self.n_out {
                for oy in 0..g.out_h {
                    for ox in 0..g.out_w {
                        let d = delta[((n * self.n_out + o) * g.out_h + oy) * g.out_w + ox];
                        db[o] += d;
                        for c in 0..self.n_in {
                            for ky in 0..kh {
                                for kx in 0..kw {
                                    if let Some((iy, ix)) = self.input_coord(&g, oy, ox, ky, kx) {
                                        let xi = ((n * self.n_in + c) * g.in_h + iy) * g.in_w + ix;
                                        let wi = ((o * self.n_in + c) * kh + ky) * kw + kx;
                                        dw[wi] += d * x[xi];
                                        dx[xi] += d * w[wi];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        let mut gradient = Gradient::new();
        gradient.set_gradient_for(
            "W",
            Tensor::new(&dw, &[self.n_out, self.n_in, kh, kw]),
            Some(Order::C),
        );
        gradient.set_gradient_for("b", Tensor::new(&db, &[1, self.n_out]), Some(Order::C));
        Ok((gradient, Tensor::new(&dx, input.shape())))
    }

    fn clear(&mut self) {
        self.input = None;
        self.pre_output = None;
    }
}
