use std::fmt;

use crate::tensor::Tensor;

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let shape = self.shape();
        match shape.len() {
            0 => writeln!(f, "{:8.4}", self.number().unwrap_or(f32::NAN))?,
            1 => {
                let row = self.data.iter().map(|v| format!("{v:8.4}")).collect::<Vec<_>>();
                writeln!(f, "[{}]", row.join(", "))?;
            }
            2 => {
                write!(f, "[")?;
                for (i, row) in self.data.outer_iter().enumerate() {
                    if i > 0 {
                        write!(f, "\n ")?;
                    }
                    let row = row.iter().map(|v| format!("{v:8.4}")).collect::<Vec<_>>();
                    write!(f, "[{}]", row.join(", "))?;
                }
                writeln!(f, "]")?;
            }
            _ => writeln!(f, "<阶数大于二的张量不展示具体数据>")?,
        }
        write!(f, "形状: {shape:?}")
    }
}
