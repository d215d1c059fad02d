mod genome;
mod metaoptimizer;
mod trainer;

use crate::genetic::Genome;

pub(super) fn evaluated(id: u64, params: &[f32], fitness: f32) -> Genome {
    Genome {
        id,
        params: params.to_vec(),
        fitness: Some(fitness),
    }
}
