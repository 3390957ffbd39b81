use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Result of sample selection for one tool invocation.
///
/// `All` is a sentinel meaning "process everything": the sampling step is
/// skipped entirely, which also avoids spurious identity loss at small
/// population sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleSet {
    All,
    Subset(Vec<String>),
}

/// Choose a subset of base identities, by explicit count or by ratio.
///
/// `count` takes precedence when both are given. `count <= 0` or
/// `ratio <= 0` selects nothing; `count >= N` or `ratio >= 1.0` selects
/// everything; otherwise `max(1, floor(ratio * N))` identities are drawn
/// without replacement. The population is sorted before the draw and the
/// chosen subset is sorted before return, so results never depend on
/// filesystem iteration order. A seeded draw is fully deterministic; the
/// generator is constructed locally per call, never shared.
pub fn select_samples(
    population: &[String],
    ratio: Option<f32>,
    count: Option<usize>,
    seed: Option<u64>,
) -> SampleSet {
    let mut pool: Vec<String> = population.to_vec();
    pool.sort();
    let total = pool.len();

    let amount = if let Some(count) = count {
        if count == 0 {
            return SampleSet::Subset(Vec::new());
        }
        if count >= total {
            return SampleSet::All;
        }
        count
    } else if let Some(ratio) = ratio {
        if ratio <= 0.0 {
            return SampleSet::Subset(Vec::new());
        }
        if ratio >= 1.0 || total == 0 {
            return SampleSet::All;
        }
        ((total as f32 * ratio).floor() as usize).max(1)
    } else {
        return SampleSet::All;
    };

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut chosen: Vec<String> = index::sample(&mut rng, total, amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect();
    chosen.sort();
    SampleSet::Subset(chosen)
}
