//! Small numeric helpers shared by the scorers

use harmony_core::AudioFeatureVector;

/// Mean of one feature across `vectors`, 0.0 when empty.
pub(crate) fn mean_of<F>(vectors: &[AudioFeatureVector], feature: F) -> f64
where
    F: Fn(&AudioFeatureVector) -> f64,
{
    if vectors.is_empty() {
        return 0.0;
    }
    vectors.iter().map(feature).sum::<f64>() / vectors.len() as f64
}

/// Population standard deviation of one feature, 0.0 when empty.
pub(crate) fn std_dev_of<F>(vectors: &[AudioFeatureVector], feature: F) -> f64
where
    F: Fn(&AudioFeatureVector) -> f64,
{
    if vectors.is_empty() {
        return 0.0;
    }
    let mean = mean_of(vectors, &feature);
    let variance = vectors
        .iter()
        .map(|v| {
            let d = feature(v) - mean;
            d * d
        })
        .sum::<f64>()
        / vectors.len() as f64;
    variance.sqrt()
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn energies(values: &[f64]) -> Vec<AudioFeatureVector> {
        values
            .iter()
            .map(|&energy| AudioFeatureVector {
                energy,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn std_dev_is_population() {
        // values 0.2, 0.4, 0.6 -> mean 0.4, variance (0.04+0+0.04)/3
        let v = energies(&[0.2, 0.4, 0.6]);
        let expected = (0.08f64 / 3.0).sqrt();
        assert!((std_dev_of(&v, |v| v.energy) - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_are_zero() {
        assert_eq!(mean_of(&[], |v| v.energy), 0.0);
        assert_eq!(std_dev_of(&[], |v| v.energy), 0.0);
    }

    #[test]
    fn round1_rounds_half_up() {
        assert_eq!(round1(4.25), 4.3);
        assert_eq!(round1(4.24), 4.2);
    }
}
