/// Cubic ease-in-out over `[0, 1]`. Input is clamped first.
pub fn ease(t: f64) -> f64 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_points() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(0.5), 0.5);
        assert_eq!(ease(1.0), 1.0);
    }

    #[test]
    fn clamps_out_of_range_and_nan() {
        assert_eq!(ease(-1.0), 0.0);
        assert_eq!(ease(3.0), 1.0);
        assert_eq!(ease(f64::NAN), 0.0);
    }

    #[test]
    fn monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = ease(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }
}
