use rand::Rng;

/// Format seconds as `M:SS`, rounding half up to the nearest second.
pub fn convert_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        (seconds + 0.5).floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Shuffled copy of `items`; the input is left as is.
pub fn shuffle<T: Clone>(items: &[T]) -> Vec<T> {
    shuffle_with(items, &mut rand::rng())
}

/// Fisher-Yates over a copy of `items` using `rng`.
pub fn shuffle_with<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.random_range(0..=i);
        out.swap(i, j);
    }
    out
}
