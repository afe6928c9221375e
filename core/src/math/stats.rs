pub struct StatsHelper;

impl StatsHelper {
    /// Arithmetic mean; an empty slice yields zero.
    pub fn mean<'a, I>(samples: I) -> f64
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let (sum, count) = samples
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), &v| (sum + v, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }

    /// Rounds to three decimal digits, the precision carried on the wire.
    pub fn round3(value: f64) -> f64 {
        (value * 1000.0).round() / 1000.0
    }
}
