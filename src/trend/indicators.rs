//! Technical indicators over Decimal series
//!
//! Pure functions; all series are ordered oldest to newest.

use rust_decimal::Decimal;

/// Simple moving average of the last `period` values
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: Decimal = values[values.len() - period..].iter().copied().sum();
    Some(sum / Decimal::from(period))
}

/// Exponential moving average, seeded with the SMA of the first `period`
pub fn ema(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let multiplier = Decimal::from(2) / Decimal::from(period + 1);
    let seed: Decimal = values[..period].iter().copied().sum::<Decimal>() / Decimal::from(period);
    let ema = values[period..]
        .iter()
        .fold(seed, |acc, &v| (v - acc) * multiplier + acc);
    Some(ema)
}

/// Relative strength index with Wilder smoothing
///
/// Returns the neutral value 50 when the series is too short, and 100 when
/// there are no losses in the smoothed window.
pub fn rsi(closes: &[Decimal], period: usize) -> Decimal {
    let neutral = Decimal::from(50);
    if period == 0 || closes.len() < period + 1 {
        return neutral;
    }

    let deltas: Vec<Decimal> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<Decimal> = deltas
        .iter()
        .map(|&d| if d > Decimal::ZERO { d } else { Decimal::ZERO })
        .collect();
    let losses: Vec<Decimal> = deltas
        .iter()
        .map(|&d| if d < Decimal::ZERO { -d } else { Decimal::ZERO })
        .collect();

    let p = Decimal::from(period);
    let mut avg_gain: Decimal = gains[..period].iter().copied().sum::<Decimal>() / p;
    let mut avg_loss: Decimal = losses[..period].iter().copied().sum::<Decimal>() / p;

    for i in period..deltas.len() {
        avg_gain = (avg_gain * (p - Decimal::ONE) + gains[i]) / p;
        avg_loss = (avg_loss * (p - Decimal::ONE) + losses[i]) / p;
    }

    if avg_loss.is_zero() {
        return Decimal::from(100);
    }

    let rs = avg_gain / avg_loss;
    Decimal::from(100) - Decimal::from(100) / (Decimal::ONE + rs)
}
