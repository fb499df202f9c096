//! Time-varying source waveforms.
//!
//! Independent sources carry a waveform descriptor evaluated at the
//! requested time during transient analysis; DC analysis uses the
//! waveform's operating-point value.

use std::f64::consts::PI;

/// A source waveform specification.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Waveform {
    /// Constant value, time-independent.
    Dc(f64),

    /// Sinusoid: `offset + amplitude * exp(-damping*t) * sin(2πf·t + phase)`,
    /// held at `offset` until `delay`.
    Sin {
        offset: f64,
        amplitude: f64,
        freq: f64,
        delay: f64,
        damping: f64,
        phase_deg: f64,
    },

    /// Single or periodic pulse: rise from `initial` to `pulsed`, hold for
    /// `width`, fall back. `period == 0` means a single pulse.
    Pulse {
        initial: f64,
        pulsed: f64,
        delay: f64,
        rise: f64,
        fall: f64,
        width: f64,
        period: f64,
    },

    /// Piecewise linear interpolation between (time, value) points sorted by
    /// time; clamped to the first/last value outside the range.
    Pwl { points: Vec<(f64, f64)> },
}

impl Waveform {
    /// A constant waveform.
    pub fn dc(value: f64) -> Self {
        Waveform::Dc(value)
    }

    /// An undamped, undelayed sinusoid.
    pub fn sin(offset: f64, amplitude: f64, freq: f64) -> Self {
        Waveform::Sin {
            offset,
            amplitude,
            freq,
            delay: 0.0,
            damping: 0.0,
            phase_deg: 0.0,
        }
    }

    /// A step from `initial` to `pulsed` at `t = delay` (instant edges, no
    /// return). Convenience for step-response tests.
    pub fn step(initial: f64, pulsed: f64, delay: f64) -> Self {
        Waveform::Pulse {
            initial,
            pulsed,
            delay,
            rise: 0.0,
            fall: 0.0,
            width: f64::INFINITY,
            period: 0.0,
        }
    }

    /// A full pulse train.
    pub fn pulse(
        initial: f64,
        pulsed: f64,
        delay: f64,
        rise: f64,
        fall: f64,
        width: f64,
        period: f64,
    ) -> Self {
        Waveform::Pulse {
            initial,
            pulsed,
            delay,
            rise,
            fall,
            width,
            period,
        }
    }

    /// A piecewise linear waveform.
    pub fn pwl(points: Vec<(f64, f64)>) -> Self {
        Waveform::Pwl { points }
    }

    /// Evaluate the waveform at a given time.
    pub fn value_at(&self, time: f64) -> f64 {
        match self {
            Waveform::Dc(v) => *v,
            Waveform::Sin {
                offset,
                amplitude,
                freq,
                delay,
                damping,
                phase_deg,
            } => {
                if time < *delay {
                    return *offset;
                }
                let t = time - delay;
                let decay = if *damping > 0.0 {
                    (-damping * t).exp()
                } else {
                    1.0
                };
                offset + amplitude * decay * (2.0 * PI * freq * t + phase_deg.to_radians()).sin()
            }
            Waveform::Pulse {
                initial,
                pulsed,
                delay,
                rise,
                fall,
                width,
                period,
            } => {
                if time < *delay {
                    return *initial;
                }
                let t = if *period > 0.0 {
                    (time - delay) % period
                } else {
                    time - delay
                };
                if t < *rise {
                    initial + (pulsed - initial) * t / rise
                } else if t < rise + width {
                    *pulsed
                } else if t < rise + width + fall {
                    pulsed - (pulsed - initial) * (t - rise - width) / fall
                } else {
                    *initial
                }
            }
            Waveform::Pwl { points } => eval_pwl(points, time),
        }
    }

    /// The value used for the DC operating point: the pre-delay level for
    /// pulses and sinusoids, the first point for PWL.
    pub fn dc_value(&self) -> f64 {
        match self {
            Waveform::Dc(v) => *v,
            Waveform::Sin { offset, .. } => *offset,
            Waveform::Pulse { initial, .. } => *initial,
            Waveform::Pwl { points } => points.first().map(|&(_, v)| v).unwrap_or(0.0),
        }
    }
}

fn eval_pwl(points: &[(f64, f64)], t: f64) -> f64 {
    let Some(&(t_first, v_first)) = points.first() else {
        return 0.0;
    };
    if t <= t_first {
        return v_first;
    }
    let &(t_last, v_last) = points.last().unwrap();
    if t >= t_last {
        return v_last;
    }
    for pair in points.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if t >= t0 && t <= t1 {
            return v0 + (v1 - v0) * (t - t0) / (t1 - t0);
        }
    }
    v_last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dc() {
        let w = Waveform::dc(5.0);
        assert_eq!(w.value_at(0.0), 5.0);
        assert_eq!(w.value_at(1.0), 5.0);
        assert_eq!(w.dc_value(), 5.0);
    }

    #[test]
    fn test_step() {
        let w = Waveform::step(0.0, 5.0, 0.0);
        assert_eq!(w.dc_value(), 0.0);
        assert_eq!(w.value_at(0.0), 5.0);
        assert_eq!(w.value_at(1.0), 5.0);
    }

    #[test]
    fn test_pulse_shape() {
        // 0→5 V, 1 ms delay, 0.1 ms edges, 1 ms width, 5 ms period
        let w = Waveform::pulse(0.0, 5.0, 1e-3, 0.1e-3, 0.1e-3, 1e-3, 5e-3);

        assert_eq!(w.value_at(0.5e-3), 0.0);
        assert!((w.value_at(1.05e-3) - 2.5).abs() < 1e-10); // mid-rise
        assert!((w.value_at(1.5e-3) - 5.0).abs() < 1e-10); // high
        assert!((w.value_at(2.5e-3) - 0.0).abs() < 1e-10); // after fall
        assert!((w.value_at(6.05e-3) - 2.5).abs() < 1e-10); // next period
    }

    #[test]
    fn test_sin() {
        let w = Waveform::sin(0.0, 1.0, 1000.0);
        assert!((w.value_at(0.0)).abs() < 1e-10);
        assert!((w.value_at(0.25e-3) - 1.0).abs() < 1e-10);
        assert!((w.value_at(0.75e-3) + 1.0).abs() < 1e-10);
        assert_eq!(w.dc_value(), 0.0);
    }

    #[test]
    fn test_pwl() {
        let w = Waveform::pwl(vec![(0.0, 0.0), (1e-3, 5.0), (2e-3, 5.0), (3e-3, 0.0)]);
        assert!((w.value_at(0.5e-3) - 2.5).abs() < 1e-10);
        assert!((w.value_at(1.5e-3) - 5.0).abs() < 1e-10);
        assert!((w.value_at(2.5e-3) - 2.5).abs() < 1e-10);
        assert!((w.value_at(5e-3) - 0.0).abs() < 1e-10); // hold last
        assert_eq!(w.dc_value(), 0.0);
    }
}
