//! Oscillator presets for the sound cues, rendered to mono `f32` PCM.

use std::f32::consts::TAU;

use shared::domain::SoundCue;

pub const SAMPLE_RATE: u32 = 44_100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One period over `phase` in `[0, 1)`, amplitude 1.
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamEvent {
    Set { at: f32, value: f32 },
    LinearTo { end: f32, value: f32 },
    ExponentialTo { end: f32, value: f32 },
}

/// Piecewise automation of a parameter over time, in seconds. Ramps start
/// from the previous event.
#[derive(Debug, Clone, PartialEq)]
pub struct Automation {
    events: Vec<ParamEvent>,
}

impl Automation {
    pub fn constant(value: f32) -> Self {
        Self {
            events: vec![ParamEvent::Set { at: 0.0, value }],
        }
    }

    pub fn set(mut self, at: f32, value: f32) -> Self {
        self.events.push(ParamEvent::Set { at, value });
        self
    }

    pub fn linear_to(mut self, end: f32, value: f32) -> Self {
        self.events.push(ParamEvent::LinearTo { end, value });
        self
    }

    pub fn exponential_to(mut self, end: f32, value: f32) -> Self {
        self.events.push(ParamEvent::ExponentialTo { end, value });
        self
    }

    pub fn value_at(&self, t: f32) -> f32 {
        let mut prev_time = 0.0;
        let mut value = 0.0;

        for event in &self.events {
            match *event {
                ParamEvent::Set { at, value: next } => {
                    if t < at {
                        break;
                    }
                    prev_time = at;
                    value = next;
                }
                ParamEvent::LinearTo { end, value: target } => {
                    if t >= end {
                        prev_time = end;
                        value = target;
                        continue;
                    }
                    let span = end - prev_time;
                    if span <= 0.0 {
                        break;
                    }
                    let progress = (t - prev_time) / span;
                    return value + (target - value) * progress;
                }
                ParamEvent::ExponentialTo { end, value: target } => {
                    if t >= end {
                        prev_time = end;
                        value = target;
                        continue;
                    }
                    let span = end - prev_time;
                    if span <= 0.0 {
                        break;
                    }
                    let progress = (t - prev_time) / span;
                    if value <= 0.0 || target <= 0.0 {
                        return value + (target - value) * progress;
                    }
                    return value * (target / value).powf(progress);
                }
            }
        }

        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub waveform: Waveform,
    pub frequency: Automation,
    pub gain: Automation,
    pub duration: f32,
}

impl ToneSpec {
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let total = (self.duration * sample_rate as f32).round() as usize;
        let step = 1.0 / sample_rate as f32;
        let mut phase = 0.0_f32;
        let mut samples = Vec::with_capacity(total);

        for i in 0..total {
            let t = i as f32 * step;
            samples.push(self.waveform.sample(phase) * self.gain.value_at(t));
            phase = (phase + self.frequency.value_at(t) * step).fract();
        }

        samples
    }
}

pub fn preset(cue: SoundCue) -> ToneSpec {
    match cue {
        SoundCue::Click => ToneSpec {
            waveform: Waveform::Triangle,
            frequency: Automation::constant(800.0),
            gain: Automation::constant(0.2).exponential_to(0.1, 0.001),
            duration: 0.1,
        },
        // C5, E5, G5
        SoundCue::Success => ToneSpec {
            waveform: Waveform::Sine,
            frequency: Automation::constant(523.25)
                .set(0.1, 659.25)
                .set(0.2, 783.99),
            gain: Automation::constant(0.0)
                .linear_to(0.01, 0.15)
                .exponential_to(0.4, 0.001),
            duration: 0.4,
        },
        SoundCue::Copy => ToneSpec {
            waveform: Waveform::Square,
            frequency: Automation::constant(1000.0).set(0.05, 1200.0),
            gain: Automation::constant(0.15).exponential_to(0.1, 0.001),
            duration: 0.1,
        },
        SoundCue::Typing => ToneSpec {
            waveform: Waveform::Sine,
            frequency: Automation::constant(1500.0),
            gain: Automation::constant(0.05).exponential_to(0.1, 0.001),
            duration: 0.1,
        },
        SoundCue::IntroGlitch => ToneSpec {
            waveform: Waveform::Sawtooth,
            frequency: Automation::constant(800.0).exponential_to(0.15, 200.0),
            gain: Automation::constant(0.1).exponential_to(0.15, 0.001),
            duration: 0.15,
        },
        SoundCue::IntroReveal => ToneSpec {
            waveform: Waveform::Sawtooth,
            frequency: Automation::constant(100.0).exponential_to(2.0, 400.0),
            gain: Automation::constant(0.0)
                .linear_to(1.5, 0.15)
                .exponential_to(2.5, 0.001),
            duration: 2.5,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DroneSpec {
    pub carrier_hz: f32,
    pub lfo_hz: f32,
    pub base_gain: f32,
    pub lfo_depth: f32,
}

impl Default for DroneSpec {
    fn default() -> Self {
        Self {
            carrier_hz: 120.0,
            lfo_hz: 4.0,
            base_gain: 0.05,
            lfo_depth: 0.05,
        }
    }
}

impl DroneSpec {
    /// One second of audio. Both oscillators complete whole cycles, so the
    /// buffer can be looped without a click.
    pub fn render_loop(&self, sample_rate: u32) -> Vec<f32> {
        let total = sample_rate as usize;
        let step = 1.0 / sample_rate as f32;
        (0..total)
            .map(|i| {
                let t = i as f32 * step;
                let lfo = Waveform::Square.sample((self.lfo_hz * t).fract());
                let gain = self.base_gain + self.lfo_depth * lfo;
                Waveform::Sine.sample((self.carrier_hz * t).fract()) * gain
            })
            .collect()
    }
}

/// Exponential fade from full level to -80 dB across `samples`.
pub fn apply_fade_out(samples: &mut [f32]) {
    let len = samples.len();
    if len == 0 {
        return;
    }
    let fade = Automation::constant(1.0).exponential_to(1.0, 0.0001);
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= fade.value_at(i as f32 / len as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_render_their_full_duration() {
        assert_eq!(preset(SoundCue::Click).render(SAMPLE_RATE).len(), 4_410);
        assert_eq!(preset(SoundCue::IntroReveal).render(SAMPLE_RATE).len(), 110_250);
    }

    #[test]
    fn rendered_cues_stay_within_unit_range() {
        for cue in SoundCue::ALL {
            let samples = preset(cue).render(8_000);
            assert!(!samples.is_empty(), "{} rendered nothing", cue.name());
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn success_steps_through_the_arpeggio() {
        let frequency = preset(SoundCue::Success).frequency;
        assert_eq!(frequency.value_at(0.05), 523.25);
        assert_eq!(frequency.value_at(0.15), 659.25);
        assert_eq!(frequency.value_at(0.3), 783.99);
    }

    #[test]
    fn exponential_ramp_interpolates_geometrically() {
        let sweep = Automation::constant(100.0).exponential_to(2.0, 400.0);
        assert!((sweep.value_at(1.0) - 200.0).abs() < 0.01);
        assert_eq!(sweep.value_at(3.0), 400.0);
    }

    #[test]
    fn linear_ramp_from_silence() {
        let gain = Automation::constant(0.0).linear_to(1.5, 0.15);
        assert!((gain.value_at(0.75) - 0.075).abs() < 1e-6);
    }

    #[test]
    fn drone_gain_alternates_with_lfo() {
        let drone = DroneSpec::default();
        let samples = drone.render_loop(SAMPLE_RATE);
        assert_eq!(samples.len(), SAMPLE_RATE as usize);
        let peak_first_half = samples[..5_512].iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        let peak_second_half = samples[5_513..11_025]
            .iter()
            .fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak_first_half > 0.09);
        assert!(peak_second_half < 1e-6);
    }

    #[test]
    fn fade_out_ends_near_silence() {
        let mut samples = vec![1.0; 1_000];
        apply_fade_out(&mut samples);
        assert_eq!(samples[0], 1.0);
        assert!(samples[999] < 0.001);
    }
}
