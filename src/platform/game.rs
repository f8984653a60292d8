//! Game update interface and a demo implementation
//!
//! Once per frame the loop hands the game a pixel buffer to fill and, when
//! the audio device answered, a sample buffer sized to exactly what the
//! planner asked for. The call is synchronous and must fill both.

use std::f32::consts::TAU;

use crate::platform::video::OffscreenBuffer;

/// Interleaved left/right 16-bit samples to produce this frame
#[derive(Debug)]
pub struct SoundOutputBuffer<'a> {
    pub samples_per_second: u32,
    samples: &'a mut [i16],
}

impl<'a> SoundOutputBuffer<'a> {
    /// `samples` holds two values per sample-pair.
    pub fn new(samples_per_second: u32, samples: &'a mut [i16]) -> Self {
        Self {
            samples_per_second,
            samples,
        }
    }

    /// Sample-pairs requested
    pub fn sample_count(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut *self.samples
    }
}

/// Accumulated scroll offsets from keyboard/controller input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputOffsets {
    pub x: i32,
    pub y: i32,
}

/// Produces a frame's pixels and samples
pub trait Game {
    fn update_and_render(
        &mut self,
        pixels: &mut OffscreenBuffer,
        offsets: InputOffsets,
        sound: Option<&mut SoundOutputBuffer<'_>>,
        tone_hz: u32,
    );
}

/// Scrolling blue/green gradient with a steady sine tone
#[derive(Debug, Clone)]
pub struct ToneGame {
    tone_volume: i16,
    t_sine: f32,
}

impl ToneGame {
    pub fn new(tone_volume: i16) -> Self {
        Self {
            tone_volume,
            t_sine: 0.0,
        }
    }

    fn output_sound(&mut self, sound: &mut SoundOutputBuffer<'_>, tone_hz: u32) {
        let volume = self.tone_volume as f32;
        let wave_period = match tone_hz {
            0 => 0,
            hz => sound.samples_per_second / hz,
        };
        if wave_period == 0 {
            sound.samples_mut().fill(0);
            return;
        }

        let step = TAU / wave_period as f32;
        for pair in sound.samples_mut().chunks_exact_mut(2) {
            let value = (self.t_sine.sin() * volume) as i16;
            pair[0] = value;
            pair[1] = value;
            self.t_sine += step;
            if self.t_sine >= TAU {
                self.t_sine -= TAU;
            }
        }
    }

    fn render_gradient(pixels: &mut OffscreenBuffer, offsets: InputOffsets) {
        for y in 0..pixels.height() {
            let green = (y as i32).wrapping_add(offsets.y) as u8 as u32;
            for (x, pixel) in pixels.row_mut(y).iter_mut().enumerate() {
                let blue = (x as i32).wrapping_add(offsets.x) as u8 as u32;
                *pixel = (green << 8) | blue;
            }
        }
    }
}

impl Default for ToneGame {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_TONE_VOLUME)
    }
}

impl Game for ToneGame {
    fn update_and_render(
        &mut self,
        pixels: &mut OffscreenBuffer,
        offsets: InputOffsets,
        sound: Option<&mut SoundOutputBuffer<'_>>,
        tone_hz: u32,
    ) {
        if let Some(sound) = sound {
            self.output_sound(sound, tone_hz);
        }
        Self::render_gradient(pixels, offsets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_stays_within_volume() {
        let mut game = ToneGame::new(3000);
        let mut samples = vec![0i16; 2 * 480];
        let mut sound = SoundOutputBuffer::new(48000, &mut samples);
        assert_eq!(sound.sample_count(), 480);
        let mut pixels = OffscreenBuffer::new(2, 2);

        game.update_and_render(&mut pixels, InputOffsets::default(), Some(&mut sound), 256);

        assert!(samples.iter().all(|s| s.abs() <= 3000));
        assert!(samples.iter().any(|&s| s > 2500));
        assert!(samples.chunks_exact(2).all(|p| p[0] == p[1]));
    }

    #[test]
    fn test_phase_carries_across_frames() {
        let mut pixels = OffscreenBuffer::new(1, 1);
        let offsets = InputOffsets::default();

        let mut whole = vec![0i16; 200];
        ToneGame::new(3000).update_and_render(
            &mut pixels,
            offsets,
            Some(&mut SoundOutputBuffer::new(48000, &mut whole)),
            256,
        );

        let mut game = ToneGame::new(3000);
        let mut first = vec![0i16; 120];
        let mut second = vec![0i16; 80];
        game.update_and_render(
            &mut pixels,
            offsets,
            Some(&mut SoundOutputBuffer::new(48000, &mut first)),
            256,
        );
        game.update_and_render(
            &mut pixels,
            offsets,
            Some(&mut SoundOutputBuffer::new(48000, &mut second)),
            256,
        );

        first.extend_from_slice(&second);
        assert_eq!(first, whole);
    }

    #[test]
    fn test_zero_tone_is_silence() {
        let mut game = ToneGame::new(3000);
        let mut samples = vec![7i16; 16];
        let mut pixels = OffscreenBuffer::new(1, 1);
        game.update_and_render(
            &mut pixels,
            InputOffsets::default(),
            Some(&mut SoundOutputBuffer::new(48000, &mut samples)),
            0,
        );
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_gradient_follows_offsets() {
        let mut game = ToneGame::default();
        let mut pixels = OffscreenBuffer::new(4, 3);
        game.update_and_render(&mut pixels, InputOffsets { x: 10, y: 254 }, None, 256);

        // x = 1, y = 2: blue 11, green (256 wraps to 0)
        assert_eq!(pixels.pixels()[2 * 4 + 1], 11);
        // x = 0, y = 0: blue 10, green 254
        assert_eq!(pixels.pixels()[0], (254 << 8) | 10);
    }
}
