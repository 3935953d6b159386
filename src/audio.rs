//! The duck squeak: one shared sound element restarted on every hard impact.

use std::cell::Cell;
use std::rc::Rc;

use crate::controller::physics::{CollideListener, Impact};

/// rodio output kept open for the lifetime of the sound, plus the encoded
/// clip so every restart decodes from the beginning.
#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
mod native {
    use std::io::Cursor;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

    use crate::assets;
    use crate::error::AudioError;

    pub fn decode(bytes: &[u8]) -> Result<Decoder<Cursor<Vec<u8>>>, AudioError> {
        Ok(Decoder::new(Cursor::new(bytes.to_vec()))?)
    }

    pub struct Output {
        // dropping the stream silences every sink on it
        _stream: OutputStream,
        _handle: OutputStreamHandle,
        sink: Sink,
        clip: Vec<u8>,
    }

    impl Output {
        pub fn open(path: &str) -> Result<Self, AudioError> {
            let clip = assets::read_binary(path)?;
            // fail early on a broken file rather than on the first impact
            decode(&clip)?;
            let (stream, handle) = OutputStream::try_default()?;
            let sink = Sink::try_new(&handle)?;
            Ok(Self { _stream: stream, _handle: handle, sink, clip })
        }

        pub fn restart(&self, volume: f32) -> Result<(), AudioError> {
            self.sink.stop();
            self.sink.set_volume(volume);
            self.sink.append(decode(&self.clip)?);
            self.sink.play();
            Ok(())
        }
    }
}

/// A single playback element. Restarting it cuts off whatever was playing,
/// so overlapping impacts truncate each other.
pub struct HitSound {
    #[cfg(target_arch = "wasm32")]
    element: Option<web_sys::HtmlAudioElement>,
    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    output: Option<native::Output>,
    #[cfg(all(not(feature = "native"), not(target_arch = "wasm32")))]
    path: String,
    plays: Cell<u32>,
    volume: Cell<f32>,
}

impl HitSound {
    pub fn new(path: &str) -> Self {
        #[cfg(target_arch = "wasm32")]
        let element = match web_sys::HtmlAudioElement::new_with_src(path) {
            Ok(element) => Some(element),
            Err(err) => {
                tracing::warn!(path, ?err, "hit sound unavailable");
                None
            }
        };

        #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
        let output = match native::Output::open(path) {
            Ok(output) => Some(output),
            Err(err) => {
                tracing::warn!(path, %err, "hit sound unavailable");
                None
            }
        };

        Self {
            #[cfg(target_arch = "wasm32")]
            element,
            #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
            output,
            #[cfg(all(not(feature = "native"), not(target_arch = "wasm32")))]
            path: path.to_string(),
            plays: Cell::new(0),
            volume: Cell::new(1.0),
        }
    }

    /// Rewind to zero and play at `volume` (0..1).
    pub fn restart(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.volume.set(volume);
        self.plays.set(self.plays.get() + 1);

        #[cfg(target_arch = "wasm32")]
        if let Some(element) = &self.element {
            element.set_volume(volume as f64);
            element.set_current_time(0.0);
            // autoplay policies reject play() until the page has seen a gesture
            if let Err(err) = element.play() {
                tracing::debug!(?err, "hit sound play rejected");
            }
        }

        #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
        if let Some(output) = &self.output {
            if let Err(err) = output.restart(volume) {
                tracing::warn!(%err, "hit sound restart failed");
            }
        }

        #[cfg(all(not(feature = "native"), not(target_arch = "wasm32")))]
        tracing::debug!(path = %self.path, volume, "squeak");
    }

    /// How many times playback was (re)started.
    pub fn plays(&self) -> u32 {
        self.plays.get()
    }

    pub fn volume(&self) -> f32 {
        self.volume.get()
    }
}

/// Collision listener that squeaks when the closing speed along the contact
/// normal exceeds `threshold`. The volume is random per impact and does not
/// depend on how hard the hit was.
pub fn squeak_on_impact(sound: Rc<HitSound>, threshold: f32) -> CollideListener {
    Box::new(move |impact: &Impact| {
        if impact.speed > threshold {
            sound.restart(rand::random::<f32>());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier3d::prelude::RigidBodyHandle;

    fn impact(speed: f32) -> Impact {
        Impact {
            body: RigidBodyHandle::from_raw_parts(1, 0),
            other: None,
            speed,
        }
    }

    #[test]
    fn soft_contacts_stay_silent() {
        let sound = Rc::new(HitSound::new("/sounds/duck-squeak.wav"));
        let mut listener = squeak_on_impact(sound.clone(), 1.5);
        listener(&impact(0.4));
        listener(&impact(1.5));
        assert_eq!(sound.plays(), 0);

        listener(&impact(1.51));
        assert_eq!(sound.plays(), 1);
        assert!((0.0..=1.0).contains(&sound.volume()));
    }

    #[test]
    fn listeners_share_one_element() {
        let sound = Rc::new(HitSound::new("/sounds/duck-squeak.wav"));
        let mut first = squeak_on_impact(sound.clone(), 1.5);
        let mut second = squeak_on_impact(sound.clone(), 1.5);
        first(&impact(4.0));
        second(&impact(6.0));
        first(&impact(3.0));
        assert_eq!(sound.plays(), 3);
    }

    #[test]
    fn missing_file_still_counts_plays() {
        let sound = HitSound::new("/sounds/missing.wav");
        sound.restart(2.0);
        assert_eq!(sound.plays(), 1);
        assert_eq!(sound.volume(), 1.0);
    }

    /// 16-bit mono PCM at 8 kHz.
    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    fn tiny_wav(samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            wav.extend_from_slice(&s.to_le_bytes());
        }
        wav
    }

    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    #[test]
    fn squeak_clip_decodes_from_memory() {
        use rodio::Source;

        let clip = tiny_wav(&[0, 1000, -1000, 0]);
        let decoder = native::decode(&clip).unwrap();
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.sample_rate(), 8000);
        assert_eq!(decoder.count(), 4);

        assert!(matches!(native::decode(b"not a wav"), Err(crate::error::AudioError::Decode(_))));
    }
}
