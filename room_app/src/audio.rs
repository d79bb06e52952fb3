//! Audio cue sink

use std::path::PathBuf;

use room_engine::events::{AudioCue, EventChannel, Subscription};

/// Logs the clip of every cue published on the channel
///
/// Playback is left to an external mixer; the sink only resolves the clip path.
pub struct AudioSink {
    cues: Subscription<AudioCue>,
    asset_root: PathBuf,
}

impl AudioSink {
    /// Subscribe to `channel`
    pub fn new(channel: &mut EventChannel<AudioCue>, asset_root: impl Into<PathBuf>) -> Self {
        Self {
            cues: channel.subscribe(),
            asset_root: asset_root.into(),
        }
    }

    /// Consume the pending cues, returning the clip paths they name
    pub fn drain(&self) -> Vec<PathBuf> {
        self.cues
            .drain()
            .into_iter()
            .map(|cue| {
                let path = self.asset_root.join(&cue.clip);
                if path.exists() {
                    log::debug!("Audio cue {}", path.display());
                } else {
                    log::warn!("Audio cue {} has no clip on disk", path.display());
                }
                path
            })
            .collect()
    }

    /// Drop the subscription
    pub fn unsubscribe(self, channel: &mut EventChannel<AudioCue>) {
        channel.unsubscribe(self.cues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_resolves_under_asset_root() {
        let mut channel = EventChannel::new();
        let sink = AudioSink::new(&mut channel, "assets");

        channel.publish(AudioCue { clip: "audio/cut.wav".to_string() });
        channel.publish(AudioCue { clip: "audio/cut.wav".to_string() });

        let clips = sink.drain();
        assert_eq!(clips.len(), 2);
        assert_eq!(clips[0], PathBuf::from("assets/audio/cut.wav"));
        assert!(sink.drain().is_empty());

        sink.unsubscribe(&mut channel);
        assert_eq!(channel.subscriber_count(), 0);
    }
}
