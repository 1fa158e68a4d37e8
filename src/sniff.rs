//! Audio format sniffing
//!
//! Classifies a decoded byte stream by inspecting a fixed-size header prefix.
//! This is classification, not validation: the rules only look at magic bytes
//! and never parse the stream.

/// Number of prefix bytes the pipeline reads before classifying
pub const SNIFF_LEN: usize = 12;

/// Audio container formats the sniffer can recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Free Lossless Audio Codec ("fLaC" marker)
    Flac,
    /// MPEG audio, either ID3-tagged or a raw frame sync
    Mp3,
    /// Ogg container ("OggS" capture pattern)
    Ogg,
}

impl AudioFormat {
    /// Conventional file extension for this format, with the leading dot
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Flac => ".flac",
            AudioFormat::Mp3 => ".mp3",
            AudioFormat::Ogg => ".ogg",
        }
    }
}

/// Classify a decoded stream's prefix by magic bytes
///
/// Returns `None` for anything unrecognized. The rules, in order:
/// - `fLaC` → FLAC
/// - `ID3` → MP3
/// - first byte `0xFF` with the top three bits of the second byte set
///   (raw MPEG frame sync) → MP3
/// - `OggS` → OGG
#[must_use]
pub fn sniff(prefix: &[u8]) -> Option<AudioFormat> {
    if prefix.starts_with(b"fLaC") {
        return Some(AudioFormat::Flac);
    }
    if prefix.starts_with(b"ID3") {
        return Some(AudioFormat::Mp3);
    }
    if prefix.len() >= 2 && prefix[0] == 0xFF && (prefix[1] & 0xE0) == 0xE0 {
        return Some(AudioFormat::Mp3);
    }
    if prefix.starts_with(b"OggS") {
        return Some(AudioFormat::Ogg);
    }
    None
}
