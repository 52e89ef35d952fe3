//! Broadcast-wave assembly.
//!
//! Writes a RIFF/WAVE stream with 16-bit signed PCM and an `iXML` chunk
//! carrying production metadata, including the recording frame rate as a
//! reduced fraction so editors can conform the audio to the image
//! sequence.

use crate::error::VfsError;

const IXML_TEMPLATE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<BWFXML>\
<IXML_VERSION>1.5</IXML_VERSION>\
<PROJECT>{project}</PROJECT>\
<NOTE>{note}</NOTE>\
<CIRCLED>FALSE</CIRCLED>\
<BLACKMAGIC-KEYWORDS>{keywords}</BLACKMAGIC-KEYWORDS>\
<TAPE>{tape}</TAPE>\
<SCENE>{scene}</SCENE>\
<BLACKMAGIC-SHOT>{shot}</BLACKMAGIC-SHOT>\
<TAKE>{take}</TAKE>\
<BLACKMAGIC-ANGLE>ms</BLACKMAGIC-ANGLE>\
<SPEED>\
<MASTER_SPEED>{num}/{den}</MASTER_SPEED>\
<CURRENT_SPEED>{num}/{den}</CURRENT_SPEED>\
<TIMECODE_RATE>{num}/{den}</TIMECODE_RATE>\
<TIMECODE_FLAG>NDF</TIMECODE_FLAG>\
</SPEED>\
</BWFXML>";

const PROJECT: &str = "RAW Video";
const NOTE: &str = "-";

fn format_ixml(fps_num: i64, fps_den: i64) -> String {
    IXML_TEMPLATE
        .replace("{project}", PROJECT)
        .replace("{note}", NOTE)
        .replace("{keywords}", "")
        .replace("{tape}", "1")
        .replace("{scene}", "1")
        .replace("{shot}", "1")
        .replace("{take}", "1")
        .replace("{num}", &fps_num.to_string())
        .replace("{den}", &fps_den.to_string())
}

/// Accumulates interleaved PCM samples and emits the finished wave blob.
pub struct Bw64Writer {
    channels: u32,
    sample_rate: u32,
    ixml: String,
    samples: Vec<i16>,
}

impl Bw64Writer {
    /// Create a writer for the given format.
    ///
    /// Fails with an invalid-format error when channels or sample rate are
    /// zero.
    pub fn new(
        channels: u32,
        sample_rate: u32,
        fps_num: i64,
        fps_den: i64,
    ) -> Result<Self, VfsError> {
        if channels == 0 || sample_rate == 0 {
            return Err(VfsError::InvalidFormat(format!(
                "invalid audio format: {channels} channels at {sample_rate} Hz"
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
            ixml: format_ixml(fps_num, fps_den.max(1)),
            samples: Vec::new(),
        })
    }

    /// Append interleaved samples.
    pub fn write(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    /// Number of per-channel frames written so far.
    pub fn frames_written(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Assemble the RIFF stream.
    pub fn finish(self) -> Vec<u8> {
        let ixml_bytes = self.ixml.as_bytes();
        let ixml_padded = (ixml_bytes.len() + 1) & !1;
        let data_len = self.samples.len() * 2;

        // RIFF size covers everything after the size field itself.
        let riff_size = 4 + (8 + 16) + (8 + ixml_padded) + (8 + data_len);

        let mut out = Vec::with_capacity(8 + riff_size);

        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(riff_size as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");

        // fmt: 16-bit signed PCM.
        let block_align = self.channels as u16 * 2;
        let byte_rate = self.sample_rate * block_align as u32;
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&(self.channels as u16).to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());

        out.extend_from_slice(b"iXML");
        out.extend_from_slice(&(ixml_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(ixml_bytes);
        if ixml_bytes.len() % 2 != 0 {
            out.push(0);
        }

        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data_len as u32).to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }

        out
    }
}
