/// WAV file format utilities.
///
/// Generates standard 44-byte RIFF WAV headers for 16-bit PCM recordings.
/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Largest PCM payload whose RIFF size (`36 + data`) still fits the u32 field.
pub const MAX_WAV_DATA_BYTES: u64 = u32::MAX as u64 - 36;

/// Generate a 44-byte WAV RIFF header.
///
/// Format: PCM (format code 1), little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_size)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF chunk descriptor
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    // data sub-chunk
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Fields read back from a header produced by [`generate_wav_header`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeaderInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub data_size: u32,
}

impl WavHeaderInfo {
    pub fn duration_secs(&self) -> f64 {
        let bytes_per_second = self.sample_rate as f64 * self.channels as f64 * self.bit_depth as f64 / 8.0;
        if bytes_per_second == 0.0 {
            return 0.0;
        }
        self.data_size as f64 / bytes_per_second
    }
}

/// Parse a canonical 44-byte PCM header. Returns `None` for anything else.
pub fn parse_wav_header(bytes: &[u8]) -> Option<WavHeaderInfo> {
    if bytes.len() < WAV_HEADER_SIZE || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[36..40] != b"data" {
        return None;
    }
    if u16::from_le_bytes([bytes[20], bytes[21]]) != 1 {
        return None;
    }
    Some(WavHeaderInfo {
        channels: u16::from_le_bytes([bytes[22], bytes[23]]),
        sample_rate: u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
        bit_depth: u16::from_le_bytes([bytes[34], bytes[35]]),
        data_size: u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
    })
}
