//! WS2812 bitstream encoding over SPI.
//!
//! The strip's one-wire protocol is bit-banged through the SPI clock: every
//! LED bit becomes one SPI byte whose duty cycle matches the WS2812 timing
//! at 6.4 MHz. Channels go out in G-R-B order, each MSB first, and the
//! frame ends with a run of zero bytes long enough to latch the strip.

/// SPI byte pattern for a "1" bit (wide high pulse).
pub const DATA_HIGH: u8 = 0b0001_1111;
/// SPI byte pattern for a "0" bit (narrow high pulse).
pub const DATA_LOW: u8 = 0b0000_0011;
/// Zero bytes appended after the last LED as the reset/latch gap.
pub const RESET_BYTES: usize = 40;
/// Encoded bytes per LED: 3 channels x 8 bits, one byte per bit.
pub const BYTES_PER_LED: usize = 24;

/// Exact length of an encoded frame for `leds` LEDs.
pub fn encoded_len(leds: usize) -> usize {
    leds * BYTES_PER_LED + RESET_BYTES
}

/// Encode corrected RGB triples into the SPI byte stream.
///
/// Output length is always `encoded_len(colors.len())`.
pub fn encode_frame(colors: &[[u8; 3]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(colors.len()));
    for &[r, g, b] in colors {
        encode_channel(g, &mut out);
        encode_channel(r, &mut out);
        encode_channel(b, &mut out);
    }
    out.resize(out.len() + RESET_BYTES, 0);
    out
}

fn encode_channel(value: u8, out: &mut Vec<u8>) {
    for bit in (0..8).rev() {
        out.push(if value & (1 << bit) != 0 {
            DATA_HIGH
        } else {
            DATA_LOW
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_length_is_exact() {
        for leds in [1, 2, 60, 300] {
            let colors = vec![[0u8; 3]; leds];
            assert_eq!(encode_frame(&colors).len(), leds * 24 + 40);
        }
    }

    #[test]
    fn channels_are_sent_green_first_msb_first() {
        // R=0x80, G=0x01, B=0x00.
        let frame = encode_frame(&[[0x80, 0x01, 0x00]]);

        // Green 0x01: seven zero bits then a one bit.
        assert_eq!(&frame[0..7], &[DATA_LOW; 7]);
        assert_eq!(frame[7], DATA_HIGH);
        // Red 0x80: a one bit then seven zero bits.
        assert_eq!(frame[8], DATA_HIGH);
        assert_eq!(&frame[9..16], &[DATA_LOW; 7]);
        // Blue 0x00: all zero bits.
        assert_eq!(&frame[16..24], &[DATA_LOW; 8]);
    }

    #[test]
    fn frame_ends_with_reset_gap() {
        let frame = encode_frame(&[[0xff, 0xff, 0xff]]);
        assert_eq!(&frame[24..], &[0u8; RESET_BYTES]);
        assert_eq!(&frame[0..24], &[DATA_HIGH; 24]);
    }
}
