//! Transaction mortality window.
use parity_scale_codec::{Decode, Encode, Error, Input, Output};

/// Era period
pub type Period = u64;

/// Era phase
pub type Phase = u64;

/// Longevity of a transaction.
///
/// Mortal era is valid for `period` blocks starting from the block whose
/// number modulo `period` is `phase`. The hash of that block is a part of
/// the signed data, so mortal era needs a checkpoint block hash.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Era {
    Immortal,
    Mortal(Period, Phase),
}

impl Era {
    /// Mortal era from desired period and current block number.
    ///
    /// Period is rounded to a power of two and clamped into `4..=65536`.
    /// Phase is quantized for periods longer than `1 << 12`.
    pub fn mortal(period: u64, current: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(1 << 16)
            .clamp(4, 1 << 16);
        let phase = current % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;

        Self::Mortal(period, quantized_phase)
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Self::Immortal)
    }

    /// Mortal era is well-formed if period is a power of two in
    /// `4..=65536`, and phase is below period and quantized.
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Immortal => true,
            Self::Mortal(period, phase) => {
                let quantize_factor = (period >> 12).max(1);
                period.is_power_of_two()
                    && (4..=1 << 16).contains(&period)
                    && phase < period
                    && phase % quantize_factor == 0
            }
        }
    }

    /// First block of the era that `current` belongs to.
    pub fn birth(self, current: u64) -> u64 {
        match self {
            Self::Immortal => 0,
            Self::Mortal(period, phase) => (current.max(phase) - phase) / period * period + phase,
        }
    }

    /// First block at which the era has ended.
    pub fn death(self, current: u64) -> u64 {
        match self {
            Self::Immortal => u64::MAX,
            Self::Mortal(period, _) => self.birth(current) + period,
        }
    }
}

impl Encode for Era {
    fn encode_to<T: Output + ?Sized>(&self, output: &mut T) {
        match self {
            Self::Immortal => output.push_byte(0),
            Self::Mortal(period, phase) => {
                let quantize_factor = (*period >> 12).max(1);
                let encoded = period.trailing_zeros().saturating_sub(1).clamp(1, 15) as u16
                    | ((phase / quantize_factor) << 4) as u16;
                encoded.encode_to(output);
            }
        }
    }
}

impl parity_scale_codec::EncodeLike for Era {}

impl Decode for Era {
    fn decode<I: Input>(input: &mut I) -> Result<Self, Error> {
        let first = input.read_byte()?;
        if first == 0 {
            Ok(Self::Immortal)
        } else {
            let encoded = first as u64 + ((input.read_byte()? as u64) << 8);
            let period = 2 << (encoded % (1 << 4));
            let quantize_factor = (period >> 12).max(1);
            let phase = (encoded >> 4) * quantize_factor;
            if period >= 4 && phase < period {
                Ok(Self::Mortal(period, phase))
            } else {
                Err("Invalid period and phase".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immortal_is_single_zero_byte() {
        let era = Era::Immortal;
        assert_eq!(era.encode(), vec![0u8]);
        assert_eq!(era, Era::decode(&mut &[0u8][..]).unwrap());
        assert_eq!(era.birth(100), 0);
        assert_eq!(era.death(100), u64::MAX);
    }

    #[test]
    fn mortal_encoding() {
        let era = Era::mortal(64, 42);
        let expected = vec![5 + 42 % 16 * 16, 42 / 16];
        assert_eq!(era.encode(), expected);
        assert_eq!(era, Era::decode(&mut &expected[..]).unwrap());
    }

    #[test]
    fn long_period_is_quantized() {
        let era = Era::mortal(32768, 20000);
        let expected = vec![(14 + 2500 % 16 * 16) as u8, (2500 / 16) as u8];
        assert_eq!(era.encode(), expected);
        assert_eq!(era, Era::decode(&mut &expected[..]).unwrap());
        assert_eq!(
            Era::mortal(1000000, 1000001),
            Era::Mortal(65536, 1000001 % 65536 / 16 * 16)
        );
    }

    #[test]
    fn malformed_mortal_era() {
        assert!(Era::Immortal.is_valid());
        assert!(Era::mortal(5, 0).is_valid());
        assert!(Era::mortal(1000000, 1000001).is_valid());
        assert!(!Era::Mortal(5, 0).is_valid());
        assert!(!Era::Mortal(2, 0).is_valid());
        assert!(!Era::Mortal(1 << 17, 0).is_valid());
        assert!(!Era::Mortal(64, 64).is_valid());
        assert!(!Era::Mortal(32768, 3).is_valid());
        assert!(!Era::Mortal(0, 0).is_valid());

        // encodes without panic, rejected before signing
        assert_eq!(Era::Mortal(5, 0).encode().len(), 2);
        assert_eq!(Era::Mortal(0, 0).encode().len(), 2);
    }

    #[test]
    fn period_rounded_and_clamped() {
        assert_eq!(Era::mortal(200, 513), Era::Mortal(256, 1));
        assert_eq!(Era::mortal(2, 1), Era::Mortal(4, 1));
        assert_eq!(Era::mortal(4, 5), Era::Mortal(4, 1));
    }

    #[test]
    fn birth_and_death() {
        let era = Era::mortal(4, 6);
        for current in 6..10 {
            assert_eq!(era.birth(current), 6);
            assert_eq!(era.death(current), 10);
        }
    }

    #[test]
    fn invalid_phase_rejected() {
        // period 4, phase 4
        assert!(Era::decode(&mut &[0x41u8, 0x00][..]).is_err());
    }
}
