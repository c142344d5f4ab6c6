//! Parameter sets for the stateful hash-based schemes
//!
//! Every supported configuration is a variant of a closed enum. Nothing
//! is selected by identity; parameter sets compare and encode by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CryptoError, Result};

/// Width of the encoded parameter set inside keys, states and signatures
pub const PARAM_CODE_SIZE: usize = 3;

const FAMILY_XMSS: u8 = 1;
const FAMILY_XMSSMT: u8 = 2;
const FAMILY_HSS: u8 = 3;

/// Winternitz width (bits per chain digit) used by the XMSS families
const XMSS_WINTERNITZ_BITS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XmssHeight {
    H10,
    H16,
    H20,
}

impl XmssHeight {
    pub fn bits(self) -> u32 {
        match self {
            Self::H10 => 10,
            Self::H16 => 16,
            Self::H20 => 20,
        }
    }
}

impl TryFrom<u32> for XmssHeight {
    type Error = CryptoError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            10 => Ok(Self::H10),
            16 => Ok(Self::H16),
            20 => Ok(Self::H20),
            other => Err(CryptoError::Unsupported(format!("XMSS height {other} (expected 10|16|20)"))),
        }
    }
}

/// XMSS^MT variants, named total-height_layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XmssMtVariant {
    V20_2,
    V20_4,
    V40_2,
    V40_4,
    V40_8,
    V60_3,
    V60_6,
    V60_12,
}

impl XmssMtVariant {
    pub const ALL: [XmssMtVariant; 8] = [
        Self::V20_2,
        Self::V20_4,
        Self::V40_2,
        Self::V40_4,
        Self::V40_8,
        Self::V60_3,
        Self::V60_6,
        Self::V60_12,
    ];

    /// (total height, layers)
    pub fn shape(self) -> (u32, u32) {
        match self {
            Self::V20_2 => (20, 2),
            Self::V20_4 => (20, 4),
            Self::V40_2 => (40, 2),
            Self::V40_4 => (40, 4),
            Self::V40_8 => (40, 8),
            Self::V60_3 => (60, 3),
            Self::V60_6 => (60, 6),
            Self::V60_12 => (60, 12),
        }
    }

    fn from_shape(height: u32, layers: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.shape() == (height, layers))
    }
}

impl fmt::Display for XmssMtVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, d) = self.shape();
        write!(f, "{h}_{d}")
    }
}

impl FromStr for XmssMtVariant {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || CryptoError::Unsupported(format!("XMSS^MT variant {s}"));
        let (h, d) = s.split_once(|c: char| c == '_' || c == '/').ok_or_else(unsupported)?;
        let h: u32 = h.parse().map_err(|_| unsupported())?;
        let d: u32 = d.parse().map_err(|_| unsupported())?;
        Self::from_shape(h, d).ok_or_else(unsupported)
    }
}

/// Winternitz parameter for HSS (bits per digit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winternitz {
    W1,
    W2,
    W4,
    W8,
}

impl Winternitz {
    pub fn bits(self) -> u32 {
        match self {
            Self::W1 => 1,
            Self::W2 => 2,
            Self::W4 => 4,
            Self::W8 => 8,
        }
    }
}

impl TryFrom<u32> for Winternitz {
    type Error = CryptoError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::W1),
            2 => Ok(Self::W2),
            4 => Ok(Self::W4),
            8 => Ok(Self::W8),
            other => Err(CryptoError::Unsupported(format!("Winternitz value {other} (expected 1|2|4|8)"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HssHeight {
    H5,
    H10,
    H15,
    H20,
    H25,
}

impl HssHeight {
    pub fn bits(self) -> u32 {
        match self {
            Self::H5 => 5,
            Self::H10 => 10,
            Self::H15 => 15,
            Self::H20 => 20,
            Self::H25 => 25,
        }
    }
}

impl TryFrom<u32> for HssHeight {
    type Error = CryptoError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            5 => Ok(Self::H5),
            10 => Ok(Self::H10),
            15 => Ok(Self::H15),
            20 => Ok(Self::H20),
            25 => Ok(Self::H25),
            other => Err(CryptoError::Unsupported(format!("HSS height {other} (expected 5|10|15|20|25)"))),
        }
    }
}

/// A supported stateful signature parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamSet {
    Xmss(XmssHeight),
    XmssMt(XmssMtVariant),
    Hss { winternitz: Winternitz, height: HssHeight },
}

impl ParamSet {
    /// Total hypertree height
    pub fn total_height(&self) -> u32 {
        match self {
            Self::Xmss(h) => h.bits(),
            Self::XmssMt(v) => v.shape().0,
            Self::Hss { height, .. } => height.bits(),
        }
    }

    /// Number of tree layers (1 for XMSS and single-level HSS)
    pub fn layers(&self) -> u32 {
        match self {
            Self::XmssMt(v) => v.shape().1,
            _ => 1,
        }
    }

    /// Height of each layer tree
    pub fn layer_height(&self) -> u32 {
        self.total_height() / self.layers()
    }

    pub fn winternitz_bits(&self) -> u32 {
        match self {
            Self::Hss { winternitz, .. } => winternitz.bits(),
            _ => XMSS_WINTERNITZ_BITS,
        }
    }

    /// Number of one-time leaves a key of this set can ever sign with
    pub fn max_leaf_index(&self) -> u64 {
        1u64 << self.total_height()
    }

    pub fn to_code(&self) -> [u8; PARAM_CODE_SIZE] {
        match self {
            Self::Xmss(h) => [FAMILY_XMSS, h.bits() as u8, 1],
            Self::XmssMt(v) => {
                let (h, d) = v.shape();
                [FAMILY_XMSSMT, h as u8, d as u8]
            }
            Self::Hss { winternitz, height } => [FAMILY_HSS, winternitz.bits() as u8, height.bits() as u8],
        }
    }

    pub fn from_code(code: [u8; PARAM_CODE_SIZE]) -> Option<Self> {
        let [family, a, b] = code;
        match family {
            FAMILY_XMSS if b == 1 => XmssHeight::try_from(a as u32).ok().map(Self::Xmss),
            FAMILY_XMSSMT => XmssMtVariant::from_shape(a as u32, b as u32).map(Self::XmssMt),
            FAMILY_HSS => {
                let winternitz = Winternitz::try_from(a as u32).ok()?;
                let height = HssHeight::try_from(b as u32).ok()?;
                Some(Self::Hss { winternitz, height })
            }
            _ => None,
        }
    }

    /// Decode a parameter code at the start of `bytes`
    pub(crate) fn decode_prefix(bytes: &[u8]) -> Option<Self> {
        let code: [u8; PARAM_CODE_SIZE] = bytes.get(..PARAM_CODE_SIZE)?.try_into().ok()?;
        Self::from_code(code)
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xmss(h) => write!(f, "XMSS height {}", h.bits()),
            Self::XmssMt(v) => write!(f, "XMSS^MT {v}"),
            Self::Hss { winternitz, height } => {
                write!(f, "HSS winternitz {} height {}", winternitz.bits(), height.bits())
            }
        }
    }
}

/// Space/time tradeoff for tree traversal. Never affects signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeStrategy {
    Full,
    #[serde(rename = "memory")]
    MemoryConstrained,
    #[serde(rename = "cpu")]
    CpuConstrained,
    Bds,
}

impl TreeStrategy {
    pub fn to_code(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::MemoryConstrained => 1,
            Self::CpuConstrained => 2,
            Self::Bds => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Full),
            1 => Some(Self::MemoryConstrained),
            2 => Some(Self::CpuConstrained),
            3 => Some(Self::Bds),
            _ => None,
        }
    }

    /// Whether layer trees are kept in memory once computed
    pub fn caches_trees(self) -> bool {
        matches!(self, Self::Full | Self::CpuConstrained)
    }

    /// HSS takes full|bds, the XMSS families take full|memory|cpu
    pub fn supports(self, params: &ParamSet) -> bool {
        match params {
            ParamSet::Hss { .. } => matches!(self, Self::Full | Self::Bds),
            _ => !matches!(self, Self::Bds),
        }
    }

    /// Default strategy used by the samples for a parameter family
    pub fn default_for(params: &ParamSet) -> Self {
        match params {
            ParamSet::Hss { .. } => Self::Bds,
            _ => Self::Full,
        }
    }
}

impl fmt::Display for TreeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Full => "Full Tree",
            Self::MemoryConstrained => "Memory Constrained",
            Self::CpuConstrained => "CPU Constrained",
            Self::Bds => "BDS",
        };
        f.write_str(name)
    }
}

impl FromStr for TreeStrategy {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "memory" => Ok(Self::MemoryConstrained),
            "cpu" => Ok(Self::CpuConstrained),
            "bds" => Ok(Self::Bds),
            other => Err(CryptoError::Unsupported(format!("tree strategy {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip_all_sets() {
        let mut sets = vec![
            ParamSet::Xmss(XmssHeight::H10),
            ParamSet::Xmss(XmssHeight::H16),
            ParamSet::Xmss(XmssHeight::H20),
        ];
        sets.extend(XmssMtVariant::ALL.iter().map(|v| ParamSet::XmssMt(*v)));
        for w in [1, 2, 4, 8] {
            for h in [5, 10, 15, 20, 25] {
                sets.push(ParamSet::Hss {
                    winternitz: Winternitz::try_from(w).unwrap(),
                    height: HssHeight::try_from(h).unwrap(),
                });
            }
        }
        for set in sets {
            assert_eq!(ParamSet::from_code(set.to_code()), Some(set));
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert_eq!(ParamSet::from_code([0, 10, 1]), None);
        assert_eq!(ParamSet::from_code([FAMILY_XMSS, 12, 1]), None);
        assert_eq!(ParamSet::from_code([FAMILY_XMSSMT, 20, 3]), None);
        assert_eq!(ParamSet::from_code([FAMILY_HSS, 3, 5]), None);
    }

    #[test]
    fn test_capacity() {
        assert_eq!(ParamSet::Xmss(XmssHeight::H10).max_leaf_index(), 1024);
        let mt = ParamSet::XmssMt(XmssMtVariant::V60_12);
        assert_eq!(mt.layer_height(), 5);
        assert_eq!(mt.max_leaf_index(), 1u64 << 60);
    }

    #[test]
    fn test_variant_parsing() {
        assert_eq!("20_4".parse::<XmssMtVariant>().unwrap(), XmssMtVariant::V20_4);
        assert_eq!("60/12".parse::<XmssMtVariant>().unwrap(), XmssMtVariant::V60_12);
        assert!("20_3".parse::<XmssMtVariant>().is_err());
        assert!("garbage".parse::<XmssMtVariant>().is_err());
    }

    #[test]
    fn test_strategy_support() {
        let hss = ParamSet::Hss { winternitz: Winternitz::W4, height: HssHeight::H5 };
        let xmss = ParamSet::Xmss(XmssHeight::H10);
        assert!(TreeStrategy::Bds.supports(&hss));
        assert!(!TreeStrategy::MemoryConstrained.supports(&hss));
        assert!(TreeStrategy::CpuConstrained.supports(&xmss));
        assert!(!TreeStrategy::Bds.supports(&xmss));
    }
}
