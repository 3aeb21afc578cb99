//! Colour filter array (Bayer) layout of single-channel RAW sensor data

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const RED: usize = 0;
pub const GREEN: usize = 1;
pub const BLUE: usize = 2;

/// 2x2 repeating filter layout; `cells[row][col]` is the channel index
/// (0 = R, 1 = G, 2 = B) of sensor pixel `(col % 2, row % 2)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfaPattern {
    cells: [[u8; 2]; 2],
}

impl CfaPattern {
    pub const RGGB: CfaPattern = CfaPattern { cells: [[0, 1], [1, 2]] };
    pub const BGGR: CfaPattern = CfaPattern { cells: [[2, 1], [1, 0]] };
    pub const GRBG: CfaPattern = CfaPattern { cells: [[1, 0], [2, 1]] };
    pub const GBRG: CfaPattern = CfaPattern { cells: [[1, 2], [0, 1]] };

    /// Build from a decoder pattern. Index 3 (second green in LibRaw
    /// numbering) is folded into green. Every channel must appear.
    pub fn new(cells: [[u8; 2]; 2]) -> Result<Self> {
        let mut seen = [false; 3];
        let mut folded = cells;
        for cell in folded.iter_mut().flatten() {
            match *cell {
                0..=2 => {}
                3 => *cell = GREEN as u8,
                other => {
                    return Err(Error::InvalidPattern(format!("channel index {}", other)));
                }
            }
            seen[*cell as usize] = true;
        }
        if seen.iter().any(|s| !s) {
            return Err(Error::InvalidPattern(format!("{:?} lacks a colour channel", cells)));
        }
        Ok(Self { cells: folded })
    }

    /// Channel index of the absolute sensor pixel `(x, y)`
    #[inline]
    pub fn channel_at(&self, x: usize, y: usize) -> usize {
        self.cells[y % 2][x % 2] as usize
    }

    /// Number of pixels of each channel inside a `width x height` window at `(x0, y0)`
    pub fn channel_counts(&self, x0: usize, y0: usize, width: usize, height: usize) -> [usize; 3] {
        let mut counts = [0usize; 3];
        // Pixels per parity class along each axis
        let span = |start: usize, len: usize, parity: usize| -> usize {
            let first = if start % 2 == parity { 0 } else { 1 };
            if len > first {
                (len - first + 1) / 2
            } else {
                0
            }
        };
        for py in 0..2 {
            for px in 0..2 {
                let n = span(x0, width, px) * span(y0, height, py);
                counts[self.cells[py][px] as usize] += n;
            }
        }
        counts
    }
}

impl std::str::FromStr for CfaPattern {
    type Err = Error;

    /// Parse a four-letter layout such as `RGGB`
    fn from_str(s: &str) -> Result<Self> {
        let letters: Vec<char> = s.trim().to_ascii_uppercase().chars().collect();
        if letters.len() != 4 {
            return Err(Error::InvalidPattern(s.to_string()));
        }
        let mut cells = [[0u8; 2]; 2];
        for (i, c) in letters.iter().enumerate() {
            cells[i / 2][i % 2] = match c {
                'R' => RED as u8,
                'G' => GREEN as u8,
                'B' => BLUE as u8,
                _ => return Err(Error::InvalidPattern(s.to_string())),
            };
        }
        CfaPattern::new(cells)
    }
}

/// Pattern plus the absolute position of a region inside the sensor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicInfo {
    pub origin_x: usize,
    pub origin_y: usize,
    pub pattern: CfaPattern,
}

impl MosaicInfo {
    pub fn new(origin_x: usize, origin_y: usize, pattern: CfaPattern) -> Self {
        Self {
            origin_x,
            origin_y,
            pattern,
        }
    }

    /// Channel of the region-relative pixel `(x, y)`
    #[inline]
    pub fn channel_at(&self, x: usize, y: usize) -> usize {
        self.pattern.channel_at(self.origin_x + x, self.origin_y + y)
    }

    pub fn channel_counts(&self, width: usize, height: usize) -> [usize; 3] {
        self.pattern
            .channel_counts(self.origin_x, self.origin_y, width, height)
    }

    /// Boolean masks selecting each channel inside a `width x height` region
    pub fn masks(&self, width: usize, height: usize) -> [Vec<bool>; 3] {
        let mut masks = [
            vec![false; width * height],
            vec![false; width * height],
            vec![false; width * height],
        ];
        for y in 0..height {
            for x in 0..width {
                masks[self.channel_at(x, y)][y * width + x] = true;
            }
        }
        masks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_patterns() {
        assert_eq!("rggb".parse::<CfaPattern>().unwrap(), CfaPattern::RGGB);
        assert_eq!("BGGR".parse::<CfaPattern>().unwrap(), CfaPattern::BGGR);
        assert!("RGGX".parse::<CfaPattern>().is_err());
        assert!("RGB".parse::<CfaPattern>().is_err());
        // No blue
        assert!("RGGR".parse::<CfaPattern>().is_err());
    }

    #[test]
    fn test_libraw_second_green() {
        let p = CfaPattern::new([[0, 1], [3, 2]]).unwrap();
        assert_eq!(p, CfaPattern::RGGB);
        assert!(CfaPattern::new([[0, 1], [4, 2]]).is_err());
    }

    #[test]
    fn test_origin_changes_phase() {
        let info = MosaicInfo::new(1, 0, CfaPattern::RGGB);
        assert_eq!(info.channel_at(0, 0), GREEN);
        assert_eq!(info.channel_at(1, 0), RED);
        assert_eq!(info.channel_at(0, 1), BLUE);
        assert_eq!(MosaicInfo::new(1, 1, CfaPattern::RGGB).channel_at(0, 0), BLUE);
    }

    #[test]
    fn test_counts_match_masks() {
        for (x0, y0, w, h) in [(0, 0, 4, 4), (1, 0, 5, 3), (1, 1, 7, 9), (0, 3, 1, 6)] {
            let info = MosaicInfo::new(x0, y0, CfaPattern::GRBG);
            let masks = info.masks(w, h);
            let counted = info.channel_counts(w, h);
            for c in 0..3 {
                assert_eq!(masks[c].iter().filter(|m| **m).count(), counted[c]);
            }
            assert_eq!(counted.iter().sum::<usize>(), w * h);
        }
    }

    #[test]
    fn test_green_is_half() {
        let counts = CfaPattern::RGGB.channel_counts(0, 0, 40, 40);
        assert_eq!(counts, [400, 800, 400]);
    }
}
