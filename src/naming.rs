use crate::foundation::error::{PvError, PvResult};

const INFIX: &str = "_pv_diagram_";
const EXT: &str = ".png";

/// Largest padding width that still fits the index range in a `u64`.
pub const MAX_PADDING_WIDTH: usize = 18;

/// Deterministic frame file naming: `<dataset-id>_pv_diagram_<index>.png`.
///
/// Generated names zero-pad the index to `width` digits so that lexicographic and numeric order
/// agree; parsing accepts any digit count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameNaming {
    dataset_id: String,
    width: usize,
}

impl FrameNaming {
    /// Naming for `dataset_id` with indices padded to `width` digits.
    ///
    /// The id must be non-empty and free of path separators; `width` is `1..=18`.
    pub fn new(dataset_id: impl Into<String>, width: usize) -> PvResult<Self> {
        let dataset_id = dataset_id.into();
        validate_dataset_id(&dataset_id)?;
        if width == 0 || width > MAX_PADDING_WIDTH {
            return Err(PvError::validation(format!(
                "frame padding width must be in 1..={MAX_PADDING_WIDTH}, got {width}"
            )));
        }
        Ok(Self { dataset_id, width })
    }

    /// Dataset id used as the file name prefix.
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Zero-padding width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of distinct indices representable at this width (`10^width`).
    pub fn capacity(&self) -> u64 {
        10u64.pow(self.width as u32)
    }

    /// Fail unless `count` frames (indices `0..count`) fit without overflowing the padding.
    pub fn check_capacity(&self, count: usize) -> PvResult<()> {
        if count as u64 > self.capacity() {
            return Err(PvError::validation(format!(
                "{count} frames do not fit a {}-digit index (max {}); raise frame_padding_width",
                self.width,
                self.capacity()
            )));
        }
        Ok(())
    }

    /// File name for frame `index`. Fails when the index needs more than `width` digits.
    pub fn file_name(&self, index: usize) -> PvResult<String> {
        if index as u64 >= self.capacity() {
            return Err(PvError::validation(format!(
                "frame index {index} overflows {}-digit padding",
                self.width
            )));
        }
        Ok(format!(
            "{}{INFIX}{index:0width$}{EXT}",
            self.dataset_id,
            width = self.width
        ))
    }

    /// Embedded index of a frame file name, or `None` if `name` is not one of ours.
    pub fn parse_index(&self, name: &str) -> Option<u64> {
        let digits = name
            .strip_prefix(self.dataset_id.as_str())?
            .strip_prefix(INFIX)?
            .strip_suffix(EXT)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

fn validate_dataset_id(id: &str) -> PvResult<()> {
    if id.trim().is_empty() {
        return Err(PvError::validation("dataset id must be non-empty"));
    }
    if id.chars().any(|c| matches!(c, '/' | '\\' | '\0') || c.is_control()) {
        return Err(PvError::validation(format!(
            "dataset id '{id}' must not contain path separators or control characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_zero_padded() {
        let n = FrameNaming::new("NGC7538_CII", 3).unwrap();
        assert_eq!(n.file_name(0).unwrap(), "NGC7538_CII_pv_diagram_000.png");
        assert_eq!(n.file_name(42).unwrap(), "NGC7538_CII_pv_diagram_042.png");
        assert_eq!(n.file_name(999).unwrap(), "NGC7538_CII_pv_diagram_999.png");
        assert!(n.file_name(1000).is_err());
    }

    #[test]
    fn lexicographic_order_matches_numeric_within_capacity() {
        let n = FrameNaming::new("cube", 2).unwrap();
        let names: Vec<String> = (0..100).map(|i| n.file_name(i).unwrap()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
    }

    #[test]
    fn capacity_is_power_of_ten() {
        let n = FrameNaming::new("cube", 3).unwrap();
        assert!(n.check_capacity(1000).is_ok());
        assert!(n.check_capacity(1001).is_err());
    }

    #[test]
    fn parse_accepts_any_digit_count() {
        let n = FrameNaming::new("cube", 3).unwrap();
        assert_eq!(n.parse_index("cube_pv_diagram_007.png"), Some(7));
        assert_eq!(n.parse_index("cube_pv_diagram_10.png"), Some(10));
        assert_eq!(n.parse_index("cube_pv_diagram_1234.png"), Some(1234));
    }

    #[test]
    fn parse_rejects_foreign_names() {
        let n = FrameNaming::new("cube", 3).unwrap();
        for name in [
            "other_pv_diagram_001.png",
            "cube_pv_diagram_.png",
            "cube_pv_diagram_00a.png",
            "cube_pv_diagram_+01.png",
            "cube_pv_diagram_001.jpg",
            "cube_pv_diagram_001.png.partial",
            "cube_pv_movie.mp4",
        ] {
            assert_eq!(n.parse_index(name), None, "{name}");
        }
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(FrameNaming::new("", 3).is_err());
        assert!(FrameNaming::new("a/b", 3).is_err());
        assert!(FrameNaming::new("cube", 0).is_err());
        assert!(FrameNaming::new("cube", MAX_PADDING_WIDTH + 1).is_err());
    }
}
