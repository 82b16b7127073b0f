//! Formatting of byte strings and sizes for statistics display.

use std::fmt::Write as _;

/// Formats `data` as lowercase hex, two digits per byte.
pub fn format_hex(data: &[u8]) -> String {
    let mut result = String::with_capacity(2 * data.len());
    for byte in data {
        let _ = write!(result, "{byte:02x}");
    }
    result
}

/// Formats `size` for human consumption using decimal units (`1.2 GB`).
pub fn format_human_readable_size(size: u64) -> String {
    if size >= 1_000_000_000 {
        format!("{:.1} GB", size as f64 / 1_000_000_000.0)
    } else {
        format!("{:.1} MB", size as f64 / 1_000_000.0)
    }
}

/// Formats `size` compactly for machine-readable output (`1.2G`, `3.4M`, or
/// plain bytes below a megabyte).
pub fn format_parsable_size_with_suffix(size: u64) -> String {
    if size >= 1_000_000_000 {
        format!("{:.1}G", size as f64 / 1_000_000_000.0)
    } else if size >= 1_000_000 {
        format!("{:.1}M", size as f64 / 1_000_000.0)
    } else {
        format!("{size}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_zero_padded() {
        assert_eq!(format_hex(&[0x00, 0x0f, 0xab]), "000fab");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn human_readable_sizes_use_decimal_units() {
        assert_eq!(format_human_readable_size(0), "0.0 MB");
        assert_eq!(format_human_readable_size(1_200_000), "1.2 MB");
        assert_eq!(format_human_readable_size(2_500_000_000), "2.5 GB");
    }

    #[test]
    fn parsable_sizes_drop_the_space() {
        assert_eq!(format_parsable_size_with_suffix(666), "666");
        assert_eq!(format_parsable_size_with_suffix(1_200_000), "1.2M");
        assert_eq!(format_parsable_size_with_suffix(2_500_000_000), "2.5G");
    }
}
