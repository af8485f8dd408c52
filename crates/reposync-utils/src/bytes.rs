/// Formats a number of bytes into a human-readable string.
///
/// # Example
///
/// ```
/// use reposync_utils::bytes::format_bytes;
///
/// assert_eq!(format_bytes(1024_u64.pow(2), 2), "1.00 MiB");
/// assert_eq!(format_bytes(0, 0), "0 B");
/// ```
pub fn format_bytes(bytes: u64, precision: usize) -> String {
    let unit = 1024.0_f64;
    let sizes = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

    let idx = if bytes == 0 {
        0
    } else {
        ((bytes as f64).log(unit).floor() as usize).min(sizes.len() - 1)
    };

    format!(
        "{:.*} {}",
        precision,
        bytes as f64 / unit.powi(idx as i32),
        sizes[idx]
    )
}
