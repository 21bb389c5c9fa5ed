//! Bounded capture of subprocess output.

/// Maximum captured output size in bytes (per stream).
pub const MAX_OUTPUT_SIZE: usize = 64 * 1024;

/// Decode captured bytes as UTF-8 (lossy) and cap the result near `limit` bytes.
///
/// Long output keeps its first and last `limit / 2` bytes with a marker line
/// in between, so trailing diagnostics survive. Returns the text and whether
/// it was truncated. Truncation never splits a UTF-8 character.
#[must_use]
pub fn capture_lossy(bytes: &[u8], limit: usize) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= limit {
        return (text.into_owned(), false);
    }

    let mut head_end = limit / 2;
    while !text.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = text.len() - (limit - limit / 2);
    while !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    let omitted = tail_start - head_end;
    let capped = format!(
        "{}\n... [{omitted} bytes truncated] ...\n{}",
        &text[..head_end],
        &text[tail_start..]
    );
    (capped, true)
}
