//! Fixed-capacity text fields

/// Copy `text` into a fixed-capacity string, truncating on a char boundary
///
/// Characters that do not fit are dropped; the result never exceeds `N` bytes.
pub fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
