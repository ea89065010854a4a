/// If `line` is a `<name> <value>` header for the given name, return the
/// value; otherwise `None`.
pub(crate) fn header<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let (found, value) = split_once(line, b' ')?;
    if found == name {
        Some(value)
    } else {
        None
    }
}

/// Split a byte slice at the first occurrence of `c`, which is consumed.
pub(crate) fn split_once(s: &[u8], c: u8) -> Option<(&[u8], &[u8])> {
    let n = s.iter().position(|b| *b == c)?;
    Some((&s[..n], &s[n + 1..]))
}
