//! history.rs: capped, most-recent-last sequences kept on the user profile.

/// Append and evict from the front once `cap` is exceeded.
pub fn push_capped<T>(v: &mut Vec<T>, item: T, cap: usize) {
    v.push(item);
    trim_front(v, cap);
}

/// Like [`push_capped`], but an existing equal entry is moved to the end instead of repeated.
pub fn push_recent_unique<T: PartialEq>(v: &mut Vec<T>, item: T, cap: usize) {
    v.retain(|x| *x != item);
    push_capped(v, item, cap);
}

/// Drop the oldest entries so at most `cap` remain.
pub fn trim_front<T>(v: &mut Vec<T>, cap: usize) {
    if v.len() > cap {
        let excess = v.len() - cap;
        v.drain(0..excess);
    }
}

/// The last `n` entries, oldest first.
pub fn last_n<T>(v: &[T], n: usize) -> &[T] {
    &v[v.len().saturating_sub(n)..]
}
