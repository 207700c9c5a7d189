/// Sorts the vector and drops repeated elements in place.
pub(crate) fn sort_and_dedupe<T: Eq + Ord>(vec: &mut Vec<T>) {
    if vec.len() < 2 {
        return;
    }
    vec.sort();
    vec.dedup();
}
