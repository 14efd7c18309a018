use std::fmt::Display;

/// Creates a vector of the specified size, with the provided defaults.
pub fn vec_with_size<T>(sz: usize, default: T) -> Vec<T>
where
    T: Clone,
{
    let mut v = Vec::with_capacity(sz);
    (0..sz).for_each(|_| v.push(default.clone()));
    v
}

/// Renders a slice for log output.
pub fn vec_to_str<T>(v: &[T]) -> String
where
    T: Display,
{
    v.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quadratic duplicate check; only ever run under debug_assert.
pub fn has_dup<T>(v: &[T]) -> bool
where
    T: PartialEq,
{
    for i in 0..v.len() {
        for j in (i + 1)..v.len() {
            if v[i] == v[j] {
                return true;
            }
        }
    }
    false
}
