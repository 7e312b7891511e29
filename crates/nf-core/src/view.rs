/// Read access every field-like type must provide to be measured.
///
/// Metrics take `&impl FieldView` rather than probing for accessors, so a
/// type that cannot list its patterns and attractors does not compile
/// against them.
pub trait FieldView {
    /// `(text, strength)` for every pattern, in insertion order.
    fn patterns(&self) -> impl Iterator<Item = (&str, f64)>;

    /// `(text, strength)` for every attractor, in formation order.
    fn attractors(&self) -> impl Iterator<Item = (&str, f64)>;
}
