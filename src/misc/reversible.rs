/// Trait for parametric objects whose directions can be traversed backwards.
pub trait Reversible: Clone {
    /// Reverses the parametrization along `direction` in place.
    fn reverse(&mut self, direction: usize);

    fn reversed(&self, direction: usize) -> Self {
        let mut rev = self.clone();
        rev.reverse(direction);
        rev
    }
}
