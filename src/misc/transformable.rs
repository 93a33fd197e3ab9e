use crate::error::GeometryResult;

/// A trait for objects that can be transformed by a given type.
/// A transformation either rewrites the whole object or leaves it untouched.
pub trait Transformable<T>: Clone {
    fn try_transform(&mut self, transform: T) -> GeometryResult<()>;

    fn try_transformed(&self, transform: T) -> GeometryResult<Self> {
        let mut clone = self.clone();
        clone.try_transform(transform)?;
        Ok(clone)
    }
}
