use std::fmt;
use std::sync::Arc;

use crate::bounding_box::BoundingBox;
use crate::error::{GeometryError, GeometryResult};
use crate::interface::interface_index_pairs;
use crate::misc::FloatingPoint;
use crate::patch::{PatchAccess, PatchPtr};

use super::DisjointSet;

/// Global numbering of the control variables, valid for the patch revisions it was built from.
#[derive(Clone, Debug)]
struct Numbering {
    system_size: usize,
    equation_ids: Vec<Vec<usize>>,
    revisions: Vec<u64>,
}

/// Insertion-ordered collection of patches with unique ids.
///
/// Patches are shared handles, so refining a patch through any handle is seen here.
/// `enumerate` numbers the control variables across the collection,
/// giving a single index to the control points matched by an interface.
///
/// # Example
/// ```
/// use isopatch::prelude::*;
///
/// let left = Patch::try_new(
///     1,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(0., 0., 2, 2, 1., 1.),
/// ).unwrap().into_ptr();
/// let right = Patch::try_new(
///     2,
///     FunctionSpace::rectangular(1, 1),
///     ControlGrid::rectangular(1., 0., 2, 2, 2., 1.),
/// ).unwrap().into_ptr();
/// make_interface(
///     &left,
///     BoundarySide::RIGHT,
///     &right,
///     BoundarySide::LEFT,
///     BoundaryDirection::Forward,
/// )
/// .unwrap();
///
/// let mut multipatch = MultiPatch::new();
/// multipatch.add_patch(left).unwrap();
/// multipatch.add_patch(right).unwrap();
/// assert_eq!(multipatch.enumerate().unwrap(), 6);
/// assert_eq!(multipatch.equation_ids(2).unwrap(), vec![1, 4, 3, 5]);
/// ```
#[derive(Clone)]
pub struct MultiPatch<T: FloatingPoint> {
    patches: Vec<PatchPtr<T>>,
    numbering: Option<Numbering>,
}

impl<T: FloatingPoint> MultiPatch<T> {
    pub fn new() -> Self {
        Self {
            patches: vec![],
            numbering: None,
        }
    }

    /// Add a patch, failing when its id is already in use
    pub fn add_patch(&mut self, patch: PatchPtr<T>) -> GeometryResult<()> {
        let id = patch.patch().id();
        if self.patches.iter().any(|p| Arc::ptr_eq(p, &patch) || p.patch().id() == id) {
            return Err(GeometryError::DuplicateId(id));
        }
        self.patches.push(patch);
        self.numbering = None;
        Ok(())
    }

    pub fn get(&self, id: usize) -> GeometryResult<PatchPtr<T>> {
        self.position(id).map(|i| self.patches[i].clone())
    }

    /// Take a patch out of the collection.
    /// Its interfaces are kept, they are ignored by the enumeration of the remaining patches.
    pub fn remove_patch(&mut self, id: usize) -> GeometryResult<PatchPtr<T>> {
        let i = self.position(id)?;
        self.numbering = None;
        Ok(self.patches.remove(i))
    }

    /// Change the id of a patch of the collection.
    ///
    /// This is the only way to rename a shared patch, so ids stay unique:
    /// ```compile_fail
    /// use isopatch::prelude::*;
    ///
    /// let patch = Patch::new(1, FunctionSpace::<f64>::rectangular(1, 1)).into_ptr();
    /// patch.patch_mut().set_id(2);
    /// ```
    pub fn set_patch_id(&mut self, old: usize, new: usize) -> GeometryResult<()> {
        let i = self.position(old)?;
        if old != new && self.position(new).is_ok() {
            return Err(GeometryError::DuplicateId(new));
        }
        self.patches[i].patch_mut().set_id(new);
        Ok(())
    }

    fn position(&self, id: usize) -> GeometryResult<usize> {
        self.patches
            .iter()
            .position(|p| p.patch().id() == id)
            .ok_or(GeometryError::NotFound(id))
    }

    /// Patches in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, PatchPtr<T>> {
        self.patches.iter()
    }

    pub fn ids(&self) -> Vec<usize> {
        self.patches.iter().map(|p| p.patch().id()).collect()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Number the control variables of every patch and return the size of the system.
    ///
    /// Control points matched across an interface share one index.
    /// Indices are handed out in insertion order of the patches, then in local order.
    /// Interfaces to patches outside the collection are ignored.
    pub fn enumerate(&mut self) -> GeometryResult<usize> {
        let mut offsets = Vec::with_capacity(self.patches.len());
        let mut total = 0;
        let mut ids = Vec::with_capacity(self.patches.len());
        for patch in self.patches.iter() {
            let guard = patch.patch();
            if ids.contains(&guard.id()) {
                return Err(GeometryError::DuplicateId(guard.id()));
            }
            ids.push(guard.id());
            offsets.push(total);
            total += guard.function_space().total_number();
        }

        let mut set = DisjointSet::new(total);
        for (i, patch) in self.patches.iter().enumerate() {
            let (space, entries, name) = {
                let guard = patch.patch();
                (
                    guard.function_space().clone(),
                    guard.interfaces().cloned().collect::<Vec<_>>(),
                    guard.name(),
                )
            };
            for entry in entries.iter() {
                let neighbor = entry
                    .neighbor()
                    .and_then(|n| self.patches.iter().position(|p| Arc::ptr_eq(p, &n)));
                let Some(j) = neighbor else {
                    log::warn!(
                        "{}: the neighbor on side {} is not part of the multipatch",
                        name,
                        entry.side()
                    );
                    continue;
                };
                // every interface is listed on both patches
                if j < i || (j == i && entry.neighbor_side() < entry.side()) {
                    continue;
                }
                let neighbor_space = if j == i {
                    space.clone()
                } else {
                    self.patches[j].patch().function_space().clone()
                };
                let pairs = interface_index_pairs(
                    &space,
                    entry.side(),
                    &neighbor_space,
                    entry.neighbor_side(),
                    &entry.orientation(),
                )?;
                for (a, b) in pairs {
                    set.union(offsets[i] + a, offsets[j] + b);
                }
            }
        }

        let mut index_of_root = vec![usize::MAX; total];
        let mut system_size = 0;
        let mut equation_ids = Vec::with_capacity(self.patches.len());
        let mut revisions = Vec::with_capacity(self.patches.len());
        for (i, patch) in self.patches.iter().enumerate() {
            let guard = patch.patch();
            let n = guard.function_space().total_number();
            let patch_ids: Vec<usize> = (0..n)
                .map(|local| {
                    let root = set.find(offsets[i] + local);
                    if index_of_root[root] == usize::MAX {
                        index_of_root[root] = system_size;
                        system_size += 1;
                    }
                    index_of_root[root]
                })
                .collect();
            equation_ids.push(patch_ids);
            revisions.push(guard.revision());
        }

        log::debug!(
            "enumerated {} patches: {} control variables, {} shared",
            self.patches.len(),
            system_size,
            total - system_size
        );
        self.numbering = Some(Numbering {
            system_size,
            equation_ids,
            revisions,
        });
        Ok(system_size)
    }

    /// Whether the numbering matches the current state of every patch
    pub fn is_enumerated(&self) -> bool {
        self.numbering.as_ref().is_some_and(|numbering| {
            numbering.revisions.len() == self.patches.len()
                && self
                    .patches
                    .iter()
                    .zip(numbering.revisions.iter())
                    .all(|(p, r)| p.patch().revision() == *r)
        })
    }

    fn current_numbering(&self) -> GeometryResult<&Numbering> {
        if !self.is_enumerated() {
            return Err(GeometryError::StaleEnumeration);
        }
        self.numbering.as_ref().ok_or(GeometryError::StaleEnumeration)
    }

    /// Number of distinct control variables of the last enumeration
    pub fn system_size(&self) -> GeometryResult<usize> {
        Ok(self.current_numbering()?.system_size)
    }

    /// Global index of every control point of a patch, in the linear order of its grid
    pub fn equation_ids(&self, id: usize) -> GeometryResult<Vec<usize>> {
        let numbering = self.current_numbering()?;
        let i = self.position(id)?;
        Ok(numbering.equation_ids[i].clone())
    }

    /// Box around the control points of every patch
    pub fn bounding_box(&self) -> GeometryResult<BoundingBox<T>> {
        let mut boxes = self.patches.iter().map(|p| p.patch().bounding_box());
        let first = boxes
            .next()
            .ok_or_else(|| GeometryError::DegenerateGeometry("empty multipatch".to_string()))??;
        boxes.try_fold(first, |acc, b| Ok(acc.union(&b?)))
    }

    /// Validate every patch and the uniqueness of the ids
    pub fn validate(&self) -> GeometryResult<()> {
        let mut ids = vec![];
        for patch in self.patches.iter() {
            let guard = patch.patch();
            if ids.contains(&guard.id()) {
                return Err(GeometryError::DuplicateId(guard.id()));
            }
            ids.push(guard.id());
            guard.validate()?;
        }
        Ok(())
    }
}

impl<T: FloatingPoint> Default for MultiPatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FloatingPoint> fmt::Display for MultiPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MultiPatch ({} patches)", self.patches.len())?;
        match self.numbering.as_ref() {
            Some(numbering) if self.is_enumerated() => {
                writeln!(f, "  enumerated: {} control variables", numbering.system_size)?
            }
            _ => writeln!(f, "  not enumerated")?,
        }
        for patch in self.patches.iter() {
            write!(f, "{}", patch.patch())?;
        }
        Ok(())
    }
}

impl<T: FloatingPoint> fmt::Debug for MultiPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiPatch")
            .field("ids", &self.ids())
            .field("enumerated", &self.is_enumerated())
            .finish()
    }
}

impl<'a, T: FloatingPoint> IntoIterator for &'a MultiPatch<T> {
    type Item = &'a PatchPtr<T>;
    type IntoIter = std::slice::Iter<'a, PatchPtr<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
