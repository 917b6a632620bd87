// SPDX-License-Identifier: CEPL-1.0
use crate::{RenderError, RenderResult};

/// Maps each swapchain image index to the fence of the frame slot that last rendered into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagesInFlight<F> {
    owners: Vec<Option<F>>,
}

impl<F> Default for ImagesInFlight<F> {
    fn default() -> Self {
        Self { owners: Vec::new() }
    }
}

impl<F: Copy + Eq> ImagesInFlight<F> {
    /// Resizes to `image_count` and clears every owner in one step.
    pub fn reset(&mut self, image_count: usize) {
        self.owners.clear();
        self.owners.resize_with(image_count, || None);
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn check(&self, image_index: u32) -> RenderResult<usize> {
        let i = image_index as usize;
        if i < self.owners.len() {
            Ok(i)
        } else {
            Err(RenderError::ImageIndexOutOfRange {
                index: image_index,
                count: self.owners.len(),
            })
        }
    }

    pub fn owner(&self, image_index: u32) -> RenderResult<Option<F>> {
        let i = self.check(image_index)?;
        Ok(self.owners[i])
    }

    /// The fence to wait on before `fence` may render into `image_index`, if any.
    pub fn conflicting(&self, image_index: u32, fence: F) -> RenderResult<Option<F>> {
        Ok(self.owner(image_index)?.filter(|&owner| owner != fence))
    }

    pub fn claim(&mut self, image_index: u32, fence: F) -> RenderResult<()> {
        let i = self.check(image_index)?;
        self.owners[i] = Some(fence);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<F>> + '_ {
        self.owners.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_all_owners() {
        let mut t = ImagesInFlight::default();
        t.reset(2);
        t.claim(0, 7u32).unwrap();
        t.claim(1, 8u32).unwrap();
        t.reset(3);
        assert_eq!(t.len(), 3);
        assert!(t.iter().all(|o| o.is_none()));
    }

    #[test]
    fn conflict_only_for_other_fences() {
        let mut t = ImagesInFlight::default();
        t.reset(2);
        assert_eq!(t.conflicting(0, 1u32).unwrap(), None);
        t.claim(0, 1).unwrap();
        assert_eq!(t.conflicting(0, 1).unwrap(), None);
        assert_eq!(t.conflicting(0, 2).unwrap(), Some(1));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut t = ImagesInFlight::<u32>::default();
        t.reset(3);
        let err = t.claim(3, 0).unwrap_err();
        assert!(matches!(err, RenderError::ImageIndexOutOfRange { index: 3, count: 3 }));
    }
}
