/// A device resource that must be given back exactly once.
pub trait Release {
    fn release(self);
}

impl Release for wgpu::Buffer {
    fn release(self) {
        self.destroy();
    }
}

impl Release for wgpu::Texture {
    fn release(self) {
        self.destroy();
    }
}

impl Release for wgpu::RenderPipeline {
    fn release(self) {
        drop(self);
    }
}

/// Owning slot for a [`Release`] resource.
///
/// `release` is idempotent: the first call gives the resource back, later
/// calls (and the implicit one on drop) are no-ops. An empty slot stands in
/// for a resource that was never created.
#[derive(Debug)]
pub struct Owned<T: Release> {
    resource: Option<T>,
}

impl<T: Release> Owned<T> {
    pub fn new(resource: T) -> Self {
        Self {
            resource: Some(resource),
        }
    }

    pub fn empty() -> Self {
        Self { resource: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    /// Returns `true` if this call released the resource.
    pub fn release(&mut self) -> bool {
        match self.resource.take() {
            Some(resource) => {
                resource.release();
                true
            }
            None => false,
        }
    }
}

impl<T: Release> Default for Owned<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Release> Drop for Owned<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Counted(Rc<Cell<u32>>);

    impl Release for Counted {
        fn release(self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn release_twice_releases_once() {
        let releases = Rc::new(Cell::new(0));
        let mut handle = Owned::new(Counted(releases.clone()));
        assert!(handle.get().is_some());

        assert!(handle.release());
        assert!(!handle.release());
        assert_eq!(releases.get(), 1);
        assert!(handle.get().is_none());

        drop(handle);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn drop_releases_live_resource() {
        let releases = Rc::new(Cell::new(0));
        drop(Owned::new(Counted(releases.clone())));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn empty_slot_release_is_noop() {
        let mut handle: Owned<Counted> = Owned::empty();
        assert!(!handle.release());
        assert!(handle.get().is_none());
    }
}
