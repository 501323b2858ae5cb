//! Image bindings.
//!
//! Binding is idempotent: the platform remembers each image it bound, and
//! those are skipped on later passes. Copies of a bound image count as new.
//! Ids are unique per sandbox.

use crate::platform::{ImagePlatform, PlatformError};
use crate::types::ImageId;

/// Images bound in the current sandbox.
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    next_id: u32,
    bound: Vec<ImageId>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every binding. Call when the sandbox is replaced.
    pub fn reset(&mut self) {
        self.next_id = 0;
        self.bound.clear();
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.bound.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    fn allocate(&mut self) -> ImageId {
        let id = ImageId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Bind every image that is not bound yet. Returns how many were bound.
///
/// Safe to call again after any mutation that may have added images.
pub fn bind_images<P>(platform: &P, registry: &mut ImageRegistry) -> Result<usize, PlatformError>
where
    P: ImagePlatform + ?Sized,
{
    let mut count = 0;
    for image in platform.images() {
        if platform.is_bound(&image) {
            continue;
        }
        let id = registry.allocate();
        let flow = platform.display_flow(&image);
        platform.bind_image(&image, id, flow)?;
        registry.bound.push(id);
        count += 1;
    }
    if count > 0 {
        tracing::debug!(count, total = registry.len(), "bound images");
    }
    Ok(count)
}
