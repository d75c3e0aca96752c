//! Heap-backed texture provider
//!
//! Stands in for GPU memory when no graphics device is around (the demo
//! binary, tests). Each texture is an RGBA8 buffer keyed by its handle.

use crate::renderer::{FrameSize, TextureData, TextureHandle, TextureProvider};
use crate::utils::error::{IntoPlayerError, PlayerError, Result};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const BYTES_PER_PIXEL: usize = 4;

/// Texture provider that allocates RGBA8 buffers on the heap
///
/// Cloning shares the same pool, so a caller can keep a clone around to
/// inspect allocations after handing the provider to the control surface.
#[derive(Clone, Default)]
pub struct HeapTextureProvider {
    inner: Arc<Mutex<TexturePool>>,
}

#[derive(Default)]
struct TexturePool {
    /// Backing storage per live texture
    buffers: HashMap<TextureHandle, Vec<u8>>,

    /// Next handle to hand out; handles are never reused
    next_id: u64,

    /// Lifetime counters
    allocated: u64,
    released: u64,
}

impl HeapTextureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of textures currently allocated
    pub fn live_textures(&self) -> usize {
        self.inner.lock().buffers.len()
    }

    /// Total bytes held by live textures
    pub fn bytes_allocated(&self) -> usize {
        self.inner.lock().buffers.values().map(Vec::len).sum()
    }

    /// (allocated, released) over the provider's lifetime
    pub fn counters(&self) -> (u64, u64) {
        let pool = self.inner.lock();
        (pool.allocated, pool.released)
    }

    /// Write into a live texture's pixels. Returns false if the handle is not live.
    pub fn with_pixels<F>(&self, handle: TextureHandle, f: F) -> bool
    where
        F: FnOnce(&mut [u8]),
    {
        match self.inner.lock().buffers.get_mut(&handle) {
            Some(buffer) => {
                f(buffer);
                true
            }
            None => false,
        }
    }
}

impl TextureProvider for HeapTextureProvider {
    fn instantiate(&mut self, size: FrameSize) -> Result<TextureData> {
        if size.is_empty() {
            return Err(PlayerError::Texture(format!("Cannot allocate {} texture", size)));
        }

        let len = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| PlayerError::Texture(format!("{} texture is too large", size)))?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .texture_err("Allocating texture storage")?;
        buffer.resize(len, 0);

        let mut pool = self.inner.lock();
        pool.next_id += 1;
        let handle = TextureHandle(pool.next_id);
        pool.buffers.insert(handle, buffer);
        pool.allocated += 1;

        debug!("Allocated {} ({}, {} bytes)", handle, size, len);
        Ok(TextureData::new(handle, size))
    }

    fn release(&mut self, texture: TextureData) {
        let mut pool = self.inner.lock();
        match pool.buffers.remove(&texture.handle()) {
            Some(_) => {
                pool.released += 1;
                debug!("Released {}", texture.handle());
            }
            None => warn!("Release of unknown texture {}", texture.handle()),
        }
    }
}
