//! Single-slot texture hand-off between the render and consumer contexts
//!
//! The slot owns at most one [`TextureData`]. The render context only ever
//! sees a copyable [`TextureHandle`]; the owned token moves out of the slot
//! into a FreeTextureData command and is released on the consumer context.
//! A handle that is no longer in the slot cannot be freed twice.

use crate::renderer::{FrameSize, TextureData, TextureHandle, TextureProvider};
use crate::utils::error::{PlayerError, Result};
use log::{debug, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct TextureHandoff {
    provider: Mutex<Box<dyn TextureProvider>>,
    slot: Mutex<Option<TextureData>>,
    scene_graph_initialized: AtomicBool,
}

impl TextureHandoff {
    pub fn new(provider: Box<dyn TextureProvider>) -> Self {
        Self {
            provider: Mutex::new(provider),
            slot: Mutex::new(None),
            scene_graph_initialized: AtomicBool::new(false),
        }
    }

    /// Render context reports its graphics state is usable
    pub fn mark_scene_graph_initialized(&self) {
        if !self.scene_graph_initialized.swap(true, Ordering::AcqRel) {
            info!("Scene graph initialized, textures may be instantiated");
        }
    }

    pub fn is_scene_graph_initialized(&self) -> bool {
        self.scene_graph_initialized.load(Ordering::Acquire)
    }

    /// Allocate a texture and make it the live one
    ///
    /// Returns the new handle together with the texture it displaced, which
    /// the caller must route to the consumer context for release.
    pub fn instantiate(&self, size: FrameSize) -> Result<(TextureHandle, Option<TextureData>)> {
        if !self.is_scene_graph_initialized() {
            return Err(PlayerError::RenderContextNotReady);
        }

        let texture = self.provider.lock().instantiate(size)?;
        let handle = texture.handle();
        let displaced = self.slot.lock().replace(texture);

        if let Some(old) = &displaced {
            debug!("{} displaces live texture {}", handle, old.handle());
        }
        Ok((handle, displaced))
    }

    /// Move the live texture out if `handle` names it
    pub fn take(&self, handle: TextureHandle) -> Option<TextureData> {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(live) if live.handle() == handle => slot.take(),
            _ => None,
        }
    }

    /// Handle of the live texture, if any
    pub fn live(&self) -> Option<TextureHandle> {
        self.slot.lock().as_ref().map(TextureData::handle)
    }

    /// Return a texture to the provider. Consumer context only.
    pub fn release(&self, texture: TextureData) {
        debug!("Releasing {}", texture.handle());
        self.provider.lock().release(texture);
    }
}

impl Drop for TextureHandoff {
    fn drop(&mut self) {
        if let Some(texture) = self.slot.get_mut().take() {
            debug!("Releasing live texture {} on shutdown", texture.handle());
            self.provider.get_mut().release(texture);
        }
    }
}
