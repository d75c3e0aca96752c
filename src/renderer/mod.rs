//! Renderer-side contracts for playctl
//!
//! The control surface never allocates GPU memory itself. It brokers a
//! single decoded-frame texture between the render context and the
//! consumer context, and delegates allocation to a [`TextureProvider`].

use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

// Export submodules
pub mod handoff;
pub mod texture;

// Re-export main types
pub use handoff::TextureHandoff;
pub use texture::HeapTextureProvider;

/// Texture provider trait: owns the GPU memory behind every handle it hands out
pub trait TextureProvider: Send {
    /// Allocate a surface the decoder can draw frames of `size` into
    ///
    /// # Arguments
    ///
    /// * `size` - Frame dimensions in pixels
    ///
    /// # Returns
    ///
    /// Returns the owned texture token or an error
    fn instantiate(&mut self, size: FrameSize) -> Result<TextureData>;

    /// Give a texture back to the provider
    ///
    /// # Arguments
    ///
    /// * `texture` - Token previously returned by `instantiate`
    fn release(&mut self, texture: TextureData);
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Copyable name of a texture, safe to hand to the render context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Owned texture token
///
/// Not `Clone`: whoever holds it is the only party able to release it.
#[derive(Debug, PartialEq, Eq)]
pub struct TextureData {
    handle: TextureHandle,
    size: FrameSize,
}

impl TextureData {
    /// Mint a token. Meant for [`TextureProvider`] implementations.
    pub fn new(handle: TextureHandle, size: FrameSize) -> Self {
        Self { handle, size }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }
}
