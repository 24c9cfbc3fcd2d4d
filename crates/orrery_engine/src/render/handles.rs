//! Move-only GPU handle wrappers
//!
//! An [`Owned`] releases its object through the device when dropped. Taking
//! the raw name out with [`Owned::take`] leaves [`INVALID_HANDLE`] behind, so
//! the later drop does nothing. Wrappers are never `Clone`; sharing a GPU name
//! means borrowing the wrapper.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::device::{GraphicsDevice, RawHandle, ResourceClass, INVALID_HANDLE};

/// Marker tying a wrapper type to its deletion call
pub trait HandleKind {
    /// Resource class passed to [`GraphicsDevice::release`]
    const CLASS: ResourceClass;
}

macro_rules! handle_kind {
    ($name:ident, $class:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug)]
        pub enum $name {}

        impl HandleKind for $name {
            const CLASS: ResourceClass = ResourceClass::$class;
        }
    };
}

handle_kind!(TextureKind, Texture, "Texture object marker");
handle_kind!(FramebufferKind, Framebuffer, "Framebuffer object marker");
handle_kind!(RenderbufferKind, Renderbuffer, "Renderbuffer object marker");
handle_kind!(BufferKind, Buffer, "Buffer object marker");
handle_kind!(VertexArrayKind, VertexArray, "Vertex array object marker");

/// Owned GPU object name
pub struct Owned<K: HandleKind> {
    device: Rc<dyn GraphicsDevice>,
    handle: RawHandle,
    _kind: PhantomData<K>,
}

/// Owned texture
pub type OwnedTexture = Owned<TextureKind>;
/// Owned framebuffer
pub type OwnedFramebuffer = Owned<FramebufferKind>;
/// Owned renderbuffer
pub type OwnedRenderbuffer = Owned<RenderbufferKind>;
/// Owned vertex/index/uniform buffer
pub type OwnedBuffer = Owned<BufferKind>;
/// Owned vertex array
pub type OwnedVertexArray = Owned<VertexArrayKind>;

impl<K: HandleKind> Owned<K> {
    /// Wrap a freshly created name
    pub fn new(device: Rc<dyn GraphicsDevice>, handle: RawHandle) -> Self {
        Self {
            device,
            handle,
            _kind: PhantomData,
        }
    }

    /// Wrapper holding nothing
    pub fn invalid(device: Rc<dyn GraphicsDevice>) -> Self {
        Self::new(device, INVALID_HANDLE)
    }

    /// The wrapped name
    pub fn raw(&self) -> RawHandle {
        self.handle
    }

    /// Whether a live object is held
    pub fn is_valid(&self) -> bool {
        self.handle != INVALID_HANDLE
    }

    /// Move the name out, leaving the sentinel
    pub fn take(&mut self) -> Self {
        let handle = std::mem::replace(&mut self.handle, INVALID_HANDLE);
        Self::new(Rc::clone(&self.device), handle)
    }

    /// Give up ownership without releasing
    pub fn into_raw(mut self) -> RawHandle {
        std::mem::replace(&mut self.handle, INVALID_HANDLE)
    }

    /// Release now instead of at drop
    pub fn reset(&mut self) {
        if self.is_valid() {
            self.device.release(K::CLASS, self.handle);
            self.handle = INVALID_HANDLE;
        }
    }
}

impl<K: HandleKind> Drop for Owned<K> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<K: HandleKind> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("class", &K::CLASS)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::{Call, RecordingDevice};

    #[test]
    fn drop_releases_once() {
        let device = RecordingDevice::shared();
        {
            let _texture = OwnedTexture::new(device.clone(), 7);
        }
        assert_eq!(device.count(|c| matches!(c, Call::Release(ResourceClass::Texture, 7))), 1);
    }

    #[test]
    fn take_leaves_sentinel_and_moves_ownership() {
        let device = RecordingDevice::shared();
        let mut original = OwnedBuffer::new(device.clone(), 3);
        let moved = original.take();

        assert!(!original.is_valid());
        assert_eq!(moved.raw(), 3);
        drop(original);
        assert_eq!(device.count(|c| matches!(c, Call::Release(..))), 0);

        drop(moved);
        assert_eq!(device.count(|c| matches!(c, Call::Release(ResourceClass::Buffer, 3))), 1);
    }

    #[test]
    fn invalid_and_into_raw_never_release() {
        let device = RecordingDevice::shared();
        drop(OwnedFramebuffer::invalid(device.clone()));
        let raw = OwnedVertexArray::new(device.clone(), 9).into_raw();

        assert_eq!(raw, 9);
        assert_eq!(device.count(|c| matches!(c, Call::Release(..))), 0);
    }
}
