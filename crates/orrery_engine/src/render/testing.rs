//! Test doubles: a device that records every call, shaders that log into
//! the same record, and a scripted window.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use crate::input::{InputEvent, InputState, KeyCode, MouseButton};

use super::device::{
    AttachmentPoint, Capability, ClearMask, CubeFace, DepthFunc, GeometryHandles, GraphicsDevice, PolygonMode,
    Primitive, RawHandle, ResourceClass, TextureData, TextureDesc, TextureFormat, TextureTarget,
};
use super::shader::{ShaderId, ShaderProgram, UniformLocation, UniformValue};
use super::window::{WindowCallbacks, WindowSurface};
use super::{RenderError, RenderResult};

/// One recorded device or shader call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateTexture(RawHandle, TextureDesc),
    UploadTexture {
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: TextureFormat,
        size: (u32, u32),
        has_data: bool,
    },
    GenerateMipmaps(RawHandle),
    CreateFramebuffer(RawHandle),
    CreateRenderbuffer(RawHandle),
    RenderbufferStorage(RawHandle, u32, u32),
    AttachTexture {
        framebuffer: RawHandle,
        point: AttachmentPoint,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
    },
    AttachRenderbuffer(RawHandle, AttachmentPoint, RawHandle),
    DrawBuffers(RawHandle, u32),
    CreateUniformBuffer(RawHandle, usize),
    CreateGeometry(RawHandle),
    Release(ResourceClass, RawHandle),
    BindFramebuffer(Option<RawHandle>),
    Viewport(i32, i32, i32, i32),
    ClearColor([f32; 4]),
    Clear(ClearMask),
    Capability(Capability, bool),
    DepthFunc(DepthFunc),
    PolygonMode(PolygonMode),
    PointSize(f32),
    BindTexture(u32, TextureTarget, Option<RawHandle>),
    BlitDepth(RawHandle, (u32, u32), Option<RawHandle>, (u32, u32)),
    DrawArrays(RawHandle, Primitive, i32),
    DrawElements(RawHandle, Primitive, i32),
    UseProgram(ShaderId),
    SetUniform(ShaderId, String, UniformValue),
    BindBlock(ShaderId, String, u32, RawHandle),
    Present,
}

/// Device double that hands out sequential names and logs every call
#[derive(Default)]
pub struct RecordingDevice {
    log: RefCell<Vec<Call>>,
    next: Cell<RawHandle>,
    incomplete: Cell<bool>,
    failing_buffers: Cell<bool>,
}

impl RecordingDevice {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self {
            next: Cell::new(1),
            ..Self::default()
        })
    }

    fn fresh(&self) -> RawHandle {
        let h = self.next.get();
        self.next.set(h + 1);
        h
    }

    pub fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.log.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn has(&self, pred: impl Fn(&Call) -> bool) -> bool {
        self.log.borrow().iter().any(pred)
    }

    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.log.borrow().iter().position(pred)
    }

    pub fn last_position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.log.borrow().iter().rposition(pred)
    }

    /// Make every later completeness check fail
    pub fn set_framebuffers_incomplete(&self, incomplete: bool) {
        self.incomplete.set(incomplete);
    }

    /// Make uniform buffer creation fail
    pub fn set_uniform_buffers_failing(&self, failing: bool) {
        self.failing_buffers.set(failing);
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_texture(&self, desc: &TextureDesc) -> RenderResult<RawHandle> {
        let h = self.fresh();
        self.push(Call::CreateTexture(h, *desc));
        Ok(h)
    }

    fn upload_texture(
        &self,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
        format: TextureFormat,
        size: (u32, u32),
        data: TextureData<'_>,
    ) -> RenderResult<()> {
        self.push(Call::UploadTexture {
            texture,
            face,
            level,
            format,
            size,
            has_data: !matches!(data, TextureData::Empty),
        });
        Ok(())
    }

    fn generate_mipmaps(&self, texture: RawHandle, _target: TextureTarget) {
        self.push(Call::GenerateMipmaps(texture));
    }

    fn create_framebuffer(&self) -> RenderResult<RawHandle> {
        let h = self.fresh();
        self.push(Call::CreateFramebuffer(h));
        Ok(h)
    }

    fn create_renderbuffer(&self) -> RenderResult<RawHandle> {
        let h = self.fresh();
        self.push(Call::CreateRenderbuffer(h));
        Ok(h)
    }

    fn renderbuffer_storage(&self, renderbuffer: RawHandle, _format: TextureFormat, width: u32, height: u32) {
        self.push(Call::RenderbufferStorage(renderbuffer, width, height));
    }

    fn attach_texture(
        &self,
        framebuffer: RawHandle,
        point: AttachmentPoint,
        texture: RawHandle,
        face: Option<CubeFace>,
        level: u32,
    ) {
        self.push(Call::AttachTexture {
            framebuffer,
            point,
            texture,
            face,
            level,
        });
    }

    fn attach_renderbuffer(&self, framebuffer: RawHandle, point: AttachmentPoint, renderbuffer: RawHandle) {
        self.push(Call::AttachRenderbuffer(framebuffer, point, renderbuffer));
    }

    fn set_draw_buffers(&self, framebuffer: RawHandle, count: u32) {
        self.push(Call::DrawBuffers(framebuffer, count));
    }

    fn framebuffer_complete(&self, _framebuffer: RawHandle) -> bool {
        !self.incomplete.get()
    }

    fn create_uniform_buffer(&self, bytes: &[u8]) -> RenderResult<RawHandle> {
        if self.failing_buffers.get() {
            return Err(RenderError::ResourceCreationFailed("uniform buffer".into()));
        }
        let h = self.fresh();
        self.push(Call::CreateUniformBuffer(h, bytes.len()));
        Ok(h)
    }

    fn create_geometry(&self, _vertices: &[f32], _attributes: &[u32], indices: Option<&[u32]>) -> RenderResult<GeometryHandles> {
        let vao = self.fresh();
        let vbo = self.fresh();
        let ibo = indices.map(|_| self.fresh());
        self.push(Call::CreateGeometry(vao));
        Ok(GeometryHandles { vao, vbo, ibo })
    }

    fn release(&self, class: ResourceClass, handle: RawHandle) {
        self.push(Call::Release(class, handle));
    }

    fn bind_framebuffer(&self, framebuffer: Option<RawHandle>) {
        self.push(Call::BindFramebuffer(framebuffer));
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.push(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, color: [f32; 4]) {
        self.push(Call::ClearColor(color));
    }

    fn clear(&self, mask: ClearMask) {
        self.push(Call::Clear(mask));
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.push(Call::Capability(capability, enabled));
    }

    fn depth_func(&self, func: DepthFunc) {
        self.push(Call::DepthFunc(func));
    }

    fn polygon_mode(&self, mode: PolygonMode) {
        self.push(Call::PolygonMode(mode));
    }

    fn point_size(&self, size: f32) {
        self.push(Call::PointSize(size));
    }

    fn bind_texture(&self, unit: u32, target: TextureTarget, texture: Option<RawHandle>) {
        self.push(Call::BindTexture(unit, target, texture));
    }

    fn blit_depth(
        &self,
        source: RawHandle,
        source_size: (u32, u32),
        destination: Option<RawHandle>,
        destination_size: (u32, u32),
    ) {
        self.push(Call::BlitDepth(source, source_size, destination, destination_size));
    }

    fn draw_arrays(&self, vao: RawHandle, primitive: Primitive, _first: i32, count: i32) {
        self.push(Call::DrawArrays(vao, primitive, count));
    }

    fn draw_elements(&self, vao: RawHandle, primitive: Primitive, count: i32) {
        self.push(Call::DrawElements(vao, primitive, count));
    }
}

/// Shader double; every uniform name resolves and is logged
pub struct MockShader {
    id: ShaderId,
    device: Rc<RecordingDevice>,
    locations: RefCell<Vec<String>>,
}

impl MockShader {
    pub fn new(id: ShaderId, device: Rc<RecordingDevice>) -> Self {
        Self {
            id,
            device,
            locations: RefCell::new(Vec::new()),
        }
    }
}

impl ShaderProgram for MockShader {
    fn bind(&self) {
        self.device.push(Call::UseProgram(self.id));
    }

    fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        let mut locations = self.locations.borrow_mut();
        let index = locations.iter().position(|n| n == name).unwrap_or_else(|| {
            locations.push(name.to_string());
            locations.len() - 1
        });
        Some(UniformLocation(index as u32))
    }

    fn set_uniform_at(&self, location: UniformLocation, value: UniformValue) {
        let name = self.locations.borrow()[location.0 as usize].clone();
        self.device.push(Call::SetUniform(self.id, name, value));
    }

    fn bind_uniform_block(&self, block: &str, binding: u32, buffer: RawHandle) {
        self.device.push(Call::BindBlock(self.id, block.to_string(), binding, buffer));
    }
}

/// Window double that closes after a fixed number of polls
pub struct MockWindow {
    device: Rc<RecordingDevice>,
    pub keys: HashSet<KeyCode>,
    pub buttons: HashSet<MouseButton>,
    pub cursor: (f64, f64),
    pub pending: Vec<InputEvent>,
    polls_left: Cell<u32>,
    pub presents: u32,
    callbacks: WindowCallbacks,
}

impl MockWindow {
    pub fn new(device: Rc<RecordingDevice>, frames: u32) -> Self {
        Self {
            device,
            keys: HashSet::new(),
            buttons: HashSet::new(),
            cursor: (0.0, 0.0),
            pending: Vec::new(),
            polls_left: Cell::new(frames),
            presents: 0,
            callbacks: WindowCallbacks::default(),
        }
    }
}

impl InputState for MockWindow {
    fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons.contains(&button)
    }

    fn cursor_pos(&self) -> (f64, f64) {
        self.cursor
    }
}

impl WindowSurface for MockWindow {
    fn should_close(&self) -> bool {
        self.polls_left.get() == 0
    }

    fn update_input(&mut self) -> Vec<InputEvent> {
        self.polls_left.set(self.polls_left.get().saturating_sub(1));
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            self.callbacks.dispatch(event);
        }
        events
    }

    fn swap_buffers(&mut self) {
        self.presents += 1;
        self.device.push(Call::Present);
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (1024, 1024)
    }

    fn callbacks_mut(&mut self) -> &mut WindowCallbacks {
        &mut self.callbacks
    }
}
