//! # OpenGL Toolpath Backend
//!
//! [`GpuBackend`] implementation on top of `glow`. Each chunk pair gets its own vertex
//! array object; every index range of a batch becomes one `glDrawElements` call.

use super::gpu::{DrawCall, GpuBackend, GpuHandle};
use super::primitive::{PrimitiveKind, VertexFormat};
use super::toolpath_shaders::{TOOLPATH_FRAGMENT_SHADER, TOOLPATH_VERTEX_SHADER};
use gcodeview_core::{ViewerError, ViewerResult};
use glam::{Mat4, Vec3};
use glow::HasContext;
use std::collections::HashMap;
use tracing::debug;

/// Error type for OpenGL operations
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error("Shader compilation error: {0}")]
    ShaderError(String),
    #[error("Buffer creation error: {0}")]
    BufferError(String),
    #[error("Unknown handle {0}")]
    UnknownHandle(u32),
}

impl From<GlError> for ViewerError {
    fn from(err: GlError) -> Self {
        ViewerError::Gpu(err.to_string())
    }
}

#[derive(Debug)]
struct VertexBuffer {
    buffer: glow::Buffer,
    format: VertexFormat,
}

/// OpenGL renderer for toolpath chunks
pub struct GlBackend {
    gl: glow::Context,
    program: glow::Program,
    vertex_buffers: HashMap<u32, VertexBuffer>,
    index_buffers: HashMap<u32, glow::Buffer>,
    vertex_arrays: HashMap<(u32, u32), glow::VertexArray>,
    next_handle: u32,
    view_projection: Mat4,
    light_direction: Vec3,
}

impl GlBackend {
    /// Create a backend and compile its shader program
    pub fn new(gl: glow::Context) -> ViewerResult<Self> {
        let program =
            Self::create_shader_program(&gl, TOOLPATH_VERTEX_SHADER, TOOLPATH_FRAGMENT_SHADER)?;
        Ok(Self {
            gl,
            program,
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            next_handle: 1,
            view_projection: Mat4::IDENTITY,
            light_direction: Vec3::new(-0.3, -1.0, -0.7).normalize(),
        })
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    pub fn set_light_direction(&mut self, direction: Vec3) {
        self.light_direction = direction.normalize_or_zero();
    }

    fn allocate_handle(&mut self) -> GpuHandle {
        let handle = GpuHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn create_buffer(&self, target: u32, bytes: &[u8]) -> Result<glow::Buffer, GlError> {
        unsafe {
            let buffer = self.gl.create_buffer().map_err(GlError::BufferError)?;
            self.gl.bind_buffer(target, Some(buffer));
            self.gl.buffer_data_u8_slice(target, bytes, glow::STATIC_DRAW);
            self.gl.bind_buffer(target, None);
            Ok(buffer)
        }
    }

    fn vertex_array(
        &mut self,
        vertices: GpuHandle,
        indices: GpuHandle,
    ) -> Result<glow::VertexArray, GlError> {
        if let Some(vao) = self.vertex_arrays.get(&(vertices.0, indices.0)) {
            return Ok(*vao);
        }
        let vbo = self
            .vertex_buffers
            .get(&vertices.0)
            .ok_or(GlError::UnknownHandle(vertices.0))?;
        let ebo = *self
            .index_buffers
            .get(&indices.0)
            .ok_or(GlError::UnknownHandle(indices.0))?;
        let format = vbo.format;
        let stride = format.vertex_size_bytes() as i32;

        let vao = unsafe {
            let vao = self
                .gl
                .create_vertex_array()
                .map_err(GlError::BufferError)?;
            self.gl.bind_vertex_array(Some(vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo.buffer));
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));

            // Position (location 0)
            self.gl
                .vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            self.gl.enable_vertex_attrib_array(0);

            // Normal (location 1), missing components read as zero
            if let Some(offset) = format.normal_offset_floats() {
                self.gl.vertex_attrib_pointer_f32(
                    1,
                    format.normal_size() as i32,
                    glow::FLOAT,
                    false,
                    stride,
                    (offset * std::mem::size_of::<f32>()) as i32,
                );
                self.gl.enable_vertex_attrib_array(1);
            }

            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
            vao
        };
        self.vertex_arrays.insert((vertices.0, indices.0), vao);
        Ok(vao)
    }

    fn drop_vertex_arrays_using(&mut self, handle: u32) {
        let stale: Vec<(u32, u32)> = self
            .vertex_arrays
            .keys()
            .filter(|(v, i)| *v == handle || *i == handle)
            .copied()
            .collect();
        for key in stale {
            if let Some(vao) = self.vertex_arrays.remove(&key) {
                unsafe { self.gl.delete_vertex_array(vao) };
            }
        }
    }

    fn create_shader_program(
        gl: &glow::Context,
        vs_source: &str,
        fs_source: &str,
    ) -> Result<glow::Program, GlError> {
        unsafe {
            let vs = gl
                .create_shader(glow::VERTEX_SHADER)
                .map_err(GlError::ShaderError)?;
            gl.shader_source(vs, vs_source);
            gl.compile_shader(vs);

            if !gl.get_shader_compile_status(vs) {
                let info = gl.get_shader_info_log(vs);
                gl.delete_shader(vs);
                return Err(GlError::ShaderError(format!("Vertex shader: {}", info)));
            }

            let fs = gl
                .create_shader(glow::FRAGMENT_SHADER)
                .map_err(GlError::ShaderError)?;
            gl.shader_source(fs, fs_source);
            gl.compile_shader(fs);

            if !gl.get_shader_compile_status(fs) {
                let info = gl.get_shader_info_log(fs);
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(GlError::ShaderError(format!("Fragment shader: {}", info)));
            }

            let program = gl.create_program().map_err(GlError::ShaderError)?;
            gl.attach_shader(program, vs);
            gl.attach_shader(program, fs);
            gl.link_program(program);

            if !gl.get_program_link_status(program) {
                let info = gl.get_program_info_log(program);
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                gl.delete_program(program);
                return Err(GlError::ShaderError(format!("Program linking: {}", info)));
            }

            gl.delete_shader(vs);
            gl.delete_shader(fs);

            Ok(program)
        }
    }
}

fn draw_mode(kind: PrimitiveKind) -> u32 {
    match kind {
        PrimitiveKind::Point => glow::POINTS,
        PrimitiveKind::Line => glow::LINES,
        PrimitiveKind::Triangle => glow::TRIANGLES,
    }
}

impl GpuBackend for GlBackend {
    fn upload_vertices(&mut self, format: VertexFormat, data: &[f32]) -> ViewerResult<GpuHandle> {
        let buffer = self.create_buffer(glow::ARRAY_BUFFER, bytemuck::cast_slice(data))?;
        let handle = self.allocate_handle();
        self.vertex_buffers
            .insert(handle.0, VertexBuffer { buffer, format });
        Ok(handle)
    }

    fn upload_indices(&mut self, data: &[u16]) -> ViewerResult<GpuHandle> {
        let buffer = self.create_buffer(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(data))?;
        let handle = self.allocate_handle();
        self.index_buffers.insert(handle.0, buffer);
        Ok(handle)
    }

    fn release(&mut self, handle: GpuHandle) {
        self.drop_vertex_arrays_using(handle.0);
        if let Some(vbo) = self.vertex_buffers.remove(&handle.0) {
            unsafe { self.gl.delete_buffer(vbo.buffer) };
        } else if let Some(ebo) = self.index_buffers.remove(&handle.0) {
            unsafe { self.gl.delete_buffer(ebo) };
        } else {
            debug!("Release of unknown GPU handle {}", handle.0);
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> ViewerResult<()> {
        let vao = self.vertex_array(call.vertices, call.indices)?;
        let mode = draw_mode(call.kind);
        let color = call.color.to_rgba(1.0);

        unsafe {
            self.gl.use_program(Some(self.program));
            if let Some(loc) = self.gl.get_uniform_location(self.program, "view_projection") {
                self.gl.uniform_matrix_4_f32_slice(
                    Some(&loc),
                    false,
                    &self.view_projection.to_cols_array(),
                );
            }
            if let Some(loc) = self.gl.get_uniform_location(self.program, "uniform_color") {
                self.gl
                    .uniform_4_f32(Some(&loc), color[0], color[1], color[2], color[3]);
            }
            if let Some(loc) = self.gl.get_uniform_location(self.program, "light_direction") {
                let d = self.light_direction;
                self.gl.uniform_3_f32(Some(&loc), d.x, d.y, d.z);
            }

            self.gl.enable(glow::DEPTH_TEST);
            self.gl.bind_vertex_array(Some(vao));
            // glow exposes no glMultiDrawElements; one draw per range on the shared VAO
            for range in call.ranges {
                self.gl.draw_elements(
                    mode,
                    range.count as i32,
                    glow::UNSIGNED_SHORT,
                    range.offset_bytes() as i32,
                );
            }
            self.gl.bind_vertex_array(None);
            self.gl.use_program(None);
        }
        Ok(())
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        unsafe {
            for (_, vao) in self.vertex_arrays.drain() {
                self.gl.delete_vertex_array(vao);
            }
            for (_, vbo) in self.vertex_buffers.drain() {
                self.gl.delete_buffer(vbo.buffer);
            }
            for (_, ebo) in self.index_buffers.drain() {
                self.gl.delete_buffer(ebo);
            }
            self.gl.delete_program(self.program);
        }
    }
}
