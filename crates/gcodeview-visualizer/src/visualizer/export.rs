//! Triangle soup extraction and Wavefront OBJ output.

use super::primitive::PrimitiveKind;
use super::tbuffer::TBuffer;
use gcodeview_core::Color;
use glam::Vec3;
use std::collections::HashMap;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Indexed triangles with one color per triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleSoup {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub colors: Vec<Color>,
}

impl TriangleSoup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.triangles.clear();
        self.colors.clear();
    }

    /// Write as OBJ, one group per color run.
    pub fn write_obj<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "# G-code toolpaths")?;
        writeln!(
            out,
            "# {} vertices, {} triangles",
            self.positions.len(),
            self.triangles.len()
        )?;
        for p in &self.positions {
            writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
        }

        let mut current: Option<Color> = None;
        for (triangle, color) in self.triangles.iter().zip(&self.colors) {
            if current != Some(*color) {
                writeln!(out, "g toolpath_{}", color.to_hex().trim_start_matches('#'))?;
                current = Some(*color);
            }
            writeln!(
                out,
                "f {} {} {}",
                triangle[0] + 1,
                triangle[1] + 1,
                triangle[2] + 1
            )?;
        }
        Ok(())
    }

    pub fn save_obj(&self, path: &Path) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write_obj(&mut out)?;
        out.flush()
    }
}

/// Append the triangles currently batched for drawing in `buffer`.
///
/// Degenerate triangles are skipped and vertices shared inside a chunk are emitted once.
/// Returns the number of triangles added; 0 when the buffer is not a triangle buffer or
/// its CPU data was released.
pub fn export_triangles(buffer: &TBuffer, soup: &mut TriangleSoup) -> usize {
    if buffer.kind() != PrimitiveKind::Triangle || !buffer.chunks().has_cpu_data() {
        return 0;
    }

    let chunks = buffer.chunks();
    let mut remap: HashMap<(usize, u16), u32> = HashMap::new();
    let mut added = 0;

    for render_path in buffer.render_paths() {
        let chunk_id = render_path.index_chunk_id;
        let Some(index_chunk) = chunks.index_chunk(chunk_id) else {
            continue;
        };
        let indices = index_chunk.data();

        for range in &render_path.ranges {
            let end = (range.offset + range.count).min(indices.len());
            let Some(slice) = indices.get(range.offset..end) else {
                continue;
            };
            for tri in slice.chunks_exact(3) {
                if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                    continue;
                }
                let mut mapped = [0u32; 3];
                for (slot, &vertex) in mapped.iter_mut().zip(tri) {
                    let next = soup.positions.len() as u32;
                    *slot = *remap.entry((chunk_id, vertex)).or_insert_with(|| {
                        soup.positions.push(
                            chunks
                                .vertex_position(chunk_id, vertex)
                                .unwrap_or(Vec3::ZERO),
                        );
                        next
                    });
                }
                soup.triangles.push(mapped);
                soup.colors.push(render_path.color);
                added += 1;
            }
        }
    }
    added
}
