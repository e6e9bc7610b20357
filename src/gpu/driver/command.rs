use std::sync::Arc;

use crate::gpu::backend::ResolvedRenderPass;
use crate::gpu::cmd::RenderBundle;
use crate::{BindGroup, Buffer, IndexType, RenderPipeline};

use super::types::Handle;

//===----------------------------------------------------------------------===//
// Command definitions
//===----------------------------------------------------------------------===//

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    SetPipeline = 0,
    SetBindGroup = 1,
    SetVertexBuffer = 2,
    SetIndexBuffer = 3,
    Draw = 4,
    DrawIndexed = 5,
    DrawIndirect = 6,
    DrawIndexedIndirect = 7,
    ExecuteBundles = 8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetBindGroup {
    pub index: u32,
    pub group: Handle<BindGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetVertexBuffer {
    pub slot: u32,
    pub buffer: Handle<Buffer>,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetIndexBuffer {
    pub buffer: Handle<Buffer>,
    pub format: IndexType,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    /// Number of vertices to draw.
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

impl Default for Draw {
    fn default() -> Self {
        Self {
            vertex_count: 3,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexed {
    /// Number of indices to draw.
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

impl Default for DrawIndexed {
    fn default() -> Self {
        Self {
            index_count: 3,
            instance_count: 1,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }
}

/// Draw whose arguments are read from `buffer` at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndirect {
    pub buffer: Handle<Buffer>,
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub enum Command {
    SetPipeline(Handle<RenderPipeline>),
    SetBindGroup(SetBindGroup),
    SetVertexBuffer(SetVertexBuffer),
    SetIndexBuffer(SetIndexBuffer),
    Draw(Draw),
    DrawIndexed(DrawIndexed),
    DrawIndirect(DrawIndirect),
    DrawIndexedIndirect(DrawIndirect),
    ExecuteBundles(Vec<Arc<RenderBundle>>),
}

impl Command {
    pub fn op(&self) -> Op {
        match self {
            Command::SetPipeline(_) => Op::SetPipeline,
            Command::SetBindGroup(_) => Op::SetBindGroup,
            Command::SetVertexBuffer(_) => Op::SetVertexBuffer,
            Command::SetIndexBuffer(_) => Op::SetIndexBuffer,
            Command::Draw(_) => Op::Draw,
            Command::DrawIndexed(_) => Op::DrawIndexed,
            Command::DrawIndirect(_) => Op::DrawIndirect,
            Command::DrawIndexedIndirect(_) => Op::DrawIndexedIndirect,
            Command::ExecuteBundles(_) => Op::ExecuteBundles,
        }
    }
}

//===----------------------------------------------------------------------===//
// Command list
//===----------------------------------------------------------------------===//

/// Validated commands of one pass or bundle, in recording order.
#[derive(Debug, Clone, Default)]
pub struct CommandList {
    commands: Vec<Command>,
}

impl CommandList {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Replays the list into `sink`. Executed bundles are expanded in place, once per
    /// listed occurrence, followed by a binding reset. Returns the number of commands
    /// delivered.
    pub fn append<S: CommandSink>(&self, sink: &mut S) -> usize {
        let mut cnt = 0;
        for cmd in self.iter() {
            match cmd {
                Command::SetPipeline(p) => sink.set_pipeline(*p),
                Command::SetBindGroup(c) => sink.set_bind_group(c),
                Command::SetVertexBuffer(c) => sink.set_vertex_buffer(c),
                Command::SetIndexBuffer(c) => sink.set_index_buffer(c),
                Command::Draw(c) => sink.draw(c),
                Command::DrawIndexed(c) => sink.draw_indexed(c),
                Command::DrawIndirect(c) => sink.draw_indirect(c),
                Command::DrawIndexedIndirect(c) => sink.draw_indexed_indirect(c),
                Command::ExecuteBundles(bundles) => {
                    for bundle in bundles {
                        cnt += bundle.commands().append(sink);
                    }
                    if !bundles.is_empty() {
                        sink.reset_bindings();
                    }
                    continue;
                }
            }
            cnt += 1;
        }
        cnt
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Receiver of a replayed command stream, typically a backend command buffer.
pub trait CommandSink {
    fn begin_render_pass(&mut self, pass: &ResolvedRenderPass);
    fn end_render_pass(&mut self);
    fn set_pipeline(&mut self, pipeline: Handle<RenderPipeline>);
    fn set_bind_group(&mut self, cmd: &SetBindGroup);
    fn set_vertex_buffer(&mut self, cmd: &SetVertexBuffer);
    fn set_index_buffer(&mut self, cmd: &SetIndexBuffer);
    fn draw(&mut self, cmd: &Draw);
    fn draw_indexed(&mut self, cmd: &DrawIndexed);
    fn draw_indirect(&mut self, cmd: &DrawIndirect);
    fn draw_indexed_indirect(&mut self, cmd: &DrawIndirect);
    /// Called after executed bundles; the pass has no bindings afterwards.
    fn reset_bindings(&mut self) {}
}
