use std::collections::HashMap;
use std::fmt;

use crate::gpu::error::ValidationError;
use crate::{Buffer, Texture};

use super::types::{AspectMask, Handle, ResourceUse, UsageBits};

/// Level/layer count meaning "everything from the base onwards".
pub const REMAINING: u32 = u32::MAX;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_mip: u32,
    pub level_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
    pub aspect: AspectMask,
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self {
            base_mip: Default::default(),
            level_count: 1,
            base_layer: Default::default(),
            layer_count: 1,
            aspect: AspectMask::ALL,
        }
    }
}

impl SubresourceRange {
    pub fn new(base_mip: u32, level_count: u32, base_layer: u32, layer_count: u32) -> Self {
        Self {
            base_mip,
            level_count,
            base_layer,
            layer_count,
            aspect: AspectMask::ALL,
        }
    }

    /// Every mip, layer and aspect of a resource. Buffers are tracked with this range.
    pub fn whole() -> Self {
        Self::new(0, REMAINING, 0, REMAINING)
    }

    pub fn with_aspect(mut self, aspect: AspectMask) -> Self {
        self.aspect = aspect;
        self
    }

    /// Two ranges overlap unless they are provably disjoint in aspect, mip or layer.
    pub fn overlaps(&self, other: &SubresourceRange) -> bool {
        self.aspect.intersects(other.aspect)
            && spans_intersect(
                (self.base_mip, self.level_count),
                (other.base_mip, other.level_count),
            )
            && spans_intersect(
                (self.base_layer, self.layer_count),
                (other.base_layer, other.layer_count),
            )
    }
}

fn span_end(base: u32, count: u32) -> u64 {
    if count == REMAINING {
        u64::MAX
    } else {
        base as u64 + count as u64
    }
}

fn spans_intersect(a: (u32, u32), b: (u32, u32)) -> bool {
    let (a_start, a_end) = (a.0 as u64, span_end(a.0, a.1));
    let (b_start, b_end) = (b.0 as u64, span_end(b.0, b.1));
    a_start < b_end && b_start < a_end
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Buffer(Handle<Buffer>),
    Texture(Handle<Texture>),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Buffer(h) => write!(f, "buffer {:?}", h),
            ResourceId::Texture(h) => write!(f, "texture {:?}", h),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UsageClass {
    Read,
    Write,
    ReadWrite,
}

/// An attachment that is resolved at pass end is written and then read by the
/// resolve, which counts as the single attachment usage.
fn fold_attachment_usage(bits: UsageBits) -> UsageBits {
    if bits.contains(UsageBits::RT_WRITE) {
        bits - UsageBits::RESOLVE_SRC
    } else {
        bits
    }
}

/// A write combined with any other distinct usage kind. Repeating the same kind is fine.
pub fn is_hazard(bits: UsageBits) -> bool {
    let bits = fold_attachment_usage(bits);
    bits.intersects(UsageBits::WRITE) && bits.bits().count_ones() > 1
}

pub fn classify(bits: UsageBits) -> Option<UsageClass> {
    let bits = fold_attachment_usage(bits);
    match (bits.intersects(UsageBits::READ), bits.intersects(UsageBits::WRITE)) {
        (false, false) => None,
        (true, false) => Some(UsageClass::Read),
        (false, true) if bits.bits().count_ones() == 1 => Some(UsageClass::Write),
        _ => Some(UsageClass::ReadWrite),
    }
}

const NO_ORIGIN: u32 = u32::MAX;

/// Usages of one resource range together with the command that first introduced each kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub resource: ResourceId,
    pub range: SubresourceRange,
    pub usage: UsageBits,
    first_use: [u32; ResourceUse::COUNT],
}

impl UsageEntry {
    fn new(resource: ResourceId, range: SubresourceRange) -> Self {
        Self {
            resource,
            range,
            usage: UsageBits::empty(),
            first_use: [NO_ORIGIN; ResourceUse::COUNT],
        }
    }

    pub fn origin_of(&self, usage: ResourceUse) -> Option<u32> {
        match self.first_use[usage as usize] {
            NO_ORIGIN => None,
            origin => Some(origin),
        }
    }

    fn uses(&self) -> impl Iterator<Item = (ResourceUse, u32)> + '_ {
        ResourceUse::ALL
            .into_iter()
            .filter_map(move |u| self.origin_of(u).map(|origin| (u, origin)))
    }
}

/// Accumulates the usages of one recording scope (a pass or a bundle).
#[derive(Default)]
pub struct UsageTracker {
    entries: Vec<UsageEntry>,
    index: HashMap<(ResourceId, SubresourceRange), usize>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Records `usage` on the range. Re-adding a known record keeps its first origin.
    pub fn add_usage(
        &mut self,
        resource: ResourceId,
        range: SubresourceRange,
        usage: ResourceUse,
        origin: u32,
    ) {
        let entries = &mut self.entries;
        let idx = *self.index.entry((resource, range)).or_insert_with(|| {
            entries.push(UsageEntry::new(resource, range));
            entries.len() - 1
        });

        let entry = &mut self.entries[idx];
        let slot = &mut entry.first_use[usage as usize];
        if *slot == NO_ORIGIN {
            *slot = origin;
            entry.usage |= usage.bits();
        }
    }

    pub fn add_buffer_usage(&mut self, buffer: Handle<Buffer>, usage: ResourceUse, origin: u32) {
        self.add_usage(
            ResourceId::Buffer(buffer),
            SubresourceRange::whole(),
            usage,
            origin,
        );
    }

    pub fn add_texture_usage(
        &mut self,
        texture: Handle<Texture>,
        range: SubresourceRange,
        usage: ResourceUse,
        origin: u32,
    ) {
        self.add_usage(ResourceId::Texture(texture), range, usage, origin);
    }

    /// Folds a frozen summary in. Every merged usage is attributed to `origin`.
    pub fn merge(&mut self, summary: &UsageSummary, origin: u32) {
        for entry in &summary.entries {
            for usage in ResourceUse::ALL {
                if entry.usage.contains(usage.bits()) {
                    self.add_usage(entry.resource, entry.range, usage, origin);
                }
            }
        }
    }

    /// Checks every pair of overlapping ranges and freezes the scope's usages.
    pub fn finalize(&self) -> Result<UsageSummary, ValidationError> {
        for (i, entry) in self.entries.iter().enumerate() {
            let mut uses: Vec<(u32, ResourceUse)> = entry.uses().map(|(u, o)| (o, u)).collect();
            for (j, other) in self.entries.iter().enumerate() {
                if i != j && other.resource == entry.resource && other.range.overlaps(&entry.range)
                {
                    uses.extend(other.uses().map(|(u, o)| (o, u)));
                }
            }

            let combined = uses
                .iter()
                .fold(UsageBits::empty(), |acc, (_, u)| acc | u.bits());
            if !is_hazard(combined) {
                continue;
            }

            // Replay in recording order; the command that tips the set into a hazard is blamed.
            uses.sort_by_key(|(origin, u)| (*origin, *u as usize));
            let mut seen = UsageBits::empty();
            for (origin, usage) in uses {
                seen |= usage.bits();
                if is_hazard(seen) {
                    return Err(ValidationError::ResourceConflict {
                        resource: entry.resource,
                        range: entry.range,
                        usages: seen,
                        command: origin,
                    });
                }
            }
        }

        Ok(UsageSummary {
            entries: self.entries.clone(),
        })
    }
}

/// Frozen result of [`UsageTracker::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSummary {
    entries: Vec<UsageEntry>,
}

impl UsageSummary {
    pub fn entries(&self) -> &[UsageEntry] {
        &self.entries
    }

    /// Union of every usage recorded on any range of `resource`.
    pub fn usage_of(&self, resource: ResourceId) -> UsageBits {
        self.entries
            .iter()
            .filter(|e| e.resource == resource)
            .fold(UsageBits::empty(), |acc, e| acc | e.usage)
    }

    pub fn classify(&self, resource: ResourceId) -> Option<UsageClass> {
        classify(self.usage_of(resource))
    }

    pub fn any_usage(&self, bits: UsageBits) -> bool {
        self.entries.iter().any(|e| e.usage.intersects(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(slot: u16) -> Handle<Buffer> {
        Handle::new(slot, 0)
    }

    fn texture(slot: u16) -> Handle<Texture> {
        Handle::new(slot, 0)
    }

    #[test]
    fn repeated_identical_usage_is_not_a_hazard() {
        let mut tracker = UsageTracker::new();
        for i in 0..1000 {
            tracker.add_buffer_usage(buffer(1), ResourceUse::UniformRead, i);
        }
        let summary = tracker.finalize().unwrap();
        assert_eq!(summary.entries().len(), 1);
        assert_eq!(
            summary.classify(ResourceId::Buffer(buffer(1))),
            Some(UsageClass::Read)
        );
    }

    #[test]
    fn storage_write_is_repeatable() {
        let mut tracker = UsageTracker::new();
        tracker.add_buffer_usage(buffer(1), ResourceUse::StorageWrite, 0);
        tracker.add_buffer_usage(buffer(1), ResourceUse::StorageWrite, 4);
        assert!(tracker.finalize().is_ok());
    }

    #[test]
    fn read_write_blames_later_command() {
        let mut tracker = UsageTracker::new();
        tracker.add_buffer_usage(buffer(2), ResourceUse::StorageWrite, 3);
        tracker.add_buffer_usage(buffer(2), ResourceUse::VertexInput, 7);
        tracker.add_buffer_usage(buffer(3), ResourceUse::VertexInput, 1);

        match tracker.finalize() {
            Err(ValidationError::ResourceConflict {
                resource, command, usages, ..
            }) => {
                assert_eq!(resource, ResourceId::Buffer(buffer(2)));
                assert_eq!(command, 7);
                assert_eq!(usages, UsageBits::STORAGE_WRITE | UsageBits::VERTEX_READ);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn distinct_writes_conflict() {
        let mut tracker = UsageTracker::new();
        let range = SubresourceRange::new(0, 1, 0, 1).with_aspect(AspectMask::COLOR);
        tracker.add_texture_usage(texture(1), range, ResourceUse::ColorAttachmentWrite, 0);
        tracker.add_texture_usage(texture(1), range, ResourceUse::StorageWrite, 2);
        assert!(tracker.finalize().is_err());
    }

    #[test]
    fn disjoint_mips_do_not_conflict() {
        let mut tracker = UsageTracker::new();
        let mip0 = SubresourceRange::new(0, 1, 0, 1).with_aspect(AspectMask::COLOR);
        let mip1 = SubresourceRange::new(1, 1, 0, 1).with_aspect(AspectMask::COLOR);
        tracker.add_texture_usage(texture(1), mip0, ResourceUse::ColorAttachmentWrite, 0);
        tracker.add_texture_usage(texture(1), mip1, ResourceUse::Sampled, 1);
        assert!(tracker.finalize().is_ok());
    }

    #[test]
    fn unknown_extents_overlap_conservatively() {
        let attachment = SubresourceRange::new(3, 1, 2, 1);
        let sampled = SubresourceRange::new(0, REMAINING, 0, REMAINING);
        assert!(attachment.overlaps(&sampled));

        let mut tracker = UsageTracker::new();
        tracker.add_texture_usage(texture(4), attachment, ResourceUse::DepthStencilWrite, 0);
        tracker.add_texture_usage(texture(4), sampled, ResourceUse::Sampled, 1);
        assert!(tracker.finalize().is_err());
    }

    #[test]
    fn disjoint_aspects_do_not_conflict() {
        let depth = SubresourceRange::default().with_aspect(AspectMask::DEPTH);
        let stencil = SubresourceRange::default().with_aspect(AspectMask::STENCIL);
        assert!(!depth.overlaps(&stencil));

        let mut tracker = UsageTracker::new();
        tracker.add_texture_usage(texture(5), depth, ResourceUse::DepthStencilWrite, 0);
        tracker.add_texture_usage(texture(5), stencil, ResourceUse::Sampled, 1);
        assert!(tracker.finalize().is_ok());
    }

    #[test]
    fn resolved_attachment_is_one_usage() {
        let mut tracker = UsageTracker::new();
        let range = SubresourceRange::default().with_aspect(AspectMask::COLOR);
        tracker.add_texture_usage(texture(6), range, ResourceUse::ColorAttachmentWrite, 0);
        tracker.add_texture_usage(texture(6), range, ResourceUse::ResolveSource, 0);
        let summary = tracker.finalize().unwrap();
        assert_eq!(
            summary.classify(ResourceId::Texture(texture(6))),
            Some(UsageClass::Write)
        );
    }

    #[test]
    fn merge_keeps_summary_deduplicated() {
        let mut bundle = UsageTracker::new();
        bundle.add_buffer_usage(buffer(1), ResourceUse::StorageWrite, 0);
        let summary = bundle.finalize().unwrap();

        let mut pass = UsageTracker::new();
        pass.merge(&summary, 0);
        pass.merge(&summary, 1);
        pass.merge(&summary, 2);
        let merged = pass.finalize().unwrap();
        assert_eq!(merged.entries().len(), 1);
        assert_eq!(merged.entries()[0].origin_of(ResourceUse::StorageWrite), Some(0));
    }
}
