use std::{fmt, hash::Hash, marker::PhantomData};

pub trait ResourceKind {
    const NAME: &'static str;
}

#[derive(Debug)]
pub struct VertexBuffer;
impl ResourceKind for VertexBuffer {
    const NAME: &'static str = "vertex buffer";
}

#[derive(Debug)]
pub struct IndexBuffer;
impl ResourceKind for IndexBuffer {
    const NAME: &'static str = "index buffer";
}

#[derive(Debug)]
pub struct UniformBuffer;
impl ResourceKind for UniformBuffer {
    const NAME: &'static str = "uniform buffer";
}

#[derive(Debug)]
pub struct Texture;
impl ResourceKind for Texture {
    const NAME: &'static str = "texture";
}

#[derive(Debug)]
pub struct Sampler;
impl ResourceKind for Sampler {
    const NAME: &'static str = "sampler";
}

/// Generation-checked index into the owning device's arena for `T`.
/// Handles stay valid until the deferred release for them executes on the
/// RHI thread; after that the generation no longer matches and any use is
/// a panic, not a dangling pointer.
pub struct Handle<T: ResourceKind> {
    index: u32,
    generation: u32,
    _marker: PhantomData<T>,
}

impl<T: ResourceKind> Handle<T> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T: ResourceKind> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ResourceKind> Copy for Handle<T> {}

impl<T: ResourceKind> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T: ResourceKind> Eq for Handle<T> {}

impl<T: ResourceKind> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T: ResourceKind> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({}v{})", T::NAME, self.index, self.generation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Live,
    PendingRelease,
}

struct Slot {
    generation: u32,
    state: SlotState,
}

/// Slot arena backing one resource kind. The explicit, inspectable half of
/// deferred destruction: `retire` marks a slot on the producer side, the
/// deferred-release closure calls `free` once the backend object is gone.
pub struct HandleArena<T: ResourceKind> {
    slots: Vec<Slot>,
    free: Vec<u32>,
    _marker: PhantomData<T>,
}

impl<T: ResourceKind> HandleArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn allocate(&mut self) -> Handle<T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Free,
                });
                self.slots.len() as u32 - 1
            }
        };

        let slot = &mut self.slots[index as usize];
        debug_assert_eq!(slot.state, SlotState::Free);
        slot.state = SlotState::Live;

        Handle {
            index,
            generation: slot.generation,
            _marker: PhantomData,
        }
    }

    fn slot(&mut self, handle: Handle<T>) -> &mut Slot {
        let slot = &mut self.slots[handle.index as usize];
        assert_eq!(
            slot.generation,
            handle.generation,
            "stale {} handle",
            T::NAME
        );

        slot
    }

    /// Producer side of destruction: the handle may no longer be recorded
    /// against, but the slot is not reusable until [`Self::free`] runs.
    pub fn retire(&mut self, handle: Handle<T>) {
        let slot = self.slot(handle);
        assert_eq!(
            slot.state,
            SlotState::Live,
            "double-destroy of a {} handle",
            T::NAME
        );

        slot.state = SlotState::PendingRelease;
    }

    /// RHI-thread side of destruction, called after the backend object died.
    pub fn free(&mut self, handle: Handle<T>) {
        let slot = self.slot(handle);
        assert_eq!(slot.state, SlotState::PendingRelease);

        slot.generation += 1;
        slot.state = SlotState::Free;
        self.free.push(handle.index);
    }

    pub fn is_live(&self, handle: Handle<T>) -> bool {
        self.slots
            .get(handle.index as usize)
            .map(|slot| slot.generation == handle.generation && slot.state == SlotState::Live)
            .unwrap_or(false)
    }

    /// Slots not yet reclaimed, including those awaiting deferred release.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state != SlotState::Free)
            .count()
    }
}

impl<T: ResourceKind> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
