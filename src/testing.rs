//! In-memory platform for tests and demos
//!
//! [`FakePlatform`] resolves string ids to containers it was told about and
//! hands out [`FakeSurface`]s that record everything done to them. Readiness
//! is driven by hand with [`FakeSurface::simulate_ready`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::audio::AudioLevelSource;
use crate::binding::StreamBinding;
use crate::event::{BusEvent, Event, EventKind};
use crate::media::MediaStreamHandle;
use crate::sink::{
    ContainerRef, InsertMode, ListenerId, MirrorOverlay, PlaybackProps, ReadinessListener, Sink,
    SinkError, SinkHandle, SinkId, SurfacePlatform, TargetElement,
};

/// Container -> whether it has a parent (sibling placement possible)
type Containers = Arc<Mutex<HashMap<ContainerRef, bool>>>;

#[derive(Default)]
struct SurfaceState {
    mounted: Option<(ContainerRef, InsertMode)>,
    source: Option<MediaStreamHandle>,
    playback: Option<PlaybackProps>,
    listeners: Vec<(ListenerId, ReadinessListener)>,
    next_listener: u64,
    ready: bool,
}

/// Recording sink
///
/// A surface that already has a frame fires newly attached listeners
/// synchronously, like a media element whose data is already buffered.
pub struct FakeSurface {
    id: SinkId,
    containers: Containers,
    state: Mutex<SurfaceState>,
}

impl FakeSurface {
    fn new(id: SinkId, containers: Containers) -> Self {
        Self {
            id,
            containers,
            state: Mutex::new(SurfaceState::default()),
        }
    }

    /// Stream currently shown
    pub fn source(&self) -> Option<MediaStreamHandle> {
        self.state.lock().source.clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted.is_some()
    }

    pub fn mount_point(&self) -> Option<(ContainerRef, InsertMode)> {
        self.state.lock().mounted
    }

    /// Last playback properties applied
    pub fn playback(&self) -> Option<PlaybackProps> {
        self.state.lock().playback
    }

    /// Listeners attached and not yet fired
    pub fn pending_listeners(&self) -> usize {
        self.state.lock().listeners.len()
    }

    /// Signal the first frame, firing every pending listener
    ///
    /// Returns the number of listeners fired.
    pub fn simulate_ready(&self) -> usize {
        let listeners = {
            let mut state = self.state.lock();
            state.ready = true;
            std::mem::take(&mut state.listeners)
        };

        let fired = listeners.len();
        for (_, listener) in listeners {
            listener();
        }
        fired
    }
}

impl Sink for FakeSurface {
    fn id(&self) -> SinkId {
        self.id
    }

    fn mount(&self, container: ContainerRef, mode: InsertMode) -> Result<(), SinkError> {
        let has_parent = self
            .containers
            .lock()
            .get(&container)
            .copied()
            .ok_or(SinkError::ContainerGone(container))?;

        if mode.needs_parent() && !has_parent {
            return Err(SinkError::NoParent { container, mode });
        }

        self.state.lock().mounted = Some((container, mode));
        Ok(())
    }

    fn unmount(&self) {
        self.state.lock().mounted = None;
    }

    fn set_source(&self, source: Option<&MediaStreamHandle>) {
        self.state.lock().source = source.cloned();
    }

    fn apply_playback(&self, props: PlaybackProps) {
        self.state.lock().playback = Some(props);
    }

    fn attach_readiness_listener(&self, listener: ReadinessListener) -> ListenerId {
        let mut state = self.state.lock();
        state.next_listener += 1;
        let id = ListenerId::new(state.next_listener);

        if state.ready {
            drop(state);
            listener();
        } else {
            state.listeners.push((id, listener));
        }
        id
    }

    fn detach_readiness_listener(&self, id: ListenerId) {
        self.state.lock().listeners.retain(|(existing, _)| *existing != id);
    }
}

impl fmt::Debug for FakeSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FakeSurface")
            .field("id", &self.id)
            .field("mounted", &state.mounted)
            .field("ready", &state.ready)
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

/// Recording mirror overlay
#[derive(Debug, Clone)]
pub struct FakeMirror {
    sink: SinkId,
    removed: Arc<AtomicBool>,
}

impl FakeMirror {
    /// Sink the overlay mirrors
    pub fn sink(&self) -> SinkId {
        self.sink
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }
}

impl MirrorOverlay for FakeMirror {
    fn remove(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }
}

/// In-memory [`SurfacePlatform`]
#[derive(Default)]
pub struct FakePlatform {
    next_id: AtomicU64,
    ids: Mutex<HashMap<String, ContainerRef>>,
    containers: Containers,
    surfaces: Mutex<Vec<Arc<FakeSurface>>>,
    created: AtomicU64,
    mirrors: Mutex<Vec<FakeMirror>>,
    fail_mirrors: AtomicBool,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_raw(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn register(&self, id: &str, has_parent: bool) -> ContainerRef {
        let container = ContainerRef::new(self.next_raw());
        self.containers.lock().insert(container, has_parent);
        self.ids.lock().insert(id.to_string(), container);
        container
    }

    /// Register a container reachable as `id`
    pub fn add_container(&self, id: &str) -> ContainerRef {
        self.register(id, true)
    }

    /// Register a parentless container; sibling placement against it fails
    pub fn add_root_container(&self, id: &str) -> ContainerRef {
        self.register(id, false)
    }

    /// Drop a container, as if it left the layout
    pub fn remove_container(&self, id: &str) {
        if let Some(container) = self.ids.lock().remove(id) {
            self.containers.lock().remove(&container);
        }
    }

    fn new_surface(&self) -> Arc<FakeSurface> {
        let surface = Arc::new(FakeSurface::new(
            SinkId::new(self.next_raw()),
            Arc::clone(&self.containers),
        ));
        self.surfaces.lock().push(Arc::clone(&surface));
        surface
    }

    /// A surface the application owns, not created through a binding
    pub fn detached_surface(&self) -> Arc<FakeSurface> {
        self.new_surface()
    }

    /// Look up any surface this platform handed out
    pub fn surface(&self, id: SinkId) -> Option<Arc<FakeSurface>> {
        self.surfaces
            .lock()
            .iter()
            .find(|surface| surface.id == id)
            .cloned()
    }

    /// Number of surfaces built through `create_sink`
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed) as usize
    }

    /// Mirror overlays handed out so far
    pub fn mirrors(&self) -> Vec<FakeMirror> {
        self.mirrors.lock().clone()
    }

    /// Make `create_mirror` fail
    pub fn fail_mirrors(&self, fail: bool) {
        self.fail_mirrors.store(fail, Ordering::SeqCst);
    }
}

impl SurfacePlatform for FakePlatform {
    fn resolve_target(&self, target: &TargetElement) -> Option<ContainerRef> {
        let container = match target {
            TargetElement::Container(container) => *container,
            TargetElement::Id(id) => *self.ids.lock().get(id)?,
        };
        self.containers
            .lock()
            .contains_key(&container)
            .then_some(container)
    }

    fn create_sink(&self, _stream: &MediaStreamHandle) -> SinkHandle {
        self.created.fetch_add(1, Ordering::Relaxed);
        self.new_surface()
    }

    fn create_mirror(&self, sink: &SinkHandle) -> Result<Box<dyn MirrorOverlay>, SinkError> {
        if self.fail_mirrors.load(Ordering::SeqCst) {
            return Err(SinkError::Mirror(format!("overlay unavailable for {}", sink.id())));
        }

        let mirror = FakeMirror {
            sink: sink.id(),
            removed: Arc::new(AtomicBool::new(false)),
        };
        self.mirrors.lock().push(mirror.clone());
        Ok(Box::new(mirror))
    }
}

impl fmt::Debug for FakePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakePlatform")
            .field("containers", &self.containers.lock().len())
            .field("surfaces", &self.surfaces.lock().len())
            .finish()
    }
}

/// Level source replaying a fixed script, then holding the last value
#[derive(Debug)]
pub struct ScriptedLevels {
    levels: Mutex<VecDeque<f64>>,
    last: Mutex<f64>,
}

impl ScriptedLevels {
    pub fn new(levels: impl IntoIterator<Item = f64>) -> Self {
        Self {
            levels: Mutex::new(levels.into_iter().collect()),
            last: Mutex::new(crate::audio::SILENCE_DB),
        }
    }
}

impl AudioLevelSource for ScriptedLevels {
    fn level(&self) -> f64 {
        let mut last = self.last.lock();
        if let Some(next) = self.levels.lock().pop_front() {
            *last = next;
        }
        *last
    }
}

/// Records every event a binding emits
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    /// Subscribe to every event kind on `binding`
    pub fn attach(binding: &StreamBinding) -> Self {
        let log = Self::default();
        for kind in EventKind::ALL {
            let events = Arc::clone(&log.events);
            binding.on(kind, move |event| events.lock().push(event.clone()));
        }
        log
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|event| event.kind()).collect()
    }
}
