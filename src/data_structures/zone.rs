//! Zones and the manager that keeps exactly one of them active.

use std::{
    cell::{Cell, Ref, RefCell},
    collections::HashMap,
    rc::{Rc, Weak},
};

use serde_json::Value;

use crate::{
    components::{BehaviorRegistry, ComponentRegistry, optional_str},
    data_structures::scene_graph::{NodeId, Scene},
    error::ConfigError,
    gpu::shader::Shader,
    message::{Handler, Message, MessageBus},
    resources::{Resource, ResourceManager, resource_loaded_code},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneState {
    Uninitialized,
    Loading,
    Updating,
}

pub struct Zone {
    id: u32,
    name: String,
    description: String,
    scene: Scene,
    state: ZoneState,
}

fn optional_array<'a>(
    json: &'a Value,
    context: &'static str,
    field: &'static str,
) -> Result<&'a [Value], ConfigError> {
    match json.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(values)) => Ok(values),
        Some(_) => Err(ConfigError::InvalidField {
            context,
            field,
            expected: "an array",
        }),
    }
}

impl Zone {
    pub fn new(id: u32, name: &str, description: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            scene: Scene::new(),
            state: ZoneState::Uninitialized,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    /// Builds the node tree described by `json.nodes` under the scene root.
    pub fn init(
        &mut self,
        json: &Value,
        components: &ComponentRegistry,
        behaviors: &BehaviorRegistry,
    ) -> anyhow::Result<()> {
        let Some(nodes) = json.get("nodes") else {
            return Err(ConfigError::ZoneHasNoNodes(self.name.clone()).into());
        };
        let nodes = nodes.as_array().ok_or(ConfigError::InvalidField {
            context: "Zone",
            field: "nodes",
            expected: "an array",
        })?;
        let root = self.scene.root();
        for node in nodes {
            load_node(&mut self.scene, root, node, components, behaviors)?;
        }
        Ok(())
    }

    /// Loads the scene. On failure every node that did load is unloaded again
    /// and the zone falls back to `Uninitialized`.
    pub fn load(&mut self) -> anyhow::Result<()> {
        self.state = ZoneState::Loading;
        if let Err(e) = self.scene.load() {
            self.scene.unload();
            self.state = ZoneState::Uninitialized;
            return Err(e);
        }
        self.state = ZoneState::Updating;
        Ok(())
    }

    /// Releases every component and starts over with an empty scene.
    pub fn unload(&mut self) {
        self.scene.unload();
        self.scene = Scene::new();
        self.state = ZoneState::Uninitialized;
    }

    pub fn update(&mut self, time: f32) {
        if self.state == ZoneState::Updating {
            self.scene.update(time);
        }
    }

    pub fn draw(&self, shader: &Shader) -> anyhow::Result<()> {
        if self.state == ZoneState::Updating {
            self.scene.draw(shader)?;
        }
        Ok(())
    }

    pub fn on_activated(&self) {
        log::info!("Zone {} ({}) activated", self.id, self.name);
    }

    pub fn on_deactivated(&self) {
        log::info!("Zone {} ({}) deactivated", self.id, self.name);
    }
}

/// Creates the node for `json` and its subtree, then attaches it to `parent`.
fn load_node(
    scene: &mut Scene,
    parent: NodeId,
    json: &Value,
    components: &ComponentRegistry,
    behaviors: &BehaviorRegistry,
) -> anyhow::Result<()> {
    let name = optional_str(json, "Node", "name")?.unwrap_or_default();
    let id = scene.create_node(&name);
    {
        let node = scene
            .node_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Node {name} vanished while loading"))?;
        if let Some(transform) = json.get("transform") {
            node.transform.set_from_json(transform)?;
        }
        for data in optional_array(json, "Node", "components")? {
            node.add_component(components.extract(data)?);
        }
        for data in optional_array(json, "Node", "behaviors")? {
            node.add_behavior(behaviors.extract(data)?);
        }
    }
    for child in optional_array(json, "Node", "children")? {
        load_node(scene, id, child, components, behaviors)?;
    }
    scene.add_child(parent, id)
}

struct PendingZone {
    id: u32,
    code: String,
    handler: Handler,
    generation: u64,
}

struct ZoneShared {
    zones: RefCell<HashMap<u32, String>>,
    active: RefCell<Option<Zone>>,
    pending: RefCell<Option<PendingZone>>,
    generation: Cell<u64>,
    resources: ResourceManager,
    bus: MessageBus,
    components: Rc<ComponentRegistry>,
    behaviors: Rc<BehaviorRegistry>,
}

/// Registry of zone ids to zone resources plus the one active zone.
#[derive(Clone)]
pub struct ZoneManager(Rc<ZoneShared>);

impl ZoneManager {
    pub fn new(
        resources: ResourceManager,
        bus: MessageBus,
        components: Rc<ComponentRegistry>,
        behaviors: Rc<BehaviorRegistry>,
    ) -> Self {
        Self(Rc::new(ZoneShared {
            zones: RefCell::new(HashMap::new()),
            active: RefCell::new(None),
            pending: RefCell::new(None),
            generation: Cell::new(0),
            resources,
            bus,
            components,
            behaviors,
        }))
    }

    /// Maps `id` to the JSON resource at `path`.
    pub fn register_zone(&self, id: u32, path: &str) {
        if let Some(old) = self.0.zones.borrow_mut().insert(id, path.to_string()) {
            log::warn!("Zone {id} was registered at {old}, now at {path}");
        }
    }

    pub fn is_registered(&self, id: u32) -> bool {
        self.0.zones.borrow().contains_key(&id)
    }

    pub fn active_zone(&self) -> Option<Ref<'_, Zone>> {
        Ref::filter_map(self.0.active.borrow(), Option::as_ref).ok()
    }

    pub fn active_zone_id(&self) -> Option<u32> {
        self.0.active.borrow().as_ref().map(Zone::id)
    }

    /// The zone waiting for its resource, if any.
    pub fn pending_zone(&self) -> Option<u32> {
        self.0.pending.borrow().as_ref().map(|p| p.id)
    }

    /// Deactivates and unloads the active zone, then activates zone `id`.
    ///
    /// The new zone is built right away when its resource is cached. Otherwise
    /// the load is started and the zone is built once the resource-loaded
    /// message is handled. A newer call replaces a transition that is still
    /// waiting.
    pub fn change_zone(&self, id: u32) -> anyhow::Result<()> {
        let previous = {
            let Ok(mut active) = self.0.active.try_borrow_mut() else {
                anyhow::bail!("Cannot change to zone {id} while the active zone is busy");
            };
            active.take()
        };
        if let Some(mut zone) = previous {
            zone.on_deactivated();
            zone.unload();
        }
        self.cancel_pending();

        let path = self
            .0
            .zones
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(ConfigError::ZoneNotFound(id))?;

        if self.0.resources.is_loaded(&path) {
            let resource = self.0.resources.get_resource(&path);
            return self.0.load_from_resource(&path, resource.as_deref());
        }

        let generation = self.0.generation.get() + 1;
        self.0.generation.set(generation);
        let code = resource_loaded_code(&path);
        let shared = Rc::downgrade(&self.0);
        let handler: Handler = Rc::new(move |message: &Message| {
            on_zone_loaded(&shared, generation, message)
        });
        self.0.bus.subscribe(&code, handler.clone());
        *self.0.pending.borrow_mut() = Some(PendingZone {
            id,
            code,
            handler,
            generation,
        });
        self.0.resources.load_resource(&path);
        Ok(())
    }

    fn cancel_pending(&self) {
        let pending = self.0.pending.borrow_mut().take();
        if let Some(pending) = pending {
            log::debug!("Dropping pending change to zone {}", pending.id);
            self.0.bus.unsubscribe(&pending.code, &pending.handler);
        }
    }

    pub fn update(&self, time: f32) {
        if let Some(zone) = self.0.active.borrow_mut().as_mut() {
            zone.update(time);
        }
    }

    pub fn draw(&self, shader: &Shader) -> anyhow::Result<()> {
        match self.0.active.borrow().as_ref() {
            Some(zone) => zone.draw(shader),
            None => Ok(()),
        }
    }
}

fn on_zone_loaded(shared: &Weak<ZoneShared>, generation: u64, message: &Message) -> anyhow::Result<()> {
    let Some(shared) = shared.upgrade() else {
        return Ok(());
    };
    let pending = {
        let mut pending = shared.pending.borrow_mut();
        match pending.as_ref() {
            Some(p) if p.generation == generation => pending.take(),
            _ => None,
        }
    };
    let Some(pending) = pending else {
        return Ok(());
    };
    shared.bus.unsubscribe(&pending.code, &pending.handler);
    let path = message.code.trim_start_matches(crate::resources::RESOURCE_LOADED_PREFIX);
    shared.load_from_resource(path, message.context_as::<Resource>())
}

impl ZoneShared {
    fn load_from_resource(&self, path: &str, resource: Option<&Resource>) -> anyhow::Result<()> {
        let json = resource
            .and_then(Resource::as_json)
            .ok_or_else(|| anyhow::anyhow!("Zone resource {path} isn't JSON"))?;
        let zone = self.load_zone(json)?;
        zone.on_activated();
        *self.active.borrow_mut() = Some(zone);
        Ok(())
    }

    fn load_zone(&self, json: &Value) -> anyhow::Result<Zone> {
        let id = json
            .get("id")
            .ok_or(ConfigError::MissingField {
                context: "Zone",
                field: "id",
            })?
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or(ConfigError::InvalidField {
                context: "Zone",
                field: "id",
                expected: "a non-negative integer",
            })?;
        let name = optional_str(json, "Zone", "name")?.ok_or(ConfigError::MissingField {
            context: "Zone",
            field: "name",
        })?;
        let description = optional_str(json, "Zone", "description")?.unwrap_or_default();

        let mut zone = Zone::new(id, &name, &description);
        zone.init(json, &self.components, &self.behaviors)?;
        if let Err(e) = zone.load() {
            zone.unload();
            return Err(e);
        }
        Ok(zone)
    }
}
