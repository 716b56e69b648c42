use std::rc::Rc;

use crate::{
    components::{BehaviorRegistry, ComponentRegistry},
    config::EngineConfig,
    data_structures::zone::ZoneManager,
    gpu::Gpu,
    graphics::{MaterialManager, TextureManager},
    message::MessageBus,
    resources::{ResourceManager, Spawner},
};

/// Everything one engine instance shares between its subsystems.
///
/// The handles are cheap to clone and all refer to the same state, so two
/// contexts never see each other's subscriptions, caches or zones.
#[derive(Clone)]
pub struct Context {
    pub gpu: Gpu,
    pub bus: MessageBus,
    pub resources: ResourceManager,
    pub components: Rc<ComponentRegistry>,
    pub behaviors: Rc<BehaviorRegistry>,
    pub textures: TextureManager,
    pub materials: MaterialManager,
    pub zones: ZoneManager,
}

impl Context {
    pub fn new(gpu: Gpu, spawner: Spawner, config: &EngineConfig) -> Self {
        let bus = MessageBus::new(config.message_limit);
        let resources = ResourceManager::new(bus.clone(), spawner);
        let components = Rc::new(ComponentRegistry::default());
        let behaviors = Rc::new(BehaviorRegistry::default());
        let textures = TextureManager::new(gpu.clone(), bus.clone(), resources.clone());
        let materials = MaterialManager::new(textures.clone());
        let zones = ZoneManager::new(
            resources.clone(),
            bus.clone(),
            components.clone(),
            behaviors.clone(),
        );

        Self {
            gpu,
            bus,
            resources,
            components,
            behaviors,
            textures,
            materials,
            zones,
        }
    }
}
